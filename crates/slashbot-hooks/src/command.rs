//! Command hook handler - executes shell commands.
//!
//! Used by config-declared rules and filesystem hooks. The spawned process
//! receives the event name and payload through `SLASHBOT_HOOK_EVENT` /
//! `SLASHBOT_HOOK_PAYLOAD`; if its stdout parses as a JSON object, that
//! object becomes the handler's payload patch.

use std::path::PathBuf;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;
use tracing::{debug, warn};

use crate::error::{HookError, HookResult};
use crate::registration::{HookHandler, HookInvocation};

/// A hook handler that runs an external command.
#[derive(Debug, Clone)]
pub struct CommandHook {
    program: String,
    args: Vec<String>,
    cwd: Option<PathBuf>,
    /// `(payload field, expected value)` — when the field is present and
    /// differs, the handler short-circuits without spawning.
    matcher: Option<(String, String)>,
    event_name: String,
}

impl CommandHook {
    /// Run a shell command line (`sh -c <command>`), as config rules do.
    #[must_use]
    pub fn shell(command: impl Into<String>, event_name: impl Into<String>) -> Self {
        Self {
            program: "sh".to_string(),
            args: vec!["-c".to_string(), command.into()],
            cwd: None,
            matcher: None,
            event_name: event_name.into(),
        }
    }

    /// Run a script directly, as filesystem hooks do.
    #[must_use]
    pub fn script(path: impl Into<PathBuf>, event_name: impl Into<String>) -> Self {
        let path = path.into();
        Self {
            program: path.display().to_string(),
            args: Vec::new(),
            cwd: None,
            matcher: None,
            event_name: event_name.into(),
        }
    }

    /// Set the working directory.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Short-circuit unless `payload[field]` is absent or equals `value`.
    #[must_use]
    pub fn with_matcher(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.matcher = Some((field.into(), value.into()));
        self
    }
}

#[async_trait]
impl HookHandler for CommandHook {
    async fn handle(
        &self,
        payload: Value,
        _invocation: &HookInvocation,
    ) -> HookResult<Option<Value>> {
        if let Some((field, expected)) = &self.matcher {
            if let Some(actual) = payload.get(field) {
                let matches = actual.as_str() == Some(expected.as_str());
                if !matches {
                    debug!(
                        field = %field,
                        expected = %expected,
                        "Matcher did not match, skipping command hook"
                    );
                    return Ok(None);
                }
            }
        }

        let payload_json = serde_json::to_string(&payload)?;

        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .env("SLASHBOT_HOOK_EVENT", &self.event_name)
            .env("SLASHBOT_HOOK_PAYLOAD", &payload_json)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        debug!(program = %self.program, event = %self.event_name, "Executing command hook");

        let output = cmd.output().await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stdout.trim().is_empty() {
            debug!(program = %self.program, stdout = %stdout.trim(), "Command hook stdout");
        }
        if !stderr.trim().is_empty() {
            warn!(program = %self.program, stderr = %stderr.trim(), "Command hook stderr");
        }

        if !output.status.success() {
            return Err(HookError::Command(format!(
                "{} exited with {}",
                self.program, output.status
            )));
        }

        match serde_json::from_str::<Value>(stdout.trim()) {
            Ok(patch @ Value::Object(_)) => Ok(Some(patch)),
            _ => Ok(None),
        }
    }
}
