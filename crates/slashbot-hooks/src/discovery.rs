//! Filesystem hook discovery.
//!
//! Scans `{workspace}/.slashbot/hooks/` for scripts named
//! `<event>.<name>.sh` and registers each as a command hook. Scripts run
//! with the workspace root as cwd and a 30 s timeout.

use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use slashbot_core::{HookEvent, WorkspaceDir};

use crate::command::CommandHook;
use crate::dispatcher::HookDispatcher;
use crate::registration::HookRegistration;

/// Plugin id that owns filesystem hooks.
const FILESYSTEM_PLUGIN_ID: &str = "filesystem";

/// Timeout applied to every filesystem hook.
const FILESYSTEM_HOOK_TIMEOUT_MS: u64 = 30_000;

/// A hook script found on disk.
#[derive(Debug, Clone)]
pub struct DiscoveredHook {
    /// Event parsed from the filename.
    pub event: HookEvent,
    /// The `<name>` segment of the filename.
    pub name: String,
    /// Absolute path to the script.
    pub path: PathBuf,
}

/// Scan the workspace hooks directory.
///
/// Non-matching filenames and (on unix) non-executable files are skipped
/// with a log line; a missing directory yields an empty list.
#[must_use]
pub fn discover_filesystem_hooks(workspace_root: &Path) -> Vec<DiscoveredHook> {
    let hooks_dir = WorkspaceDir::new(workspace_root).hooks_dir();
    let entries = match std::fs::read_dir(&hooks_dir) {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %hooks_dir.display(), error = %e, "Failed to read hooks directory");
            return Vec::new();
        },
    };

    let mut hooks = Vec::new();
    for entry in entries.flatten() {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        let Some((event_name, name)) = parse_hook_file_name(file_name) else {
            debug!(file = %file_name, "Ignoring non-hook file in hooks directory");
            continue;
        };
        if !is_executable(&path) {
            warn!(path = %path.display(), "Hook script is not executable, skipping");
            continue;
        }
        hooks.push(DiscoveredHook {
            event: HookEvent::parse(event_name),
            name: name.to_string(),
            path,
        });
    }

    // Stable order regardless of directory iteration.
    hooks.sort_by(|a, b| a.path.cmp(&b.path));
    info!(
        count = hooks.len(),
        path = %hooks_dir.display(),
        "Discovered filesystem hooks"
    );
    hooks
}

/// Discover and register every filesystem hook. Returns how many were
/// registered.
pub fn register_filesystem_hooks(dispatcher: &HookDispatcher, workspace_root: &Path) -> usize {
    let discovered = discover_filesystem_hooks(workspace_root);
    let count = discovered.len();
    for hook in discovered {
        let event_name = hook.event.to_string();
        let handler =
            CommandHook::script(&hook.path, event_name.as_str()).with_cwd(workspace_root);
        dispatcher.register(
            HookRegistration::with_handler(FILESYSTEM_PLUGIN_ID, hook.event, handler)
                .with_timeout_ms(FILESYSTEM_HOOK_TIMEOUT_MS)
                .with_description(format!("filesystem hook {}", hook.name)),
        );
    }
    count
}

/// Split `<event>.<name>.sh` into its event and name segments.
fn parse_hook_file_name(file_name: &str) -> Option<(&str, &str)> {
    let stem = file_name.strip_suffix(".sh")?;
    let (event, name) = stem.split_once('.')?;
    if event.is_empty() || name.is_empty() {
        return None;
    }
    Some((event, name))
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    path.metadata()
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slashbot_core::{HookDomain, HookEvent};
    use slashbot_events::EventBus;
    use std::sync::Arc;

    use crate::registration::HookInvocation;

    fn write_script(dir: &Path, file_name: &str, body: &str) {
        let path = dir.join(file_name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).unwrap();
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        }
    }

    #[test]
    fn parses_event_and_name_segments() {
        assert_eq!(
            parse_hook_file_name("session_start.notify.sh"),
            Some(("session_start", "notify"))
        );
        assert_eq!(parse_hook_file_name("README.md"), None);
        assert_eq!(parse_hook_file_name("plain.sh"), None);
        assert_eq!(parse_hook_file_name(".x.sh"), None);
    }

    #[test]
    fn missing_directory_yields_empty_list() {
        let ws = tempfile::tempdir().unwrap();
        assert!(discover_filesystem_hooks(ws.path()).is_empty());
    }

    #[test]
    fn discovers_scripts_and_parses_events() {
        let ws = tempfile::tempdir().unwrap();
        let hooks_dir = ws.path().join(".slashbot").join("hooks");
        std::fs::create_dir_all(&hooks_dir).unwrap();
        write_script(&hooks_dir, "session_start.notify.sh", "true");
        write_script(&hooks_dir, "deploy.announce.sh", "true");
        std::fs::write(hooks_dir.join("notes.txt"), "not a hook").unwrap();

        let hooks = discover_filesystem_hooks(ws.path());
        assert_eq!(hooks.len(), 2);
        assert_eq!(hooks[0].event, HookEvent::Custom("deploy".into()));
        assert_eq!(hooks[1].event, HookEvent::SessionStart);
        assert_eq!(hooks[1].name, "notify");
    }

    #[cfg(unix)]
    #[test]
    fn non_executable_scripts_are_skipped() {
        use std::os::unix::fs::PermissionsExt;
        let ws = tempfile::tempdir().unwrap();
        let hooks_dir = ws.path().join(".slashbot").join("hooks");
        std::fs::create_dir_all(&hooks_dir).unwrap();
        let path = hooks_dir.join("session_start.quiet.sh");
        std::fs::write(&path, "#!/bin/sh\ntrue\n").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o644)).unwrap();

        assert!(discover_filesystem_hooks(ws.path()).is_empty());
    }

    #[tokio::test]
    async fn registered_script_patches_the_payload() {
        let ws = tempfile::tempdir().unwrap();
        let hooks_dir = ws.path().join(".slashbot").join("hooks");
        std::fs::create_dir_all(&hooks_dir).unwrap();
        write_script(
            &hooks_dir,
            "deploy.mark.sh",
            r#"printf '{"marked": "%s"}' "$SLASHBOT_HOOK_EVENT""#,
        );

        let dispatcher = HookDispatcher::new(Arc::new(EventBus::new()), 5_000);
        assert_eq!(register_filesystem_hooks(&dispatcher, ws.path()), 1);

        let event = HookEvent::Custom("deploy".into());
        let invocation = HookInvocation::new(event.clone());
        let report = dispatcher
            .dispatch(HookDomain::Custom, &event, json!({}), &invocation)
            .await;
        assert!(report.failures.is_empty());
        assert_eq!(report.final_payload["marked"], "deploy");
    }
}
