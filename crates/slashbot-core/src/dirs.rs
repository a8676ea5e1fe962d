//! Directory scaffolding for the Slashbot home and workspace directories.
//!
//! Two key directory structures:
//!
//! - [`SlashbotHome`]: global state at `~/.slashbot/` (or `$SLASHBOT_HOME`).
//!   Holds the user config, the credential store, and per-agent session
//!   metadata.
//!
//! - [`WorkspaceDir`]: per-project directory at `<project>/.slashbot/`.
//!   Holds committable project config and filesystem hooks.
//!
//! # Layout
//!
//! ```text
//! ~/.slashbot/                    (SlashbotHome)
//! ├── config.json                   (user-level runtime config)
//! ├── credentials.json              (multi-agent auth profiles)
//! └── agents/<agent>/
//!     ├── agent/auth-profiles.json  (legacy profile file, read-only)
//!     └── sessions/<session>.json   (session metadata)
//!
//! <project>/.slashbot/            (WorkspaceDir)
//! ├── config.json                   (workspace config overlay)
//! └── hooks/<event>.<name>.sh       (filesystem hooks)
//! ```

use std::io;
use std::path::{Path, PathBuf};

/// Global Slashbot home directory (`~/.slashbot/` or `$SLASHBOT_HOME`).
#[derive(Debug, Clone)]
pub struct SlashbotHome {
    root: PathBuf,
}

impl SlashbotHome {
    /// Resolve the home directory.
    ///
    /// Checks `$SLASHBOT_HOME` first, then falls back to `$HOME/.slashbot/`.
    ///
    /// # Errors
    ///
    /// Returns an error if `$SLASHBOT_HOME` is relative, or if neither
    /// `$SLASHBOT_HOME` nor `$HOME` is set.
    pub fn resolve() -> io::Result<Self> {
        if let Ok(custom) = std::env::var("SLASHBOT_HOME") {
            let p = PathBuf::from(&custom);
            if !p.is_absolute() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    "SLASHBOT_HOME must be an absolute path",
                ));
            }
            return Ok(Self { root: p });
        }
        let home = std::env::var("HOME").map_err(|_| {
            io::Error::new(
                io::ErrorKind::NotFound,
                "neither SLASHBOT_HOME nor HOME environment variable is set",
            )
        })?;
        Ok(Self {
            root: PathBuf::from(home).join(".slashbot"),
        })
    }

    /// Use an explicit root (tests, `--home` override).
    #[must_use]
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `config.json` path.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.root.join("config.json")
    }

    /// `credentials.json` path.
    #[must_use]
    pub fn credentials_file(&self) -> PathBuf {
        self.root.join("credentials.json")
    }

    /// Directory for one agent's state.
    #[must_use]
    pub fn agent_dir(&self, agent_id: &str) -> PathBuf {
        self.root.join("agents").join(agent_id)
    }

    /// Legacy per-agent profile file (read-only compatibility path).
    #[must_use]
    pub fn legacy_profiles_file(&self, agent_id: &str) -> PathBuf {
        self.agent_dir(agent_id).join("agent").join("auth-profiles.json")
    }

    /// Directory holding one agent's session metadata files.
    #[must_use]
    pub fn sessions_dir(&self, agent_id: &str) -> PathBuf {
        self.agent_dir(agent_id).join("sessions")
    }

    /// Metadata file for one session.
    #[must_use]
    pub fn session_file(&self, agent_id: &str, session_id: &str) -> PathBuf {
        self.sessions_dir(agent_id).join(format!("{session_id}.json"))
    }

    /// Lock file guarding `(agent, provider)` credential writes.
    #[must_use]
    pub fn credentials_lock_file(&self, agent_id: &str, provider_id: &str) -> PathBuf {
        self.root
            .join(format!("credentials.{agent_id}.{provider_id}.lock"))
    }

    /// Create the root directory if it does not exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn ensure(&self) -> io::Result<()> {
        std::fs::create_dir_all(&self.root)
    }
}

/// Per-project directory at `<project>/.slashbot/`.
#[derive(Debug, Clone)]
pub struct WorkspaceDir {
    root: PathBuf,
}

impl WorkspaceDir {
    /// Wrap a workspace root (the project directory, not `.slashbot` itself).
    #[must_use]
    pub fn new(workspace_root: impl Into<PathBuf>) -> Self {
        Self {
            root: workspace_root.into(),
        }
    }

    /// The workspace root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// The `.slashbot` directory inside the workspace.
    #[must_use]
    pub fn dot_dir(&self) -> PathBuf {
        self.root.join(".slashbot")
    }

    /// Workspace config overlay path.
    #[must_use]
    pub fn config_file(&self) -> PathBuf {
        self.dot_dir().join("config.json")
    }

    /// Filesystem hooks directory.
    #[must_use]
    pub fn hooks_dir(&self) -> PathBuf {
        self.dot_dir().join("hooks")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn home_layout_paths() {
        let home = SlashbotHome::at("/tmp/sb-test");
        assert_eq!(home.config_file(), PathBuf::from("/tmp/sb-test/config.json"));
        assert_eq!(
            home.session_file("main", "abc"),
            PathBuf::from("/tmp/sb-test/agents/main/sessions/abc.json")
        );
        assert_eq!(
            home.legacy_profiles_file("main"),
            PathBuf::from("/tmp/sb-test/agents/main/agent/auth-profiles.json")
        );
        assert_eq!(
            home.credentials_lock_file("main", "anthropic"),
            PathBuf::from("/tmp/sb-test/credentials.main.anthropic.lock")
        );
    }

    #[test]
    fn workspace_layout_paths() {
        let ws = WorkspaceDir::new("/work/project");
        assert_eq!(
            ws.hooks_dir(),
            PathBuf::from("/work/project/.slashbot/hooks")
        );
        assert_eq!(
            ws.config_file(),
            PathBuf::from("/work/project/.slashbot/config.json")
        );
    }
}
