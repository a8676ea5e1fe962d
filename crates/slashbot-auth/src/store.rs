//! The credential store.
//!
//! Layout: a multi-agent document at `~/.slashbot/credentials.json`, with
//! optional read-only overlays in the cwd and workspace `.slashbot`
//! directories, plus a legacy per-agent file kept for backward
//! compatibility. Writes go only to the user-global file, via temp-file +
//! rename. Read-modify-write cycles (token refresh) must run inside
//! [`CredentialStore::with_profile_lock`].

use std::collections::BTreeMap;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use slashbot_config::fs::write_json_atomic;
use slashbot_core::{SlashbotHome, WorkspaceDir};

use crate::error::{AuthError, AuthResult};
use crate::profile::AuthProfile;

/// Lock polling interval.
const LOCK_POLL_INTERVAL: Duration = Duration::from_millis(100);
/// Lock acquisition deadline.
const LOCK_DEADLINE: Duration = Duration::from_secs(5);
/// Current credential document version.
const CREDENTIALS_VERSION: u32 = 1;

/// The on-disk multi-agent credential document.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct CredentialsDoc {
    version: u32,
    #[serde(default)]
    agents: BTreeMap<String, AgentProfiles>,
}

impl Default for CredentialsDoc {
    fn default() -> Self {
        Self {
            version: CREDENTIALS_VERSION,
            agents: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct AgentProfiles {
    #[serde(default)]
    profiles: Vec<AuthProfile>,
}

/// Legacy per-agent file: `agents/<agent>/agent/auth-profiles.json`.
#[derive(Debug, Clone, Default, Deserialize)]
struct LegacyProfilesFile {
    #[serde(default)]
    profiles: Vec<AuthProfile>,
}

/// Persistent store for auth profiles.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    home: SlashbotHome,
    cwd_overlay: Option<PathBuf>,
    workspace_overlay: Option<PathBuf>,
}

impl CredentialStore {
    /// Create a store over the given home, with no overlays.
    #[must_use]
    pub fn new(home: SlashbotHome) -> Self {
        Self {
            home,
            cwd_overlay: None,
            workspace_overlay: None,
        }
    }

    /// Also read `<cwd>/.slashbot/credentials.json`.
    #[must_use]
    pub fn with_cwd_overlay(mut self, cwd: &Path) -> Self {
        self.cwd_overlay = Some(WorkspaceDir::new(cwd).dot_dir().join("credentials.json"));
        self
    }

    /// Also read `<workspace>/.slashbot/credentials.json`.
    #[must_use]
    pub fn with_workspace_overlay(mut self, workspace_root: &Path) -> Self {
        self.workspace_overlay = Some(
            WorkspaceDir::new(workspace_root)
                .dot_dir()
                .join("credentials.json"),
        );
        self
    }

    /// List profiles for an agent, optionally filtered by provider.
    ///
    /// Merge order: user-global file, cwd overlay, workspace overlay,
    /// legacy per-agent file. The first occurrence of a
    /// `(provider_id, profile_id)` pair wins. Missing or corrupt overlay
    /// and legacy files are skipped with a warning; a corrupt user-global
    /// file is an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the user-global file exists but cannot be read
    /// or parsed.
    pub fn list_profiles(
        &self,
        agent_id: &str,
        provider_id: Option<&str>,
    ) -> AuthResult<Vec<AuthProfile>> {
        let mut merged: Vec<AuthProfile> = Vec::new();
        let mut seen: HashSet<(String, String)> = HashSet::new();

        let mut absorb = |profiles: Vec<AuthProfile>| {
            for profile in profiles {
                if seen.insert(profile.key()) {
                    merged.push(profile);
                }
            }
        };

        absorb(self.read_user_global(agent_id)?);

        for overlay in [&self.cwd_overlay, &self.workspace_overlay].into_iter().flatten() {
            absorb(read_doc_lenient(overlay, agent_id));
        }

        absorb(self.read_legacy(agent_id));

        if let Some(provider_id) = provider_id {
            merged.retain(|p| p.provider_id == provider_id);
        }
        Ok(merged)
    }

    /// Insert or replace a profile in the user-global file.
    ///
    /// Bumps `updated_at` and writes atomically. Callers refreshing
    /// tokens must wrap the read-modify-write in
    /// [`CredentialStore::with_profile_lock`].
    ///
    /// # Errors
    ///
    /// Returns an error if the user-global file cannot be read or written.
    pub fn upsert_profile(&self, agent_id: &str, mut profile: AuthProfile) -> AuthResult<()> {
        let path = self.home.credentials_file();
        let mut doc = self.read_doc()?.unwrap_or_default();

        profile.updated_at = chrono::Utc::now();

        let agent = doc.agents.entry(agent_id.to_string()).or_default();
        let key = profile.key();
        if let Some(existing) = agent.profiles.iter_mut().find(|p| p.key() == key) {
            *existing = profile;
        } else {
            agent.profiles.push(profile);
        }

        write_json_atomic(&path, &doc).map_err(|e| AuthError::Write {
            path: path.display().to_string(),
            detail: e.to_string(),
        })?;
        debug!(agent_id, "Wrote credential store");
        Ok(())
    }

    /// Run `f` while holding the exclusive `(agent, provider)` lock.
    ///
    /// The lock is a file created with exclusive-create semantics,
    /// polled every 100 ms for up to 5 s. A stale lock from a dead owner
    /// is not reclaimed; callers see [`AuthError::LockTimeout`].
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::LockTimeout`] when the deadline passes, or
    /// whatever `f` returns.
    pub async fn with_profile_lock<T, F, Fut>(
        &self,
        agent_id: &str,
        provider_id: &str,
        f: F,
    ) -> AuthResult<T>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = AuthResult<T>>,
    {
        let lock_path = self.home.credentials_lock_file(agent_id, provider_id);
        if let Some(parent) = lock_path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| AuthError::Write {
                path: lock_path.display().to_string(),
                detail: e.to_string(),
            })?;
        }

        let started = Instant::now();
        loop {
            match std::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&lock_path)
            {
                Ok(_) => break,
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if started.elapsed() >= LOCK_DEADLINE {
                        return Err(AuthError::LockTimeout {
                            agent_id: agent_id.to_string(),
                            provider_id: provider_id.to_string(),
                            waited_ms: u64::try_from(started.elapsed().as_millis())
                                .unwrap_or(u64::MAX),
                        });
                    }
                    tokio::time::sleep(LOCK_POLL_INTERVAL).await;
                },
                Err(e) => {
                    return Err(AuthError::Write {
                        path: lock_path.display().to_string(),
                        detail: e.to_string(),
                    });
                },
            }
        }

        let result = f().await;

        if let Err(e) = std::fs::remove_file(&lock_path) {
            warn!(path = %lock_path.display(), error = %e, "Failed to remove credential lock");
        }
        result
    }

    fn read_user_global(&self, agent_id: &str) -> AuthResult<Vec<AuthProfile>> {
        Ok(self
            .read_doc()?
            .and_then(|doc| doc.agents.get(agent_id).cloned())
            .map(|agent| agent.profiles)
            .unwrap_or_default())
    }

    fn read_doc(&self) -> AuthResult<Option<CredentialsDoc>> {
        let path = self.home.credentials_file();
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(AuthError::Read {
                    path: path.display().to_string(),
                    source: e,
                });
            },
        };
        let doc: CredentialsDoc =
            serde_json::from_str(&content).map_err(|e| AuthError::Parse {
                path: path.display().to_string(),
                source: e,
            })?;
        Ok(Some(doc))
    }

    fn read_legacy(&self, agent_id: &str) -> Vec<AuthProfile> {
        let path = self.home.legacy_profiles_file(agent_id);
        let content = match std::fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read legacy profile file");
                return Vec::new();
            },
        };
        match serde_json::from_str::<LegacyProfilesFile>(&content) {
            Ok(file) => file.profiles,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Malformed legacy profile file, skipping");
                Vec::new()
            },
        }
    }
}

/// Read an overlay document, tolerating absence and corruption.
fn read_doc_lenient(path: &Path, agent_id: &str) -> Vec<AuthProfile> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to read credential overlay");
            return Vec::new();
        },
    };
    match serde_json::from_str::<CredentialsDoc>(&content) {
        Ok(doc) => doc
            .agents
            .get(agent_id)
            .map(|a| a.profiles.clone())
            .unwrap_or_default(),
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Malformed credential overlay, skipping");
            Vec::new()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use slashbot_core::AuthMethod;
    use std::sync::Arc;

    fn profile(provider: &str, id: &str, label: &str) -> AuthProfile {
        AuthProfile::new(id, provider, label, AuthMethod::ApiKey, json!({"k": label}))
    }

    fn store(dir: &Path) -> CredentialStore {
        CredentialStore::new(SlashbotHome::at(dir))
    }

    #[test]
    fn upsert_then_list_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        store
            .upsert_profile("main", profile("anthropic", "default", "first"))
            .unwrap();
        store
            .upsert_profile("main", profile("openai", "default", "other"))
            .unwrap();

        let all = store.list_profiles("main", None).unwrap();
        assert_eq!(all.len(), 2);

        let anthropic = store.list_profiles("main", Some("anthropic")).unwrap();
        assert_eq!(anthropic.len(), 1);
        assert_eq!(anthropic[0].label, "first");
    }

    #[test]
    fn upsert_replaces_and_bumps_updated_at() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let original = profile("anthropic", "default", "v1");
        let created_at = original.created_at;
        store.upsert_profile("main", original).unwrap();
        store
            .upsert_profile("main", profile("anthropic", "default", "v2"))
            .unwrap();

        let profiles = store.list_profiles("main", Some("anthropic")).unwrap();
        assert_eq!(profiles.len(), 1);
        assert_eq!(profiles[0].label, "v2");
        assert!(profiles[0].updated_at >= created_at);
    }

    #[test]
    fn first_occurrence_wins_across_layers() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        store
            .upsert_profile("main", profile("anthropic", "default", "global"))
            .unwrap();

        // Legacy file with the same key plus a new one.
        let legacy = SlashbotHome::at(dir.path()).legacy_profiles_file("main");
        std::fs::create_dir_all(legacy.parent().unwrap()).unwrap();
        let legacy_doc = json!({"profiles": [
            serde_json::to_value(profile("anthropic", "default", "legacy")).unwrap(),
            serde_json::to_value(profile("anthropic", "spare", "legacy-spare")).unwrap(),
        ]});
        std::fs::write(&legacy, legacy_doc.to_string()).unwrap();

        let profiles = store.list_profiles("main", Some("anthropic")).unwrap();
        assert_eq!(profiles.len(), 2);
        assert_eq!(profiles[0].label, "global");
        assert_eq!(profiles[1].label, "legacy-spare");
    }

    #[test]
    fn corrupt_user_global_is_an_error_but_corrupt_legacy_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let home = SlashbotHome::at(dir.path());

        let legacy = home.legacy_profiles_file("main");
        std::fs::create_dir_all(legacy.parent().unwrap()).unwrap();
        std::fs::write(&legacy, "{broken").unwrap();
        assert!(store.list_profiles("main", None).unwrap().is_empty());

        std::fs::create_dir_all(home.root()).unwrap();
        std::fs::write(home.credentials_file(), "{broken").unwrap();
        assert!(matches!(
            store.list_profiles("main", None),
            Err(AuthError::Parse { .. })
        ));
    }

    #[tokio::test]
    async fn profile_lock_serializes_writers() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store(dir.path()));

        let a = Arc::clone(&store);
        let first = tokio::spawn(async move {
            a.with_profile_lock("main", "anthropic", || async {
                tokio::time::sleep(Duration::from_millis(250)).await;
                a.upsert_profile("main", profile("anthropic", "default", "first"))
            })
            .await
        });

        // Give the first task time to take the lock.
        tokio::time::sleep(Duration::from_millis(50)).await;

        let b = Arc::clone(&store);
        let second = tokio::spawn(async move {
            let started = std::time::Instant::now();
            let result = b
                .with_profile_lock("main", "anthropic", || async {
                    // The first writer's update must be visible here.
                    let seen = b.list_profiles("main", Some("anthropic"))?;
                    assert_eq!(seen[0].label, "first");
                    b.upsert_profile("main", profile("anthropic", "default", "second"))
                })
                .await;
            (result, started.elapsed())
        });

        first.await.unwrap().unwrap();
        let (result, waited) = second.await.unwrap();
        result.unwrap();
        assert!(waited >= Duration::from_millis(150));

        let profiles = store.list_profiles("main", Some("anthropic")).unwrap();
        assert_eq!(profiles[0].label, "second");
    }

    // Paused time auto-advances through the poll sleeps, so the 5s
    // deadline elapses instantly in virtual time.
    #[tokio::test(start_paused = true)]
    async fn stale_lock_times_out() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());
        let home = SlashbotHome::at(dir.path());
        std::fs::create_dir_all(home.root()).unwrap();
        std::fs::write(home.credentials_lock_file("main", "anthropic"), "").unwrap();

        let result = store
            .with_profile_lock("main", "anthropic", || async { Ok(()) })
            .await;
        assert!(matches!(result, Err(AuthError::LockTimeout { .. })));

        // The stale lock is still on disk: it was not reclaimed.
        assert!(home.credentials_lock_file("main", "anthropic").exists());
    }
}
