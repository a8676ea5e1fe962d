//! Session metadata persistence.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use slashbot_config::fs::write_json_atomic;
use slashbot_core::SlashbotHome;

use crate::error::{KernelError, KernelResult};

/// On-disk session metadata:
/// `agents/<agent>/sessions/<session>.json`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMeta {
    /// The session.
    pub session_id: String,
    /// The owning agent.
    pub agent_id: String,
    /// When the session started.
    pub started_at: DateTime<Utc>,
    /// `active` or `ended`.
    pub status: SessionStatus,
    /// When the session ended, if it has.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ended_at: Option<DateTime<Utc>>,
}

/// Session lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    /// The session is running.
    Active,
    /// The session has ended.
    Ended,
}

impl SessionMeta {
    /// Fresh metadata for a starting session.
    pub fn started(session_id: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            agent_id: agent_id.into(),
            started_at: Utc::now(),
            status: SessionStatus::Active,
            ended_at: None,
        }
    }

    /// Persist to the agent's sessions directory.
    ///
    /// # Errors
    ///
    /// Returns [`KernelError::SessionPersist`] when the write fails.
    pub fn write(&self, home: &SlashbotHome) -> KernelResult<()> {
        let path = home.session_file(&self.agent_id, &self.session_id);
        write_json_atomic(&path, self).map_err(|e| KernelError::SessionPersist {
            session_id: self.session_id.clone(),
            message: e.to_string(),
        })
    }

    /// Read back persisted metadata, if present.
    #[must_use]
    pub fn read(home: &SlashbotHome, agent_id: &str, session_id: &str) -> Option<Self> {
        let path = home.session_file(agent_id, session_id);
        let content = std::fs::read_to_string(path).ok()?;
        serde_json::from_str(&content).ok()
    }

    /// Transition to ended, stamping `ended_at`.
    pub fn end(&mut self) {
        self.status = SessionStatus::Ended;
        self.ended_at = Some(Utc::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_and_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let home = SlashbotHome::at(dir.path());

        let mut meta = SessionMeta::started("s-1", "main");
        meta.write(&home).unwrap();

        let read = SessionMeta::read(&home, "main", "s-1").unwrap();
        assert_eq!(read.status, SessionStatus::Active);
        assert!(read.ended_at.is_none());

        meta.end();
        meta.write(&home).unwrap();
        let read = SessionMeta::read(&home, "main", "s-1").unwrap();
        assert_eq!(read.status, SessionStatus::Ended);
        assert!(read.ended_at.is_some());
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let meta = SessionMeta::started("s-1", "main");
        let json = serde_json::to_value(&meta).unwrap();
        assert!(json.get("sessionId").is_some());
        assert!(json.get("startedAt").is_some());
        assert_eq!(json["status"], "active");
    }
}
