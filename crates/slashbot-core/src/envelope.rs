//! Event-bus envelopes.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A typed event published on the bus.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Event type, e.g. `hook:dispatch_start` or `tool:result`.
    #[serde(rename = "type")]
    pub event_type: String,
    /// Event payload.
    pub payload: Value,
    /// When the event was published.
    pub at: DateTime<Utc>,
}

impl EventEnvelope {
    /// Create an envelope stamped with the current time.
    pub fn new(event_type: impl Into<String>, payload: Value) -> Self {
        Self {
            event_type: event_type.into(),
            payload,
            at: Utc::now(),
        }
    }
}
