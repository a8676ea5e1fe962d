//! Dual-channel tool results.
//!
//! A [`ToolResult`] carries separate payloads for the model (`for_llm`) and
//! the user surface (`for_user`). The kernel mandates the channel semantics;
//! how a connector renders `for_user` is its own business.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Result of a tool execution.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolResult {
    /// Whether the tool succeeded.
    pub ok: bool,
    /// Primary output, used when no channel-specific payload is set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
    /// Payload for the user surface.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_user: Option<String>,
    /// Payload fed back to the model.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub for_llm: Option<String>,
    /// Suppress user emission entirely.
    #[serde(default)]
    pub silent: bool,
    /// Error details when `ok` is false.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ToolResultError>,
    /// Free-form metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<Value>,
}

impl ToolResult {
    /// Create a successful result with a single output payload.
    pub fn success(output: impl Into<String>) -> Self {
        Self {
            ok: true,
            output: Some(output.into()),
            ..Self::default()
        }
    }

    /// Create a failed result with an error code and message.
    pub fn failure(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(ToolResultError {
                code: code.into(),
                message: message.into(),
                hint: None,
            }),
            ..Self::default()
        }
    }

    /// Set the model-facing payload.
    #[must_use]
    pub fn with_for_llm(mut self, text: impl Into<String>) -> Self {
        self.for_llm = Some(text.into());
        self
    }

    /// Set the user-facing payload.
    #[must_use]
    pub fn with_for_user(mut self, text: impl Into<String>) -> Self {
        self.for_user = Some(text.into());
        self
    }

    /// Mark the result as silent (no user emission).
    #[must_use]
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    /// Text fed back to the model: `for_llm`, falling back to `output`,
    /// falling back to the error message.
    #[must_use]
    pub fn llm_text(&self) -> String {
        if let Some(text) = &self.for_llm {
            return text.clone();
        }
        if let Some(text) = &self.output {
            return text.clone();
        }
        match &self.error {
            Some(e) => format!("ERROR [{}] {}", e.code, e.message),
            None => String::new(),
        }
    }

    /// Text for the user surface, unless `silent` is set: `for_user`,
    /// falling back to `output`.
    #[must_use]
    pub fn user_text(&self) -> Option<String> {
        if self.silent {
            return None;
        }
        self.for_user.clone().or_else(|| self.output.clone())
    }
}

/// Error details attached to a failed [`ToolResult`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResultError {
    /// Stable error code (see [`crate::error_codes`]).
    pub code: String,
    /// Human-readable message.
    pub message: String,
    /// Optional remediation hint.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}
