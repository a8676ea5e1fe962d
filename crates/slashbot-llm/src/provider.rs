//! The LLM provider trait and completion types.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use slashbot_core::AgentMessage;

use crate::error::LlmResult;

/// A bound provider instance: one model, ready to complete.
#[async_trait]
pub trait LlmProvider: Send + Sync + std::fmt::Debug {
    /// The provider id.
    fn provider_id(&self) -> &str;

    /// The model id this instance is bound to.
    fn model_id(&self) -> &str;

    /// The model's context window in tokens.
    fn context_window(&self) -> usize;

    /// Run one completion.
    async fn complete(&self, request: &CompletionRequest) -> LlmResult<CompletionResponse>;
}

/// One completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionRequest {
    /// Prepared conversation, system messages included.
    pub messages: Vec<AgentMessage>,
    /// Tool schemas offered to the model: `(tool id, description, parameters)`.
    #[serde(default)]
    pub tools: Vec<(String, String, Value)>,
}

/// One completion response.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionResponse {
    /// The assistant message.
    pub message: AgentMessage,
    /// Tool calls the model requested, in order.
    #[serde(default)]
    pub tool_calls: Vec<ToolCallRequest>,
    /// Token usage, when the transport reports it.
    #[serde(default)]
    pub usage: Option<Usage>,
}

/// A tool call requested by the model.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallRequest {
    /// Call id, echoed back with the result.
    pub call_id: String,
    /// Tool id to invoke.
    pub tool_id: String,
    /// Arguments for the tool.
    pub args: Value,
}

/// Token usage for one completion.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Usage {
    /// Tokens in the prompt.
    pub input_tokens: usize,
    /// Tokens generated.
    pub output_tokens: usize,
}

impl Usage {
    /// Total tokens.
    #[must_use]
    pub fn total(&self) -> usize {
        self.input_tokens + self.output_tokens
    }
}
