//! Hook domains and named hook events.
//!
//! These live in `slashbot-core` so that both `slashbot-hooks` and
//! `slashbot-plugins` can reference them without a circular dependency.

use serde::{Deserialize, Serialize};
use std::fmt;

/// The domain a hook belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookDomain {
    /// Kernel startup/shutdown.
    Kernel,
    /// Message, tool, command, and prompt lifecycle inflection points.
    Lifecycle,
    /// Plugin-defined events, including filesystem hooks.
    Custom,
}

impl fmt::Display for HookDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kernel => write!(f, "kernel"),
            Self::Lifecycle => write!(f, "lifecycle"),
            Self::Custom => write!(f, "custom"),
        }
    }
}

/// Events that can trigger hooks.
///
/// The kernel and lifecycle events are a closed set; plugins contribute
/// arbitrary events through [`HookEvent::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HookEvent {
    /// Kernel has finished startup.
    Startup,
    /// Kernel is shutting down.
    Shutdown,
    /// Session has started.
    SessionStart,
    /// Session is ending.
    SessionEnd,
    /// A message arrived from a user or connector.
    MessageReceived,
    /// A message is about to be sent.
    MessageSending,
    /// A message was sent.
    MessageSent,
    /// Before a tool call is executed.
    BeforeToolCall,
    /// After a tool call completes.
    AfterToolCall,
    /// A tool result is being persisted.
    ToolResultPersist,
    /// Before a command runs.
    BeforeCommand,
    /// After a command runs.
    AfterCommand,
    /// Before the system prompt is assembled.
    BeforePromptAssemble,
    /// After the system prompt is assembled.
    AfterPromptAssemble,
    /// Before an LLM call.
    BeforeLlmCall,
    /// After an LLM call.
    AfterLlmCall,
    /// CLI host initialized.
    CliInit,
    /// CLI host exiting.
    CliExit,
    /// A plugin-defined event.
    #[serde(untagged)]
    Custom(String),
}

impl HookEvent {
    /// The domain this event belongs to.
    #[must_use]
    pub fn domain(&self) -> HookDomain {
        match self {
            Self::Startup | Self::Shutdown => HookDomain::Kernel,
            Self::Custom(_) => HookDomain::Custom,
            _ => HookDomain::Lifecycle,
        }
    }

    /// Parse a snake_case event name; unknown names become [`HookEvent::Custom`].
    #[must_use]
    pub fn parse(name: &str) -> Self {
        match name {
            "startup" => Self::Startup,
            "shutdown" => Self::Shutdown,
            "session_start" => Self::SessionStart,
            "session_end" => Self::SessionEnd,
            "message_received" => Self::MessageReceived,
            "message_sending" => Self::MessageSending,
            "message_sent" => Self::MessageSent,
            "before_tool_call" => Self::BeforeToolCall,
            "after_tool_call" => Self::AfterToolCall,
            "tool_result_persist" => Self::ToolResultPersist,
            "before_command" => Self::BeforeCommand,
            "after_command" => Self::AfterCommand,
            "before_prompt_assemble" => Self::BeforePromptAssemble,
            "after_prompt_assemble" => Self::AfterPromptAssemble,
            "before_llm_call" => Self::BeforeLlmCall,
            "after_llm_call" => Self::AfterLlmCall,
            "cli_init" => Self::CliInit,
            "cli_exit" => Self::CliExit,
            other => Self::Custom(other.to_string()),
        }
    }

    /// The payload field a config matcher compares against, if this event
    /// has one (`toolId` for tool events, `commandId` for command events).
    #[must_use]
    pub fn match_field(&self) -> Option<&'static str> {
        match self {
            Self::BeforeToolCall | Self::AfterToolCall | Self::ToolResultPersist => {
                Some("toolId")
            },
            Self::BeforeCommand | Self::AfterCommand => Some("commandId"),
            _ => None,
        }
    }
}

impl fmt::Display for HookEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Startup => write!(f, "startup"),
            Self::Shutdown => write!(f, "shutdown"),
            Self::SessionStart => write!(f, "session_start"),
            Self::SessionEnd => write!(f, "session_end"),
            Self::MessageReceived => write!(f, "message_received"),
            Self::MessageSending => write!(f, "message_sending"),
            Self::MessageSent => write!(f, "message_sent"),
            Self::BeforeToolCall => write!(f, "before_tool_call"),
            Self::AfterToolCall => write!(f, "after_tool_call"),
            Self::ToolResultPersist => write!(f, "tool_result_persist"),
            Self::BeforeCommand => write!(f, "before_command"),
            Self::AfterCommand => write!(f, "after_command"),
            Self::BeforePromptAssemble => write!(f, "before_prompt_assemble"),
            Self::AfterPromptAssemble => write!(f, "after_prompt_assemble"),
            Self::BeforeLlmCall => write!(f, "before_llm_call"),
            Self::AfterLlmCall => write!(f, "after_llm_call"),
            Self::CliInit => write!(f, "cli_init"),
            Self::CliExit => write!(f, "cli_exit"),
            Self::Custom(name) => write!(f, "{name}"),
        }
    }
}
