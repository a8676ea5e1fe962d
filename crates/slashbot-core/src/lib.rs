//! Slashbot Core - Foundation types for the Slashbot assistant host.
//!
//! This crate provides:
//! - The canonical conversation message type and its content variants
//! - Dual-channel tool results (separate payloads for the model and the user)
//! - Hook domains and named hook events
//! - Event-bus envelopes
//! - The `~/.slashbot/` directory layout

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod auth_method;
pub mod dirs;
pub mod envelope;
pub mod error_codes;
pub mod hook_event;
pub mod json_cap;
pub mod message;
pub mod op_ctx;
pub mod tool;

pub use auth_method::AuthMethod;
pub use dirs::{SlashbotHome, WorkspaceDir};
pub use envelope::EventEnvelope;
pub use hook_event::{HookDomain, HookEvent};
pub use json_cap::cap_json;
pub use message::{AgentMessage, ContentPart, MessageContent, MessageRole};
pub use op_ctx::OpCtx;
pub use tool::{ToolResult, ToolResultError};
