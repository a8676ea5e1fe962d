//! Slashbot Kernel - the host façade.
//!
//! The kernel owns every registry (tools, commands, providers, services,
//! HTTP routes, gateway methods, status indicators), the hook dispatcher,
//! the event bus, and the prompt assembler. Plugins populate the
//! registries during activation through the registration context; after
//! startup the kernel exposes the operational surface: `run_tool`,
//! `run_command`, `assemble_prompt`, message lifecycle dispatch, and
//! session bookkeeping.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod context_impl;
mod error;
mod kernel;
mod prompt;
mod registry;
mod routes;
mod services;
mod session;
mod status;

pub use error::{KernelError, KernelResult};
pub use kernel::{Health, HealthStatus, Kernel};
pub use prompt::{ContextProvider, PromptAssembler, PromptSection};
pub use registry::{Registered, Registry};
pub use routes::HttpRouteRegistry;
pub use services::ServiceRegistry;
pub use session::{SessionMeta, SessionStatus};
pub use status::{StatusIndicatorRegistry, StatusSubscription};
