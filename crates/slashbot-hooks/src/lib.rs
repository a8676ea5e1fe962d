//! Slashbot Hooks - priority-ordered, timeout-isolated middleware.
//!
//! Hooks are registered against a `(domain, event)` pair and invoked by the
//! [`HookDispatcher`] in deterministic order: ascending priority, ties by
//! registration order. Each handler receives a copy of the working payload
//! and may return an object whose top-level fields are merged back in.
//! Failures and timeouts are isolated per hook and reported in the
//! dispatch result, never thrown.
//!
//! Besides programmatic registrations, two declarative sources exist:
//! - config-declared rules (`hooks.rules` in `config.json`)
//! - filesystem hooks (`.slashbot/hooks/<event>.<name>.sh`)
//!
//! Both become command handlers executed through `tokio::process`.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod command;
mod config_rules;
mod discovery;
mod dispatcher;
mod error;
mod registration;

pub use command::CommandHook;
pub use config_rules::register_config_hooks;
pub use discovery::{discover_filesystem_hooks, register_filesystem_hooks, DiscoveredHook};
pub use dispatcher::{DispatchReport, HookDispatcher, HookFailure};
pub use error::{HookError, HookResult};
pub use registration::{HookHandler, HookInvocation, HookRegistration};
