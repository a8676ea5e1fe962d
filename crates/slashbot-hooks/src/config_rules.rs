//! Registration of config-declared hooks.

use tracing::debug;

use slashbot_config::{HookAction, HooksConfig};
use slashbot_core::HookEvent;

use crate::command::CommandHook;
use crate::dispatcher::HookDispatcher;
use crate::registration::HookRegistration;

/// Plugin id that owns config-declared hooks.
const CONFIG_PLUGIN_ID: &str = "config";

/// Register every rule in `hooks.rules`. Returns how many hooks were
/// registered.
///
/// A rule with a `matcher` on an event that has a match field (tool and
/// command events) short-circuits when the payload carries that field
/// with a different value.
pub fn register_config_hooks(dispatcher: &HookDispatcher, config: &HooksConfig) -> usize {
    let mut count = 0;
    for (event_name, rules) in &config.rules {
        let event = HookEvent::parse(event_name);
        for rule in rules {
            for action in &rule.hooks {
                let HookAction::Command {
                    command,
                    timeout_ms,
                } = action;

                let mut handler = CommandHook::shell(command.as_str(), event_name.as_str());
                if let (Some(matcher), Some(field)) = (&rule.matcher, event.match_field()) {
                    handler = handler.with_matcher(field, matcher.as_str());
                }

                let mut registration =
                    HookRegistration::with_handler(CONFIG_PLUGIN_ID, event.clone(), handler)
                        .with_description(format!("config rule for {event_name}"));
                if let Some(timeout_ms) = timeout_ms {
                    registration = registration.with_timeout_ms(*timeout_ms);
                }

                debug!(event = %event_name, command = %command, "Registered config hook");
                dispatcher.register(registration);
                count += 1;
            }
        }
    }
    count
}
