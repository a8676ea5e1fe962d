//! Post-merge validation.

use crate::error::{ConfigError, ConfigResult};
use crate::types::{HookAction, RuntimeConfig};

/// Validate a merged configuration.
///
/// # Errors
///
/// Returns [`ConfigError::Invalid`] naming the first offending field.
pub fn validate(config: &RuntimeConfig) -> ConfigResult<()> {
    if config.gateway.port == 0 {
        return Err(invalid("gateway.port", "port must be non-zero"));
    }
    if config.gateway.host.trim().is_empty() {
        return Err(invalid("gateway.host", "host must be non-empty"));
    }
    if config.hooks.default_timeout_ms == 0 {
        return Err(invalid(
            "hooks.defaultTimeoutMs",
            "timeout must be non-zero",
        ));
    }
    if config.command_safety.default_timeout_ms == 0 {
        return Err(invalid(
            "commandSafety.defaultTimeoutMs",
            "timeout must be non-zero",
        ));
    }
    for (idx, entry) in config.plugins.entries.iter().enumerate() {
        if entry.id.trim().is_empty() {
            return Err(invalid(
                &format!("plugins.entries[{idx}].id"),
                "plugin id must be non-empty",
            ));
        }
    }
    for (event, rules) in &config.hooks.rules {
        for (idx, rule) in rules.iter().enumerate() {
            if rule.hooks.is_empty() {
                return Err(invalid(
                    &format!("hooks.rules.{event}[{idx}].hooks"),
                    "rule must declare at least one action",
                ));
            }
            for action in &rule.hooks {
                let HookAction::Command { command, .. } = action;
                if command.trim().is_empty() {
                    return Err(invalid(
                        &format!("hooks.rules.{event}[{idx}]"),
                        "command must be non-empty",
                    ));
                }
            }
        }
    }
    Ok(())
}

fn invalid(field: &str, message: &str) -> ConfigError {
    ConfigError::Invalid {
        field: field.to_string(),
        message: message.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{HookRule, PluginEntry};

    #[test]
    fn default_config_is_valid() {
        assert!(validate(&RuntimeConfig::default()).is_ok());
    }

    #[test]
    fn zero_port_is_rejected() {
        let mut config = RuntimeConfig::default();
        config.gateway.port = 0;
        let err = validate(&config).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { field, .. } if field == "gateway.port"));
    }

    #[test]
    fn empty_plugin_id_is_rejected() {
        let mut config = RuntimeConfig::default();
        config.plugins.entries.push(PluginEntry {
            id: "  ".into(),
            enabled: true,
            config: serde_json::Value::Null,
        });
        assert!(validate(&config).is_err());
    }

    #[test]
    fn rule_without_actions_is_rejected() {
        let mut config = RuntimeConfig::default();
        config.hooks.rules.insert(
            "before_tool_call".into(),
            vec![HookRule {
                matcher: None,
                hooks: vec![],
            }],
        );
        assert!(validate(&config).is_err());
    }
}
