//! Credential methods.
//!
//! `AuthMethod` lives in `slashbot-core` so that both `slashbot-auth`
//! (profile records) and `slashbot-llm` (provider preference order) can
//! reference it without a circular dependency.

use serde::{Deserialize, Serialize};
use std::fmt;

/// How a stored credential was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    /// OAuth authorization-code flow with PKCE.
    OauthPkce,
    /// Plain API key.
    ApiKey,
    /// One-time setup token exchanged for credentials.
    SetupToken,
    /// Credentials imported from a Claude Code installation.
    ClaudeCodeImport,
}

impl fmt::Display for AuthMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OauthPkce => write!(f, "oauth_pkce"),
            Self::ApiKey => write!(f, "api_key"),
            Self::SetupToken => write!(f, "setup_token"),
            Self::ClaudeCodeImport => write!(f, "claude_code_import"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serde_uses_snake_case() {
        let json = serde_json::to_string(&AuthMethod::OauthPkce).unwrap();
        assert_eq!(json, r#""oauth_pkce""#);
        let back: AuthMethod = serde_json::from_str(r#""claude_code_import""#).unwrap();
        assert_eq!(back, AuthMethod::ClaudeCodeImport);
    }
}
