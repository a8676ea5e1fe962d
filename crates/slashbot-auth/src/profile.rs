//! Stored credential records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use slashbot_core::AuthMethod;

/// One stored credential for one provider for one agent.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthProfile {
    /// Profile id, unique within `(provider_id, profile_id)`.
    pub profile_id: String,
    /// Provider this credential is for.
    pub provider_id: String,
    /// Human-readable label.
    pub label: String,
    /// How the credential was obtained.
    pub method: AuthMethod,
    /// When the profile was created.
    pub created_at: DateTime<Utc>,
    /// When the profile was last written.
    pub updated_at: DateTime<Utc>,
    /// Opaque credential data (tokens, keys, expiry bookkeeping).
    pub data: Value,
}

impl AuthProfile {
    /// Create a profile stamped with the current time.
    pub fn new(
        profile_id: impl Into<String>,
        provider_id: impl Into<String>,
        label: impl Into<String>,
        method: AuthMethod,
        data: Value,
    ) -> Self {
        let now = Utc::now();
        Self {
            profile_id: profile_id.into(),
            provider_id: provider_id.into(),
            label: label.into(),
            method,
            created_at: now,
            updated_at: now,
            data,
        }
    }

    /// The `(provider_id, profile_id)` identity key.
    #[must_use]
    pub fn key(&self) -> (String, String) {
        (self.provider_id.clone(), self.profile_id.clone())
    }
}

// Manual Debug so credential data never reaches logs.
impl std::fmt::Debug for AuthProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthProfile")
            .field("profile_id", &self.profile_id)
            .field("provider_id", &self.provider_id)
            .field("label", &self.label)
            .field("method", &self.method)
            .field("updated_at", &self.updated_at)
            .field("has_data", &!self.data.is_null())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn debug_does_not_leak_credential_data() {
        let profile = AuthProfile::new(
            "default",
            "anthropic",
            "Work",
            AuthMethod::ApiKey,
            json!({"apiKey": "sk-secret-123"}),
        );
        let debug = format!("{profile:?}");
        assert!(!debug.contains("sk-secret-123"));
        assert!(debug.contains("has_data: true"));
    }

    #[test]
    fn serde_round_trip() {
        let profile = AuthProfile::new(
            "default",
            "anthropic",
            "Work",
            AuthMethod::OauthPkce,
            json!({"refreshToken": "r"}),
        );
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["providerId"], "anthropic");
        assert_eq!(json["method"], "oauth_pkce");
        let back: AuthProfile = serde_json::from_value(json).unwrap();
        assert_eq!(back.key(), profile.key());
    }
}
