//! Auth routing: profile selection and per-session rotation.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use tracing::{debug, warn};

use slashbot_config::ProvidersConfig;
use slashbot_core::AuthMethod;
use slashbot_llm::ProviderRegistry;

use crate::error::{AuthError, AuthResult};
use crate::profile::AuthProfile;
use crate::store::CredentialStore;

/// A resolve request.
#[derive(Debug, Clone)]
pub struct ResolveRequest {
    /// Agent whose credentials apply.
    pub agent_id: String,
    /// Session scoping the rotation state.
    pub session_id: String,
    /// Overrides the configured active provider when set.
    pub pinned_provider_id: Option<String>,
}

/// A usable provider/profile/model triple.
#[derive(Debug, Clone)]
pub struct ResolvedAuth {
    /// The selected provider.
    pub provider_id: String,
    /// The selected profile.
    pub profile: AuthProfile,
    /// The model to call.
    pub model_id: String,
}

/// A profile failure report.
#[derive(Debug, Clone)]
pub struct ProfileFailure {
    /// Session the failure occurred in.
    pub session_id: String,
    /// Provider of the failing profile.
    pub provider_id: String,
    /// The failing profile.
    pub profile_id: String,
}

/// Resolves usable auth profiles, rotating away from ones that failed
/// earlier in the same session.
///
/// Failure marks are in-memory only: a process restart intentionally
/// clears them so transient errors never strand a user behind a
/// persistent blacklist.
pub struct AuthRouter {
    store: Arc<CredentialStore>,
    providers: Arc<ProviderRegistry>,
    config: ProvidersConfig,
    failed: Mutex<HashMap<String, HashSet<(String, String)>>>,
}

impl AuthRouter {
    /// Create a router.
    #[must_use]
    pub fn new(
        store: Arc<CredentialStore>,
        providers: Arc<ProviderRegistry>,
        config: ProvidersConfig,
    ) -> Self {
        Self {
            store,
            providers,
            config,
            failed: Mutex::new(HashMap::new()),
        }
    }

    /// Resolve a usable `(provider, profile, model)` for a session.
    ///
    /// Provider selection: the pinned provider when given, else the
    /// configured active provider. Profiles that failed earlier in this
    /// session are excluded; the rest are ranked by the provider's
    /// preferred auth order (stable within a method) and the first wins.
    ///
    /// # Errors
    ///
    /// [`AuthError::NoProviderConfigured`] when nothing selects a
    /// provider, [`AuthError::UnknownProvider`] when the selected id is
    /// not registered, [`AuthError::NoUsableProfile`] when no profile
    /// remains.
    pub fn resolve(&self, request: &ResolveRequest) -> AuthResult<ResolvedAuth> {
        let provider_id = request
            .pinned_provider_id
            .clone()
            .or_else(|| {
                self.config
                    .active
                    .as_ref()
                    .map(|active| active.provider_id.clone())
            })
            .ok_or(AuthError::NoProviderConfigured)?;

        let entry = self
            .providers
            .get(&provider_id)
            .ok_or_else(|| AuthError::UnknownProvider(provider_id.clone()))?;

        let mut profiles = self
            .store
            .list_profiles(&request.agent_id, Some(&provider_id))?;

        {
            let failed = self.failed.lock().unwrap_or_else(|e| e.into_inner());
            if let Some(session_failed) = failed.get(&request.session_id) {
                profiles.retain(|p| !session_failed.contains(&p.key()));
            }
        }

        rank_by_preferred_order(&mut profiles, &entry.definition.preferred_auth_order);

        let profile = profiles.into_iter().next().ok_or_else(|| {
            AuthError::NoUsableProfile {
                provider_id: provider_id.clone(),
            }
        })?;

        let model_id = self
            .config
            .active
            .as_ref()
            .filter(|active| active.provider_id == provider_id)
            .map(|active| active.model_id.clone())
            .or_else(|| entry.definition.default_model().map(|m| m.id.clone()))
            .ok_or_else(|| AuthError::UnknownProvider(provider_id.clone()))?;

        debug!(
            provider_id = %provider_id,
            profile_id = %profile.profile_id,
            model_id = %model_id,
            session_id = %request.session_id,
            "Resolved auth profile"
        );

        Ok(ResolvedAuth {
            provider_id,
            profile,
            model_id,
        })
    }

    /// Mark a profile as failed for the rest of this session. The next
    /// `resolve` call rotates to a different profile.
    pub fn report_failure(&self, failure: &ProfileFailure) {
        warn!(
            session_id = %failure.session_id,
            provider_id = %failure.provider_id,
            profile_id = %failure.profile_id,
            "Auth profile failed, rotating for this session"
        );
        let mut failed = self.failed.lock().unwrap_or_else(|e| e.into_inner());
        failed
            .entry(failure.session_id.clone())
            .or_default()
            .insert((failure.provider_id.clone(), failure.profile_id.clone()));
    }

    /// Drop rotation state for a session (called on session end).
    pub fn clear_session(&self, session_id: &str) {
        let mut failed = self.failed.lock().unwrap_or_else(|e| e.into_inner());
        failed.remove(session_id);
    }
}

impl std::fmt::Debug for AuthRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sessions = self.failed.lock().map(|m| m.len()).unwrap_or(0);
        f.debug_struct("AuthRouter")
            .field("sessions_with_failures", &sessions)
            .finish()
    }
}

/// Stable sort: profiles of earlier preferred methods first; methods not
/// in the order sort last.
fn rank_by_preferred_order(profiles: &mut [AuthProfile], order: &[AuthMethod]) {
    let rank = |method: AuthMethod| -> usize {
        order
            .iter()
            .position(|m| *m == method)
            .unwrap_or(order.len())
    };
    profiles.sort_by_key(|p| rank(p.method));
}
