//! Slashbot Auth - credential store and provider auth routing.
//!
//! Profiles live in a multi-agent JSON document at
//! `~/.slashbot/credentials.json`, written atomically and guarded by
//! exclusive-create lock files per `(agent, provider)` so two concurrent
//! token refreshes cannot interleave. The router picks a usable profile
//! per session, rotating away from profiles that failed earlier in the
//! same session.

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

mod error;
mod profile;
mod router;
mod store;

pub use error::{AuthError, AuthResult};
pub use profile::AuthProfile;
pub use router::{AuthRouter, ProfileFailure, ResolveRequest, ResolvedAuth};
pub use store::CredentialStore;
