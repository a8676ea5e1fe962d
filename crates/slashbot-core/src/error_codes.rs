//! Stable error codes shared across the host.
//!
//! These strings are part of the wire contract (tool results, gateway
//! responses) and must not change between releases.

/// No tool registered under the requested id.
pub const TOOL_NOT_FOUND: &str = "TOOL_NOT_FOUND";
/// A tool's `execute` returned an error or panicked.
pub const TOOL_EXECUTE_ERROR: &str = "TOOL_EXECUTE_ERROR";
/// A registry already holds an entry with this id.
pub const ALREADY_REGISTERED: &str = "ALREADY_REGISTERED";
/// No provider is pinned or configured as active.
pub const NO_PROVIDER_CONFIGURED: &str = "NO_PROVIDER_CONFIGURED";
/// Every profile for the selected provider has failed this session.
pub const NO_USABLE_PROFILE: &str = "NO_USABLE_PROFILE";
/// All overflow-recovery strategies were exhausted.
pub const OVERFLOW_RECOVERY_EXHAUSTED: &str = "OVERFLOW_RECOVERY_EXHAUSTED";
/// The gateway method registry has no handler for the requested method.
pub const UNKNOWN_METHOD: &str = "UNKNOWN_METHOD";
/// A credential-store lock could not be acquired before the deadline.
pub const LOCK_TIMEOUT: &str = "LOCK_TIMEOUT";
