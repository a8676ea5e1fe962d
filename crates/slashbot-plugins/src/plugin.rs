//! The plugin lifecycle trait.

use async_trait::async_trait;

use crate::context::PluginContext;
use crate::error::PluginResult;
use crate::manifest::PluginManifest;

/// A plugin instance.
///
/// Lifecycle: instantiate → `setup` → optional `activate` → live.
/// On shutdown, `deactivate` runs in reverse activation order.
#[async_trait]
pub trait Plugin: Send + Sync {
    /// The plugin's manifest. Must match the discovered manifest's id.
    fn manifest(&self) -> &PluginManifest;

    /// Register contributions. Runs before `activate`.
    ///
    /// # Errors
    ///
    /// An error marks the plugin failed; siblings are unaffected.
    async fn setup(&self, context: &dyn PluginContext) -> PluginResult<()>;

    /// Start background work after all contributions are registered.
    ///
    /// # Errors
    ///
    /// An error marks the plugin failed; siblings are unaffected.
    async fn activate(&self) -> PluginResult<()> {
        Ok(())
    }

    /// Stop background work. Failures are logged, never thrown.
    ///
    /// # Errors
    ///
    /// An error is logged by the caller.
    async fn deactivate(&self) -> PluginResult<()> {
        Ok(())
    }
}
