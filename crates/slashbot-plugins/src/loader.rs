//! Plugin discovery and activation.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{debug, info, warn};

use slashbot_config::PluginsConfig;

use crate::context::PluginContext;
use crate::error::{PluginError, PluginResult};
use crate::graph::activation_order;
use crate::manifest::{PluginDiagnostic, PluginManifest, PluginStatus};
use crate::plugin::Plugin;

/// Constructs a plugin instance.
pub type PluginFactory = Arc<dyn Fn() -> PluginResult<Box<dyn Plugin>> + Send + Sync>;

/// A plugin found during discovery, not yet instantiated.
#[derive(Clone)]
pub struct DiscoveredPlugin {
    /// The manifest.
    pub manifest: PluginManifest,
    /// Where the plugin came from (`<builtin>` for compiled-in plugins).
    pub source_path: PathBuf,
    /// Instance constructor.
    pub factory: PluginFactory,
}

impl DiscoveredPlugin {
    /// Wrap a compiled-in plugin.
    pub fn builtin(manifest: PluginManifest, factory: PluginFactory) -> Self {
        Self {
            manifest,
            source_path: PathBuf::from("<builtin>"),
            factory,
        }
    }
}

impl std::fmt::Debug for DiscoveredPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DiscoveredPlugin")
            .field("id", &self.manifest.id)
            .field("source_path", &self.source_path)
            .finish()
    }
}

/// A live plugin.
#[derive(Clone)]
pub struct LoadedPlugin {
    /// The manifest.
    pub manifest: PluginManifest,
    /// The running instance.
    pub instance: Arc<dyn Plugin>,
}

impl std::fmt::Debug for LoadedPlugin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoadedPlugin")
            .field("id", &self.manifest.id)
            .finish()
    }
}

/// Discover plugins declared by manifest files under the configured
/// external paths (`<path>/<plugin>/plugin.json`).
///
/// Each manifest's `main` names a constructor in `constructors`; an
/// unknown constructor becomes a failing factory so the plugin surfaces
/// as a `failed` diagnostic instead of aborting startup.
///
/// # Errors
///
/// Returns an error when a manifest file exists but cannot be read or
/// parsed. Missing directories are skipped.
pub fn discover_manifest_plugins(
    paths: &[PathBuf],
    constructors: &HashMap<String, PluginFactory>,
) -> PluginResult<Vec<DiscoveredPlugin>> {
    let mut discovered = Vec::new();
    for base in paths {
        let entries = match std::fs::read_dir(base) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %base.display(), "Plugin path missing, skipping");
                continue;
            },
            Err(e) => {
                warn!(path = %base.display(), error = %e, "Failed to read plugin path");
                continue;
            },
        };
        for entry in entries.flatten() {
            let manifest_path = entry.path().join("plugin.json");
            if !manifest_path.is_file() {
                continue;
            }
            let manifest = read_manifest(&manifest_path)?;
            let factory = match constructors.get(&manifest.main) {
                Some(factory) => Arc::clone(factory),
                None => {
                    let main = manifest.main.clone();
                    Arc::new(move || Err(PluginError::UnknownConstructor(main.clone())))
                },
            };
            discovered.push(DiscoveredPlugin {
                manifest,
                source_path: manifest_path,
                factory,
            });
        }
    }
    // Stable order across filesystems.
    discovered.sort_by(|a, b| a.manifest.id.cmp(&b.manifest.id));
    Ok(discovered)
}

fn read_manifest(path: &Path) -> PluginResult<PluginManifest> {
    let content = std::fs::read_to_string(path).map_err(|e| PluginError::ManifestRead {
        path: path.display().to_string(),
        message: e.to_string(),
    })?;
    serde_json::from_str(&content).map_err(|e| PluginError::ManifestRead {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

/// Instantiate and activate plugins in dependency order.
///
/// Structural problems (invalid manifest, duplicate id, dependency
/// cycle) abort startup. Per-plugin failures (constructor error,
/// manifest-id mismatch, setup or activate error, missing dependency)
/// produce a `failed` diagnostic and never poison siblings.
///
/// # Errors
///
/// Returns [`PluginError::InvalidManifest`] or
/// [`PluginError::DependencyCycle`] for structural problems.
pub async fn load_plugins<F>(
    discovered: Vec<DiscoveredPlugin>,
    config: &PluginsConfig,
    make_context: F,
) -> PluginResult<(Vec<LoadedPlugin>, Vec<PluginDiagnostic>)>
where
    F: Fn(&PluginManifest) -> Arc<dyn PluginContext>,
{
    let enabled: Vec<DiscoveredPlugin> = discovered
        .into_iter()
        .filter(|plugin| {
            let id = &plugin.manifest.id;
            if config.deny.iter().any(|d| d == id) {
                info!(plugin_id = %id, "Plugin denied by config");
                return false;
            }
            if !config.allow.is_empty() && !config.allow.iter().any(|a| a == id) {
                info!(plugin_id = %id, "Plugin not in allow list");
                return false;
            }
            if let Some(entry) = config.entries.iter().find(|e| e.id == *id) {
                if !entry.enabled {
                    info!(plugin_id = %id, "Plugin disabled by config");
                    return false;
                }
            }
            true
        })
        .collect();

    let mut seen_ids = HashSet::new();
    for plugin in &enabled {
        plugin.manifest.validate()?;
        if !seen_ids.insert(plugin.manifest.id.clone()) {
            return Err(PluginError::InvalidManifest {
                plugin_id: plugin.manifest.id.clone(),
                message: "duplicate plugin id".to_string(),
            });
        }
    }

    let manifests: Vec<PluginManifest> = enabled.iter().map(|p| p.manifest.clone()).collect();
    let order = activation_order(&manifests)?;

    let by_id: HashMap<String, DiscoveredPlugin> = enabled
        .into_iter()
        .map(|p| (p.manifest.id.clone(), p))
        .collect();

    let mut loaded: Vec<LoadedPlugin> = Vec::new();
    let mut diagnostics: Vec<PluginDiagnostic> = Vec::new();
    let mut live_ids: HashSet<String> = HashSet::new();

    for id in order {
        let plugin = &by_id[&id];
        let fail = |reason: String| PluginDiagnostic {
            plugin_id: id.clone(),
            status: PluginStatus::Failed,
            reason: Some(reason),
            source_path: plugin.source_path.clone(),
        };

        if let Some(missing) = plugin
            .manifest
            .dependencies
            .iter()
            .find(|dep| !live_ids.contains(*dep))
        {
            warn!(plugin_id = %id, dependency = %missing, "Dependency not loaded");
            diagnostics.push(fail(format!("dependency not loaded: {missing}")));
            continue;
        }

        let instance: Arc<dyn Plugin> = match (plugin.factory)() {
            Ok(instance) => Arc::from(instance),
            Err(e) => {
                warn!(plugin_id = %id, error = %e, "Plugin instantiation failed");
                diagnostics.push(fail(e.to_string()));
                continue;
            },
        };

        if instance.manifest().id != plugin.manifest.id {
            let reason = format!(
                "manifest id mismatch: instance says {}, manifest says {}",
                instance.manifest().id,
                plugin.manifest.id
            );
            warn!(plugin_id = %id, "{reason}");
            diagnostics.push(fail(reason));
            continue;
        }

        let context = make_context(&plugin.manifest);
        if let Err(e) = instance.setup(context.as_ref()).await {
            warn!(plugin_id = %id, error = %e, "Plugin setup failed");
            diagnostics.push(fail(format!("setup failed: {e}")));
            continue;
        }
        if let Err(e) = instance.activate().await {
            warn!(plugin_id = %id, error = %e, "Plugin activation failed");
            diagnostics.push(fail(format!("activate failed: {e}")));
            continue;
        }

        info!(plugin_id = %id, "Plugin loaded");
        diagnostics.push(PluginDiagnostic {
            plugin_id: id.clone(),
            status: PluginStatus::Loaded,
            reason: None,
            source_path: plugin.source_path.clone(),
        });
        live_ids.insert(id.clone());
        loaded.push(LoadedPlugin {
            manifest: plugin.manifest.clone(),
            instance,
        });
    }

    Ok((loaded, diagnostics))
}

/// Deactivate plugins in reverse activation order. Failures are logged,
/// never thrown.
pub async fn deactivate_all(plugins: &[LoadedPlugin]) {
    for plugin in plugins.iter().rev() {
        if let Err(e) = plugin.instance.deactivate().await {
            warn!(plugin_id = %plugin.manifest.id, error = %e, "Plugin deactivation failed");
        }
    }
}
