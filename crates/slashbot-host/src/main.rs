//! The Slashbot daemon.
//!
//! Startup order: config → logging → kernel → built-in providers →
//! credential store and auth router services → plugins → declarative
//! hooks → `startup` hook → gateway. Shutdown reverses it: `shutdown`
//! hook, plugin deactivation, gateway stop.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use slashbot_auth::{AuthRouter, CredentialStore};
use slashbot_core::{HookEvent, SlashbotHome};
use slashbot_gateway::Gateway;
use slashbot_hooks::{register_config_hooks, register_filesystem_hooks};
use slashbot_kernel::Kernel;
use slashbot_llm::register_builtin_providers;
use slashbot_plugins::discover_manifest_plugins;

mod builtin;

#[derive(Debug, Parser)]
#[command(name = "slashbot", about = "Local-first plugin-extensible assistant host")]
struct Args {
    /// Workspace root (defaults to the current directory).
    #[arg(long, env = "SLASHBOT_WORKSPACE")]
    workspace: Option<PathBuf>,

    /// Override the home directory (defaults to ~/.slashbot).
    #[arg(long, env = "SLASHBOT_HOME")]
    home: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let home = match &args.home {
        Some(path) => SlashbotHome::at(path),
        None => SlashbotHome::resolve().context("cannot resolve home directory")?,
    };
    home.ensure().context("cannot create home directory")?;

    let workspace_root = match &args.workspace {
        Some(path) => path.clone(),
        None => std::env::current_dir().context("cannot resolve current directory")?,
    };

    let config = slashbot_config::load(&home, Some(&workspace_root))?;

    init_logging(config.logging.level);
    info!(
        home = %home.root().display(),
        workspace = %workspace_root.display(),
        "Starting slashbot"
    );

    let kernel = Kernel::new(home.clone(), config.clone());

    register_builtin_providers(kernel.providers())
        .context("built-in provider registration failed")?;

    let store = Arc::new(
        CredentialStore::new(home.clone()).with_workspace_overlay(&workspace_root),
    );
    let router = Arc::new(AuthRouter::new(
        Arc::clone(&store),
        Arc::clone(kernel.providers()),
        config.providers.clone(),
    ));
    kernel.services().register("auth.store", "host", store)?;
    kernel.services().register("auth.router", "host", router)?;

    let mut discovered = builtin::bundled_plugins(&kernel);
    discovered.extend(discover_manifest_plugins(
        &config.plugins.paths,
        &HashMap::new(),
    )?);
    kernel.load_plugins(discovered).await?;

    let config_hooks = register_config_hooks(kernel.dispatcher(), &config.hooks);
    let fs_hooks = register_filesystem_hooks(kernel.dispatcher(), &workspace_root);
    info!(config_hooks, fs_hooks, "Declarative hooks registered");

    let startup = kernel.dispatch_kernel_event(HookEvent::Startup).await;
    if !startup.failures.is_empty() {
        warn!(failures = startup.failures.len(), "Startup hooks reported failures");
    }

    let cancel = CancellationToken::new();
    let (addr, gateway) = Gateway::new(Arc::clone(&kernel))
        .bind(cancel.clone())
        .await
        .context("cannot bind gateway")?;
    info!(%addr, "Gateway up");

    tokio::signal::ctrl_c().await.context("signal handler failed")?;
    info!("Shutting down");

    kernel.dispatch_kernel_event(HookEvent::Shutdown).await;
    kernel.deactivate_plugins().await;
    cancel.cancel();
    if let Err(e) = gateway.await {
        warn!(error = %e, "Gateway task ended abnormally");
    }
    Ok(())
}

fn init_logging(level: slashbot_config::LogLevel) {
    use tracing_subscriber::EnvFilter;
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level.to_string()));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
