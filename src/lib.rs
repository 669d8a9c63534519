use std::sync::Arc;

use tracing::{error, info, warn};

pub mod channel;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod global;
pub mod instance;
pub mod lifecycle;
pub mod logs;
pub mod plugin;
pub mod registry;
pub mod server;

use crate::config::Config;
use crate::global::GlobalState;
use crate::plugin::OutputPlugin;
use crate::server::HttpWorker;

/// Starts one HTTP server per configured instance and runs until Ctrl-C.
pub async fn run_app(config: Config) -> anyhow::Result<()> {
    config.validate()?;

    if config.servers.is_empty() {
        warn!("no servers configured, nothing to do");
        return Ok(());
    }

    let global = Arc::new(GlobalState::new(config.max_instances));
    let plugin = OutputPlugin::new(global, config.max_instances, Arc::new(HttpWorker));

    for (id, server) in config.servers.iter().enumerate() {
        plugin.init(id, server)?;
    }

    launch_all(&plugin).await?;

    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => error!("unable to listen to shutdown signal: {}", err),
    }

    plugin.shutdown().await;

    Ok(())
}

/// Starts every registered instance. If one of them cannot be started, the
/// ones already running are shut down before the error is returned.
pub async fn launch_all(plugin: &OutputPlugin) -> anyhow::Result<()> {
    for id in plugin.registry().ids() {
        info!("launching server #{:02}", id);
        if let Err(err) = plugin.run(id) {
            error!("failed to launch server #{:02}: {}", id, err);
            plugin.shutdown().await;
            return Err(err.into());
        }
    }

    Ok(())
}
