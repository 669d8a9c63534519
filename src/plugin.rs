use std::sync::Arc;

use tracing::{debug, info};

use crate::config::ServerConfig;
use crate::error::{OutputError, Result};
use crate::global::GlobalState;
use crate::instance::{InstanceConfig, InstanceContext};
use crate::lifecycle::{DynWorker, LifecycleManager};
use crate::registry::InstanceRegistry;

pub const OUTPUT_PLUGIN_NAME: &str = "HTTP output plugin";

/// The HTTP output: a set of independent server instances sharing one
/// process wide state, each with its own command channel.
pub struct OutputPlugin {
    registry: Arc<InstanceRegistry>,
    lifecycle: LifecycleManager,
    global: Arc<GlobalState>,
}

impl OutputPlugin {
    pub fn new(global: Arc<GlobalState>, capacity: usize, worker: DynWorker) -> Self {
        let registry = Arc::new(InstanceRegistry::new(capacity));
        let lifecycle = LifecycleManager::new(registry.clone(), worker);

        Self {
            registry,
            lifecycle,
            global,
        }
    }

    /// Sets up instance `id`. Calling it again for the same id replaces the
    /// previous setup; it must happen before the instance is started.
    pub fn init(&self, id: usize, cfg: &ServerConfig) -> Result<Arc<InstanceContext>> {
        debug!("output #{:02}", id);

        if id >= self.registry.capacity() {
            return Err(OutputError::InvalidConfig(format!(
                "instance id {} exceeds the maximum of {} instances",
                id,
                self.registry.capacity()
            )));
        }

        let config = InstanceConfig::from_server_config(cfg)?;
        log_config(id, &config);

        let ctx = self
            .registry
            .register(InstanceContext::new(id, config, self.global.clone()));
        self.global.set_output_name(id, OUTPUT_PLUGIN_NAME);

        Ok(ctx)
    }

    pub fn run(&self, id: usize) -> Result<()> {
        self.lifecycle.start(id)
    }

    /// Best effort cancellation of instance `id`, see [`LifecycleManager::stop`].
    pub fn stop(&self, id: usize) -> Result<()> {
        self.lifecycle.stop(id)
    }

    pub fn cmd(&self, id: usize, command: u32, group: u32, value: i32) -> Result<i32> {
        self.registry.dispatch(id, command, group, value)
    }

    pub async fn shutdown(&self) {
        self.lifecycle.shutdown().await
    }

    pub fn registry(&self) -> &InstanceRegistry {
        &self.registry
    }

    pub fn lifecycle(&self) -> &LifecycleManager {
        &self.lifecycle
    }
}

fn log_config(id: usize, cfg: &InstanceConfig) {
    let disabled = || "disabled".to_string();

    info!(
        instance_id = id,
        "www-folder-path......: {}",
        cfg.www_folder.clone().unwrap_or_else(disabled)
    );
    info!(instance_id = id, "HTTP TCP port........: {}", cfg.port);
    info!(
        instance_id = id,
        "HTTP Listen Address..: {}",
        cfg.listen.clone().unwrap_or_else(|| "all interfaces".to_string())
    );
    info!(
        instance_id = id,
        "username:password....: {}",
        if cfg.credentials.is_some() { "enabled" } else { "disabled" }
    );
    info!(
        instance_id = id,
        "commands.............: {}",
        if cfg.nocommands { "disabled" } else { "enabled" }
    );
    info!(
        instance_id = id,
        "named pipe path......: {}",
        cfg.channel
            .path()
            .map(|p| p.display().to_string())
            .unwrap_or_else(disabled)
    );
}

#[cfg(test)]
mod tests {
    use tokio_util::sync::CancellationToken;

    use super::*;
    use crate::channel::tests::{drain, fifo_with_reader};
    use crate::dispatch::GENERIC_GROUP;
    use crate::lifecycle::Worker;

    struct IdleWorker;

    #[async_trait::async_trait]
    impl Worker for IdleWorker {
        async fn run(&self, _: Arc<InstanceContext>, cancel: CancellationToken) -> anyhow::Result<()> {
            cancel.cancelled().await;
            Ok(())
        }
    }

    fn plugin(capacity: usize) -> OutputPlugin {
        OutputPlugin::new(Arc::new(GlobalState::new(capacity)), capacity, Arc::new(IdleWorker))
    }

    #[test]
    fn init_registers_instance_and_names_output() {
        let plugin = plugin(2);
        let cfg = ServerConfig {
            port: 8090,
            ..Default::default()
        };

        let ctx = plugin.init(1, &cfg).unwrap();

        assert_eq!(ctx.id, 1);
        assert_eq!(plugin.registry().get(1).unwrap().config.port, 8090);
        assert_eq!(
            plugin.global.output_name(1).as_deref(),
            Some(OUTPUT_PLUGIN_NAME)
        );
    }

    #[test]
    fn init_rejects_id_beyond_capacity() {
        let plugin = plugin(2);

        assert!(matches!(
            plugin.init(2, &ServerConfig::default()),
            Err(OutputError::InvalidConfig(_))
        ));
        assert!(plugin.registry().ids().is_empty());
    }

    #[test]
    fn cmd_routes_to_the_right_instance() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("one.fifo");
        let mut reader = fifo_with_reader(&path);

        let plugin = plugin(2);
        plugin.init(0, &ServerConfig::default()).unwrap();
        plugin
            .init(
                1,
                &ServerConfig {
                    pipe: Some(path),
                    ..Default::default()
                },
            )
            .unwrap();

        assert!(matches!(
            plugin.cmd(0, 2, GENERIC_GROUP, 0),
            Err(OutputError::ChannelUnavailable(0))
        ));
        assert_eq!(plugin.cmd(1, 2, GENERIC_GROUP, 0).unwrap(), 0);
        assert_eq!(drain(&mut reader), vec![b'f']);
    }

    #[tokio::test]
    async fn run_and_stop_instances() {
        let plugin = plugin(2);
        plugin.init(0, &ServerConfig::default()).unwrap();

        assert!(matches!(plugin.run(1), Err(OutputError::NotFound(1))));

        plugin.run(0).unwrap();
        assert!(plugin.lifecycle().is_running(0));

        plugin.stop(0).unwrap();
        assert!(!plugin.lifecycle().is_running(0));

        plugin.shutdown().await;
    }
}
