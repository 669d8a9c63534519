use anyhow::Context;
use serde::Deserialize;

use crate::config::system::SystemConfig;
use crate::error::OutputError;

pub mod server;
pub mod system;

pub use server::ServerConfig;

/// Registry capacity used when the configuration does not set one.
pub const DEFAULT_MAX_INSTANCES: usize = 10;

/// Upper bound for `max_instances`, every slot is preallocated.
pub const MAX_INSTANCES_LIMIT: usize = 1024;

#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_max_instances")]
    pub max_instances: usize,
    pub system: Option<SystemConfig>,
    #[serde(default)]
    pub servers: Vec<ServerConfig>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_instances: DEFAULT_MAX_INSTANCES,
            system: None,
            servers: Vec::new(),
        }
    }
}

fn default_max_instances() -> usize {
    DEFAULT_MAX_INSTANCES
}

impl Config {
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let cfg = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file: {}", path))?;
        let cfg = toml::from_str(&cfg)
            .with_context(|| format!("failed to parse config file: {}", path))?;
        Ok(cfg)
    }

    /// Checks the constraints that must hold before any instance is set up.
    pub fn validate(&self) -> Result<(), OutputError> {
        if self.max_instances == 0 {
            return Err(OutputError::InvalidConfig(
                "max_instances must be greater than zero".to_string(),
            ));
        }

        if self.max_instances > MAX_INSTANCES_LIMIT {
            return Err(OutputError::InvalidConfig(format!(
                "max_instances must not exceed {}, got {}",
                MAX_INSTANCES_LIMIT, self.max_instances
            )));
        }

        if self.servers.len() > self.max_instances {
            return Err(OutputError::InvalidConfig(format!(
                "{} servers configured, but at most {} instances are supported",
                self.servers.len(),
                self.max_instances
            )));
        }

        Ok(())
    }

    pub fn logs(&self) -> system::LogsConfig {
        self.system
            .as_ref()
            .and_then(|s| s.logs.clone())
            .unwrap_or_default()
    }
}
