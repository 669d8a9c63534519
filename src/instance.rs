use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use crate::channel::CommandChannel;
use crate::config::ServerConfig;
use crate::dispatch::CommandSymbols;
use crate::error::{OutputError, Result};
use crate::global::GlobalState;

/// Runtime configuration of one server instance.
///
/// Immutable once built, apart from the two latched toggles which only the
/// command dispatcher flips.
#[derive(Debug)]
pub struct InstanceConfig {
    pub port: u16,
    pub listen: Option<String>,
    pub credentials: Option<String>,
    pub www_folder: Option<String>,
    pub nocommands: bool,
    pub channel: CommandChannel,
    pub symbols: CommandSymbols,
    auto_toggle: AtomicBool,
    continue_toggle: AtomicBool,
}

impl InstanceConfig {
    pub fn from_server_config(cfg: &ServerConfig) -> Result<Self> {
        // rejected symbols must not leave a fifo behind
        let symbols = cfg.symbols.resolve()?;

        let channel = match &cfg.pipe {
            Some(path) => CommandChannel::open(path),
            None => CommandChannel::unavailable(),
        };

        Ok(Self::build(cfg, symbols, channel))
    }

    pub(crate) fn with_channel(cfg: &ServerConfig, channel: CommandChannel) -> Result<Self> {
        let symbols = cfg.symbols.resolve()?;
        Ok(Self::build(cfg, symbols, channel))
    }

    fn build(cfg: &ServerConfig, symbols: CommandSymbols, channel: CommandChannel) -> Self {
        Self {
            port: cfg.port,
            listen: cfg.listen.clone(),
            credentials: cfg.credentials.clone(),
            www_folder: cfg.www_folder(),
            nocommands: cfg.nocommands,
            channel,
            symbols,
            auto_toggle: AtomicBool::new(false),
            continue_toggle: AtomicBool::new(false),
        }
    }

    /// The address the worker binds to, all interfaces when no host is set.
    pub fn bind_addr(&self) -> String {
        let host = self.listen.as_deref().unwrap_or("0.0.0.0");
        if host.contains(':') && !host.starts_with('[') {
            format!("[{}]:{}", host, self.port)
        } else {
            format!("{}:{}", host, self.port)
        }
    }

    pub fn auto_toggle(&self) -> bool {
        self.auto_toggle.load(Ordering::Acquire)
    }

    pub fn continue_toggle(&self) -> bool {
        self.continue_toggle.load(Ordering::Acquire)
    }

    /// Flips a toggle and returns its new state.
    pub(crate) fn flip(&self, toggle: Toggle) -> bool {
        let flag = match toggle {
            Toggle::Auto => &self.auto_toggle,
            Toggle::Continue => &self.continue_toggle,
        };
        !flag.fetch_xor(true, Ordering::AcqRel)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggle {
    Auto,
    Continue,
}

/// Everything one server instance needs while running.
#[derive(Debug)]
pub struct InstanceContext {
    pub id: usize,
    pub config: InstanceConfig,
    pub global: Arc<GlobalState>,
}

impl InstanceContext {
    pub fn new(id: usize, config: InstanceConfig, global: Arc<GlobalState>) -> Self {
        Self { id, config, global }
    }

    pub(crate) fn channel_error(&self, err: crate::channel::ChannelError) -> OutputError {
        OutputError::from_channel(self.id, err)
    }
}
