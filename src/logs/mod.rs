use anyhow::anyhow;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::fmt;
use tracing_subscriber::prelude::*;

use crate::config::system::LogsConfig;

/// Builds the filter from `RUST_LOG`, falling back to the configured level.
pub fn env_filter(cfg: &LogsConfig) -> anyhow::Result<EnvFilter> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new(&cfg.level)
            .map_err(|err| anyhow!("invalid log level '{}': {}", cfg.level, err)),
    }
}

/// Installs the global subscriber writing to a non-blocking stdout.
///
/// The returned guard flushes pending records on drop and has to be kept
/// alive for as long as the process logs.
pub fn init(cfg: &LogsConfig) -> anyhow::Result<WorkerGuard> {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stdout());

    tracing_subscriber::registry()
        .with(env_filter(cfg)?)
        .with(
            fmt::layer()
                .with_writer(writer)
                .with_ansi(cfg.ansi)
                .with_target(true),
        )
        .try_init()
        .map_err(|err| anyhow!("failed to install tracing subscriber: {}", err))?;

    Ok(guard)
}
