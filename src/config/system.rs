use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, Default)]
pub struct SystemConfig {
    pub logs: Option<LogsConfig>,
}

#[derive(Deserialize, Debug, Clone)]
pub struct LogsConfig {
    /// Default filter directive, used when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_ansi")]
    pub ansi: bool,
}

impl Default for LogsConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            ansi: default_ansi(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_ansi() -> bool {
    true
}
