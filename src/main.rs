use anyhow::Context;
use clap::Parser;
use tracing::info;

use mjpeg_output::config::{Config, ServerConfig};

#[derive(Parser, Debug)]
#[command(
    name = "mjpeg-output",
    version,
    about = "Multi instance HTTP output with a named pipe command bridge"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long)]
    config: Option<String>,

    /// Additional server in plugin syntax, e.g. "-p 8081 -i /tmp/cmd.fifo".
    /// Split on whitespace without quote handling, so paths containing
    /// spaces have to be set in the config file
    #[arg(short, long = "server", value_name = "ARGS", allow_hyphen_values = true)]
    servers: Vec<String>,

    /// Overrides the maximum number of server instances
    #[arg(long)]
    max_instances: Option<usize>,
}

fn load_config(cli: &Cli) -> anyhow::Result<Config> {
    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::default(),
    };

    for args in &cli.servers {
        let server = ServerConfig::from_arg_str(args)
            .with_context(|| format!("invalid server arguments: {}", args))?;
        config.servers.push(server);
    }

    if let Some(max_instances) = cli.max_instances {
        config.max_instances = max_instances;
    }

    Ok(config)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = load_config(&cli)?;

    let _log_guard = mjpeg_output::logs::init(&config.logs())?;
    info!("starting {} server(s)", config.servers.len());

    mjpeg_output::run_app(config).await
}
