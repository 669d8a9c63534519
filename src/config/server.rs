use std::path::PathBuf;

use anyhow::anyhow;
use clap::Parser;
use serde::Deserialize;

use crate::dispatch::SymbolMap;

pub const DEFAULT_PORT: u16 = 8080;

/// Options of a single HTTP server instance, as found in the config file or
/// in a plugin style argument string.
#[derive(Deserialize, Debug, Clone, PartialEq)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    pub listen: Option<String>,
    pub credentials: Option<String>,
    pub www: Option<String>,
    #[serde(default)]
    pub nocommands: bool,
    pub pipe: Option<PathBuf>,
    #[serde(default)]
    pub symbols: SymbolMap,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            listen: None,
            credentials: None,
            www: None,
            nocommands: false,
            pipe: None,
            symbols: SymbolMap::default(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

#[derive(Parser, Debug)]
#[command(name = "output_http", about = "HTTP output plugin")]
struct PluginArgs {
    /// folder that contains webpages in flat hierarchy (no subfolders)
    #[arg(short = 'w', long = "www")]
    www: Option<String>,

    /// TCP port for this HTTP server
    #[arg(short = 'p', long = "port", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Listen on Hostname / IP
    #[arg(short = 'l', long = "listen")]
    listen: Option<String>,

    /// ask for "username:password" on connect
    #[arg(short = 'c', long = "credentials")]
    credentials: Option<String>,

    /// disable execution of commands
    #[arg(short = 'n', long = "nocommands")]
    nocommands: bool,

    /// named pipe file for commands to control the external process
    #[arg(short = 'i', long = "pipe")]
    pipe: Option<PathBuf>,
}

impl ServerConfig {
    /// Parses plugin style options, e.g. `-p 8080 -w ./www -i /tmp/cmd.fifo`.
    ///
    /// `--help` and unknown options are reported as errors carrying the
    /// rendered help text.
    pub fn from_args<I, T>(args: I) -> anyhow::Result<Self>
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let argv = std::iter::once("output_http".to_string())
            .chain(args.into_iter().map(Into::into));
        let parsed =
            PluginArgs::try_parse_from(argv).map_err(|err| anyhow!("{}", err.render()))?;

        Ok(Self {
            port: parsed.port,
            listen: parsed.listen,
            credentials: parsed.credentials,
            www: parsed.www,
            nocommands: parsed.nocommands,
            pipe: parsed.pipe,
            symbols: SymbolMap::default(),
        })
    }

    /// Same as [`ServerConfig::from_args`] for a whitespace separated string.
    ///
    /// Splitting happens on every whitespace character and quotes are not
    /// interpreted, so values containing spaces have to go through
    /// [`ServerConfig::from_args`] or the config file.
    pub fn from_arg_str(args: &str) -> anyhow::Result<Self> {
        Self::from_args(args.split_whitespace())
    }

    /// The static content root with exactly one trailing separator.
    pub fn www_folder(&self) -> Option<String> {
        self.www.as_deref().map(normalize_folder)
    }
}

fn normalize_folder(folder: &str) -> String {
    if folder.ends_with('/') {
        folder.to_string()
    } else {
        format!("{}/", folder)
    }
}
