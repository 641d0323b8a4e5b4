//! Command-line arguments

use std::path::PathBuf;

use clap::Parser;

/// Connects to Benzinga TCP and prints content items as they arrive.
#[derive(Debug, Parser)]
#[command(name = "bztcp", version)]
pub struct Cli {
    /// Username to authenticate with
    pub username: String,

    /// Key to authenticate with
    pub key: String,

    /// Feed host (overrides the settings file)
    #[arg(long)]
    pub host: Option<String>,

    /// Feed port (overrides the settings file)
    #[arg(long)]
    pub port: Option<u16>,

    /// Settings file (defaults to config.toml in the user config directory)
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Retries for connectivity failures before giving up
    #[arg(long)]
    pub retries: Option<u32>,

    /// Delay before the first retry
    #[arg(long, value_name = "SECS")]
    pub retry_delay: Option<f64>,

    /// Factor applied to the retry delay after every retry
    #[arg(long)]
    pub backoff: Option<f64>,

    /// Treat payload-less frames as heartbeats instead of a dead stream
    #[arg(long)]
    pub skip_heartbeats: bool,

    /// Exit instead of reconnecting when the stream drops
    #[arg(long)]
    pub no_reconnect: bool,
}
