//! bztcp - Benzinga TCP feed client
//!
//! Connects with the given credentials and prints one line per content item
//! until the feed fails for good.

use std::io::{self, Write};
use std::process::ExitCode;

use bztcp_net::{Client, Credentials};
use clap::Parser;
use thiserror::Error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

mod cli;
mod display;
mod settings;

use cli::Cli;
use settings::{Settings, SettingsError};

#[derive(Debug, Error)]
enum AppError {
    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("Feed error: {0}")]
    Feed(#[from] bztcp_net::Error),

    #[error("Output error: {0}")]
    Output(#[from] io::Error),
}

fn main() -> ExitCode {
    // Logs go to stderr; stdout carries the items
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            ExitCode::FAILURE
        }
    }
}

fn run(cli: &Cli) -> Result<(), AppError> {
    let config = Settings::discover(cli.config.as_deref())?
        .apply_cli(cli)
        .into_config()?;

    let mut out = io::stdout().lock();
    writeln!(out, "Starting benzinga TCP test client.")?;

    tracing::info!(host = %config.host, port = config.port, "Starting feed client");
    let mut client = Client::connect(Credentials::new(&cli.username, &cli.key), config)?;

    for item in client.content_items() {
        writeln!(out, "{}", display::format_item(&item?))?;
        out.flush()?;
    }

    Ok(())
}
