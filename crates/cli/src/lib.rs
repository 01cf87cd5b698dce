// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pulse: command-line front end for the pulse sync client.
//!
//! - `pulse watch <topic>` streams pushed updates as JSON lines
//! - `pulse get <path>` performs one API read

mod cli;
mod commands;
pub mod error;
pub mod output;
pub mod settings;

pub use cli::{Cli, Command};
pub use error::{Error, Result};

use tracing_subscriber::EnvFilter;

/// Installs the stderr log subscriber.
///
/// `RUST_LOG` is honored unless `verbose` forces debug output.
pub fn init_logging(
    verbose: bool,
) -> std::result::Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init()
}

pub async fn run(cli: Cli) -> Result<()> {
    let config = settings::resolve(
        cli.config.as_deref(),
        cli.url.as_deref(),
        cli.api_url.as_deref(),
    )?;

    match cli.command {
        Command::Watch { topic, params } => commands::watch::run(config, topic, params).await,
        Command::Get { path, query } => commands::get::run(&config, &path, query).await,
    }
}
