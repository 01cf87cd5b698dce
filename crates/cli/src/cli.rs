// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "pulse", version)]
#[command(about = "Real-time subscription client for push services")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Config file (default: <config dir>/pulse/config.toml)
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Push service WebSocket URL
    #[arg(long, global = true, value_name = "URL")]
    pub url: Option<String>,

    /// Request/response API base URL
    #[arg(long, global = true, value_name = "URL")]
    pub api_url: Option<String>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Subscribe to a topic and print each update as a JSON line
    Watch {
        /// Topic name (e.g. prices, balances)
        topic: String,

        /// Subscription parameter; the value is always sent as a JSON string
        #[arg(short, long = "param", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        params: Vec<(String, String)>,
    },

    /// GET an API path and print the JSON response
    Get {
        /// Path relative to the API base URL
        path: String,

        /// Query parameter
        #[arg(short, long = "query", value_name = "KEY=VALUE", value_parser = parse_key_value)]
        query: Vec<(String, String)>,
    },
}

/// Parses a `KEY=VALUE` argument. The value may be empty or contain `=`.
pub fn parse_key_value(arg: &str) -> Result<(String, String), String> {
    let (key, value) = arg
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got '{arg}'"))?;
    if key.is_empty() {
        return Err(format!("empty key in '{arg}'"));
    }
    Ok((key.to_string(), value.to_string()))
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
