// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Config resolution for the command line.
//!
//! Precedence: `--config` file, else the per-user file if present, else
//! defaults; `--url` and `--api-url` are applied on top.

use std::path::{Path, PathBuf};

use pulse_client::ClientConfig;
use tracing::debug;

use crate::error::Result;

/// `<config dir>/pulse/config.toml`, when the platform has a config dir.
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("pulse").join("config.toml"))
}

pub fn resolve(
    explicit: Option<&Path>,
    url: Option<&str>,
    api_url: Option<&str>,
) -> Result<ClientConfig> {
    resolve_with_default(explicit, default_config_path().as_deref(), url, api_url)
}

pub fn resolve_with_default(
    explicit: Option<&Path>,
    default_path: Option<&Path>,
    url: Option<&str>,
    api_url: Option<&str>,
) -> Result<ClientConfig> {
    let mut config = match (explicit, default_path) {
        (Some(path), _) => {
            debug!(path = %path.display(), "loading config");
            ClientConfig::load(path)?
        }
        (None, Some(path)) if path.exists() => {
            debug!(path = %path.display(), "loading config");
            ClientConfig::load(path)?
        }
        _ => ClientConfig::default(),
    };

    if let Some(url) = url {
        config.url = url.to_string();
    }
    if let Some(api_url) = api_url {
        config.api_url = api_url.to_string();
    }
    config.validate()?;
    Ok(config)
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
