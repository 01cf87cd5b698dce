// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use pulse_client::{ApiError, ConfigError};
use thiserror::Error;

/// Errors surfaced by the `pulse` command.
#[derive(Debug, Error)]
pub enum Error {
    #[error("{0}\n  hint: check the config file or the --url/--api-url flags")]
    Config(#[from] ConfigError),

    #[error("api: {0}")]
    Api(#[from] ApiError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
