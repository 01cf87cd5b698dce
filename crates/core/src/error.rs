// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for pulse-core operations.

use thiserror::Error;

/// Errors raised while encoding or decoding wire frames.
#[derive(Debug, Error)]
pub enum Error {
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("frame is not a JSON object")]
    NotAnObject,

    #[error("frame has no \"type\" field")]
    MissingType,

    #[error("malformed {kind} frame: {reason}")]
    MalformedFrame { kind: String, reason: String },

    #[error("subscription params must be a JSON object, got {0}")]
    InvalidParams(String),
}

/// A specialized Result type for pulse-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
