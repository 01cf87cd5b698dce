// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Client configuration.
//!
//! Configuration is usually stored in a TOML file; every field is optional
//! and falls back to its default:
//!
//! ```toml
//! url = "wss://push.example.com/ws"
//! api_url = "https://api.example.com"
//! heartbeat_interval_ms = 30000
//! heartbeat_timeout_ms = 10000
//! reconnect_base_delay_ms = 1000
//! reconnect_decay = 1.5
//! reconnect_max_delay_ms = 30000
//! reconnect_max_retries = 0
//! ```

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Error type for loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Configuration for the sync and API clients.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientConfig {
    /// WebSocket URL of the push service.
    #[serde(default = "default_url")]
    pub url: String,
    /// Base URL of the request/response API.
    #[serde(default = "default_api_url")]
    pub api_url: String,
    /// Heartbeat ping interval in milliseconds. 0 = disabled.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Max time to wait for a pong in milliseconds. Must be below the interval.
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
    /// Delay before the first reconnect attempt in milliseconds.
    #[serde(default = "default_reconnect_base_delay_ms")]
    pub reconnect_base_delay_ms: u64,
    /// Growth factor between reconnect attempts.
    #[serde(default = "default_reconnect_decay")]
    pub reconnect_decay: f64,
    /// Maximum delay between reconnect attempts in milliseconds.
    #[serde(default = "default_reconnect_max_delay_ms")]
    pub reconnect_max_delay_ms: u64,
    /// Reconnect attempts before giving up (0 = unlimited).
    #[serde(default)]
    pub reconnect_max_retries: u32,
    /// Max time for one connection attempt in seconds.
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    /// Max time for one HTTP request in seconds.
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_url() -> String {
    "ws://localhost:7890".to_string()
}

fn default_api_url() -> String {
    "http://localhost:7891".to_string()
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

fn default_reconnect_base_delay_ms() -> u64 {
    1_000
}

fn default_reconnect_decay() -> f64 {
    1.5
}

fn default_reconnect_max_delay_ms() -> u64 {
    30_000
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for ClientConfig {
    fn default() -> Self {
        ClientConfig {
            url: default_url(),
            api_url: default_api_url(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
            reconnect_base_delay_ms: default_reconnect_base_delay_ms(),
            reconnect_decay: default_reconnect_decay(),
            reconnect_max_delay_ms: default_reconnect_max_delay_ms(),
            reconnect_max_retries: 0,
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl ClientConfig {
    /// Loads and validates a TOML config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parses and validates TOML config text.
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ClientConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(self.url.starts_with("ws://") || self.url.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "url '{}' must start with ws:// or wss://",
                self.url
            )));
        }
        if !(self.api_url.starts_with("http://") || self.api_url.starts_with("https://")) {
            return Err(ConfigError::Invalid(format!(
                "api_url '{}' must start with http:// or https://",
                self.api_url
            )));
        }
        if self.heartbeat_interval_ms > 0
            && self.heartbeat_timeout_ms >= self.heartbeat_interval_ms
        {
            return Err(ConfigError::Invalid(format!(
                "heartbeat_timeout_ms ({}) must be less than heartbeat_interval_ms ({})",
                self.heartbeat_timeout_ms, self.heartbeat_interval_ms
            )));
        }
        if !self.reconnect_decay.is_finite() || self.reconnect_decay < 1.0 {
            return Err(ConfigError::Invalid(format!(
                "reconnect_decay ({}) must be at least 1.0",
                self.reconnect_decay
            )));
        }
        if self.reconnect_base_delay_ms > self.reconnect_max_delay_ms {
            return Err(ConfigError::Invalid(format!(
                "reconnect_base_delay_ms ({}) exceeds reconnect_max_delay_ms ({})",
                self.reconnect_base_delay_ms, self.reconnect_max_delay_ms
            )));
        }
        Ok(())
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_ms > 0).then(|| Duration::from_millis(self.heartbeat_interval_ms))
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
