// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Reconnect backoff.
//!
//! `delay = min(base * decay^attempt, max)`, where `attempt` is read before
//! it is incremented. The counter resets after every successful connect.

use std::time::Duration;

use crate::config::ClientConfig;

#[derive(Debug, Clone, PartialEq)]
pub struct Backoff {
    base: Duration,
    decay: f64,
    max: Duration,
    attempt: u32,
}

impl Backoff {
    pub fn new(base: Duration, decay: f64, max: Duration) -> Self {
        Backoff {
            base,
            decay,
            max,
            attempt: 0,
        }
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        Backoff::new(
            Duration::from_millis(config.reconnect_base_delay_ms),
            config.reconnect_decay,
            Duration::from_millis(config.reconnect_max_delay_ms),
        )
    }

    /// Attempts scheduled since the last reset.
    pub fn attempt(&self) -> u32 {
        self.attempt
    }

    /// Delay for a given attempt number, without touching the counter.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let exponent = i32::try_from(attempt).unwrap_or(i32::MAX);
        let max_ms = self.max.as_millis() as f64;
        let raw_ms = self.base.as_millis() as f64 * self.decay.powi(exponent);
        Duration::from_millis(raw_ms.min(max_ms).round() as u64)
    }

    /// Delay for the current attempt; advances the counter.
    pub fn next_delay(&mut self) -> Duration {
        let delay = self.delay_for(self.attempt);
        self.attempt = self.attempt.saturating_add(1);
        delay
    }

    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

impl Default for Backoff {
    fn default() -> Self {
        Backoff::from_config(&ClientConfig::default())
    }
}

#[cfg(test)]
#[path = "backoff_tests.rs"]
mod tests;
