// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! One-shot timer slot for the connection manager's select loop.
//!
//! A `Timer` is either idle or armed with a deadline. `fired()` completes at
//! the deadline and never completes while idle, so it can sit in a
//! `tokio::select!` branch unconditionally. The loop disarms or re-arms the
//! timer when the branch runs.

use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Default)]
pub(crate) struct Timer {
    deadline: Option<Instant>,
}

impl Timer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Arms the timer, replacing any previous deadline.
    pub(crate) fn schedule(&mut self, delay: Duration) {
        self.deadline = Some(Instant::now() + delay);
    }

    pub(crate) fn cancel(&mut self) {
        self.deadline = None;
    }

    pub(crate) fn is_scheduled(&self) -> bool {
        self.deadline.is_some()
    }

    /// Completes at the deadline; pending forever while idle.
    pub(crate) async fn fired(&self) {
        match self.deadline {
            Some(deadline) => tokio::time::sleep_until(deadline).await,
            None => std::future::pending().await,
        }
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_at_deadline() {
        let mut timer = Timer::new();
        timer.schedule(Duration::from_secs(5));
        assert!(timer.is_scheduled());

        let start = Instant::now();
        timer.fired().await;
        assert!(start.elapsed() >= Duration::from_secs(5));
    }

    #[tokio::test(start_paused = true)]
    async fn idle_timer_never_fires() {
        let mut timer = Timer::new();
        timer.schedule(Duration::from_secs(1));
        timer.cancel();
        assert!(!timer.is_scheduled());

        let fired = tokio::time::timeout(Duration::from_secs(60), timer.fired()).await;
        assert!(fired.is_err());
    }
}
