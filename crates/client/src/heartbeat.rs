// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Heartbeat monitor.
//!
//! While connected, a probe is due every `interval`. A probe left unanswered
//! for `timeout`, or still outstanding when the next one is due, means the
//! connection is dead even if the transport has not noticed yet.

use std::time::Duration;

use tokio::time::Instant;

use crate::config::ClientConfig;
use crate::timer::Timer;

/// Which heartbeat timer fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Beat {
    Tick,
    Timeout,
}

/// What the connection manager must do about a beat.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Action {
    /// Send a ping, then call [`Heartbeat::probe_sent`].
    SendProbe,
    /// Liveness failure; tear the connection down.
    Dead,
}

/// An unanswered probe.
#[derive(Debug, Clone, Copy)]
struct PendingLiveness {
    sent_at: Instant,
}

#[derive(Debug)]
pub(crate) struct Heartbeat {
    /// `None` disables probing.
    interval: Option<Duration>,
    timeout: Duration,
    tick: Timer,
    liveness: Timer,
    pending: Option<PendingLiveness>,
}

impl Heartbeat {
    pub(crate) fn new(interval: Option<Duration>, timeout: Duration) -> Self {
        Heartbeat {
            interval,
            timeout,
            tick: Timer::new(),
            liveness: Timer::new(),
            pending: None,
        }
    }

    pub(crate) fn from_config(config: &ClientConfig) -> Self {
        Heartbeat::new(config.heartbeat_interval(), config.heartbeat_timeout())
    }

    /// Called on entering Connected.
    pub(crate) fn start(&mut self) {
        self.stop();
        if let Some(interval) = self.interval {
            self.tick.schedule(interval);
        }
    }

    /// Called on leaving Connected for any reason.
    pub(crate) fn stop(&mut self) {
        self.tick.cancel();
        self.liveness.cancel();
        self.pending = None;
    }

    #[cfg(test)]
    pub(crate) fn is_running(&self) -> bool {
        self.tick.is_scheduled() || self.liveness.is_scheduled()
    }

    #[cfg(test)]
    pub(crate) fn probe_outstanding(&self) -> bool {
        self.pending.is_some()
    }

    /// Completes when either timer fires.
    pub(crate) async fn wait(&self) -> Beat {
        tokio::select! {
            biased;
            _ = self.liveness.fired() => Beat::Timeout,
            _ = self.tick.fired() => Beat::Tick,
        }
    }

    pub(crate) fn handle(&mut self, beat: Beat) -> Action {
        match beat {
            Beat::Timeout => {
                self.stop();
                Action::Dead
            }
            Beat::Tick if self.pending.is_some() => {
                self.stop();
                Action::Dead
            }
            Beat::Tick => {
                if let Some(interval) = self.interval {
                    self.tick.schedule(interval);
                }
                Action::SendProbe
            }
        }
    }

    /// Records an outstanding probe and arms its timeout.
    pub(crate) fn probe_sent(&mut self) {
        self.pending = Some(PendingLiveness {
            sent_at: Instant::now(),
        });
        self.liveness.schedule(self.timeout);
    }

    /// Clears the outstanding probe. Returns its round-trip time, if one was
    /// outstanding.
    pub(crate) fn on_pong(&mut self) -> Option<Duration> {
        let pending = self.pending.take()?;
        self.liveness.cancel();
        Some(pending.sent_at.elapsed())
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
