// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Inbound frame routing.
//!
//! Control frames are classified and handed back to the connection manager.
//! Domain updates are mapped to a [`SubscriptionKey`] through a routing table
//! (update type → topic + correlation fields) and delivered to every callback
//! registered under that key.
//!
//! Each callback runs inside its own panic boundary: a faulting subscriber is
//! logged and skipped, and never affects other subscribers, other keys, or the
//! connection.

use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};

use pulse_core::{Params, ServerFrame, SubscriptionKey, Update};
use tracing::{debug, warn};

use crate::registry::Registry;

/// Where updates of one type are delivered.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    /// Topic the update belongs to.
    pub topic: String,
    /// Payload fields copied into the key's params.
    pub correlation: Vec<String>,
}

/// Outcome of dispatching one raw frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatched {
    /// Liveness response.
    Pong,
    /// Subscribe/unsubscribe acknowledgement.
    Ack,
    /// Server-reported error, logged and dropped.
    ServerError,
    /// Domain update delivered to `delivered` callbacks, `faulted` of which panicked.
    Update { delivered: usize, faulted: usize },
    /// Unparseable frame, dropped.
    Dropped,
}

/// Maps update types to subscription keys and fans updates out.
#[derive(Debug, Clone)]
pub struct Router {
    routes: HashMap<String, Route>,
}

impl Default for Router {
    fn default() -> Self {
        Router::empty()
            .with_route("price_update", "prices", &[])
            .with_route("balance_update", "balances", &["address"])
            .with_route("lease_update", "leases", &["address"])
            .with_route("tx_status", "transactions", &["txHash"])
            .with_route("staking_update", "staking", &["address"])
    }
}

impl Router {
    /// A router without any routes.
    ///
    /// Updates then go to the key formed by their own `topic` field (or their
    /// type when untagged) with no params.
    pub fn empty() -> Self {
        Router {
            routes: HashMap::new(),
        }
    }

    /// Adds or replaces the route for an update type.
    pub fn with_route(mut self, kind: &str, topic: &str, correlation: &[&str]) -> Self {
        self.routes.insert(
            kind.to_string(),
            Route {
                topic: topic.to_string(),
                correlation: correlation.iter().map(|field| field.to_string()).collect(),
            },
        );
        self
    }

    /// The route for an update type, if one is configured.
    pub fn route(&self, kind: &str) -> Option<&Route> {
        self.routes.get(kind)
    }

    /// Derives the registry key an update is delivered to.
    ///
    /// An explicit `topic` on the frame wins over the route's topic.
    /// Correlation fields missing from the payload are left out of the key.
    pub fn key_for(&self, update: &Update) -> SubscriptionKey {
        let route = self.route(&update.kind);
        let topic = update
            .topic
            .clone()
            .or_else(|| route.map(|r| r.topic.clone()))
            .unwrap_or_else(|| update.kind.clone());

        let mut params = Params::new();
        if let Some(route) = route {
            for field in &route.correlation {
                if let Some(value) = update.field(field) {
                    params.insert(field.clone(), value.clone());
                }
            }
        }
        SubscriptionKey::new(topic, &params)
    }

    /// Parses and dispatches one raw frame.
    pub fn dispatch(&self, text: &str, registry: &Registry) -> Dispatched {
        let frame = match ServerFrame::parse(text) {
            Ok(frame) => frame,
            Err(e) => {
                warn!(error = %e, frame = %truncate(text), "dropping unparseable frame");
                return Dispatched::Dropped;
            }
        };

        match frame {
            ServerFrame::Pong => Dispatched::Pong,
            ServerFrame::Subscribed { topic } => {
                debug!(%topic, "subscription acknowledged");
                Dispatched::Ack
            }
            ServerFrame::Unsubscribed { topic } => {
                debug!(%topic, "unsubscription acknowledged");
                Dispatched::Ack
            }
            ServerFrame::Error { message, topic } => {
                warn!(%message, topic = topic.as_deref().unwrap_or("-"), "server reported error");
                Dispatched::ServerError
            }
            ServerFrame::Update(update) => self.deliver(&update, registry),
        }
    }

    fn deliver(&self, update: &Update, registry: &Registry) -> Dispatched {
        let key = self.key_for(update);
        let callbacks = registry.callbacks(&key);
        if callbacks.is_empty() {
            debug!(kind = %update.kind, %key, "no subscribers for update");
        }

        let mut faulted = 0;
        for callback in &callbacks {
            if catch_unwind(AssertUnwindSafe(|| callback(update))).is_err() {
                faulted += 1;
                warn!(kind = %update.kind, %key, "subscriber callback panicked");
            }
        }

        Dispatched::Update {
            delivered: callbacks.len(),
            faulted,
        }
    }
}

/// Keeps diagnostics for huge frames readable.
fn truncate(text: &str) -> &str {
    const MAX: usize = 200;
    if text.len() <= MAX {
        return text;
    }
    let mut end = MAX;
    while !text.is_char_boundary(end) {
        end -= 1;
    }
    &text[..end]
}

#[cfg(test)]
#[path = "router_tests.rs"]
mod tests;
