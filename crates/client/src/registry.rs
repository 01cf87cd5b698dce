// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription registry.
//!
//! Maps each [`SubscriptionKey`] to the callbacks interested in it and the
//! wire parameters needed to (re)issue its subscribe/unsubscribe frames.
//! The registry has no network awareness: mutations return the frame that
//! should be sent, and the connection manager decides whether to send it.

use std::collections::HashMap;
use std::sync::Arc;

use pulse_core::{ClientFrame, Params, SubscriptionKey, Update};

/// Callback invoked for every update routed to a subscription.
pub type UpdateCallback = Arc<dyn Fn(&Update) + Send + Sync>;

/// Identifies one registered callback.
pub(crate) type CallbackId = u64;

struct Entry {
    topic: String,
    params: Params,
    /// In registration order.
    callbacks: Vec<(CallbackId, UpdateCallback)>,
}

/// Subscriptions by key, with their callbacks.
#[derive(Default)]
pub struct Registry {
    entries: HashMap<SubscriptionKey, Entry>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a callback under `key`.
    ///
    /// Returns the subscribe frame when this created the subscription, `None`
    /// when it joined an existing one.
    pub(crate) fn add(
        &mut self,
        key: SubscriptionKey,
        topic: &str,
        params: &Params,
        id: CallbackId,
        callback: UpdateCallback,
    ) -> Option<ClientFrame> {
        let mut created = None;
        let entry = self.entries.entry(key).or_insert_with(|| {
            created = Some(ClientFrame::subscribe(topic, params));
            Entry {
                topic: topic.to_string(),
                params: params.clone(),
                callbacks: Vec::new(),
            }
        });
        entry.callbacks.push((id, callback));
        created
    }

    /// Removes exactly one callback.
    ///
    /// Returns the unsubscribe frame when the last callback for the key was
    /// removed. Unknown keys or ids are ignored, so removing twice is harmless.
    pub(crate) fn remove(&mut self, key: &SubscriptionKey, id: CallbackId) -> Option<ClientFrame> {
        let entry = self.entries.get_mut(key)?;
        entry.callbacks.retain(|(existing, _)| *existing != id);
        if !entry.callbacks.is_empty() {
            return None;
        }
        let entry = self.entries.remove(key)?;
        Some(ClientFrame::unsubscribe(entry.topic, &entry.params))
    }

    /// Callbacks registered under `key`, in registration order.
    pub fn callbacks(&self, key: &SubscriptionKey) -> Vec<UpdateCallback> {
        self.entries
            .get(key)
            .map(|entry| entry.callbacks.iter().map(|(_, cb)| Arc::clone(cb)).collect())
            .unwrap_or_default()
    }

    /// One subscribe frame per tracked subscription, in no particular order.
    pub fn replay_frames(&self) -> Vec<ClientFrame> {
        self.entries
            .values()
            .map(|entry| ClientFrame::subscribe(entry.topic.clone(), &entry.params))
            .collect()
    }

    /// Drops every subscription without producing frames.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of distinct subscriptions.
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    #[cfg(test)]
    pub(crate) fn contains(&self, key: &SubscriptionKey) -> bool {
        self.entries.contains_key(key)
    }

    #[cfg(test)]
    pub(crate) fn callback_count(&self, key: &SubscriptionKey) -> usize {
        self.entries.get(key).map_or(0, |entry| entry.callbacks.len())
    }

    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
