// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! In-flight request coalescing.
//!
//! Concurrent callers asking for the same key share one underlying call and
//! observe the same outcome. The entry is removed as soon as the call settles,
//! so the next caller starts a fresh one.

use std::collections::HashMap;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use futures_util::future::{BoxFuture, FutureExt, Shared};
use tracing::debug;

type SharedOutcome<T, E> = Shared<BoxFuture<'static, Result<T, E>>>;

struct InFlight<T, E> {
    /// Distinguishes this call from a later one under the same key.
    id: u64,
    outcome: SharedOutcome<T, E>,
}

type InFlightMap<T, E> = Arc<Mutex<HashMap<String, InFlight<T, E>>>>;

pub struct Coalescer<T, E> {
    inflight: InFlightMap<T, E>,
    next_id: AtomicU64,
}

impl<T, E> Default for Coalescer<T, E> {
    fn default() -> Self {
        Coalescer {
            inflight: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(0),
        }
    }
}

impl<T, E> Coalescer<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs `producer` unless a call for `key` is already in flight, in which
    /// case its outcome is awaited instead and `producer` is never invoked.
    pub async fn coalesce<F, Fut>(&self, key: &str, producer: F) -> Result<T, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>> + Send + 'static,
    {
        let outcome = {
            let mut inflight = lock(&self.inflight);
            match inflight.get(key) {
                Some(existing) => {
                    debug!(key, "joining in-flight request");
                    existing.outcome.clone()
                }
                None => {
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let outcome = settle_then_forget(
                        Arc::clone(&self.inflight),
                        key.to_string(),
                        id,
                        producer(),
                    );
                    inflight.insert(
                        key.to_string(),
                        InFlight {
                            id,
                            outcome: outcome.clone(),
                        },
                    );
                    outcome
                }
            }
        };
        outcome.await
    }

    /// Number of keys with a call in flight.
    #[cfg(test)]
    pub(crate) fn in_flight(&self) -> usize {
        lock(&self.inflight).len()
    }
}

/// Wraps `call` so its map entry is removed the moment it settles, before any
/// waiter sees the outcome.
fn settle_then_forget<T, E, Fut>(
    inflight: InFlightMap<T, E>,
    key: String,
    id: u64,
    call: Fut,
) -> SharedOutcome<T, E>
where
    T: Clone + Send + Sync + 'static,
    E: Clone + Send + Sync + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    async move {
        let result = call.await;
        let mut inflight = lock(&inflight);
        if inflight.get(&key).is_some_and(|entry| entry.id == id) {
            inflight.remove(&key);
        }
        result
    }
    .boxed()
    .shared()
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
#[path = "coalesce_tests.rs"]
mod tests;
