// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pulse-client: real-time subscription and synchronization client.
//!
//! Keeps one logical WebSocket connection to a push service, multiplexes
//! any number of topic subscriptions over it, and keeps them alive across
//! network failures with heartbeats, exponential-backoff reconnection and
//! subscription replay. A companion [`ApiClient`] deduplicates identical
//! concurrent GET requests against the request/response API.
//!
//! # Main Components
//!
//! - [`SyncClient`] - handle to the connection driver; `connect`, `subscribe`, ...
//! - [`Router`] - maps pushed update types to subscription keys
//! - [`ApiClient`] - HTTP client with in-flight request coalescing
//! - [`ClientConfig`] - TOML-backed configuration
//!
//! ```rust,ignore
//! use pulse_client::{ClientConfig, SyncClient};
//! use pulse_core::params_from_value;
//!
//! let client = SyncClient::new(ClientConfig::default());
//! client.connect().await?;
//! let params = params_from_value(serde_json::json!({"address": "addrA"}))?;
//! let subscription = client.subscribe("balances", params, |update| {
//!     println!("{:?}", update.payload);
//! });
//! // ...
//! subscription.unsubscribe();
//! ```

pub mod api;
pub mod backoff;
pub mod coalesce;
pub mod config;
pub mod connection;
mod heartbeat;
pub mod registry;
pub mod router;
mod timer;
pub mod transport;

#[cfg(test)]
mod transport_tests;

pub use api::{ApiClient, ApiError, RequestOptions};
pub use backoff::Backoff;
pub use coalesce::Coalescer;
pub use config::{ClientConfig, ConfigError};
pub use connection::{
    ClientBuilder, ClientError, ClientResult, ConnectionState, StateCallback, StateObserver,
    Subscription, SyncClient,
};
pub use registry::UpdateCallback;
pub use router::{Dispatched, Route, Router};
pub use transport::{
    Connector, Transport, TransportError, TransportResult, WebSocketConnector, WebSocketTransport,
};
