// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! pulse-core: Shared wire types for the pulse sync client
//!
//! This crate provides the protocol frames and the canonical subscription
//! key used by the client and by test servers.

pub mod error;
pub mod key;
pub mod protocol;

pub use error::{Error, Result};
pub use key::{canonical_json, params_from_value, Params, SubscriptionKey};
pub use protocol::{ClientFrame, ServerFrame, Update};
