// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Canonical subscription identity.
//!
//! Two subscribe calls share one wire subscription when their topic and
//! normalized parameters are equal. Normalization:
//! 1. Null parameter values and the envelope names `type` and `topic` are
//!    dropped, matching what a subscribe frame carries on the wire
//! 2. Each remaining value is rendered as compact JSON with object keys sorted
//! 3. Parameters are ordered by name
//!
//! so `{"a":1,"b":2}` and `{"b":2,"a":1}` produce the same key.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Error, Result};

/// Subscription parameters as sent on the wire (flattened into the frame).
pub type Params = Map<String, Value>;

/// Field names owned by the frame envelope; never taken from params.
const RESERVED_FIELDS: [&str; 2] = ["type", "topic"];

pub(crate) fn is_reserved(name: &str) -> bool {
    RESERVED_FIELDS.contains(&name)
}

/// Builds [`Params`] from an arbitrary JSON value.
///
/// `null` is accepted as "no parameters"; anything other than an object is
/// rejected.
pub fn params_from_value(value: Value) -> Result<Params> {
    match value {
        Value::Object(map) => Ok(map),
        Value::Null => Ok(Params::new()),
        other => Err(Error::InvalidParams(json_kind(&other).to_string())),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// The (topic, normalized params) pair that identifies a subscription.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionKey {
    topic: String,
    params: BTreeMap<String, String>,
}

impl SubscriptionKey {
    /// Creates a key from a topic and its wire parameters.
    pub fn new(topic: impl Into<String>, params: &Params) -> Self {
        let params = params
            .iter()
            .filter(|(name, value)| !value.is_null() && !is_reserved(name))
            .map(|(name, value)| (name.clone(), canonical_json(value)))
            .collect();
        SubscriptionKey {
            topic: topic.into(),
            params,
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Normalized parameters: name → canonical JSON text.
    pub fn params(&self) -> &BTreeMap<String, String> {
        &self.params
    }
}

impl fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.topic)?;
        for (name, value) in &self.params {
            write!(f, ":{name}={value}")?;
        }
        Ok(())
    }
}

/// Renders a value as compact JSON with object keys in sorted order,
/// independent of how the map was built.
pub fn canonical_json(value: &Value) -> String {
    sorted(value).to_string()
}

fn sorted(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));
            let mut out = Map::new();
            for (name, inner) in entries {
                out.insert(name.clone(), sorted(inner));
            }
            Value::Object(out)
        }
        Value::Array(items) => Value::Array(items.iter().map(sorted).collect()),
        other => other.clone(),
    }
}

#[cfg(test)]
#[path = "key_tests.rs"]
mod tests;
