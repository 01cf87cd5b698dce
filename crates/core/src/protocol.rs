// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! WebSocket protocol frames for client-server communication.
//!
//! The protocol is simple:
//! - Client sends subscribe/unsubscribe requests and liveness pings
//! - Server acknowledges subscriptions, answers pings, reports errors and
//!   pushes domain updates whose payload is opaque to the client core

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};
use crate::key::{is_reserved, Params};

/// Frames sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientFrame {
    /// Start receiving updates for a topic.
    ///
    /// Params are spread at the top level of the frame, not nested.
    Subscribe {
        topic: String,
        #[serde(flatten)]
        params: Params,
    },

    /// Stop receiving updates for a topic.
    Unsubscribe {
        topic: String,
        #[serde(flatten)]
        params: Params,
    },

    /// Liveness probe, answered with `pong`.
    Ping,
}

impl ClientFrame {
    /// Creates a Subscribe frame.
    pub fn subscribe(topic: impl Into<String>, params: &Params) -> Self {
        ClientFrame::Subscribe {
            topic: topic.into(),
            params: wire_params(params),
        }
    }

    /// Creates an Unsubscribe frame.
    pub fn unsubscribe(topic: impl Into<String>, params: &Params) -> Self {
        ClientFrame::Unsubscribe {
            topic: topic.into(),
            params: wire_params(params),
        }
    }

    /// Creates a Ping frame.
    pub fn ping() -> Self {
        ClientFrame::Ping
    }

    /// Serializes the frame to JSON.
    pub fn to_json(&self) -> std::result::Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the frame from JSON.
    pub fn from_json(s: &str) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

fn wire_params(params: &Params) -> Params {
    params
        .iter()
        .filter(|(name, _)| !is_reserved(name))
        .map(|(name, value)| (name.clone(), value.clone()))
        .collect()
}

/// A server-pushed domain update.
///
/// Only the envelope is interpreted: `kind` is the frame's `type`, `topic`
/// is present when the server tags the update explicitly. Everything else is
/// carried untouched in `payload` (which still includes `type`).
#[derive(Debug, Clone, PartialEq)]
pub struct Update {
    pub kind: String,
    pub topic: Option<String>,
    pub payload: Map<String, Value>,
}

impl Update {
    /// Returns a payload field by name.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.payload.get(name)
    }
}

/// Frames sent from server to client.
#[derive(Debug, Clone, PartialEq)]
pub enum ServerFrame {
    /// Acknowledges a subscribe frame.
    Subscribed { topic: String },

    /// Acknowledges an unsubscribe frame.
    Unsubscribed { topic: String },

    /// Response to a client Ping.
    Pong,

    /// Server-reported protocol error.
    Error {
        message: String,
        topic: Option<String>,
    },

    /// Any other frame type: a domain update.
    Update(Update),
}

impl ServerFrame {
    /// Creates a Pong frame.
    pub fn pong() -> Self {
        ServerFrame::Pong
    }

    /// Creates a domain update frame of the given type.
    ///
    /// `fields` must be a JSON object; other values produce an empty payload.
    pub fn update(kind: impl Into<String>, fields: Value) -> Self {
        let kind = kind.into();
        let mut payload = match fields {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        payload.insert("type".to_string(), Value::String(kind.clone()));
        let topic = payload
            .get("topic")
            .and_then(Value::as_str)
            .map(str::to_string);
        ServerFrame::Update(Update {
            kind,
            topic,
            payload,
        })
    }

    /// Parses a raw text frame, classifying it by its `type` field.
    pub fn parse(text: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(text)?;
        let Value::Object(object) = value else {
            return Err(Error::NotAnObject);
        };
        let kind = match object.get("type") {
            Some(Value::String(kind)) => kind.clone(),
            _ => return Err(Error::MissingType),
        };

        match kind.as_str() {
            "subscribed" => Ok(ServerFrame::Subscribed {
                topic: required_str(&object, &kind, "topic")?,
            }),
            "unsubscribed" => Ok(ServerFrame::Unsubscribed {
                topic: required_str(&object, &kind, "topic")?,
            }),
            "pong" => Ok(ServerFrame::Pong),
            "error" => Ok(ServerFrame::Error {
                message: required_str(&object, &kind, "message")?,
                topic: optional_str(&object, "topic"),
            }),
            _ => Ok(ServerFrame::Update(Update {
                topic: optional_str(&object, "topic"),
                kind,
                payload: object,
            })),
        }
    }

    /// Serializes the frame to JSON.
    pub fn to_json(&self) -> String {
        let value = match self {
            ServerFrame::Subscribed { topic } => {
                serde_json::json!({"type": "subscribed", "topic": topic})
            }
            ServerFrame::Unsubscribed { topic } => {
                serde_json::json!({"type": "unsubscribed", "topic": topic})
            }
            ServerFrame::Pong => serde_json::json!({"type": "pong"}),
            ServerFrame::Error { message, topic } => {
                let mut value = serde_json::json!({"type": "error", "message": message});
                if let Some(topic) = topic {
                    value["topic"] = Value::String(topic.clone());
                }
                value
            }
            ServerFrame::Update(update) => Value::Object(update.payload.clone()),
        };
        value.to_string()
    }
}

fn required_str(object: &Map<String, Value>, kind: &str, field: &str) -> Result<String> {
    object
        .get(field)
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| Error::MalformedFrame {
            kind: kind.to_string(),
            reason: format!("missing string field `{field}`"),
        })
}

fn optional_str(object: &Map<String, Value>, field: &str) -> Option<String> {
    object.get(field).and_then(Value::as_str).map(str::to_string)
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
