// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use chrono::{DateTime, SecondsFormat, Utc};
use pulse_core::Update;
use serde_json::json;

/// One JSON line for a received update: receipt time plus the raw frame.
pub fn update_line(update: &Update, received_at: DateTime<Utc>) -> String {
    json!({
        "received_at": received_at.to_rfc3339_opts(SecondsFormat::Millis, true),
        "update": update.payload,
    })
    .to_string()
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
