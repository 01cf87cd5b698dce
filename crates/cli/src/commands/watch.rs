// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::io::Write;

use chrono::Utc;
use pulse_client::{ClientConfig, ConnectionState, SyncClient};
use pulse_core::Params;
use serde_json::Value;
use tokio::sync::mpsc;
use tracing::{info, warn};

use crate::error::Result;
use crate::output;

pub async fn run(
    config: ClientConfig,
    topic: String,
    params: Vec<(String, String)>,
) -> Result<()> {
    let client = SyncClient::new(config);

    let observer = client.on_connection_state_change(|state| {
        if state == ConnectionState::Reconnecting {
            warn!("connection lost, reconnecting");
        }
    });

    let (tx, mut rx) = mpsc::unbounded_channel();
    let subscription = client.subscribe(topic, build_params(&params), move |update| {
        let _ = tx.send((update.clone(), Utc::now()));
    });
    info!(key = %subscription.key(), "watching");

    if let Err(e) = client.connect().await {
        warn!(error = %e, "initial connection failed, retrying in the background");
    }

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);
    let mut stdout = std::io::stdout();
    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                info!("interrupted");
                break;
            }
            received = rx.recv() => match received {
                Some((update, received_at)) => {
                    writeln!(stdout, "{}", output::update_line(&update, received_at))?;
                    stdout.flush()?;
                }
                None => break,
            },
        }
    }

    subscription.unsubscribe();
    observer.remove();
    client.disconnect().await;
    Ok(())
}

/// Turns `KEY=VALUE` pairs into subscription params.
///
/// Values stay strings, so `address=123` matches an update carrying
/// `"address":"123"`.
pub(crate) fn build_params(pairs: &[(String, String)]) -> Params {
    pairs
        .iter()
        .map(|(key, value)| (key.clone(), Value::String(value.clone())))
        .collect()
}

#[cfg(test)]
#[path = "watch_tests.rs"]
mod tests;
