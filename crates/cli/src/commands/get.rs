// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use pulse_client::{ApiClient, ClientConfig, RequestOptions};

use crate::error::Result;

pub async fn run(config: &ClientConfig, path: &str, query: Vec<(String, String)>) -> Result<()> {
    let api = ApiClient::new(config)?;
    let options = RequestOptions {
        query,
        ..RequestOptions::default()
    };
    let value = api.get(path, options).await?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
