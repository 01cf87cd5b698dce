// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Request/response API client.
//!
//! Bodiless GET requests go through a [`Coalescer`] keyed by method and full
//! URL, so identical concurrent reads produce one HTTP call. Everything else
//! is sent as-is.

use std::time::Duration;

use reqwest::{Method, Url};
use serde_json::Value;
use tracing::debug;

use crate::coalesce::Coalescer;
use crate::config::ClientConfig;

/// Longest response body kept in a status error.
const MAX_ERROR_BODY: usize = 512;

/// Error type for API requests.
///
/// `Clone` so that every waiter on a coalesced request gets the same error.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApiError {
    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("request timed out")]
    Timeout,

    #[error("server returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid response body: {0}")]
    Decode(String),
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            ApiError::Timeout
        } else {
            ApiError::Request(e.to_string())
        }
    }
}

/// Per-request options.
#[derive(Debug, Clone, Default)]
pub struct RequestOptions {
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
    pub headers: Vec<(String, String)>,
}

impl RequestOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn query(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }
}

/// Whether a request may share an in-flight identical one.
pub fn is_coalescible(method: &Method, options: &RequestOptions) -> bool {
    *method == Method::GET && options.body.is_none()
}

/// Coalescing key: `METHOD:full-url`.
pub fn dedup_key(method: &Method, url: &Url) -> String {
    format!("{method}:{url}")
}

/// HTTP client for the request/response API.
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    inflight: Coalescer<Value, ApiError>,
}

impl ApiClient {
    /// Creates a client for `config.api_url`.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::with_base_url(&config.api_url, config.request_timeout())
    }

    pub fn with_base_url(base_url: &str, timeout: Duration) -> Result<Self, ApiError> {
        Url::parse(base_url).map_err(|e| ApiError::InvalidUrl(format!("{base_url}: {e}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(ApiClient {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            inflight: Coalescer::new(),
        })
    }

    /// Resolves `path` against the base URL, keeping any base path prefix.
    pub fn url_for(&self, path: &str, query: &[(String, String)]) -> Result<Url, ApiError> {
        let raw = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        let mut url = Url::parse(&raw).map_err(|e| ApiError::InvalidUrl(format!("{raw}: {e}")))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Sends a request and decodes the JSON response.
    ///
    /// An empty successful response decodes to `Value::Null`.
    pub async fn request(
        &self,
        method: Method,
        path: &str,
        options: RequestOptions,
    ) -> Result<Value, ApiError> {
        let url = self.url_for(path, &options.query)?;

        if is_coalescible(&method, &options) {
            let key = dedup_key(&method, &url);
            let http = self.http.clone();
            let headers = options.headers;
            return self
                .inflight
                .coalesce(&key, move || execute(http, method, url, headers, None))
                .await;
        }

        execute(self.http.clone(), method, url, options.headers, options.body).await
    }

    pub async fn get(&self, path: &str, options: RequestOptions) -> Result<Value, ApiError> {
        self.request(Method::GET, path, options).await
    }
}

async fn execute(
    http: reqwest::Client,
    method: Method,
    url: Url,
    headers: Vec<(String, String)>,
    body: Option<Value>,
) -> Result<Value, ApiError> {
    debug!(%method, %url, "api request");

    let mut request = http.request(method, url);
    for (name, value) in &headers {
        request = request.header(name, value);
    }
    if let Some(body) = &body {
        request = request.json(body);
    }

    let response = request.send().await?;
    let status = response.status();
    let text = response.text().await?;

    if !status.is_success() {
        let mut body = text;
        if body.len() > MAX_ERROR_BODY {
            let mut end = MAX_ERROR_BODY;
            while !body.is_char_boundary(end) {
                end -= 1;
            }
            body.truncate(end);
        }
        return Err(ApiError::Status {
            status: status.as_u16(),
            body,
        });
    }
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    serde_json::from_str(&text).map_err(|e| ApiError::Decode(e.to_string()))
}

#[cfg(test)]
#[path = "api_tests.rs"]
mod tests;
