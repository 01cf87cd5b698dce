// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use super::*;
use futures_util::future::join_all;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use yare::parameterized;

/// Minimal HTTP/1.1 responder that counts requests.
struct TestServer {
    base_url: String,
    hits: Arc<AtomicUsize>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl TestServer {
    async fn start(status: u16, body: &'static str, delay: Duration) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        let hits = Arc::new(AtomicUsize::new(0));
        let requests = Arc::new(Mutex::new(Vec::new()));

        let (hits_in, requests_in) = (Arc::clone(&hits), Arc::clone(&requests));
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                let hits = Arc::clone(&hits_in);
                let requests = Arc::clone(&requests_in);
                tokio::spawn(async move {
                    respond(stream, status, body, delay, &hits, &requests).await;
                });
            }
        });

        TestServer {
            base_url,
            hits,
            requests,
        }
    }

    fn client(&self) -> ApiClient {
        ApiClient::with_base_url(&self.base_url, Duration::from_secs(5)).unwrap()
    }

    fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }
}

/// Reads one request, records it, and answers after `delay`.
async fn respond(
    mut stream: TcpStream,
    status: u16,
    body: &str,
    delay: Duration,
    hits: &AtomicUsize,
    requests: &Mutex<Vec<String>>,
) {
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    let header_end = loop {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            return;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
            break pos + 4;
        }
    };
    let head = String::from_utf8_lossy(&buf[..header_end]).to_string();
    let content_length = head
        .lines()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.eq_ignore_ascii_case("content-length"))
        .map(|(_, value)| value.trim().parse::<usize>().unwrap())
        .unwrap_or(0);
    while buf.len() < header_end + content_length {
        let n = stream.read(&mut chunk).await.unwrap();
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
    }
    requests
        .lock()
        .unwrap()
        .push(String::from_utf8_lossy(&buf).to_string());
    hits.fetch_add(1, Ordering::SeqCst);

    tokio::time::sleep(delay).await;
    let response = format!(
        "HTTP/1.1 {status} Test\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\r\n{body}",
        body.len()
    );
    let _ = stream.write_all(response.as_bytes()).await;
    let _ = stream.shutdown().await;
}

#[tokio::test]
async fn concurrent_gets_share_one_call() {
    let server = TestServer::start(200, r#"{"price":1.5}"#, Duration::from_millis(200)).await;
    let client = server.client();

    let results = join_all((0..5).map(|_| {
        client.get("/prices", RequestOptions::new().query("symbol", "X"))
    }))
    .await;

    assert_eq!(server.hits(), 1);
    for result in results {
        assert_eq!(result.unwrap(), json!({"price": 1.5}));
    }
}

#[tokio::test]
async fn different_queries_are_separate_calls() {
    let server = TestServer::start(200, "{}", Duration::from_millis(100)).await;
    let client = server.client();

    let (a, b) = tokio::join!(
        client.get("/prices", RequestOptions::new().query("symbol", "X")),
        client.get("/prices", RequestOptions::new().query("symbol", "Y")),
    );
    a.unwrap();
    b.unwrap();
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn requests_with_body_are_not_coalesced() {
    let server = TestServer::start(200, r#"{"ok":true}"#, Duration::from_millis(100)).await;
    let client = server.client();

    let results = join_all((0..3).map(|i| {
        client.request(
            Method::POST,
            "/tx",
            RequestOptions::new().body(json!({"n": i})),
        )
    }))
    .await;

    assert!(results.iter().all(Result::is_ok));
    assert_eq!(server.hits(), 3);
    let requests = server.requests.lock().unwrap();
    assert!(requests.iter().all(|r| r.starts_with("POST /tx ")));
    assert!(requests.iter().any(|r| r.ends_with(r#"{"n":2}"#)));
}

#[tokio::test]
async fn error_status_is_shared_then_cleared() {
    let server = TestServer::start(500, "boom", Duration::from_millis(100)).await;
    let client = server.client();

    let results = join_all((0..3).map(|_| client.get("/fail", RequestOptions::new()))).await;
    assert_eq!(server.hits(), 1);
    for result in results {
        assert_eq!(
            result.unwrap_err(),
            ApiError::Status {
                status: 500,
                body: "boom".to_string()
            }
        );
    }

    assert!(client.get("/fail", RequestOptions::new()).await.is_err());
    assert_eq!(server.hits(), 2);
}

#[tokio::test]
async fn headers_are_sent() {
    let server = TestServer::start(200, "{}", Duration::ZERO).await;
    let client = server.client();

    client
        .get("/me", RequestOptions::new().header("x-api-key", "secret"))
        .await
        .unwrap();
    let requests = server.requests.lock().unwrap();
    assert!(requests[0].to_ascii_lowercase().contains("x-api-key: secret"));
}

#[tokio::test]
async fn empty_body_is_null() {
    let server = TestServer::start(200, "", Duration::ZERO).await;
    let value = server.client().get("/empty", RequestOptions::new()).await.unwrap();
    assert_eq!(value, Value::Null);
}

#[tokio::test]
async fn non_json_body_is_decode_error() {
    let server = TestServer::start(200, "<html>", Duration::ZERO).await;
    let err = server.client().get("/html", RequestOptions::new()).await.unwrap_err();
    assert!(matches!(err, ApiError::Decode(_)), "got {err}");
}

#[tokio::test]
async fn unreachable_server_is_request_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let base_url = format!("http://{addr}");
    let client = ApiClient::with_base_url(&base_url, Duration::from_secs(5)).unwrap();
    let err = client.get("/x", RequestOptions::new()).await.unwrap_err();
    assert!(matches!(err, ApiError::Request(_)), "got {err}");
}

#[test]
fn url_for_keeps_base_path() {
    let base_url = "http://api.example.com/v1/";
    let client = ApiClient::with_base_url(base_url, Duration::from_secs(1)).unwrap();
    let url = client
        .url_for("/balances", &[("address".to_string(), "A B".to_string())])
        .unwrap();
    assert_eq!(url.as_str(), "http://api.example.com/v1/balances?address=A+B");

    let url = client.url_for("prices", &[]).unwrap();
    assert_eq!(url.as_str(), "http://api.example.com/v1/prices");
}

#[test]
fn invalid_base_url_rejected() {
    let result = ApiClient::with_base_url("not a url", Duration::from_secs(1));
    assert!(matches!(result, Err(ApiError::InvalidUrl(_))));
}

#[test]
fn dedup_key_includes_query() {
    let url = Url::parse("http://localhost:7891/prices?symbol=X").unwrap();
    assert_eq!(dedup_key(&Method::GET, &url), "GET:http://localhost:7891/prices?symbol=X");
}

#[parameterized(
    plain_get = { Method::GET, None, true },
    get_with_body = { Method::GET, Some(json!({})), false },
    post = { Method::POST, None, false },
    delete = { Method::DELETE, None, false },
)]
fn coalescible_requests(method: Method, body: Option<Value>, expected: bool) {
    let options = RequestOptions {
        body,
        ..RequestOptions::default()
    };
    assert_eq!(is_coalescible(&method, &options), expected);
}
