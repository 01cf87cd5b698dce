// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Mock transport for testing without real sockets, plus its own tests.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;

use crate::transport::{Connector, Transport, TransportError, TransportResult};

/// What the scripted server does on the current connection.
enum Inbound {
    Frame(String),
    Close,
    Fail,
}

struct MockShared {
    attempts: AtomicUsize,
    /// Every connect fails while set.
    refuse: AtomicBool,
    /// Every connect hangs while set.
    hold: AtomicBool,
    /// Every send on an open transport fails while set.
    reject_sends: AtomicBool,
    sent_tx: mpsc::UnboundedSender<String>,
    current: Mutex<Option<mpsc::UnboundedSender<Inbound>>>,
}

/// Connector handing out [`MockTransport`]s wired to one [`MockServer`].
#[derive(Clone)]
pub struct MockConnector {
    shared: Arc<MockShared>,
}

/// Test-side view of the mock: inspect outbound frames, drive inbound ones.
pub struct MockServer {
    shared: Arc<MockShared>,
    sent_rx: mpsc::UnboundedReceiver<String>,
}

pub fn mock_pair() -> (MockConnector, MockServer) {
    let (sent_tx, sent_rx) = mpsc::unbounded_channel();
    let shared = Arc::new(MockShared {
        attempts: AtomicUsize::new(0),
        refuse: AtomicBool::new(false),
        hold: AtomicBool::new(false),
        reject_sends: AtomicBool::new(false),
        sent_tx,
        current: Mutex::new(None),
    });
    (
        MockConnector {
            shared: Arc::clone(&shared),
        },
        MockServer { shared, sent_rx },
    )
}

impl MockServer {
    /// Number of connect attempts so far.
    pub fn attempts(&self) -> usize {
        self.shared.attempts.load(Ordering::SeqCst)
    }

    /// Set whether connects should fail.
    pub fn set_refuse(&self, refuse: bool) {
        self.shared.refuse.store(refuse, Ordering::SeqCst);
    }

    /// Set whether connects should hang.
    pub fn set_hold(&self, hold: bool) {
        self.shared.hold.store(hold, Ordering::SeqCst);
    }

    /// Set whether sends on open transports should fail.
    pub fn set_reject_sends(&self, reject: bool) {
        self.shared.reject_sends.store(reject, Ordering::SeqCst);
    }

    /// Next frame the client sent, parsed as JSON.
    pub async fn next_sent(&mut self) -> Value {
        let text = tokio::time::timeout(Duration::from_secs(3600), self.sent_rx.recv())
            .await
            .expect("timed out waiting for an outbound frame")
            .expect("sent channel closed");
        serde_json::from_str(&text).unwrap()
    }

    /// Outbound frames already delivered, without waiting.
    pub fn drain_sent(&mut self) -> Vec<Value> {
        let mut frames = Vec::new();
        while let Ok(text) = self.sent_rx.try_recv() {
            frames.push(serde_json::from_str(&text).unwrap());
        }
        frames
    }

    /// Push a text frame on the current connection.
    pub fn push_raw(&self, text: &str) {
        self.deliver(Inbound::Frame(text.to_string()));
    }

    /// Push a JSON frame on the current connection.
    pub fn push(&self, frame: Value) {
        self.push_raw(&frame.to_string());
    }

    /// Close the current connection from the server side.
    pub fn close(&self) {
        self.deliver(Inbound::Close);
    }

    /// Break the current connection with a receive error.
    pub fn fail(&self) {
        self.deliver(Inbound::Fail);
    }

    fn deliver(&self, inbound: Inbound) {
        if let Some(tx) = self.shared.current.lock().unwrap().as_ref() {
            let _ = tx.send(inbound);
        }
    }
}

impl Connector for MockConnector {
    type Transport = MockTransport;

    fn connect(
        &self,
        _url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<MockTransport>> + Send + 'static>> {
        let shared = Arc::clone(&self.shared);
        Box::pin(async move {
            shared.attempts.fetch_add(1, Ordering::SeqCst);
            if shared.hold.load(Ordering::SeqCst) {
                std::future::pending::<()>().await;
            }
            if shared.refuse.load(Ordering::SeqCst) {
                return Err(TransportError::ConnectionFailed("mock failure".into()));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            *shared.current.lock().unwrap() = Some(tx);
            Ok(MockTransport {
                shared: Arc::clone(&shared),
                inbound: rx,
                closed: false,
            })
        })
    }
}

/// Mock transport recording outbound frames and replaying scripted inbound ones.
pub struct MockTransport {
    shared: Arc<MockShared>,
    inbound: mpsc::UnboundedReceiver<Inbound>,
    closed: bool,
}

impl Transport for MockTransport {
    fn send(
        &mut self,
        frame: String,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            if self.closed {
                return Err(TransportError::ConnectionClosed);
            }
            if self.shared.reject_sends.load(Ordering::SeqCst) {
                return Err(TransportError::SendFailed("mock failure".into()));
            }
            self.shared
                .sent_tx
                .send(frame)
                .map_err(|e| TransportError::SendFailed(e.to_string()))
        })
    }

    fn recv(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Option<String>>> + Send + '_>> {
        Box::pin(async move {
            if self.closed {
                return Ok(None);
            }
            match self.inbound.recv().await {
                Some(Inbound::Frame(text)) => Ok(Some(text)),
                Some(Inbound::Close) | None => {
                    self.closed = true;
                    Ok(None)
                }
                Some(Inbound::Fail) => Err(TransportError::ReceiveFailed("mock failure".into())),
            }
        })
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            self.closed = true;
            Ok(())
        })
    }
}

#[tokio::test]
async fn test_mock_transport_send_recv() {
    let (connector, mut server) = mock_pair();
    let mut transport = connector.connect("ws://localhost:1234").await.unwrap();
    assert_eq!(server.attempts(), 1);

    transport.send(r#"{"type":"ping"}"#.to_string()).await.unwrap();
    assert_eq!(server.next_sent().await, serde_json::json!({"type": "ping"}));

    server.push(serde_json::json!({"type": "pong"}));
    let received = transport.recv().await.unwrap();
    assert_eq!(received.as_deref(), Some(r#"{"type":"pong"}"#));

    server.close();
    assert!(transport.recv().await.unwrap().is_none());
    assert!(transport.send("{}".to_string()).await.is_err());
}

#[tokio::test]
async fn test_mock_transport_connect_fail() {
    let (connector, server) = mock_pair();
    server.set_refuse(true);

    let result = connector.connect("ws://localhost:1234").await;
    assert!(matches!(result, Err(TransportError::ConnectionFailed(_))));
    assert_eq!(server.attempts(), 1);
}

#[tokio::test]
async fn test_mock_transport_recv_error() {
    let (connector, server) = mock_pair();
    let mut transport = connector.connect("ws://localhost:1234").await.unwrap();

    server.fail();
    assert!(matches!(
        transport.recv().await,
        Err(TransportError::ReceiveFailed(_))
    ));
}

#[tokio::test]
async fn test_mock_transport_rejected_send() {
    let (connector, mut server) = mock_pair();
    let mut transport = connector.connect("ws://localhost:1234").await.unwrap();

    server.set_reject_sends(true);
    assert!(matches!(
        transport.send("{}".to_string()).await,
        Err(TransportError::SendFailed(_))
    ));
    assert!(server.drain_sent().is_empty());

    server.set_reject_sends(false);
    transport.send("{}".to_string()).await.unwrap();
    assert_eq!(server.drain_sent().len(), 1);
}

#[test]
fn transport_error_display() {
    assert_eq!(TransportError::Timeout(5).to_string(), "connection timed out after 5s");
    assert_eq!(TransportError::ConnectionClosed.to_string(), "connection closed");
}
