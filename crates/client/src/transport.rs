// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Transport abstraction for WebSocket communication.
//!
//! Provides a trait-based transport layer that enables:
//! - Real WebSocket connections for production
//! - Mock transports for unit testing
//!
//! A [`Connector`] opens one [`Transport`] per connection attempt. Transports
//! carry raw text frames; parsing belongs to the router.

use std::future::Future;
use std::pin::Pin;

use tracing::warn;

/// Error type for transport operations.
#[derive(Debug, Clone, thiserror::Error)]
pub enum TransportError {
    /// Connection failed.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// Connection attempt did not finish in time.
    #[error("connection timed out after {0}s")]
    Timeout(u64),

    /// Connection closed unexpectedly.
    #[error("connection closed")]
    ConnectionClosed,

    /// Send failed.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// Receive failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// An open duplex connection carrying text frames.
pub trait Transport: Send {
    /// Send a text frame to the server.
    fn send(
        &mut self,
        frame: String,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;

    /// Receive the next text frame from the server.
    ///
    /// Returns `None` if the connection is closed.
    fn recv(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Option<String>>> + Send + '_>>;

    /// Close the connection.
    fn close(&mut self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>>;
}

/// Opens transports.
///
/// The returned future must not borrow the connector: attempts run in their
/// own task so the connection manager stays responsive while connecting.
pub trait Connector: Send + Sync + 'static {
    type Transport: Transport + 'static;

    /// Connect to a remote server.
    fn connect(
        &self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Self::Transport>> + Send + 'static>>;
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

/// WebSocket transport implementation using tokio-tungstenite.
pub struct WebSocketTransport {
    sink: futures_util::stream::SplitSink<WsStream, tokio_tungstenite::tungstenite::Message>,
    stream: futures_util::stream::SplitStream<WsStream>,
}

/// Opens [`WebSocketTransport`]s.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    type Transport = WebSocketTransport;

    fn connect(
        &self,
        url: &str,
    ) -> Pin<Box<dyn Future<Output = TransportResult<WebSocketTransport>> + Send + 'static>> {
        let url = url.to_string();
        Box::pin(async move {
            use futures_util::StreamExt;

            let (ws_stream, _) = tokio_tungstenite::connect_async(&url)
                .await
                .map_err(|e| TransportError::ConnectionFailed(e.to_string()))?;

            let (sink, stream) = ws_stream.split();
            Ok(WebSocketTransport { sink, stream })
        })
    }
}

impl Transport for WebSocketTransport {
    fn send(
        &mut self,
        frame: String,
    ) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            use futures_util::SinkExt;
            use tokio_tungstenite::tungstenite::Message;

            self.sink
                .send(Message::Text(frame.into()))
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))?;

            // Flush so a dead connection shows up here rather than on a later frame
            self.sink
                .flush()
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))
        })
    }

    fn recv(
        &mut self,
    ) -> Pin<Box<dyn Future<Output = TransportResult<Option<String>>> + Send + '_>> {
        Box::pin(async move {
            use futures_util::StreamExt;
            use tokio_tungstenite::tungstenite::Message;

            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => return Ok(Some(text.as_str().to_owned())),
                    Some(Ok(Message::Binary(data))) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => return Ok(Some(text)),
                        Err(_) => {
                            warn!("dropping binary frame that is not valid UTF-8");
                            continue;
                        }
                    },
                    Some(Ok(Message::Close(_))) | None => return Ok(None),
                    Some(Ok(_)) => {
                        // Ping/pong control frames are answered by tungstenite
                        continue;
                    }
                    Some(Err(e)) => return Err(TransportError::ReceiveFailed(e.to_string())),
                }
            }
        })
    }

    fn close(&mut self) -> Pin<Box<dyn Future<Output = TransportResult<()>> + Send + '_>> {
        Box::pin(async move {
            use futures_util::SinkExt;
            self.sink
                .close()
                .await
                .map_err(|e| TransportError::SendFailed(e.to_string()))
        })
    }
}
