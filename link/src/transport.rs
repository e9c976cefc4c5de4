//! Socket transport used by observable query connections.
//!
//! [`Transport`] opens one socket per connection attempt; the connection
//! task drives the returned [`TransportSocket`] and owns it until the socket
//! ends or the connection is disconnected.  [`WebSocketTransport`] is the
//! production implementation on top of `tokio-tungstenite`; tests plug in
//! scripted transports through the same seam.

use bytes::Bytes;
use futures_util::future::BoxFuture;
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{ObservableLinkError, Result};

/// Maximum accepted size of a single inbound frame (64 MiB).
pub const MAX_FRAME_BYTES: usize = 64 << 20;

/// A frame surfaced to the connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportFrame {
    /// A JSON text payload (binary frames are decoded as UTF-8).
    Text(String),
    /// A protocol-level frame with no payload for the application
    /// (ping, pong). Resets keepalive timers.
    Heartbeat,
    /// The peer closed the socket, with close code and reason if sent.
    Close(Option<(u16, String)>),
}

/// One open socket.
pub trait TransportSocket: Send {
    /// Next inbound frame. `None` means the stream ended without a close frame.
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<TransportFrame>>>;

    /// Send a keepalive ping.
    fn ping(&mut self) -> BoxFuture<'_, Result<()>>;

    /// Close the socket. Errors are swallowed; the socket is dropped afterwards.
    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Opens sockets for a fully resolved URL.
pub trait Transport: Send + Sync + 'static {
    fn open(&self, url: &str) -> BoxFuture<'static, Result<Box<dyn TransportSocket>>>;
}

/// WebSocket transport backed by `tokio-tungstenite`.
#[derive(Debug, Clone, Default)]
pub struct WebSocketTransport;

impl WebSocketTransport {
    pub fn new() -> Self {
        Self
    }
}

impl Transport for WebSocketTransport {
    fn open(&self, url: &str) -> BoxFuture<'static, Result<Box<dyn TransportSocket>>> {
        let url = url.to_string();
        Box::pin(async move {
            match tokio_tungstenite::connect_async(url.as_str()).await {
                Ok((stream, _response)) => {
                    log::debug!("[observable-link] WebSocket handshake completed for {}", url);
                    Ok(Box::new(WebSocketSocket { stream }) as Box<dyn TransportSocket>)
                },
                Err(tungstenite::Error::Http(response)) => {
                    let status = response.status();
                    let body_text = response
                        .into_body()
                        .as_ref()
                        .and_then(|b| {
                            if b.is_empty() {
                                None
                            } else {
                                Some(String::from_utf8_lossy(b).into_owned())
                            }
                        })
                        .unwrap_or_default();
                    let message = match status.as_u16() {
                        401 => "Unauthorized: WebSocket requires valid credentials".to_string(),
                        403 => "Forbidden: Access to WebSocket denied".to_string(),
                        code => {
                            if body_text.is_empty() {
                                format!("WebSocket HTTP error: {}", code)
                            } else {
                                format!("WebSocket HTTP error {}: {}", code, body_text)
                            }
                        },
                    };
                    Err(ObservableLinkError::WebSocketError(message))
                },
                Err(e) => Err(ObservableLinkError::WebSocketError(format!(
                    "Connection failed: {}",
                    e
                ))),
            }
        })
    }
}

struct WebSocketSocket {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TransportSocket for WebSocketSocket {
    fn next_frame(&mut self) -> BoxFuture<'_, Option<Result<TransportFrame>>> {
        Box::pin(async move {
            loop {
                let message = match self.stream.next().await? {
                    Ok(message) => message,
                    Err(e) => {
                        return Some(Err(ObservableLinkError::WebSocketError(e.to_string())))
                    },
                };

                if let Message::Text(_) | Message::Binary(_) = &message {
                    if message.len() > MAX_FRAME_BYTES {
                        log::warn!(
                            "[observable-link] Dropping oversized frame ({} bytes)",
                            message.len()
                        );
                        continue;
                    }
                }

                return match message {
                    Message::Text(text) => Some(Ok(TransportFrame::Text(text.to_string()))),
                    Message::Binary(data) => match String::from_utf8(data.to_vec()) {
                        Ok(text) => Some(Ok(TransportFrame::Text(text))),
                        Err(e) => {
                            log::warn!("[observable-link] Dropping non UTF-8 binary frame: {}", e);
                            continue;
                        },
                    },
                    Message::Ping(payload) => {
                        if let Err(e) = self.stream.send(Message::Pong(payload)).await {
                            log::debug!("[observable-link] Failed to answer ping: {}", e);
                        }
                        Some(Ok(TransportFrame::Heartbeat))
                    },
                    Message::Pong(_) => Some(Ok(TransportFrame::Heartbeat)),
                    Message::Close(frame) => Some(Ok(TransportFrame::Close(
                        frame.map(|f| (u16::from(f.code), f.reason.to_string())),
                    ))),
                    Message::Frame(_) => continue,
                };
            }
        })
    }

    fn ping(&mut self) -> BoxFuture<'_, Result<()>> {
        Box::pin(async move {
            self.stream
                .send(Message::Ping(Bytes::new()))
                .await
                .map_err(|e| ObservableLinkError::WebSocketError(e.to_string()))
        })
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        Box::pin(async move {
            if let Err(e) = self.stream.close(None).await {
                log::debug!("[observable-link] Error while closing socket: {}", e);
            }
        })
    }
}
