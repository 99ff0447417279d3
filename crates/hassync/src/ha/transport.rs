#[cfg(test)]
use std::collections::VecDeque;

use async_trait::async_trait;
use futures_util::SinkExt;
use futures_util::StreamExt;
use tokio::net::TcpStream;
use tokio_tungstenite::MaybeTlsStream;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;
use tracing::debug;

use crate::error::ConnectionError;

/// A bidirectional stream of text frames.
///
/// This trait allows for mocking the socket for testing purposes
#[async_trait]
pub trait Transport: Send {
    /// Send one text frame
    async fn send(&mut self, frame: String) -> Result<(), ConnectionError>;

    /// Receive the next text frame
    ///
    /// Returns None once the remote has closed the connection
    async fn recv(&mut self) -> Result<Option<String>, ConnectionError>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), ConnectionError>;
}

/// WebSocket transport implementation using tokio-tungstenite
pub struct WsTransport {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl WsTransport {
    /// Connect to an already-normalized `ws://` or `wss://` address
    pub async fn connect(url: &str) -> Result<Self, ConnectionError> {
        let (stream, response) = tokio_tungstenite::connect_async(url)
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))?;
        debug!("WebSocket upgrade complete: HTTP {}", response.status());
        Ok(Self { stream })
    }
}

#[async_trait]
impl Transport for WsTransport {
    async fn send(&mut self, frame: String) -> Result<(), ConnectionError> {
        self.stream
            .send(Message::Text(frame))
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))
    }

    async fn recv(&mut self) -> Result<Option<String>, ConnectionError> {
        while let Some(msg) = self.stream.next().await {
            match msg.map_err(|e| ConnectionError::Transport(e.to_string()))? {
                Message::Text(text) => return Ok(Some(text)),
                Message::Binary(bytes) => {
                    let text = String::from_utf8(bytes).map_err(|e| {
                        ConnectionError::Transport(format!("non UTF-8 binary frame: {}", e))
                    })?;
                    return Ok(Some(text));
                }
                Message::Close(frame) => {
                    debug!("Remote closed WebSocket: {:?}", frame);
                    return Ok(None);
                }
                // Pings are answered by tungstenite on the next read
                Message::Ping(_) | Message::Pong(_) | Message::Frame(_) => {}
            }
        }
        Ok(None)
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.stream
            .close(None)
            .await
            .map_err(|e| ConnectionError::Transport(e.to_string()))
    }
}

#[cfg(test)]
type Responder = Box<dyn FnMut(&serde_json::Value) -> Vec<serde_json::Value> + Send>;

/// Scripted transport for tests
///
/// Queues the `auth_required` greeting on creation, answers `auth` with
/// `auth_ok` (or `auth_invalid`), and hands every other outgoing message to
/// a responder that produces the replies.
#[cfg(test)]
pub struct MockTransport {
    pub sent: Vec<serde_json::Value>,
    pub closed: bool,
    inbound: VecDeque<String>,
    accept_auth: bool,
    responder: Responder,
}

#[cfg(test)]
impl MockTransport {
    /// Create a mock that accepts auth and answers every command with an
    /// empty successful result
    pub fn new() -> Self {
        let mut inbound = VecDeque::new();
        inbound.push_back(r#"{"type":"auth_required","ha_version":"2024.6.0"}"#.to_string());
        Self {
            sent: Vec::new(),
            closed: false,
            inbound,
            accept_auth: true,
            responder: Box::new(|msg| vec![success(request_id(msg), serde_json::json!([]))]),
        }
    }

    pub fn rejecting_auth() -> Self {
        Self {
            accept_auth: false,
            ..Self::new()
        }
    }

    pub fn respond_with<F>(mut self, f: F) -> Self
    where
        F: FnMut(&serde_json::Value) -> Vec<serde_json::Value> + Send + 'static,
    {
        self.responder = Box::new(f);
        self
    }

    /// Queue a frame that arrives before any reply to the next request
    pub fn push_inbound(&mut self, msg: serde_json::Value) {
        self.inbound.push_back(msg.to_string());
    }

    /// The `type` of every message sent, in order
    pub fn sent_types(&self) -> Vec<String> {
        self.sent
            .iter()
            .map(|m| m["type"].as_str().unwrap_or_default().to_string())
            .collect()
    }
}

#[cfg(test)]
pub fn request_id(msg: &serde_json::Value) -> u64 {
    msg["id"].as_u64().unwrap_or_default()
}

#[cfg(test)]
pub fn success(id: u64, result: serde_json::Value) -> serde_json::Value {
    serde_json::json!({"id": id, "type": "result", "success": true, "result": result})
}

#[cfg(test)]
pub fn failure(id: u64, message: &str) -> serde_json::Value {
    serde_json::json!({
        "id": id,
        "type": "result",
        "success": false,
        "error": {"code": "unknown_error", "message": message},
    })
}

#[cfg(test)]
#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, frame: String) -> Result<(), ConnectionError> {
        if self.closed {
            return Err(ConnectionError::Closed);
        }
        let msg: serde_json::Value = serde_json::from_str(&frame)?;
        let replies = if msg["type"] == "auth" {
            let kind = if self.accept_auth {
                "auth_ok"
            } else {
                "auth_invalid"
            };
            vec![serde_json::json!({"type": kind, "message": "Invalid access token"})]
        } else {
            (self.responder)(&msg)
        };
        self.sent.push(msg);
        self.inbound
            .extend(replies.into_iter().map(|r| r.to_string()));
        Ok(())
    }

    async fn recv(&mut self) -> Result<Option<String>, ConnectionError> {
        Ok(self.inbound.pop_front())
    }

    async fn close(&mut self) -> Result<(), ConnectionError> {
        self.closed = true;
        Ok(())
    }
}
