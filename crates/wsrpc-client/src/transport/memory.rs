//! In-process transport.
//!
//! [`memory_transport`] returns a connector and the [`MemoryServer`] holding the
//! other end of its channel. The server side reads the client's frames and
//! injects replies, pushes, errors, and closes, which makes every engine
//! behavior reproducible without a socket.

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::sync::mpsc;
use url::Url;
use wsrpc_core::PushEvent;

use super::{Connector, TransportChannel, TransportError, TransportEvent};

/// Connector handing out one pre-built in-process channel.
pub struct MemoryConnector {
    channel: Mutex<Option<TransportChannel>>,
    hang: bool,
}

impl MemoryConnector {
    /// A connector whose `connect` never resolves.
    pub fn unresponsive() -> Self {
        Self {
            channel: Mutex::new(None),
            hang: true,
        }
    }
}

#[async_trait]
impl Connector for MemoryConnector {
    async fn connect(&self, _url: &Url) -> Result<TransportChannel, TransportError> {
        if self.hang {
            futures::future::pending::<()>().await;
        }
        self.channel
            .lock()
            .take()
            .ok_or_else(|| TransportError::Connect("memory transport already connected".into()))
    }
}

/// Peer end of a memory transport.
pub struct MemoryServer {
    from_client: mpsc::UnboundedReceiver<String>,
    to_client: mpsc::UnboundedSender<TransportEvent>,
}

/// Create a connected connector/server pair.
pub fn memory_transport() -> (MemoryConnector, MemoryServer) {
    let (out_tx, out_rx) = mpsc::unbounded_channel();
    let (in_tx, in_rx) = mpsc::unbounded_channel();
    let _ = in_tx.send(TransportEvent::Open);

    let connector = MemoryConnector {
        channel: Mutex::new(Some(TransportChannel {
            outbound: out_tx,
            inbound: in_rx,
        })),
        hang: false,
    };
    let server = MemoryServer {
        from_client: out_rx,
        to_client: in_tx,
    };
    (connector, server)
}

impl MemoryServer {
    /// Next raw frame sent by the client. `None` once the client closed.
    pub async fn recv(&mut self) -> Option<String> {
        self.from_client.recv().await
    }

    /// Next frame sent by the client, parsed as JSON.
    pub async fn recv_json(&mut self) -> Option<Value> {
        let text = self.recv().await?;
        serde_json::from_str(&text).ok()
    }

    /// A frame already sent by the client, without waiting.
    pub fn try_recv_json(&mut self) -> Option<Value> {
        let text = self.from_client.try_recv().ok()?;
        serde_json::from_str(&text).ok()
    }

    /// Answer request `id` with `result`.
    pub fn reply(&self, id: u64, result: Value) -> bool {
        self.send_json(&json!({ "id": id, "result": result }))
    }

    /// Answer request `id` with an error object.
    pub fn reply_error(&self, id: u64, message: &str) -> bool {
        self.send_json(&json!({ "id": id, "error": { "code": -32000, "message": message } }))
    }

    /// Emit a push event.
    pub fn push(&self, event: &PushEvent) -> bool {
        self.send_json(&json!({ "result": event }))
    }

    /// Send a JSON frame.
    pub fn send_json(&self, frame: &Value) -> bool {
        self.send_text(frame.to_string())
    }

    /// Send a raw text frame.
    pub fn send_text(&self, text: impl Into<String>) -> bool {
        self.to_client.send(TransportEvent::Message(text.into())).is_ok()
    }

    /// Report a transport error to the client.
    pub fn fail(&self, message: &str) -> bool {
        self.to_client
            .send(TransportEvent::Error(message.to_string()))
            .is_ok()
    }

    /// Close the channel from the server side.
    pub fn close(&self, code: u16, reason: &str) -> bool {
        self.to_client
            .send(TransportEvent::Close {
                code,
                reason: reason.to_string(),
            })
            .is_ok()
    }

    /// Accept `authenticate` and `use` with null results.
    ///
    /// Returns the two requests in the order received.
    pub async fn accept_handshake(&mut self) -> Option<(Value, Value)> {
        let auth = self.recv_json().await?;
        let _ = self.reply(auth["id"].as_u64()?, Value::Null);
        let scope = self.recv_json().await?;
        let _ = self.reply(scope["id"].as_u64()?, Value::Null);
        Some((auth, scope))
    }
}
