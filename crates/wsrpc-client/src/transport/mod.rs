//! Transport seam between the client engine and a duplex text channel.
//!
//! A [`Connector`] opens a channel to a URL and hands back a [`TransportChannel`]:
//! an outbound sender of text frames and an inbound stream of [`TransportEvent`]s.
//! The engine never touches sockets directly, so the same engine runs over a real
//! WebSocket ([`WsConnector`]) or an in-process pair ([`MemoryConnector`]).
//!
//! Dropping the outbound sender asks the transport to close.

mod memory;
mod ws;

pub use memory::{MemoryConnector, MemoryServer, memory_transport};
pub use ws::WsConnector;

use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::mpsc;
use url::Url;
use wsrpc_core::ClientError;

/// Close code used when the peer vanished without a close frame.
pub const ABNORMAL_CLOSURE: u16 = 1006;

/// Something the transport observed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransportEvent {
    /// The channel is open.
    Open,
    /// One inbound text frame.
    Message(String),
    /// The channel closed. No further events follow.
    Close {
        /// WebSocket close code.
        code: u16,
        /// Close reason, possibly empty.
        reason: String,
    },
    /// The channel failed. A `Close` normally follows.
    Error(String),
}

/// An open duplex channel.
#[derive(Debug)]
pub struct TransportChannel {
    /// Text frames to send.
    pub outbound: mpsc::UnboundedSender<String>,
    /// Events observed on the channel, in arrival order.
    pub inbound: mpsc::UnboundedReceiver<TransportEvent>,
}

/// Failure to open a channel.
#[derive(Debug, Error)]
pub enum TransportError {
    /// The upgrade request could not be built.
    #[error("invalid upgrade request: {0}")]
    Request(String),
    /// The peer could not be reached or refused the upgrade.
    #[error("connect failed: {0}")]
    Connect(String),
}

impl From<TransportError> for ClientError {
    fn from(err: TransportError) -> Self {
        ClientError::transport(err.to_string())
    }
}

/// Opens transport channels.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a channel to `url`. Resolves once the channel is open.
    async fn connect(&self, url: &Url) -> Result<TransportChannel, TransportError>;
}
