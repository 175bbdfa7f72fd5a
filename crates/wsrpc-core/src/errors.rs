//! Error hierarchy for the wsrpc client.
//!
//! [`ClientError`] is the single error type delivered to callers, either through the
//! asynchronous result of a submitted operation or (for construction-time failures)
//! directly from `Client::connect`.
//!
//! The type is `Clone` because one failure is routinely broadcast to many callers:
//! a handshake failure reaches every buffered operation, and a transport failure
//! reaches every pending request.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

// ─────────────────────────────────────────────────────────────────────────────
// Handshake steps
// ─────────────────────────────────────────────────────────────────────────────

/// The bootstrap step that produced a [`ClientError::Handshake`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HandshakeStep {
    /// Out-of-band HTTP credential exchange.
    Signin,
    /// `authenticate` over the RPC channel.
    Authenticate,
    /// `use` (namespace/database selection) over the RPC channel.
    Use,
}

impl fmt::Display for HandshakeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Signin => write!(f, "signin"),
            Self::Authenticate => write!(f, "authenticate"),
            Self::Use => write!(f, "use"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// ClientError
// ─────────────────────────────────────────────────────────────────────────────

/// Errors surfaced to callers of the RPC client.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ClientError {
    /// A bootstrap step failed. Terminal for the connection.
    #[error("handshake failed at {step}: {message}")]
    Handshake {
        /// Step that failed.
        step: HandshakeStep,
        /// Failure detail.
        message: String,
    },

    /// The server answered this request with an `error` object.
    #[error("remote error: {message}")]
    Remote {
        /// The server's `error.message`.
        message: String,
    },

    /// The transport failed or closed while the request was in flight.
    #[error("transport failure: {message}")]
    Transport {
        /// Failure detail.
        message: String,
    },

    /// The success continuation of a request failed while handling its payload.
    #[error("result handling failed: {message}")]
    Callback {
        /// Failure detail.
        message: String,
    },

    /// An inbound frame could not be interpreted.
    #[error("protocol violation: {message}")]
    Protocol {
        /// Description of the malformed frame.
        message: String,
    },

    /// The transport did not open within the bounded wait.
    #[error("connection did not open within {timeout_ms}ms")]
    ConnectTimeout {
        /// The configured wait.
        timeout_ms: u64,
    },

    /// The connection URL could not be used.
    #[error("invalid endpoint: {message}")]
    InvalidEndpoint {
        /// Parse failure detail.
        message: String,
    },

    /// A single-result query returned no statement results.
    #[error("query returned no results")]
    EmptyResult,

    /// A statement result carried a non-`OK` status.
    #[error("query failed ({status}): {message}")]
    QueryFailed {
        /// Status reported by the server.
        status: String,
        /// Error text (the result payload when it is a string, else the status).
        message: String,
    },
}

impl ClientError {
    /// Build a handshake failure for a step.
    #[must_use]
    pub fn handshake(step: HandshakeStep, message: impl Into<String>) -> Self {
        Self::Handshake {
            step,
            message: message.into(),
        }
    }

    /// Build a remote operation error.
    #[must_use]
    pub fn remote(message: impl Into<String>) -> Self {
        Self::Remote {
            message: message.into(),
        }
    }

    /// Build a transport failure.
    #[must_use]
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Build a callback fault.
    #[must_use]
    pub fn callback(message: impl Into<String>) -> Self {
        Self::Callback {
            message: message.into(),
        }
    }

    /// Build a protocol violation.
    #[must_use]
    pub fn protocol(message: impl Into<String>) -> Self {
        Self::Protocol {
            message: message.into(),
        }
    }

    /// Re-frame an error raised during a handshake step as a handshake failure.
    ///
    /// Errors that already are handshake failures keep their original step.
    #[must_use]
    pub fn into_handshake(self, step: HandshakeStep) -> Self {
        match self {
            Self::Handshake { .. } => self,
            Self::Remote { message }
            | Self::Transport { message }
            | Self::Callback { message }
            | Self::Protocol { message } => Self::Handshake { step, message },
            other => Self::Handshake {
                step,
                message: other.to_string(),
            },
        }
    }
}

impl From<serde_json::Error> for ClientError {
    fn from(err: serde_json::Error) -> Self {
        Self::callback(err.to_string())
    }
}

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
