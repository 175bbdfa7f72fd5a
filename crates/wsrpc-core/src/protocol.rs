//! JSON-RPC wire frames.
//!
//! Outbound, one frame per operation:
//!
//! ```json
//! {"id": 0, "jsonrpc": "2.0", "method": "query", "params": ["SELECT 1", {}]}
//! ```
//!
//! Inbound frames are either responses (top-level `id`) or push events (no `id`,
//! with the event nested under `result`):
//!
//! ```json
//! {"id": 0, "result": [...]}
//! {"id": 0, "error": {"message": "parse error"}}
//! {"result": {"id": "lq-1", "action": "CREATE", "result": {...}}}
//! ```

use serde::Serialize;
use serde_json::Value;

use crate::errors::{ClientError, Result};
use crate::ids::CorrelationId;
use crate::operation::Operation;
use crate::push::PushEvent;

/// JSON-RPC protocol version tag.
pub const JSONRPC_VERSION: &str = "2.0";

/// Outbound request frame.
#[derive(Debug, Serialize)]
pub struct RequestFrame<'a> {
    /// Correlation ID.
    pub id: CorrelationId,
    /// Always `"2.0"`.
    pub jsonrpc: &'static str,
    /// Method name.
    pub method: &'a str,
    /// Positional parameters.
    pub params: &'a [Value],
}

impl<'a> RequestFrame<'a> {
    /// Frame an operation under a correlation ID.
    pub fn new(id: CorrelationId, operation: &'a Operation) -> Self {
        Self {
            id,
            jsonrpc: JSONRPC_VERSION,
            method: &operation.method,
            params: &operation.params,
        }
    }
}

/// Serialize an operation into a text frame.
pub fn encode_request(id: CorrelationId, operation: &Operation) -> Result<String> {
    Ok(serde_json::to_string(&RequestFrame::new(id, operation))?)
}

/// A decoded inbound frame.
#[derive(Clone, Debug, PartialEq)]
pub enum InboundFrame {
    /// Reply to the request holding `id`.
    Response {
        /// Correlation ID echoed by the server.
        id: CorrelationId,
        /// The `result` payload, or the `error` converted to [`ClientError::Remote`].
        outcome: Result<Value>,
    },
    /// Server-initiated live notification.
    Push(PushEvent),
}

/// Decode one inbound text frame.
///
/// Returns [`ClientError::Protocol`] for frames that cannot be routed:
/// malformed JSON, a non-integer `id`, or a push without subject ID/action.
pub fn decode_inbound(text: &str) -> Result<InboundFrame> {
    let mut frame: Value = serde_json::from_str(text)
        .map_err(|e| ClientError::protocol(format!("invalid JSON: {e}")))?;
    let Some(object) = frame.as_object_mut() else {
        return Err(ClientError::protocol("frame is not a JSON object"));
    };

    if let Some(id) = object.remove("id") {
        let id = id
            .as_u64()
            .map(CorrelationId::new)
            .ok_or_else(|| ClientError::protocol(format!("non-integer correlation id: {id}")))?;
        let outcome = match object.remove("error") {
            Some(error) => Err(ClientError::remote(error_message(&error))),
            None => Ok(object.remove("result").unwrap_or(Value::Null)),
        };
        return Ok(InboundFrame::Response { id, outcome });
    }

    let Some(inner) = object.remove("result") else {
        return Err(ClientError::protocol("push frame without result"));
    };
    let event: PushEvent = serde_json::from_value(inner)
        .map_err(|e| ClientError::protocol(format!("malformed push event: {e}")))?;
    Ok(InboundFrame::Push(event))
}

fn error_message(error: &Value) -> String {
    match error.get("message").and_then(Value::as_str) {
        Some(message) => message.to_owned(),
        None => error.to_string(),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
