//! Server-initiated push events.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A live notification emitted by the server without a correlation ID.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PushEvent {
    /// Live query ID the event belongs to.
    #[serde(rename = "id")]
    pub subject_id: String,
    /// Action reported by the server (`CREATE`, `UPDATE`, `DELETE`, ...).
    pub action: String,
    /// Event data.
    #[serde(rename = "result", default)]
    pub payload: Value,
}

impl PushEvent {
    /// Create an event.
    pub fn new(subject_id: impl Into<String>, action: impl Into<String>, payload: Value) -> Self {
        Self {
            subject_id: subject_id.into(),
            action: action.into(),
            payload,
        }
    }

    /// Whether this event belongs to the given live query.
    pub fn is_for(&self, subject_id: &str) -> bool {
        self.subject_id == subject_id
    }
}
