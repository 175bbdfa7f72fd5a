//! Queries and their decoded results.
//!
//! A `query` call carries the statement text and a map of named variables. The
//! server replies with one result object per statement:
//!
//! ```json
//! [{"status": "OK", "time": "1.2ms", "result": [...]}, ...]
//! ```

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::{ClientError, Result};
use crate::operation::{Operation, QUERY};

/// A query statement. Reference variables with `$name`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Query {
    /// Statement text.
    pub sql: String,
    /// Named variables.
    pub vars: Map<String, Value>,
}

impl Query {
    /// Create a query without variables.
    pub fn new(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            vars: Map::new(),
        }
    }

    /// Bind a variable. Rebinding a name replaces its value.
    #[must_use]
    pub fn bind(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        let _ = self.vars.insert(name.into(), value.into());
        self
    }

    /// Encode as a `query` operation with params `[sql, vars]`.
    pub fn into_operation(self) -> Operation {
        Operation::new(QUERY, vec![Value::String(self.sql), Value::Object(self.vars)])
    }
}

/// Result of one statement in a query.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct QueryResponse {
    /// `OK` when the statement succeeded.
    pub status: String,
    /// Execution time as reported by the server.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
    /// Statement output, or the error text when the statement failed.
    #[serde(default)]
    pub result: Value,
}

impl QueryResponse {
    /// Whether the statement succeeded.
    pub fn is_ok(&self) -> bool {
        self.status == "OK"
    }

    /// Return `self` if the statement succeeded, else a [`ClientError::QueryFailed`].
    pub fn ok(self) -> Result<Self> {
        if self.is_ok() {
            return Ok(self);
        }
        let message = match &self.result {
            Value::String(s) => s.clone(),
            _ => self.status.clone(),
        };
        Err(ClientError::QueryFailed {
            status: self.status,
            message,
        })
    }
}

/// Decode a `query` reply into one response per statement.
///
/// An array yields one response per element; any other value is treated as a
/// single statement result.
pub fn decode_responses(payload: Value) -> Result<Vec<QueryResponse>> {
    let items = match payload {
        Value::Array(items) => items,
        other => vec![other],
    };
    items
        .into_iter()
        .map(|item| serde_json::from_value(item).map_err(ClientError::from))
        .collect()
}

/// Decode a `query` reply keeping only the last statement result.
pub fn decode_last_response(payload: Value) -> Result<QueryResponse> {
    decode_responses(payload)?
        .pop()
        .ok_or(ClientError::EmptyResult)
}
