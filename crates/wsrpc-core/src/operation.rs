//! Outgoing operations.

use serde_json::Value;

/// Method name used for queries.
pub const QUERY: &str = "query";
/// Method name for token authentication.
pub const AUTHENTICATE: &str = "authenticate";
/// Method name for namespace/database selection.
pub const USE: &str = "use";

/// A named remote operation with positional parameters.
#[derive(Clone, Debug, PartialEq)]
pub struct Operation {
    /// Method name (e.g. `query`, `authenticate`).
    pub method: String,
    /// Positional parameters.
    pub params: Vec<Value>,
}

impl Operation {
    /// Create an operation.
    pub fn new(method: impl Into<String>, params: Vec<Value>) -> Self {
        Self {
            method: method.into(),
            params,
        }
    }

    /// `authenticate` carrying a bootstrap token.
    pub fn authenticate(token: impl Into<String>) -> Self {
        Self::new(AUTHENTICATE, vec![Value::String(token.into())])
    }

    /// `use` selecting a namespace and database.
    pub fn use_scope(namespace: impl Into<String>, database: impl Into<String>) -> Self {
        Self::new(
            USE,
            vec![
                Value::String(namespace.into()),
                Value::String(database.into()),
            ],
        )
    }
}
