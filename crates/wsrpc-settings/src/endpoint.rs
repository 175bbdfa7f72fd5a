//! Connection URL parsing.
//!
//! A connection URL has a `ws` or `wss` scheme, ends with two path segments
//! naming the namespace and database, and carries credentials in its user-info:
//!
//! ```text
//! ws://root:secret@localhost:8000/ns/db        (root credentials)
//! wss://<token>@db.example.com/base/ns/db      (token)
//! ```
//!
//! From it two endpoints are derived, both rooted at the path prefix before the
//! namespace segment: the HTTP sign-in endpoint (`<prefix>/signin`) and the RPC
//! WebSocket endpoint (`<prefix>/rpc`).

use std::fmt;
use std::str::FromStr;

use percent_encoding::percent_decode_str;
use url::Url;

use crate::errors::{Result, SettingsError};

/// Credentials carried in a connection URL.
#[derive(Clone, PartialEq, Eq)]
pub enum Credentials {
    /// Pre-issued token, sent as-is with `authenticate`.
    Token(String),
    /// Root user; exchanged for a token at the sign-in endpoint.
    Root {
        /// Root username.
        username: String,
        /// Root password.
        password: String,
    },
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Token(_) => f.debug_tuple("Token").field(&"<redacted>").finish(),
            Self::Root { username, .. } => f
                .debug_struct("Root")
                .field("username", username)
                .field("password", &"<redacted>")
                .finish(),
        }
    }
}

/// A parsed connection URL.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Endpoint {
    /// Namespace selected after authentication.
    pub namespace: String,
    /// Database selected after authentication.
    pub database: String,
    /// Credentials for the handshake.
    pub credentials: Credentials,
    /// HTTP(S) sign-in endpoint for root credentials.
    pub login_url: Url,
    /// WebSocket RPC endpoint.
    pub rpc_url: Url,
}

impl Endpoint {
    /// Parse a connection URL.
    pub fn parse(input: &str) -> Result<Self> {
        let url = Url::parse(input).map_err(|e| invalid(format!("{input:?}: {e}")))?;

        let http_scheme = match url.scheme() {
            "ws" => "http",
            "wss" => "https",
            other => return Err(invalid(format!("unsupported scheme {other:?}, expected ws or wss"))),
        };

        let mut segments: Vec<&str> = url
            .path_segments()
            .map(Iterator::collect)
            .unwrap_or_default();
        if segments.last() == Some(&"") {
            let _ = segments.pop();
        }
        if segments.len() < 2 {
            return Err(invalid("path must end with namespace and database segments"));
        }
        let (prefix, scope) = segments.split_at(segments.len() - 2);
        let namespace = decode(scope[0])?;
        let database = decode(scope[1])?;
        if namespace.is_empty() || database.is_empty() {
            return Err(invalid("namespace and database must not be empty"));
        }

        let credentials = credentials(&url)?;

        let host = url
            .host_str()
            .ok_or_else(|| invalid("missing host"))?;
        let authority = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host.to_string(),
        };
        let base: String = prefix.iter().map(|s| format!("/{s}")).collect();

        let login_url = Url::parse(&format!("{http_scheme}://{authority}{base}/signin"))
            .map_err(|e| invalid(format!("sign-in endpoint: {e}")))?;
        let rpc_url = Url::parse(&format!("{}://{authority}{base}/rpc", url.scheme()))
            .map_err(|e| invalid(format!("rpc endpoint: {e}")))?;

        Ok(Self {
            namespace,
            database,
            credentials,
            login_url,
            rpc_url,
        })
    }
}

impl FromStr for Endpoint {
    type Err = SettingsError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

fn credentials(url: &Url) -> Result<Credentials> {
    let username = decode(url.username())?;
    let password = url.password().map(decode).transpose()?;

    match password {
        None if username.is_empty() => Err(invalid("credentials must be specified")),
        None => Ok(Credentials::Token(username)),
        Some(_) if username.is_empty() => Err(invalid("username must not be empty")),
        Some(password) if password.contains(':') => Err(invalid(
            "only token and user:pass credentials are supported",
        )),
        Some(password) => Ok(Credentials::Root { username, password }),
    }
}

fn decode(raw: &str) -> Result<String> {
    percent_decode_str(raw)
        .decode_utf8()
        .map(|s| s.into_owned())
        .map_err(|e| invalid(format!("invalid percent-encoding in {raw:?}: {e}")))
}

fn invalid(message: impl Into<String>) -> SettingsError {
    SettingsError::InvalidUrl(message.into())
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
