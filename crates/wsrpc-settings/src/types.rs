//! Client settings.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::errors::{Result, SettingsError};

/// Tunables for one client connection.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClientSettings {
    /// How long `connect` waits for the transport to open.
    pub connect_timeout_ms: u64,
    /// How long the HTTP credential exchange may take.
    pub signin_timeout_ms: u64,
    /// WebSocket subprotocol requested on upgrade.
    pub subprotocol: String,
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_level: String,
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            connect_timeout_ms: 5_000,
            signin_timeout_ms: 10_000,
            subprotocol: "json".to_string(),
            log_level: "warn".to_string(),
        }
    }
}

impl ClientSettings {
    /// Connect timeout as a [`Duration`].
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    /// Sign-in timeout as a [`Duration`].
    pub fn signin_timeout(&self) -> Duration {
        Duration::from_millis(self.signin_timeout_ms)
    }

    /// Reject values no connection can work with.
    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue("connectTimeoutMs must be positive".into()));
        }
        if self.signin_timeout_ms == 0 {
            return Err(SettingsError::InvalidValue("signinTimeoutMs must be positive".into()));
        }
        if self.subprotocol.chars().any(|c| c.is_whitespace() || c == ',') {
            return Err(SettingsError::InvalidValue(format!(
                "subprotocol {:?} is not a single token",
                self.subprotocol
            )));
        }
        Ok(())
    }
}
