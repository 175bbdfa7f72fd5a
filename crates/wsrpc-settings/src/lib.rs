//! # wsrpc-settings
//!
//! Client settings and connection URL parsing.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`ClientSettings::default()`]
//! 2. **User file**: `~/.wsrpc/settings.json` (deep-merged over defaults)
//! 3. **Environment variables**: `WSRPC_*` overrides (highest priority)
//!
//! Connection targets are `ws://` / `wss://` URLs whose last two path segments
//! name the namespace and database and whose user-info carries the credentials;
//! see [`Endpoint`].

#![deny(unsafe_code)]

pub mod endpoint;
pub mod errors;
pub mod loader;
pub mod types;

pub use endpoint::{Credentials, Endpoint};
pub use errors::{Result, SettingsError};
pub use loader::{SETTINGS_ENV, deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::ClientSettings;
