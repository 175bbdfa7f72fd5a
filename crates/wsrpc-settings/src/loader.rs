//! Layered settings: compiled defaults, then `settings.json`, then `WSRPC_*`.
//!
//! The file is read from `$WSRPC_SETTINGS` when set, else `~/.wsrpc/settings.json`.
//! Its keys are deep-merged over the defaults; `null` keeps the default. The
//! merged result is validated after environment overrides apply.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::{debug, warn};

use crate::errors::Result;
use crate::types::ClientSettings;

/// Environment variable naming an alternative settings file.
pub const SETTINGS_ENV: &str = "WSRPC_SETTINGS";

/// Where settings are read from.
pub fn settings_path() -> PathBuf {
    if let Some(path) = std::env::var_os(SETTINGS_ENV).filter(|p| !p.is_empty()) {
        return PathBuf::from(path);
    }
    std::env::var_os("HOME")
        .map_or_else(|| PathBuf::from("/tmp"), PathBuf::from)
        .join(".wsrpc")
        .join("settings.json")
}

/// Load settings from [`settings_path`].
pub fn load_settings() -> Result<ClientSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from `path`, then apply `WSRPC_*` overrides and validate.
///
/// A missing file yields defaults; unreadable or invalid JSON is an error.
pub fn load_settings_from_path(path: &Path) -> Result<ClientSettings> {
    let mut layered = serde_json::to_value(ClientSettings::default())?;
    match std::fs::read_to_string(path) {
        Ok(content) => {
            debug!(?path, "merging settings file");
            layered = deep_merge(layered, serde_json::from_str(&content)?);
        }
        Err(e) if e.kind() == ErrorKind::NotFound => debug!(?path, "no settings file"),
        Err(e) => return Err(e.into()),
    }

    let mut settings: ClientSettings = serde_json::from_value(layered)?;
    apply_env_overrides(&mut settings, |name| std::env::var(name).ok());
    settings.validate()?;
    Ok(settings)
}

/// Merge `source` over `target`.
///
/// Objects merge key by key; any other source value replaces the target
/// outright. `null` in the source leaves the target value in place.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut base), Value::Object(overlay)) => {
            for (key, value) in overlay.into_iter().filter(|(_, v)| !v.is_null()) {
                let next = match base.remove(&key) {
                    Some(existing) => deep_merge(existing, value),
                    None => value,
                };
                let _ = base.insert(key, next);
            }
            Value::Object(base)
        }
        (_, source) => source,
    }
}

/// Apply `WSRPC_*` overrides read through `lookup`.
///
/// Invalid values are logged and ignored, keeping the file/default value.
pub fn apply_env_overrides(settings: &mut ClientSettings, lookup: impl Fn(&str) -> Option<String>) {
    if let Some(v) = read_u64(&lookup, "WSRPC_CONNECT_TIMEOUT_MS", 1, 600_000) {
        settings.connect_timeout_ms = v;
    }
    if let Some(v) = read_u64(&lookup, "WSRPC_SIGNIN_TIMEOUT_MS", 1, 600_000) {
        settings.signin_timeout_ms = v;
    }
    if let Some(v) = read_string(&lookup, "WSRPC_SUBPROTOCOL") {
        settings.subprotocol = v;
    }
    if let Some(v) = read_string(&lookup, "WSRPC_LOG_LEVEL") {
        settings.log_level = v;
    }
}

/// Parse a string as a `u64` within an inclusive range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.trim().parse().ok()?;
    (min..=max).contains(&n).then_some(n)
}

fn read_string(lookup: &impl Fn(&str) -> Option<String>, name: &str) -> Option<String> {
    lookup(name).filter(|v| !v.is_empty())
}

fn read_u64(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &str,
    min: u64,
    max: u64,
) -> Option<u64> {
    let val = lookup(name)?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
