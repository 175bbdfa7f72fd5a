//! Correlation identifiers.
//!
//! A [`CorrelationId`] pairs one outbound request with its eventual inbound
//! response. IDs are slot indices in the request table: they are dense, start at
//! zero, and are reused once the request owning them has resolved.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Integer tag pairing an outbound request with its response.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CorrelationId(u64);

impl CorrelationId {
    /// Create from a raw integer.
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Raw integer value as sent on the wire.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// Create from a slot index.
    #[must_use]
    pub fn from_slot(index: usize) -> Self {
        Self(index as u64)
    }

    /// Slot index this ID refers to, if it fits the platform's address space.
    #[must_use]
    pub fn slot(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }
}

impl fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for CorrelationId {
    fn from(raw: u64) -> Self {
        Self(raw)
    }
}
