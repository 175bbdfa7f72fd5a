//! Push event routing.
//!
//! Handlers register either for one subject id (scoped, at most one per id) or
//! for every event (global, unordered set keyed by handler identity). Each
//! inbound [`PushEvent`] reaches the scoped handler for its subject first, then
//! every global handler. A handler that fails or panics is told so through
//! [`PushHandler::on_error`]; other handlers still receive the event.
//!
//! Handlers are snapshotted under the registry locks and invoked after release,
//! so a handler may register or unregister handlers while it runs.

use std::collections::HashMap;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{trace, warn};
use wsrpc_core::{ClientError, PushEvent, Result};

use crate::completion::panic_message;

/// Receiver of server push events.
pub trait PushHandler: Send + Sync {
    /// Handle one event.
    fn on_event(&self, event: &PushEvent) -> Result<()>;

    /// Called with the error when [`PushHandler::on_event`] fails.
    fn on_error(&self, error: ClientError) {
        warn!(error = %error, "push handler failed");
    }
}

impl<F> PushHandler for F
where
    F: Fn(&PushEvent) -> Result<()> + Send + Sync,
{
    fn on_event(&self, event: &PushEvent) -> Result<()> {
        self(event)
    }
}

/// Shared handle to a registered handler. Identity is the allocation.
pub type PushHandlerRef = Arc<dyn PushHandler>;

/// Whether two handles refer to the same handler.
pub fn same_handler(a: &PushHandlerRef, b: &PushHandlerRef) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(a), Arc::as_ptr(b))
}

/// Handler forwarding events into an unbounded channel.
struct ChannelHandler {
    tx: mpsc::UnboundedSender<PushEvent>,
}

impl PushHandler for ChannelHandler {
    fn on_event(&self, event: &PushEvent) -> Result<()> {
        self.tx
            .send(event.clone())
            .map_err(|_| ClientError::callback("push receiver dropped"))
    }

    fn on_error(&self, error: ClientError) {
        trace!(error = %error, "channel handler has no receiver");
    }
}

/// Create a handler that forwards every event it receives into a channel.
pub fn channel_handler() -> (PushHandlerRef, mpsc::UnboundedReceiver<PushEvent>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Arc::new(ChannelHandler { tx }), rx)
}

// ─────────────────────────────────────────────────────────────────────────────
// PushDispatcher
// ─────────────────────────────────────────────────────────────────────────────

/// Registry of scoped and global push handlers.
#[derive(Default)]
pub struct PushDispatcher {
    scoped: Mutex<HashMap<String, PushHandlerRef>>,
    global: Mutex<Vec<PushHandlerRef>>,
}

impl PushDispatcher {
    /// Create an empty dispatcher.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler for every event. Returns `false` if it was already registered.
    pub fn register_global(&self, handler: PushHandlerRef) -> bool {
        let mut global = self.global.lock();
        if global.iter().any(|h| same_handler(h, &handler)) {
            return false;
        }
        global.push(handler);
        true
    }

    /// Remove a global handler. Returns `false` if it was not registered.
    pub fn unregister_global(&self, handler: &PushHandlerRef) -> bool {
        let mut global = self.global.lock();
        let before = global.len();
        global.retain(|h| !same_handler(h, handler));
        global.len() != before
    }

    /// Set the handler for one subject id, returning the one it replaces.
    pub fn register_scoped(
        &self,
        subject_id: impl Into<String>,
        handler: PushHandlerRef,
    ) -> Option<PushHandlerRef> {
        self.scoped.lock().insert(subject_id.into(), handler)
    }

    /// Remove the handler for one subject id.
    pub fn unregister_scoped(&self, subject_id: &str) -> Option<PushHandlerRef> {
        self.scoped.lock().remove(subject_id)
    }

    /// Remove a handler from the global set and from every subject it serves.
    ///
    /// Returns the number of registrations removed.
    pub fn unregister_handler(&self, handler: &PushHandlerRef) -> usize {
        let mut removed = usize::from(self.unregister_global(handler));
        let mut scoped = self.scoped.lock();
        let before = scoped.len();
        scoped.retain(|_, h| !same_handler(h, handler));
        removed += before - scoped.len();
        removed
    }

    /// Deliver an event to its scoped handler, then to every global handler.
    ///
    /// Returns how many handlers were invoked.
    pub fn dispatch(&self, event: &PushEvent) -> usize {
        let scoped = self.scoped.lock().get(&event.subject_id).cloned();
        let global: Vec<PushHandlerRef> = self.global.lock().clone();

        let mut invoked = 0;
        for handler in scoped.iter().chain(global.iter()) {
            let handled = catch_unwind(AssertUnwindSafe(|| handler.on_event(event)))
                .unwrap_or_else(|panic| Err(ClientError::callback(panic_message(&*panic))));
            if let Err(err) = handled {
                if catch_unwind(AssertUnwindSafe(|| handler.on_error(err))).is_err() {
                    warn!(subject = %event.subject_id, "push error handler panicked");
                }
            }
            invoked += 1;
        }
        if invoked == 0 {
            trace!(subject = %event.subject_id, "no handler for push event");
        }
        invoked
    }

    /// Number of scoped registrations.
    pub fn scoped_count(&self) -> usize {
        self.scoped.lock().len()
    }

    /// Number of global registrations.
    pub fn global_count(&self) -> usize {
        self.global.lock().len()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
