//! Completion continuations for in-flight requests.
//!
//! Every submitted operation carries exactly one [`Completion`]. The engine
//! guarantees it is resolved exactly once: with the response payload, with a
//! remote/transport/handshake error, or (when the success path itself fails)
//! with the resulting callback fault.

use std::any::Any;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::pin::Pin;
use std::task::{Context, Poll};

use serde_json::Value;
use tokio::sync::oneshot;
use tracing::{debug, warn};
use wsrpc_core::{ClientError, Result};

/// Outcome delivered to a completion.
pub type Outcome = Result<Value>;

/// Continuation invoked when a request settles.
pub trait Completion: Send + 'static {
    /// Receive the outcome of one request.
    ///
    /// Returning `Err` while handling an `Ok` outcome is a callback fault; the
    /// engine redelivers that error to this same completion as a failure.
    fn complete(&mut self, outcome: Outcome) -> Result<()>;
}

impl<F> Completion for F
where
    F: FnMut(Outcome) -> Result<()> + Send + 'static,
{
    fn complete(&mut self, outcome: Outcome) -> Result<()> {
        self(outcome)
    }
}

/// Resolve a completion, converting a failing success path into a failure.
///
/// A panicking handler counts as a failing one and never unwinds into the caller.
pub(crate) fn deliver(mut completion: Box<dyn Completion>, outcome: Outcome) {
    let succeeded = outcome.is_ok();
    match guarded(completion.as_mut(), outcome) {
        Ok(()) => {}
        Err(fault) if succeeded => {
            warn!(error = %fault, "result handler failed, delivering as failure");
            if let Err(err) = guarded(completion.as_mut(), Err(fault)) {
                debug!(error = %err, "failure handler returned an error, ignoring");
            }
        }
        Err(err) => debug!(error = %err, "failure handler returned an error, ignoring"),
    }
}

fn guarded(completion: &mut dyn Completion, outcome: Outcome) -> Result<()> {
    catch_unwind(AssertUnwindSafe(|| completion.complete(outcome)))
        .unwrap_or_else(|panic| Err(ClientError::callback(panic_message(&*panic))))
}

/// Text of a caught panic payload.
pub(crate) fn panic_message(panic: &(dyn Any + Send)) -> String {
    let text = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    format!("handler panicked: {text}")
}

// ─────────────────────────────────────────────────────────────────────────────
// Future-backed completion
// ─────────────────────────────────────────────────────────────────────────────

/// Completion that decodes the payload and hands the result to a [`ResponseFuture`].
pub struct Reply<T> {
    tx: Option<oneshot::Sender<Result<T>>>,
    decode: fn(Value) -> Result<T>,
}

impl<T: Send + 'static> Reply<T> {
    fn send(&mut self, result: Result<T>) {
        if let Some(tx) = self.tx.take() {
            // Receiver gone means the caller stopped waiting.
            let _ = tx.send(result);
        }
    }
}

impl<T: Send + 'static> Completion for Reply<T> {
    fn complete(&mut self, outcome: Outcome) -> Result<()> {
        match outcome {
            Ok(payload) => {
                let value = (self.decode)(payload)?;
                self.send(Ok(value));
            }
            Err(err) => self.send(Err(err)),
        }
        Ok(())
    }
}

/// Build a completion and the future that observes it.
pub fn reply<T: Send + 'static>(decode: fn(Value) -> Result<T>) -> (Reply<T>, ResponseFuture<T>) {
    let (tx, rx) = oneshot::channel();
    (
        Reply {
            tx: Some(tx),
            decode,
        },
        ResponseFuture { rx },
    )
}

/// Future resolving to the outcome of one submitted operation.
#[must_use = "the response is lost if the future is dropped"]
pub struct ResponseFuture<T> {
    rx: oneshot::Receiver<Result<T>>,
}

impl<T> Future for ResponseFuture<T> {
    type Output = Result<T>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx).poll(cx).map(|received| {
            received.unwrap_or_else(|_| {
                Err(ClientError::transport(
                    "request dropped before it completed",
                ))
            })
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
