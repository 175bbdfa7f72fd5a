//! Readiness gate for user operations.
//!
//! Until the handshake reaches [`ConnectionState::Ready`], user operations are
//! buffered in FIFO order. Opening the gate replays the buffer under the gate
//! lock, so an operation submitted concurrently with the transition can never
//! overtake one that was buffered before it. Failing the gate hands the buffer
//! back to the caller for error delivery and rejects every later submission.
//!
//! State changes are published on a [`watch`] channel.

use std::collections::VecDeque;

use parking_lot::Mutex;
use tokio::sync::watch;
use tracing::debug;
use wsrpc_core::{ClientError, ConnectionState, Operation};

use crate::completion::Completion;

/// An operation waiting for the gate to open.
pub(crate) struct BufferedOperation {
    pub(crate) operation: Operation,
    pub(crate) completion: Box<dyn Completion>,
}

/// Decision for one submitted operation.
pub(crate) enum Admission {
    /// The gate is open; send now.
    Forward(BufferedOperation),
    /// Held until the gate opens or fails.
    Buffered,
    /// The gate failed; resolve with this error.
    Rejected(Box<dyn Completion>, ClientError),
}

struct Gate {
    state: ConnectionState,
    buffer: VecDeque<BufferedOperation>,
    failure: Option<ClientError>,
}

/// FIFO buffer of operations guarded by the connection state.
pub struct OperationQueue {
    gate: Mutex<Gate>,
    state_tx: watch::Sender<ConnectionState>,
}

impl Default for OperationQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl OperationQueue {
    /// Create a closed gate in [`ConnectionState::Connecting`].
    pub fn new() -> Self {
        let (state_tx, _) = watch::channel(ConnectionState::Connecting);
        Self {
            gate: Mutex::new(Gate {
                state: ConnectionState::Connecting,
                buffer: VecDeque::new(),
                failure: None,
            }),
            state_tx,
        }
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.gate.lock().state
    }

    /// Observe state changes.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state_tx.subscribe()
    }

    /// The error that failed the gate, if any.
    pub fn failure(&self) -> Option<ClientError> {
        self.gate.lock().failure.clone()
    }

    /// Number of operations waiting for the gate.
    pub fn buffered(&self) -> usize {
        self.gate.lock().buffer.len()
    }

    pub(crate) fn admit(&self, operation: Operation, completion: Box<dyn Completion>) -> Admission {
        let mut gate = self.gate.lock();
        match gate.state {
            ConnectionState::Ready => Admission::Forward(BufferedOperation {
                operation,
                completion,
            }),
            ConnectionState::Failed => {
                let err = gate
                    .failure
                    .clone()
                    .unwrap_or_else(|| ClientError::transport("connection failed"));
                Admission::Rejected(completion, err)
            }
            _ => {
                gate.buffer.push_back(BufferedOperation {
                    operation,
                    completion,
                });
                Admission::Buffered
            }
        }
    }

    /// Move to an intermediate handshake state.
    ///
    /// Returns `false` if the transition would go backwards or leave a terminal state.
    pub fn advance(&self, next: ConnectionState) -> bool {
        if next.is_terminal() {
            return false;
        }
        let mut gate = self.gate.lock();
        if !gate.state.can_advance_to(next) {
            return false;
        }
        gate.state = next;
        drop(gate);
        debug!(state = %next, "connection state advanced");
        let _ = self.state_tx.send_replace(next);
        true
    }

    /// Open the gate, replaying buffered operations through `forward` in FIFO order.
    ///
    /// `forward` runs with the gate lock held and must not submit through this
    /// queue. Returns the number of operations replayed.
    pub(crate) fn open(&self, mut forward: impl FnMut(BufferedOperation)) -> usize {
        let mut gate = self.gate.lock();
        if !gate.state.can_advance_to(ConnectionState::Ready) {
            return 0;
        }
        let mut replayed = 0;
        while let Some(op) = gate.buffer.pop_front() {
            forward(op);
            replayed += 1;
        }
        gate.state = ConnectionState::Ready;
        drop(gate);
        debug!(replayed, "connection ready");
        let _ = self.state_tx.send_replace(ConnectionState::Ready);
        replayed
    }

    /// Fail the gate with `error`, returning the buffered operations in FIFO order.
    pub(crate) fn fail(&self, error: ClientError) -> Vec<BufferedOperation> {
        let mut gate = self.gate.lock();
        if !gate.state.can_advance_to(ConnectionState::Failed) {
            return Vec::new();
        }
        gate.state = ConnectionState::Failed;
        gate.failure = Some(error);
        let drained = gate.buffer.drain(..).collect();
        drop(gate);
        let _ = self.state_tx.send_replace(ConnectionState::Failed);
        drained
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
