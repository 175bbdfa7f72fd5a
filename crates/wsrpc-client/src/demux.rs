//! Inbound frame demultiplexer.
//!
//! A single reader task consumes transport events in arrival order. Responses go
//! to the request table, pushes to the push dispatcher. A transport error fails
//! every pending request and keeps reading; a close also shuts the outbound side
//! so later submissions fail instead of vanishing.
//!
//! The task holds only a weak reference and stops once the client is gone.
//! Should routing itself panic, the connection is closed rather than left with
//! requests nobody will answer.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Weak;

use tokio::sync::mpsc;
use tracing::{debug, error, info, trace, warn};
use wsrpc_core::logging::FRAMES_TARGET;
use wsrpc_core::protocol::{InboundFrame, decode_inbound};
use wsrpc_core::ClientError;

use crate::client::Shared;
use crate::completion::panic_message;
use crate::push::PushDispatcher;
use crate::request_table::RequestTable;
use crate::transport::TransportEvent;

pub(crate) async fn run(shared: Weak<Shared>, mut inbound: mpsc::UnboundedReceiver<TransportEvent>) {
    while let Some(event) = inbound.recv().await {
        let Some(shared) = shared.upgrade() else {
            debug!("client dropped, stopping reader");
            return;
        };
        match event {
            TransportEvent::Open => debug!("transport open"),
            TransportEvent::Message(text) => {
                let routed = catch_unwind(AssertUnwindSafe(|| {
                    route_frame(&text, &shared.requests, &shared.push);
                }));
                if let Err(panic) = routed {
                    error!(reason = %panic_message(&*panic), "frame routing failed, closing connection");
                    closed(&shared, "reader failed".to_string());
                    return;
                }
            }
            TransportEvent::Error(message) => {
                let error = ClientError::transport(message);
                let failed = shared.requests.fail_all(&error);
                warn!(error = %error, failed, "transport error");
            }
            TransportEvent::Close { code, reason } => {
                let message = if reason.is_empty() {
                    format!("connection closed ({code})")
                } else {
                    format!("connection closed ({code}): {reason}")
                };
                closed(&shared, message);
                return;
            }
        }
    }
    if let Some(shared) = shared.upgrade() {
        closed(&shared, "connection closed".to_string());
    }
}

fn closed(shared: &Shared, message: String) {
    let _ = shared.shutdown();
    let error = ClientError::transport(message);
    let failed = shared.requests.fail_all(&error);
    info!(reason = %error, failed, "transport closed");
}

/// Route one inbound text frame.
pub(crate) fn route_frame(text: &str, requests: &RequestTable, push: &PushDispatcher) {
    trace!(target: FRAMES_TARGET, frame = text, "<<");
    match decode_inbound(text) {
        Ok(InboundFrame::Response { id, outcome }) => {
            let _ = requests.resolve(id, outcome);
        }
        Ok(InboundFrame::Push(event)) => {
            let _ = push.dispatch(&event);
        }
        Err(err) => warn!(error = %err, "dropping undecodable frame"),
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
