//! # wsrpc-client
//!
//! Correlated JSON-RPC over a WebSocket, with a gated bootstrap handshake.
//!
//! - **Request table**: [`RequestTable`] assigns dense, reusable correlation ids
//! - **Push routing**: [`PushDispatcher`] fans server pushes out to scoped and global handlers
//! - **Readiness gate**: [`OperationQueue`] buffers operations until `authenticate` and `use` succeed
//! - **Transports**: [`Connector`] seam with WebSocket and in-memory implementations
//! - **Credential exchange**: [`signin`] trades root credentials for a token over HTTP
//! - **Facade**: [`Client`] composes all of the above

#![deny(unsafe_code)]

pub mod client;
pub mod completion;
mod demux;
mod handshake;
pub mod push;
pub mod queue;
pub mod request_table;
pub mod signin;
pub mod transport;

pub use client::Client;
pub use completion::{Completion, Outcome, ResponseFuture};
pub use push::{PushDispatcher, PushHandler, PushHandlerRef};
pub use queue::OperationQueue;
pub use request_table::{Lease, RequestTable};
pub use signin::signin;
pub use transport::{Connector, TransportChannel, TransportError, TransportEvent};

pub use wsrpc_core::{
    ClientError, ConnectionState, CorrelationId, HandshakeStep, Operation, PushEvent, Query,
    QueryResponse, Result,
};
pub use wsrpc_settings::{ClientSettings, Credentials, Endpoint};
