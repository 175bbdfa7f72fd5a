//! # wsrpc-core
//!
//! Foundation types, wire frames, and errors for the wsrpc client.
//!
//! This crate provides the shared vocabulary that the settings and client crates depend on:
//!
//! - **Correlation IDs**: [`CorrelationId`] newtype for in-flight request slots
//! - **Operations**: [`Operation`] (method name + positional params) and [`Query`]
//! - **Results**: [`QueryResponse`] decoded from a `query` reply
//! - **Push events**: [`PushEvent`] for server-initiated live notifications
//! - **Connection state**: [`ConnectionState`] lifecycle of the bootstrap handshake
//! - **Wire frames**: [`protocol`] encode/decode for JSON-RPC text frames
//! - **Errors**: [`ClientError`] taxonomy via `thiserror`

#![deny(unsafe_code)]

pub mod errors;
pub mod ids;
pub mod logging;
pub mod operation;
pub mod protocol;
pub mod push;
pub mod query;
pub mod state;

pub use errors::{ClientError, HandshakeStep, Result};
pub use ids::CorrelationId;
pub use operation::Operation;
pub use push::PushEvent;
pub use query::{Query, QueryResponse};
pub use state::ConnectionState;
