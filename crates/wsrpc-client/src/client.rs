//! The caller-facing client.
//!
//! [`Client`] owns one transport channel and composes the request table, push
//! dispatcher, operation queue, and handshake. Construction waits (bounded) for
//! the transport to open, spawns the inbound reader and the handshake, and
//! returns immediately; operations submitted before the handshake completes are
//! buffered and replayed in order.

use std::sync::Arc;

use parking_lot::Mutex;
use serde_json::Value;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, instrument, trace, warn};
use wsrpc_core::logging::FRAMES_TARGET;
use wsrpc_core::protocol::encode_request;
use wsrpc_core::query::{decode_last_response, decode_responses};
use wsrpc_core::{
    ClientError, ConnectionState, CorrelationId, Operation, PushEvent, Query, QueryResponse, Result,
};
use wsrpc_settings::{ClientSettings, Endpoint, load_settings};

use crate::completion::{Completion, ResponseFuture, deliver, reply};
use crate::demux;
use crate::handshake::Handshake;
use crate::push::{PushDispatcher, PushHandlerRef, channel_handler};
use crate::queue::{Admission, OperationQueue};
use crate::request_table::RequestTable;
use crate::transport::{Connector, TransportChannel, WsConnector};

// ─────────────────────────────────────────────────────────────────────────────
// Shared engine state
// ─────────────────────────────────────────────────────────────────────────────

/// An operation that could not be written, with the completion still owed a result.
pub(crate) struct Unsent {
    completion: Box<dyn Completion>,
    error: ClientError,
}

impl Unsent {
    fn fail(self) {
        deliver(self.completion, Err(self.error));
    }
}

/// State shared by the facade, the reader task, and the handshake task.
pub(crate) struct Shared {
    outbound: Mutex<Option<mpsc::UnboundedSender<String>>>,
    pub(crate) requests: RequestTable,
    pub(crate) push: PushDispatcher,
    pub(crate) queue: OperationQueue,
}

impl Shared {
    pub(crate) fn new(outbound: mpsc::UnboundedSender<String>) -> Self {
        Self {
            outbound: Mutex::new(Some(outbound)),
            requests: RequestTable::new(),
            push: PushDispatcher::new(),
            queue: OperationQueue::new(),
        }
    }

    /// Submit through the readiness gate.
    pub(crate) fn submit(&self, operation: Operation, completion: Box<dyn Completion>) {
        match self.queue.admit(operation, completion) {
            Admission::Forward(op) => self.send_or_fail(&op.operation, op.completion),
            Admission::Buffered => trace!("operation buffered until ready"),
            Admission::Rejected(completion, err) => deliver(completion, Err(err)),
        }
    }

    /// Allocate an id and write the request, bypassing the gate.
    pub(crate) fn send(
        &self,
        operation: &Operation,
        completion: Box<dyn Completion>,
    ) -> std::result::Result<CorrelationId, Unsent> {
        let lease = self.requests.lease(completion);
        let written = encode_request(lease.id, operation).and_then(|frame| self.write(frame));
        match written {
            Ok(()) => Ok(lease.id),
            // A concurrent transport failure may already have resolved the slot,
            // and the id may since belong to someone else.
            Err(error) => match self.requests.reclaim(lease) {
                Some(completion) => Err(Unsent { completion, error }),
                None => Ok(lease.id),
            },
        }
    }

    pub(crate) fn send_or_fail(&self, operation: &Operation, completion: Box<dyn Completion>) {
        if let Err(unsent) = self.send(operation, completion) {
            unsent.fail();
        }
    }

    /// Send a raw operation outside the gate and await its payload.
    pub(crate) fn call_ungated(&self, operation: &Operation) -> ResponseFuture<Value> {
        let (completion, response) = reply(Ok);
        self.send_or_fail(operation, Box::new(completion));
        response
    }

    fn write(&self, frame: String) -> Result<()> {
        trace!(target: FRAMES_TARGET, frame = %frame, ">>");
        let outbound = self.outbound.lock();
        let Some(tx) = outbound.as_ref() else {
            return Err(ClientError::transport("connection closed"));
        };
        tx.send(frame)
            .map_err(|_| ClientError::transport("connection closed"))
    }

    /// Open the gate and replay buffered operations.
    pub(crate) fn open_gate(&self) {
        let mut unsent = Vec::new();
        let replayed = self.queue.open(|op| {
            if let Err(u) = self.send(&op.operation, op.completion) {
                unsent.push(u);
            }
        });
        for u in unsent {
            u.fail();
        }
        info!(replayed, "connection ready");
    }

    /// Fail the gate and every operation buffered behind it, in submission order.
    pub(crate) fn fail_gate(&self, error: &ClientError) {
        warn!(error = %error, "handshake failed");
        for op in self.queue.fail(error.clone()) {
            deliver(op.completion, Err(error.clone()));
        }
    }

    /// Drop the outbound channel, asking the transport to close.
    pub(crate) fn shutdown(&self) -> bool {
        self.outbound.lock().take().is_some()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Client
// ─────────────────────────────────────────────────────────────────────────────

/// A connection to an RPC endpoint.
pub struct Client {
    shared: Arc<Shared>,
    reader: Option<JoinHandle<()>>,
}

impl Client {
    /// Connect to a connection URL over WebSocket.
    pub async fn connect(url: &str, settings: &ClientSettings) -> Result<Self> {
        let endpoint = Endpoint::parse(url).map_err(|e| ClientError::InvalidEndpoint {
            message: e.to_string(),
        })?;
        Self::connect_endpoint(endpoint, settings).await
    }

    /// Connect with settings loaded from `~/.wsrpc/settings.json` and `WSRPC_*`.
    ///
    /// An unreadable settings file is logged and replaced by defaults.
    pub async fn connect_default(url: &str) -> Result<Self> {
        let settings = load_settings().unwrap_or_else(|e| {
            warn!(error = %e, "invalid client settings, using defaults");
            ClientSettings::default()
        });
        Self::connect(url, &settings).await
    }

    /// Connect to a parsed endpoint over WebSocket.
    pub async fn connect_endpoint(endpoint: Endpoint, settings: &ClientSettings) -> Result<Self> {
        let connector = if settings.subprotocol.is_empty() {
            WsConnector::without_subprotocol()
        } else {
            WsConnector::new(settings.subprotocol.clone())
        };
        Self::connect_with(&connector, endpoint, settings).await
    }

    /// Connect through an arbitrary transport.
    ///
    /// Waits up to `connectTimeoutMs` for the channel to open. The handshake runs
    /// in the background; use [`Client::ready`] to wait for it.
    #[instrument(skip_all, fields(url = %endpoint.rpc_url))]
    pub async fn connect_with(
        connector: &dyn Connector,
        endpoint: Endpoint,
        settings: &ClientSettings,
    ) -> Result<Self> {
        let handshake = Handshake::new(&endpoint, settings)?;

        let TransportChannel { outbound, inbound } =
            tokio::time::timeout(settings.connect_timeout(), connector.connect(&endpoint.rpc_url))
                .await
                .map_err(|_| ClientError::ConnectTimeout {
                    timeout_ms: settings.connect_timeout_ms,
                })??;
        debug!("transport connected");

        let shared = Arc::new(Shared::new(outbound));
        let reader = tokio::spawn(demux::run(Arc::downgrade(&shared), inbound));
        drop(tokio::spawn(handshake.run(Arc::clone(&shared))));

        Ok(Self {
            shared,
            reader: Some(reader),
        })
    }

    // ── Submission ──────────────────────────────────────────────────────

    /// Submit an operation with a completion callback.
    ///
    /// Never blocks. The completion runs exactly once, on the reader task or on
    /// the caller's task when the outcome is known immediately.
    pub fn submit(&self, operation: Operation, completion: impl Completion) {
        self.shared.submit(operation, Box::new(completion));
    }

    /// Call `method` with positional `params`, resolving to the raw result.
    pub fn call(&self, method: impl Into<String>, params: Vec<Value>) -> ResponseFuture<Value> {
        let (completion, response) = reply(Ok);
        self.submit(Operation::new(method, params), completion);
        response
    }

    /// Run a query, resolving to one response per statement.
    pub fn query(&self, query: Query) -> ResponseFuture<Vec<QueryResponse>> {
        let (completion, response) = reply(decode_responses);
        self.submit(query.into_operation(), completion);
        response
    }

    /// Run a query, resolving to the last statement's response.
    pub fn query_single(&self, query: Query) -> ResponseFuture<QueryResponse> {
        let (completion, response) = reply(decode_last_response);
        self.submit(query.into_operation(), completion);
        response
    }

    // ── Live subscriptions ──────────────────────────────────────────────

    /// Receive every push event.
    pub fn on_live(&self, handler: PushHandlerRef) -> bool {
        self.shared.push.register_global(handler)
    }

    /// Receive push events for one live query id, replacing any previous handler.
    pub fn on_live_id(
        &self,
        id: impl Into<String>,
        handler: PushHandlerRef,
    ) -> Option<PushHandlerRef> {
        self.shared.push.register_scoped(id, handler)
    }

    /// Remove a handler from every registration it holds.
    pub fn off_live(&self, handler: &PushHandlerRef) -> usize {
        self.shared.push.unregister_handler(handler)
    }

    /// Remove the handler for one live query id.
    pub fn off_live_id(&self, id: &str) -> Option<PushHandlerRef> {
        self.shared.push.unregister_scoped(id)
    }

    /// Register a global handler feeding a channel and return both ends.
    pub fn live_channel(&self) -> (PushHandlerRef, mpsc::UnboundedReceiver<PushEvent>) {
        let (handler, events) = channel_handler();
        let _ = self.on_live(Arc::clone(&handler));
        (handler, events)
    }

    // ── Lifecycle ───────────────────────────────────────────────────────

    /// Current connection state.
    pub fn state(&self) -> ConnectionState {
        self.shared.queue.state()
    }

    /// Observe connection state changes.
    pub fn subscribe_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.queue.subscribe()
    }

    /// Wait until the handshake finishes.
    pub async fn ready(&self) -> Result<()> {
        let mut states = self.subscribe_state();
        let state = *states
            .wait_for(|s| s.is_terminal())
            .await
            .map_err(|_| ClientError::transport("connection state unavailable"))?;
        match state {
            ConnectionState::Ready => Ok(()),
            _ => Err(self
                .shared
                .queue
                .failure()
                .unwrap_or_else(|| ClientError::transport("connection failed"))),
        }
    }

    /// Number of requests awaiting a response.
    pub fn in_flight(&self) -> usize {
        self.shared.requests.in_flight()
    }

    /// Close the transport and wait for the reader to drain.
    pub async fn close(mut self) {
        let _ = self.shared.shutdown();
        if let Some(reader) = self.reader.take() {
            if let Err(e) = reader.await {
                warn!(error = %e, "reader task ended abnormally");
            }
        }
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        if self.shared.shutdown() {
            debug!("client dropped, closing transport");
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::completion::Outcome;
    use crate::transport::{MemoryConnector, MemoryServer, memory_transport};
    use serde_json::json;
    use std::time::Duration;
    use wsrpc_core::HandshakeStep;

    const TIMEOUT: Duration = Duration::from_secs(5);

    fn endpoint() -> Endpoint {
        Endpoint::parse("ws://tok@memory/ns/db").unwrap()
    }

    async fn connected() -> (Client, MemoryServer) {
        let (connector, server) = memory_transport();
        let client = Client::connect_with(&connector, endpoint(), &ClientSettings::default())
            .await
            .unwrap();
        (client, server)
    }

    async fn ready() -> (Client, MemoryServer) {
        let (client, mut server) = connected().await;
        let _ = server.accept_handshake().await.unwrap();
        tokio::time::timeout(TIMEOUT, client.ready())
            .await
            .unwrap()
            .unwrap();
        (client, server)
    }

    async fn next(server: &mut MemoryServer) -> Value {
        tokio::time::timeout(TIMEOUT, server.recv_json())
            .await
            .expect("timed out waiting for frame")
            .expect("client closed")
    }

    #[tokio::test]
    async fn handshake_sends_authenticate_then_use() {
        let (client, mut server) = connected().await;
        let (auth, scope) = server.accept_handshake().await.unwrap();

        assert_eq!(auth["method"], "authenticate");
        assert_eq!(auth["params"], json!(["tok"]));
        assert_eq!(auth["jsonrpc"], "2.0");
        assert_eq!(scope["method"], "use");
        assert_eq!(scope["params"], json!(["ns", "db"]));

        client.ready().await.unwrap();
        assert_eq!(client.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn nothing_reaches_the_wire_before_ready() {
        let (client, mut server) = connected().await;
        let pending = client.call("ping", vec![]);

        let auth = next(&mut server).await;
        assert_eq!(auth["method"], "authenticate");
        assert!(server.try_recv_json().is_none());

        let _ = server.reply(auth["id"].as_u64().unwrap(), Value::Null);
        let scope = next(&mut server).await;
        assert_eq!(scope["method"], "use");
        assert!(server.try_recv_json().is_none());

        let _ = server.reply(scope["id"].as_u64().unwrap(), Value::Null);
        let ping = next(&mut server).await;
        assert_eq!(ping["method"], "ping");

        let _ = server.reply(ping["id"].as_u64().unwrap(), json!("pong"));
        assert_eq!(pending.await.unwrap(), json!("pong"));
    }

    #[tokio::test]
    async fn buffered_operations_replay_in_order() {
        let (client, mut server) = connected().await;
        let a = client.call("a", vec![]);
        let b = client.call("b", vec![]);
        let c = client.call("c", vec![]);

        let _ = server.accept_handshake().await.unwrap();
        let mut ids = Vec::new();
        for expected in ["a", "b", "c"] {
            let frame = next(&mut server).await;
            assert_eq!(frame["method"], expected);
            ids.push(frame["id"].as_u64().unwrap());
        }

        let _ = server.reply(ids[1], json!("B"));
        let _ = server.reply(ids[0], json!("A"));
        let _ = server.reply(ids[2], json!("C"));
        assert_eq!(a.await.unwrap(), json!("A"));
        assert_eq!(b.await.unwrap(), json!("B"));
        assert_eq!(c.await.unwrap(), json!("C"));
    }

    #[tokio::test]
    async fn use_failure_fails_every_buffered_operation() {
        let (client, mut server) = connected().await;
        let pending: Vec<_> = (0..3).map(|i| client.call(format!("op{i}"), vec![])).collect();

        let auth = next(&mut server).await;
        let _ = server.reply(auth["id"].as_u64().unwrap(), Value::Null);
        let scope = next(&mut server).await;
        let _ = server.reply_error(scope["id"].as_u64().unwrap(), "namespace not allowed");

        let expected = ClientError::handshake(HandshakeStep::Use, "namespace not allowed");
        for op in pending {
            assert_eq!(op.await.unwrap_err(), expected);
        }
        assert_eq!(client.ready().await.unwrap_err(), expected);
        assert_eq!(client.state(), ConnectionState::Failed);

        // Later submissions fail fast and never reach the wire.
        assert_eq!(client.call("late", vec![]).await.unwrap_err(), expected);
        assert!(server.try_recv_json().is_none());
    }

    #[tokio::test]
    async fn authenticate_failure_skips_use() {
        let (client, mut server) = connected().await;
        let auth = next(&mut server).await;
        let _ = server.reply_error(auth["id"].as_u64().unwrap(), "invalid token");

        let err = client.ready().await.unwrap_err();
        assert_eq!(
            err,
            ClientError::handshake(HandshakeStep::Authenticate, "invalid token")
        );
        assert!(server.try_recv_json().is_none());
    }

    #[tokio::test]
    async fn query_decodes_statement_results() {
        let (client, mut server) = ready().await;
        let response = client.query(Query::new("SELECT * FROM t"));

        let frame = next(&mut server).await;
        assert_eq!(frame["method"], "query");
        assert_eq!(frame["params"], json!(["SELECT * FROM t", {}]));
        let _ = server.reply(
            frame["id"].as_u64().unwrap(),
            json!([{"status": "OK", "result": [1, 2]}]),
        );

        let responses = response.await.unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].status, "OK");
        assert_eq!(responses[0].result, json!([1, 2]));
    }

    #[tokio::test]
    async fn remote_error_reaches_only_its_caller() {
        let (client, mut server) = ready().await;
        let bad = client.query(Query::new("SELEC"));
        let good = client.call("ping", vec![]);

        let bad_frame = next(&mut server).await;
        let good_frame = next(&mut server).await;
        let _ = server.reply_error(bad_frame["id"].as_u64().unwrap(), "parse error");
        let _ = server.reply(good_frame["id"].as_u64().unwrap(), json!(true));

        assert_eq!(bad.await.unwrap_err(), ClientError::remote("parse error"));
        assert_eq!(good.await.unwrap(), json!(true));
    }

    #[tokio::test]
    async fn query_single_on_empty_result_is_an_error() {
        let (client, mut server) = ready().await;
        let response = client.query_single(Query::new("SELECT 1"));
        let frame = next(&mut server).await;
        let _ = server.reply(frame["id"].as_u64().unwrap(), json!([]));
        assert_eq!(response.await.unwrap_err(), ClientError::EmptyResult);
    }

    #[tokio::test]
    async fn transport_error_fails_pending_but_keeps_subscriptions() {
        let (client, mut server) = ready().await;
        let (_handler, mut events) = client.live_channel();
        let pending: Vec<_> = (0..3).map(|_| client.call("slow", vec![])).collect();
        for _ in 0..3 {
            let _ = next(&mut server).await;
        }
        assert_eq!(client.in_flight(), 3);

        let _ = server.fail("connection reset");
        for op in pending {
            assert_eq!(
                op.await.unwrap_err(),
                ClientError::transport("connection reset")
            );
        }
        assert_eq!(client.in_flight(), 0);

        let _ = server.push(&PushEvent::new("L1", "CREATE", json!({"id": 1})));
        let event = tokio::time::timeout(TIMEOUT, events.recv())
            .await
            .unwrap()
            .unwrap();
        assert!(event.is_for("L1"));
    }

    #[tokio::test]
    async fn server_close_fails_pending_and_later_calls() {
        let (client, mut server) = ready().await;
        let pending = client.call("slow", vec![]);
        let _ = next(&mut server).await;

        let _ = server.close(1001, "going away");
        assert!(matches!(
            pending.await.unwrap_err(),
            ClientError::Transport { .. }
        ));
        assert!(matches!(
            client.call("after", vec![]).await.unwrap_err(),
            ClientError::Transport { .. }
        ));
    }

    #[tokio::test]
    async fn scoped_and_global_live_handlers() {
        let (client, server) = ready().await;
        let seen = Arc::new(Mutex::new(Vec::new()));

        let scoped_log = Arc::clone(&seen);
        let scoped: PushHandlerRef = Arc::new(move |e: &PushEvent| -> Result<()> {
            scoped_log.lock().push(format!("scoped:{}", e.subject_id));
            Ok(())
        });
        let (global, mut events) = client.live_channel();
        let _ = client.on_live_id("L1", scoped);

        let _ = server.push(&PushEvent::new("L1", "UPDATE", json!(null)));
        let _ = server.push(&PushEvent::new("L2", "DELETE", json!(null)));
        for expected in ["L1", "L2"] {
            let event = tokio::time::timeout(TIMEOUT, events.recv())
                .await
                .unwrap()
                .unwrap();
            assert!(event.is_for(expected));
        }
        assert_eq!(*seen.lock(), vec!["scoped:L1".to_string()]);

        assert!(client.off_live_id("L1").is_some());
        assert_eq!(client.off_live(&global), 1);
    }

    #[tokio::test]
    async fn callback_fault_is_redelivered_as_failure() {
        let (client, mut server) = ready().await;
        let (tx, rx) = tokio::sync::oneshot::channel();
        let mut tx = Some(tx);
        client.submit(Operation::new("ping", vec![]), move |outcome: Outcome| {
            match outcome {
                Ok(_) => Err(ClientError::callback("cannot handle payload")),
                Err(err) => {
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(err);
                    }
                    Ok(())
                }
            }
        });
        let frame = next(&mut server).await;
        let _ = server.reply(frame["id"].as_u64().unwrap(), json!(1));
        assert_eq!(
            rx.await.unwrap(),
            ClientError::callback("cannot handle payload")
        );
    }

    #[tokio::test]
    async fn panicking_callback_does_not_stall_other_callers() {
        let (client, mut server) = ready().await;
        let (tx, rx) = tokio::sync::oneshot::channel();
        let mut tx = Some(tx);
        client.submit(Operation::new("boom", vec![]), move |outcome: Outcome| {
            match outcome {
                Ok(_) => panic!("cannot handle payload"),
                Err(err) => {
                    if let Some(tx) = tx.take() {
                        let _ = tx.send(err);
                    }
                    Ok(())
                }
            }
        });
        let other = client.call("other", vec![]);

        let boom = next(&mut server).await;
        let frame = next(&mut server).await;
        let _ = server.reply(boom["id"].as_u64().unwrap(), json!(1));
        let _ = server.reply(frame["id"].as_u64().unwrap(), json!("fine"));

        let other = tokio::time::timeout(TIMEOUT, other).await.unwrap();
        assert_eq!(other.unwrap(), json!("fine"));
        let fault = rx.await.unwrap();
        assert!(matches!(fault, ClientError::Callback { ref message } if message.contains("cannot handle payload")));
        assert_eq!(client.in_flight(), 0);
        assert_eq!(client.state(), ConnectionState::Ready);
    }

    #[tokio::test]
    async fn transport_failure_during_handshake_fails_buffered_operations() {
        let (client, mut server) = connected().await;
        let pending: Vec<_> = (0..3).map(|i| client.call(format!("op{i}"), vec![])).collect();

        let auth = next(&mut server).await;
        assert_eq!(auth["method"], "authenticate");
        assert!(server.fail("reset"));

        let expected = ClientError::handshake(HandshakeStep::Authenticate, "reset");
        for op in pending {
            let result = tokio::time::timeout(TIMEOUT, op).await.unwrap();
            assert_eq!(result.unwrap_err(), expected);
        }
        assert_eq!(client.ready().await.unwrap_err(), expected);
        assert_eq!(client.state(), ConnectionState::Failed);
        assert!(server.try_recv_json().is_none());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_submissions_before_ready_are_all_delivered() {
        const TASKS: usize = 8;
        const PER_TASK: usize = 25;

        let (client, mut server) = connected().await;
        let client = Arc::new(client);
        let submitters: Vec<_> = (0..TASKS)
            .map(|t| {
                let client = Arc::clone(&client);
                tokio::spawn(async move {
                    (0..PER_TASK)
                        .map(|i| {
                            let method = format!("t{t}-{i}");
                            (method.clone(), client.call(method, vec![]))
                        })
                        .collect::<Vec<_>>()
                })
            })
            .collect();
        let mut pending = Vec::new();
        for submitter in submitters {
            pending.extend(submitter.await.unwrap());
        }

        let _ = server.accept_handshake().await.unwrap();
        let mut frames = Vec::new();
        let mut ids = std::collections::HashSet::new();
        for _ in 0..TASKS * PER_TASK {
            let frame = next(&mut server).await;
            assert!(ids.insert(frame["id"].as_u64().unwrap()), "id in flight twice");
            frames.push(frame);
        }
        for frame in frames {
            let _ = server.reply(frame["id"].as_u64().unwrap(), frame["method"].clone());
        }

        for (method, response) in pending {
            let result = tokio::time::timeout(TIMEOUT, response).await.unwrap();
            assert_eq!(result.unwrap(), json!(method));
        }
        assert_eq!(client.in_flight(), 0);
    }

    #[tokio::test]
    async fn ids_are_reused_after_responses() {
        let (client, mut server) = ready().await;
        let first = client.call("a", vec![]);
        let frame = next(&mut server).await;
        let id = frame["id"].as_u64().unwrap();
        let _ = server.reply(id, Value::Null);
        let _ = first.await.unwrap();

        let _second = client.call("b", vec![]);
        let frame = next(&mut server).await;
        assert_eq!(frame["id"].as_u64().unwrap(), id);
    }

    #[tokio::test(start_paused = true)]
    async fn connect_times_out() {
        let settings = ClientSettings {
            connect_timeout_ms: 250,
            ..ClientSettings::default()
        };
        let err = Client::connect_with(&MemoryConnector::unresponsive(), endpoint(), &settings)
            .await
            .err()
            .unwrap();
        assert_eq!(err, ClientError::ConnectTimeout { timeout_ms: 250 });
    }

    #[tokio::test]
    async fn invalid_url_is_rejected_synchronously() {
        let err = Client::connect("http://host/ns/db", &ClientSettings::default())
            .await
            .err()
            .unwrap();
        assert!(matches!(err, ClientError::InvalidEndpoint { .. }));
    }

    #[tokio::test]
    async fn close_shuts_the_transport() {
        let (client, mut server) = ready().await;
        let closing = tokio::spawn(client.close());
        assert_eq!(
            tokio::time::timeout(TIMEOUT, server.recv()).await.unwrap(),
            None
        );
        drop(server);
        tokio::time::timeout(TIMEOUT, closing)
            .await
            .unwrap()
            .unwrap();
    }
}
