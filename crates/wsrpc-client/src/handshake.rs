//! Connection bootstrap.
//!
//! Runs once per connection on its own task: exchange root credentials for a
//! token when needed, `authenticate` with the token, then `use` the namespace and
//! database. Both RPC steps bypass the readiness gate. Success opens the gate;
//! the first failure fails it, tagged with the step that broke.
//!
//! The task holds the shared state only until the gate resolves.

use std::sync::Arc;

use tracing::{debug, instrument};
use url::Url;
use wsrpc_core::{ClientError, ConnectionState, HandshakeStep, Operation, Result};
use wsrpc_settings::{ClientSettings, Credentials, Endpoint};

use crate::client::Shared;
use crate::signin::signin;

pub(crate) struct Handshake {
    credentials: Credentials,
    namespace: String,
    database: String,
    login_url: Url,
    http: reqwest::Client,
}

impl Handshake {
    pub(crate) fn new(endpoint: &Endpoint, settings: &ClientSettings) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.signin_timeout())
            .build()
            .map_err(|e| ClientError::transport(format!("http client: {e}")))?;
        Ok(Self {
            credentials: endpoint.credentials.clone(),
            namespace: endpoint.namespace.clone(),
            database: endpoint.database.clone(),
            login_url: endpoint.login_url.clone(),
            http,
        })
    }

    #[instrument(name = "handshake", skip_all, fields(namespace = %self.namespace, database = %self.database))]
    pub(crate) async fn run(self, shared: Arc<Shared>) {
        match self.bootstrap(&shared).await {
            Ok(()) => shared.open_gate(),
            Err(err) => shared.fail_gate(&err),
        }
    }

    async fn bootstrap(&self, shared: &Shared) -> Result<()> {
        let _ = shared.queue.advance(ConnectionState::Authenticating);
        let token = match &self.credentials {
            Credentials::Token(token) => token.clone(),
            Credentials::Root { username, password } => {
                debug!(username = %username, "exchanging root credentials");
                signin(&self.http, &self.login_url, username, password).await?
            }
        };

        let _ = shared
            .call_ungated(&Operation::authenticate(token))
            .await
            .map_err(|e| e.into_handshake(HandshakeStep::Authenticate))?;
        debug!("authenticated");

        let _ = shared.queue.advance(ConnectionState::ScopingSession);
        let _ = shared
            .call_ungated(&Operation::use_scope(&self.namespace, &self.database))
            .await
            .map_err(|e| e.into_handshake(HandshakeStep::Use))?;
        debug!("session scoped");
        Ok(())
    }
}
