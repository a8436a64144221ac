//! Invocation orchestration
//!
//! [`Client::run_until`] drives one invocation end to end:
//!
//! ```text
//! decode key ─▶ open session ─▶ ready ─▶ join discovery ─▶ discover schema
//!     ─▶ race { resolve query ─▶ execute ─▶ project ─▶ format }
//!     ─▶ teardown (exactly once, also on error or shutdown)
//! ```

use std::future::Future;
use std::path::PathBuf;
use std::sync::Arc;

use roomq_core::{AccessDescriptor, Backend, BlindPeer, Error, QuerySpec, Result};
use tracing::{debug, info};

use crate::executor::execute;
use crate::lifecycle::{Lifecycle, StoragePath};
use crate::output::{format, OutputOptions};
use crate::race::RaceController;
use crate::resolver::{discover_schema, resolve_query, SchemaRetryPolicy};
use crate::session::StoreSession;

/// Everything one command-line invocation asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    /// Encoded room key
    pub locator: String,
    /// Parsed query argument
    pub query: QuerySpec,
    /// Persistent storage directory; `None` for an ephemeral one
    pub storage: Option<PathBuf>,
    /// Encoded blind peer keys
    pub blind_peers: Vec<String>,
    /// Output flags
    pub output: OutputOptions,
    /// Verbose diagnostics on stderr
    pub debug: bool,
}

/// Runs invocations against a [`Backend`].
pub struct Client<B> {
    backend: B,
    schema_policy: SchemaRetryPolicy,
    race: RaceController,
}

impl<B: Backend> Client<B> {
    /// Client with the default retry policies.
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            schema_policy: SchemaRetryPolicy::default(),
            race: RaceController::default(),
        }
    }

    /// Replace the schema listing policy.
    pub fn with_schema_policy(mut self, policy: SchemaRetryPolicy) -> Self {
        self.schema_policy = policy;
        self
    }

    /// Replace the race controller.
    pub fn with_race(mut self, race: RaceController) -> Self {
        self.race = race;
        self
    }

    /// The backend this client opens sessions with.
    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Run `invocation` to completion.
    pub async fn run(&self, invocation: &Invocation) -> Result<String> {
        self.run_until(invocation, std::future::pending()).await
    }

    /// Run `invocation`, giving up with [`Error::Interrupted`] if `shutdown`
    /// completes first. Teardown runs exactly once either way.
    pub async fn run_until<S>(&self, invocation: &Invocation, shutdown: S) -> Result<String>
    where
        S: Future<Output = ()>,
    {
        let lifecycle = Lifecycle::new(StoragePath::resolve(invocation.storage.clone()));

        let outcome = tokio::select! {
            outcome = self.pipeline(invocation, &lifecycle) => outcome,
            _ = shutdown => {
                info!(target: "roomq::lifecycle", "Interrupted, tearing down");
                Err(Error::Interrupted)
            }
        };

        lifecycle.teardown().await;
        outcome
    }

    async fn pipeline(&self, invocation: &Invocation, lifecycle: &Lifecycle) -> Result<String> {
        let access = AccessDescriptor::decode(&invocation.locator)?;
        let blind_peers = invocation
            .blind_peers
            .iter()
            .map(|key| BlindPeer::decode(key))
            .collect::<Result<Vec<_>>>()?;
        debug!(target: "roomq::session", key = ?access, "Room key decoded");

        let session = Arc::new(
            StoreSession::open(&self.backend, lifecycle.storage(), access, &blind_peers).await?,
        );
        lifecycle.attach(session.clone());
        session.ready().await?;
        session.join_discovery().await?;

        let store = session.store();
        let schema = discover_schema(store, &self.schema_policy).await?;
        let schema_id = &schema.id;
        let spec = &invocation.query;
        let options = &invocation.output;

        self.race
            .run(|attempt| async move {
                debug!(target: "roomq::race", ?attempt, query = %spec.label(), "Running query");
                let query = resolve_query(store, schema_id, spec).await?;
                let records = execute(store, schema_id, &query).await?;
                format(spec, &records, options)
            })
            .await
    }
}
