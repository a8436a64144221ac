//! Collaborator traits at the store boundary
//!
//! The replicated store, its discovery transport and the mirror helper are
//! external collaborators. These traits are the only surface the executor
//! sees, so implementations can be swapped (local replica, test mocks)
//! without touching the orchestration layer.
//!
//! Every method is a suspension point; callers run them on a single
//! cooperative task.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;

use crate::access::{AccessDescriptor, BlindPeer, DiscoveryKey};
use crate::error::Result;
use crate::types::{NamedQuery, ResultRecord, Schema, SchemaId};

/// Queryable view of the replicated store
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Wait until the store's consistency log is initialized.
    async fn ready(&self) -> Result<()>;

    /// Schemas currently known locally, in discovery order.
    ///
    /// May be empty while replication has not delivered any yet.
    async fn list_schemas(&self) -> Result<Vec<Schema>>;

    /// All named queries registered for `schema`.
    async fn list_named_queries(&self, schema: &SchemaId) -> Result<Vec<NamedQuery>>;

    /// Evaluate `expression` against `schema`.
    async fn query(&self, schema: &SchemaId, expression: &str) -> Result<Vec<ResultRecord>>;

    /// Release the local cache handle. Must tolerate repeated calls.
    async fn close(&self) -> Result<()>;
}

/// Peer discovery transport
#[async_trait]
pub trait Discovery: Send + Sync {
    /// Announce this session under `topic` and connect to known peers.
    async fn join(&self, topic: DiscoveryKey) -> Result<()>;

    /// Stop accepting connections and withdraw announcements. Must tolerate
    /// repeated calls.
    async fn destroy(&self) -> Result<()>;
}

/// Blind peer mirroring helper
#[async_trait]
pub trait Mirror: Send + Sync {
    /// Stop mirroring. Must tolerate repeated calls.
    async fn close(&self) -> Result<()>;
}

/// Everything a backend hands back when opened
#[derive(Clone)]
pub struct Components {
    /// Local cache / query facility
    pub store: Arc<dyn RoomStore>,
    /// Discovery transport
    pub discovery: Arc<dyn Discovery>,
    /// Mirroring helper
    pub mirror: Arc<dyn Mirror>,
}

/// Opens the collaborators for one invocation
#[async_trait]
pub trait Backend: Send + Sync {
    /// Open or create local storage at `storage` and start the transport.
    ///
    /// `ephemeral` is true when the directory was generated for this
    /// invocation and will be removed on teardown.
    async fn open(
        &self,
        storage: &Path,
        ephemeral: bool,
        access: &AccessDescriptor,
        blind_peers: &[BlindPeer],
    ) -> Result<Components>;
}
