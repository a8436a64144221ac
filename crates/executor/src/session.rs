//! Store session
//!
//! A [`StoreSession`] owns the collaborators a [`Backend`] hands back for one
//! invocation and exposes the two setup steps that must succeed before any
//! query runs: readiness and discovery announcement. Neither is retried
//! here; a failure is fatal to the invocation.

use std::sync::atomic::{AtomicBool, Ordering};

use roomq_core::{AccessDescriptor, Backend, BlindPeer, Components, Error, Result, RoomStore};
use tracing::{debug, warn};

use crate::lifecycle::StoragePath;

/// Keep session errors as they are; wrap anything else under `operation`.
fn as_session_error(operation: &'static str) -> impl FnOnce(Error) -> Error {
    move |e| match e {
        e @ Error::Session { .. } => e,
        other => Error::session(operation, other),
    }
}

/// An open connection to the replicated store.
pub struct StoreSession {
    components: Components,
    access: AccessDescriptor,
    closed: AtomicBool,
}

impl StoreSession {
    /// Open local storage and start the discovery transport.
    pub async fn open(
        backend: &dyn Backend,
        storage: &StoragePath,
        access: AccessDescriptor,
        blind_peers: &[BlindPeer],
    ) -> Result<Self> {
        debug!(
            target: "roomq::session",
            storage = %storage.path().display(),
            ephemeral = storage.is_ephemeral(),
            blind_peers = blind_peers.len(),
            "Opening store"
        );
        let components = backend
            .open(storage.path(), storage.is_ephemeral(), &access, blind_peers)
            .await
            .map_err(as_session_error("open"))?;
        Ok(Self {
            components,
            access,
            closed: AtomicBool::new(false),
        })
    }

    /// Collaborators owned by this session.
    pub fn components(&self) -> &Components {
        &self.components
    }

    /// Query facility.
    pub fn store(&self) -> &dyn RoomStore {
        self.components.store.as_ref()
    }

    /// Wait for the store's consistency log.
    pub async fn ready(&self) -> Result<()> {
        self.components
            .store
            .ready()
            .await
            .map_err(as_session_error("ready"))?;
        debug!(target: "roomq::session", "Store ready");
        Ok(())
    }

    /// Announce this session under the room's discovery key.
    pub async fn join_discovery(&self) -> Result<()> {
        let topic = self.access.discovery_key();
        self.components
            .discovery
            .join(topic)
            .await
            .map_err(as_session_error("join"))?;
        debug!(target: "roomq::session", topic = %topic.to_hex(), "Joined discovery");
        Ok(())
    }

    /// Release mirror, discovery and local cache, in that order.
    ///
    /// Failures are logged and never escalated. Later calls do nothing.
    pub async fn close(&self) {
        if self.closed.swap(true, Ordering::AcqRel) {
            return;
        }
        let components = &self.components;
        if let Err(e) = components.mirror.close().await {
            warn!(target: "roomq::session", error = %e, "Mirror close failed");
        }
        if let Err(e) = components.discovery.destroy().await {
            warn!(target: "roomq::session", error = %e, "Discovery destroy failed");
        }
        if let Err(e) = components.store.close().await {
            warn!(target: "roomq::session", error = %e, "Store close failed");
        }
        debug!(target: "roomq::session", "Session closed");
    }
}
