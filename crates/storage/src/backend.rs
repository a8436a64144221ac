//! Local backend: wires replica, swarm and mirror together

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use roomq_core::{AccessDescriptor, Backend, BlindPeer, Components, Result};
use tracing::debug;

use crate::config::ReplicaConfig;
use crate::discovery::Announcements;
use crate::mirror::BlindMirror;
use crate::replica::Replica;
use crate::swarm::Swarm;

/// [`Backend`] backed by a file replica and loopback TCP replication.
#[derive(Debug, Clone, Default)]
pub struct LocalBackend {
    config: Option<ReplicaConfig>,
}

impl LocalBackend {
    /// Read configuration from each storage directory's `roomq.toml`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use `config` for every open, ignoring any `roomq.toml`.
    pub fn with_config(config: ReplicaConfig) -> Self {
        Self {
            config: Some(config),
        }
    }
}

#[async_trait]
impl Backend for LocalBackend {
    async fn open(
        &self,
        storage: &Path,
        ephemeral: bool,
        access: &AccessDescriptor,
        blind_peers: &[BlindPeer],
    ) -> Result<Components> {
        // Creates the directory, so the config file can be written after.
        let replica = Arc::new(Replica::open(storage, access.identifier()).await?);
        let config = match &self.config {
            Some(config) => config.clone(),
            None => ReplicaConfig::load(storage, ephemeral)?,
        };
        debug!(
            target: "roomq::replica",
            storage = %storage.display(),
            ephemeral,
            listen = %config.listen_addr,
            "Opening local backend"
        );

        let capability = access.capability();
        let announcements = Announcements::new(config.discovery_dir());
        let swarm = Swarm::bind(
            &config.listen_addr,
            announcements.clone(),
            replica.clone(),
            capability,
        )
        .await?;
        let mirror =
            BlindMirror::start(blind_peers, &announcements, replica.clone(), capability).await?;

        Ok(Components {
            store: replica,
            discovery: Arc::new(swarm),
            mirror: Arc::new(mirror),
        })
    }
}
