//! Blind peer mirroring
//!
//! A blind peer announces itself under the hex of its own key instead of the
//! room's discovery topic. The mirror dials whatever is announced there and
//! runs the replication protocol, so local writes wake the mirror up and
//! mirrored data flows back in.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use roomq_core::{BlindPeer, Mirror, Result};
use tokio::task::JoinSet;
use tracing::{debug, info};

use crate::discovery::Announcements;
use crate::replica::Replica;
use crate::swarm::dial;

/// Replication links to known blind peers.
pub struct BlindMirror {
    tasks: Mutex<JoinSet<()>>,
    closed: AtomicBool,
}

impl BlindMirror {
    /// Dial every announced address of every blind peer.
    ///
    /// Unreachable or unannounced peers are skipped.
    pub async fn start(
        peers: &[BlindPeer],
        announcements: &Announcements,
        replica: Arc<Replica>,
        capability: [u8; 32],
    ) -> Result<Self> {
        let tasks = Mutex::new(JoinSet::new());
        let mut linked = 0usize;
        for peer in peers {
            let topic = peer.to_hex();
            let addrs = announcements.peers(&topic, None).await?;
            if addrs.is_empty() {
                debug!(target: "roomq::mirror", peer = %topic, "Blind peer not announced");
            }
            for addr in addrs {
                if dial(&tasks, addr, replica.clone(), capability).await {
                    linked += 1;
                }
            }
        }
        if !peers.is_empty() {
            info!(target: "roomq::mirror", peers = peers.len(), links = linked, "Mirroring started");
        }
        Ok(Self {
            tasks,
            closed: AtomicBool::new(false),
        })
    }

    /// Number of mirror links still running.
    pub fn links(&self) -> usize {
        self.tasks.lock().len()
    }
}

#[async_trait]
impl Mirror for BlindMirror {
    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.tasks.lock().abort_all();
        debug!(target: "roomq::mirror", "Mirror closed");
        Ok(())
    }
}
