//! Discovery transport
//!
//! A [`Swarm`] accepts inbound replication connections for the lifetime of
//! the session and, once joined to a topic, dials every peer announced under
//! it. Each connection runs [`replicate`], which feeds the replica
//! (replication stream) and pushes wakeup frames for new local entries
//! (wakeup stream).
//!
//! All connection tasks live in one `JoinSet`; [`Discovery::destroy`]
//! aborts them and withdraws the announcement.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use roomq_core::{Discovery, DiscoveryKey, Error, Result};
use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::discovery::Announcements;
use crate::replica::Replica;
use crate::wire::replicate;

/// How long to wait for an announced peer to accept a connection.
pub const DIAL_TIMEOUT: Duration = Duration::from_secs(1);

/// Dial `addr` and run replication on a background task.
pub(crate) async fn dial(
    tasks: &Mutex<JoinSet<()>>,
    addr: SocketAddr,
    replica: Arc<Replica>,
    capability: [u8; 32],
) -> bool {
    let stream = match tokio::time::timeout(DIAL_TIMEOUT, TcpStream::connect(addr)).await {
        Ok(Ok(stream)) => stream,
        Ok(Err(e)) => {
            debug!(target: "roomq::swarm", %addr, error = %e, "Peer unreachable");
            return false;
        }
        Err(_) => {
            debug!(target: "roomq::swarm", %addr, "Peer dial timed out");
            return false;
        }
    };
    tasks.lock().spawn(async move {
        if let Err(e) = replicate(stream, replica, capability, addr.to_string()).await {
            warn!(target: "roomq::swarm", %addr, error = %e, "Replication stream ended");
        }
    });
    true
}

async fn accept_loop(listener: TcpListener, replica: Arc<Replica>, capability: [u8; 32]) {
    // Dropping this set (when the accept task is aborted) aborts every
    // inbound connection with it.
    let mut connections = JoinSet::new();
    loop {
        match listener.accept().await {
            Ok((stream, peer)) => {
                debug!(target: "roomq::swarm", %peer, "Inbound connection");
                let replica = replica.clone();
                connections.spawn(async move {
                    if let Err(e) = replicate(stream, replica, capability, peer.to_string()).await
                    {
                        warn!(target: "roomq::swarm", %peer, error = %e, "Replication stream ended");
                    }
                });
            }
            Err(e) => {
                warn!(target: "roomq::swarm", error = %e, "Accept failed");
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
        // Reap finished connections.
        while connections.try_join_next().is_some() {}
    }
}

/// Discovery transport bound to one replica.
pub struct Swarm {
    replica: Arc<Replica>,
    capability: [u8; 32],
    local_addr: SocketAddr,
    announcements: Announcements,
    announced: Mutex<Vec<PathBuf>>,
    tasks: Mutex<JoinSet<()>>,
    destroyed: AtomicBool,
}

impl Swarm {
    /// Bind the listener and start accepting inbound connections.
    ///
    /// # Errors
    ///
    /// Returns a session error if the listen address cannot be bound.
    pub async fn bind(
        listen_addr: &str,
        announcements: Announcements,
        replica: Arc<Replica>,
        capability: [u8; 32],
    ) -> Result<Self> {
        let listener = TcpListener::bind(listen_addr)
            .await
            .map_err(|e| Error::session("listen", format!("{}: {}", listen_addr, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| Error::session("listen", e))?;

        let mut tasks = JoinSet::new();
        tasks.spawn(accept_loop(listener, replica.clone(), capability));
        info!(target: "roomq::swarm", %local_addr, "Accepting replication connections");

        Ok(Self {
            replica,
            capability,
            local_addr,
            announcements,
            announced: Mutex::new(Vec::new()),
            tasks: Mutex::new(tasks),
            destroyed: AtomicBool::new(false),
        })
    }

    /// Address inbound peers connect to.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

#[async_trait]
impl Discovery for Swarm {
    async fn join(&self, topic: DiscoveryKey) -> Result<()> {
        if self.destroyed.load(Ordering::Acquire) {
            return Err(Error::session("join", "swarm destroyed"));
        }
        let topic = topic.to_hex();
        // Record first so destroy withdraws it even if this join is dropped
        // mid-write.
        let own = self.announcements.peer_file(&topic);
        self.announced.lock().push(own.clone());
        self.announcements.publish(&own, self.local_addr).await?;

        let peers = self
            .announcements
            .peers(&topic, Some(&own))
            .await
            .map_err(|e| Error::session("join", e))?;
        let mut connected = 0usize;
        for addr in peers {
            if addr == self.local_addr {
                continue;
            }
            if dial(&self.tasks, addr, self.replica.clone(), self.capability).await {
                connected += 1;
            }
        }
        info!(target: "roomq::swarm", topic = %topic, peers = connected, "Joined discovery topic");
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        if self.destroyed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        self.tasks.lock().abort_all();
        let announced = std::mem::take(&mut *self.announced.lock());
        for path in announced {
            if let Err(e) = self.announcements.withdraw(&path).await {
                warn!(target: "roomq::swarm", path = %path.display(), error = %e, "Failed to withdraw announcement");
            }
        }
        debug!(target: "roomq::swarm", "Swarm destroyed");
        Ok(())
    }
}
