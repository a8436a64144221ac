//! File-based peer announcements
//!
//! Sessions announce themselves by dropping a file into a per-topic
//! directory:
//!
//! ```text
//! <discovery_dir>/<topic-hex>/<uuid>.peer   # contains "127.0.0.1:40123"
//! ```
//!
//! Stale files from processes that died are harmless: dialing them fails and
//! the peer is skipped.

use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use roomq_core::{Error, Result};
use tokio::fs;
use tracing::{debug, warn};

const PEER_FILE_EXTENSION: &str = "peer";

/// Announcement directory shared by all sessions on a host.
#[derive(Debug, Clone)]
pub struct Announcements {
    root: PathBuf,
}

impl Announcements {
    /// Use `root` as the announcement directory.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// A fresh announcement file path under `topic`. Nothing is written.
    pub fn peer_file(&self, topic: &str) -> PathBuf {
        self.root
            .join(topic)
            .join(format!("{}.{}", uuid::Uuid::new_v4(), PEER_FILE_EXTENSION))
    }

    /// Write `addr` to the announcement file `path`.
    pub async fn publish(&self, path: &Path, addr: SocketAddr) -> Result<()> {
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)
                .await
                .map_err(|e| Error::session("join", format!("{}: {}", dir.display(), e)))?;
        }
        fs::write(path, addr.to_string())
            .await
            .map_err(|e| Error::session("join", format!("{}: {}", path.display(), e)))?;
        debug!(target: "roomq::swarm", path = %path.display(), %addr, "Announced");
        Ok(())
    }

    /// Publish `addr` under `topic`; returns the file to withdraw later.
    pub async fn announce(&self, topic: &str, addr: SocketAddr) -> Result<PathBuf> {
        let path = self.peer_file(topic);
        self.publish(&path, addr).await?;
        Ok(path)
    }

    /// Addresses announced under `topic`, skipping the file `exclude`.
    pub async fn peers(&self, topic: &str, exclude: Option<&Path>) -> Result<Vec<SocketAddr>> {
        let dir = self.root.join(topic);
        let mut entries = match fs::read_dir(&dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut peers = Vec::new();
        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if Some(path.as_path()) == exclude {
                continue;
            }
            if path.extension().and_then(|e| e.to_str()) != Some(PEER_FILE_EXTENSION) {
                continue;
            }
            let content = match fs::read_to_string(&path).await {
                Ok(content) => content,
                // Withdrawn between listing and reading.
                Err(_) => continue,
            };
            match content.trim().parse::<SocketAddr>() {
                Ok(addr) => peers.push(addr),
                Err(e) => {
                    warn!(target: "roomq::swarm", path = %path.display(), error = %e, "Ignoring malformed announcement")
                }
            }
        }
        Ok(peers)
    }

    /// Remove an announcement file; missing files are not an error.
    pub async fn withdraw(&self, path: &Path) -> Result<()> {
        match fs::remove_file(path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
