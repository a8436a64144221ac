//! Resource lifecycle
//!
//! Every invocation owns one storage path and, once opened, one
//! [`StoreSession`]. [`Lifecycle::teardown`] releases them exactly once, no
//! matter how many exit paths reach it:
//!
//! 1. close the mirror helper
//! 2. destroy the discovery transport
//! 3. close the local cache
//! 4. remove the storage directory, only if it was generated for this run
//!
//! A user-supplied storage directory is never removed.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::session::StoreSession;

/// Prefix of generated storage directory names.
pub const EPHEMERAL_PREFIX: &str = "roomq-";

/// Where the local cache lives for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoragePath {
    path: PathBuf,
    ephemeral: bool,
}

impl StoragePath {
    /// Use the caller's directory, or generate a fresh one under the system
    /// temp dir.
    pub fn resolve(user: Option<PathBuf>) -> Self {
        match user {
            Some(path) => Self::user(path),
            None => Self::ephemeral_in(&std::env::temp_dir()),
        }
    }

    /// A caller-supplied directory; never deleted.
    pub fn user(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ephemeral: false,
        }
    }

    /// A fresh directory name under `root`, deleted on teardown.
    pub fn ephemeral_in(root: &Path) -> Self {
        Self {
            path: root.join(format!("{}{}", EPHEMERAL_PREFIX, uuid::Uuid::new_v4())),
            ephemeral: true,
        }
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Whether this directory was generated for the invocation.
    pub fn is_ephemeral(&self) -> bool {
        self.ephemeral
    }
}

/// One-shot owner of an invocation's resources.
pub struct Lifecycle {
    storage: StoragePath,
    session: Mutex<Option<Arc<StoreSession>>>,
    torn_down: AtomicBool,
}

impl Lifecycle {
    /// Take ownership of `storage`.
    pub fn new(storage: StoragePath) -> Self {
        Self {
            storage,
            session: Mutex::new(None),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Storage path for this invocation.
    pub fn storage(&self) -> &StoragePath {
        &self.storage
    }

    /// Register the opened session for teardown.
    pub fn attach(&self, session: Arc<StoreSession>) {
        *self.session.lock() = Some(session);
    }

    /// Whether teardown has already run.
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    /// Release everything. Only the first call does any work.
    pub async fn teardown(&self) {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            debug!(target: "roomq::lifecycle", "Teardown already ran");
            return;
        }

        let session = self.session.lock().take();
        if let Some(session) = session {
            session.close().await;
        }

        if !self.storage.is_ephemeral() {
            debug!(
                target: "roomq::lifecycle",
                path = %self.storage.path().display(),
                "Keeping user storage"
            );
            return;
        }
        match tokio::fs::remove_dir_all(self.storage.path()).await {
            Ok(()) => debug!(
                target: "roomq::lifecycle",
                path = %self.storage.path().display(),
                "Removed ephemeral storage"
            ),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(
                target: "roomq::lifecycle",
                path = %self.storage.path().display(),
                error = %e,
                "Failed to remove ephemeral storage"
            ),
        }
    }
}
