//! Local replica: the on-disk cache of a room
//!
//! The replica owns a storage directory containing:
//!
//! ```text
//! <storage>/
//! ├── room          # hex store identifier this directory belongs to
//! ├── oplog.jsonl   # append-only operation log
//! └── roomq.toml    # replica config (persistent directories only)
//! ```
//!
//! `ready()` replays the log into an in-memory [`View`]. Entries arriving
//! afterwards (local appends or replication) are written to the log, folded
//! into the view and broadcast on the wakeup channel.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;
use roomq_core::{
    to_hex, Error, NamedQuery, Result, ResultRecord, RoomStore, Schema, SchemaId,
};
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::{broadcast, watch, Mutex};
use tracing::{debug, info};

use crate::expr::Expression;
use crate::oplog::{Entry, Op, View};

/// Operation log file name.
pub const LOG_FILE_NAME: &str = "oplog.jsonl";
/// Room identity file name.
pub const ROOM_FILE_NAME: &str = "room";

const WAKEUP_CAPACITY: usize = 256;

#[derive(Default)]
struct ReplicaState {
    seen: HashSet<String>,
    entries: Vec<Entry>,
    view: View,
}

impl ReplicaState {
    fn insert(&mut self, entry: Entry) -> bool {
        if !self.seen.insert(entry.id.clone()) {
            return false;
        }
        self.view.apply(&entry.op);
        self.entries.push(entry);
        true
    }
}

/// File-backed replica of one room.
pub struct Replica {
    dir: PathBuf,
    state: RwLock<ReplicaState>,
    writer: Mutex<Option<File>>,
    wakeup: broadcast::Sender<Entry>,
    ready: watch::Sender<bool>,
    closed: AtomicBool,
}

impl Replica {
    /// Open (or create) the replica directory for `identifier`.
    ///
    /// The log is not read until [`RoomStore::ready`].
    ///
    /// # Errors
    ///
    /// Returns a session error if the directory cannot be created or belongs
    /// to a different room.
    pub async fn open(dir: &Path, identifier: &[u8]) -> Result<Self> {
        fs::create_dir_all(dir)
            .await
            .map_err(|e| Error::session("open", format!("{}: {}", dir.display(), e)))?;

        let room_file = dir.join(ROOM_FILE_NAME);
        let expected = to_hex(identifier);
        match fs::read_to_string(&room_file).await {
            Ok(existing) if existing.trim() == expected => {}
            Ok(existing) => {
                return Err(Error::session(
                    "open",
                    format!(
                        "{} belongs to room {}, not {}",
                        dir.display(),
                        existing.trim(),
                        expected
                    ),
                ))
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                fs::write(&room_file, &expected)
                    .await
                    .map_err(|e| Error::session("open", e))?;
            }
            Err(e) => return Err(Error::session("open", e)),
        }

        let (wakeup, _) = broadcast::channel(WAKEUP_CAPACITY);
        let (ready, _) = watch::channel(false);
        Ok(Self {
            dir: dir.to_path_buf(),
            state: RwLock::new(ReplicaState::default()),
            writer: Mutex::new(None),
            wakeup,
            ready,
            closed: AtomicBool::new(false),
        })
    }

    /// Storage directory of this replica.
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    /// Whether the log has been replayed.
    pub fn is_ready(&self) -> bool {
        *self.ready.borrow()
    }

    /// Wait until the log has been replayed.
    pub async fn wait_ready(&self) {
        let mut rx = self.ready.subscribe();
        // The sender lives as long as `self`, so this only ends once ready.
        let _ = rx.wait_for(|ready| *ready).await;
    }

    fn ensure_open(&self, operation: &str) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::session(operation, "replica is closed"));
        }
        if !self.is_ready() {
            return Err(Error::session(operation, "replica is not ready"));
        }
        Ok(())
    }

    /// Number of entries in the log.
    pub fn len(&self) -> usize {
        self.state.read().entries.len()
    }

    /// Whether the log is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Copy of every entry, in log order.
    pub fn entries(&self) -> Vec<Entry> {
        self.state.read().entries.clone()
    }

    /// Subscribe to entries added from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Entry> {
        self.wakeup.subscribe()
    }

    /// Add an entry, persisting it first.
    ///
    /// Returns `false` if the entry was already present.
    pub async fn apply(&self, entry: Entry) -> Result<bool> {
        self.ensure_open("apply")?;

        let mut writer = self.writer.lock().await;
        if self.state.read().seen.contains(&entry.id) {
            return Ok(false);
        }

        let file = writer
            .as_mut()
            .ok_or_else(|| Error::session("apply", "replica is closed"))?;
        let mut line = serde_json::to_string(&entry)?;
        line.push('\n');
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;

        self.state.write().insert(entry.clone());
        debug!(target: "roomq::replica", id = %entry.id, "Entry applied");
        // No subscribers is fine.
        let _ = self.wakeup.send(entry);
        Ok(true)
    }

    /// Append a locally authored operation.
    pub async fn append(&self, op: Op) -> Result<Entry> {
        let entry = Entry::new(op);
        self.apply(entry.clone()).await?;
        Ok(entry)
    }

    async fn replay(&self) -> Result<()> {
        let path = self.log_path();
        let content = match fs::read_to_string(&path).await {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(Error::session("ready", e)),
        };

        let mut replayed = 0usize;
        {
            let mut state = self.state.write();
            for (lineno, line) in content.lines().enumerate() {
                if line.trim().is_empty() {
                    continue;
                }
                let entry: Entry = serde_json::from_str(line).map_err(|e| {
                    Error::session(
                        "ready",
                        format!("{} line {}: {}", path.display(), lineno + 1, e),
                    )
                })?;
                if state.insert(entry) {
                    replayed += 1;
                }
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| Error::session("ready", e))?;
        *self.writer.lock().await = Some(file);

        info!(target: "roomq::replica", entries = replayed, "Replica log replayed");
        Ok(())
    }
}

#[async_trait]
impl RoomStore for Replica {
    async fn ready(&self) -> Result<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(Error::session("ready", "replica is closed"));
        }
        if self.is_ready() {
            return Ok(());
        }
        self.replay().await?;
        self.ready.send_replace(true);
        Ok(())
    }

    async fn list_schemas(&self) -> Result<Vec<Schema>> {
        self.ensure_open("list_schemas")?;
        let state = self.state.read();
        Ok(state
            .view
            .schemas()
            .iter()
            .map(|id| Schema { id: id.clone() })
            .collect())
    }

    async fn list_named_queries(&self, schema: &SchemaId) -> Result<Vec<NamedQuery>> {
        self.ensure_open("list_named_queries")?;
        Ok(self.state.read().view.queries(schema))
    }

    async fn query(&self, schema: &SchemaId, expression: &str) -> Result<Vec<ResultRecord>> {
        self.ensure_open("query")?;
        let expr = Expression::parse(expression)?;
        let state = self.state.read();
        Ok(state
            .view
            .records(schema, &expr.collection)
            .filter(|r| expr.matches(&r.value))
            .map(|r| ResultRecord::new(r.value.clone()))
            .collect())
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        if let Some(mut file) = self.writer.lock().await.take() {
            file.flush().await?;
        }
        debug!(target: "roomq::replica", dir = %self.dir.display(), "Replica closed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    const ROOM: [u8; 32] = [7u8; 32];

    async fn ready_replica(dir: &Path) -> Replica {
        let replica = Replica::open(dir, &ROOM).await.unwrap();
        replica.ready().await.unwrap();
        replica
    }

    fn schema() -> SchemaId {
        SchemaId::new("main")
    }

    #[tokio::test]
    async fn test_open_writes_room_file() {
        let dir = TempDir::new().unwrap();
        Replica::open(dir.path(), &ROOM).await.unwrap();
        let room = std::fs::read_to_string(dir.path().join(ROOM_FILE_NAME)).unwrap();
        assert_eq!(room, to_hex(&ROOM));
    }

    #[tokio::test]
    async fn test_open_rejects_other_room() {
        let dir = TempDir::new().unwrap();
        Replica::open(dir.path(), &ROOM).await.unwrap();
        let err = Replica::open(dir.path(), &[8u8; 32]).await.err().unwrap();
        assert!(matches!(err, Error::Session { .. }));
    }

    #[tokio::test]
    async fn test_queries_before_ready_fail() {
        let dir = TempDir::new().unwrap();
        let replica = Replica::open(dir.path(), &ROOM).await.unwrap();
        assert!(matches!(
            replica.list_schemas().await,
            Err(Error::Session { .. })
        ));
    }

    #[tokio::test]
    async fn test_append_and_replay() {
        let dir = TempDir::new().unwrap();
        {
            let replica = ready_replica(dir.path()).await;
            replica.append(Op::Schema { id: schema() }).await.unwrap();
            replica
                .append(Op::Record {
                    schema: schema(),
                    collection: "settings".to_string(),
                    key: None,
                    value: json!({"url": "postgres://db", "pool": 4}),
                })
                .await
                .unwrap();
            replica.close().await.unwrap();
        }

        let replica = ready_replica(dir.path()).await;
        assert_eq!(replica.len(), 2);
        let schemas = replica.list_schemas().await.unwrap();
        assert_eq!(schemas, vec![Schema { id: schema() }]);

        let rows = replica.query(&schema(), "settings").await.unwrap();
        assert_eq!(rows.len(), 1);
        let keys: Vec<_> = rows[0].json.as_object().unwrap().keys().cloned().collect();
        assert_eq!(keys, vec!["url", "pool"]);
    }

    #[tokio::test]
    async fn test_apply_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let replica = ready_replica(dir.path()).await;
        let entry = Entry::new(Op::Schema { id: schema() });
        assert!(replica.apply(entry.clone()).await.unwrap());
        assert!(!replica.apply(entry).await.unwrap());
        assert_eq!(replica.len(), 1);
    }

    #[tokio::test]
    async fn test_apply_broadcasts_new_entries() {
        let dir = TempDir::new().unwrap();
        let replica = ready_replica(dir.path()).await;
        let mut rx = replica.subscribe();
        let entry = replica.append(Op::Schema { id: schema() }).await.unwrap();
        assert_eq!(rx.recv().await.unwrap(), entry);
    }

    #[tokio::test]
    async fn test_query_filters_and_collection_miss() {
        let dir = TempDir::new().unwrap();
        let replica = ready_replica(dir.path()).await;
        for env in ["dev", "prod"] {
            replica
                .append(Op::Record {
                    schema: schema(),
                    collection: "settings".to_string(),
                    key: Some(env.to_string()),
                    value: json!({"env": env}),
                })
                .await
                .unwrap();
        }
        let rows = replica
            .query(&schema(), "settings where env = prod")
            .await
            .unwrap();
        assert_eq!(rows, vec![ResultRecord::new(json!({"env": "prod"}))]);
        assert!(replica.query(&schema(), "missing").await.unwrap().is_empty());
        assert!(matches!(
            replica.query(&schema(), "settings where").await,
            Err(Error::Execution { .. })
        ));
    }

    #[tokio::test]
    async fn test_corrupt_log_is_session_error() {
        let dir = TempDir::new().unwrap();
        let replica = Replica::open(dir.path(), &ROOM).await.unwrap();
        std::fs::write(dir.path().join(LOG_FILE_NAME), "{not json\n").unwrap();
        let err = replica.ready().await.unwrap_err();
        assert!(matches!(err, Error::Session { .. }));
        assert!(err.to_string().contains("line 1"));
    }

    #[tokio::test]
    async fn test_close_is_idempotent_and_blocks_queries() {
        let dir = TempDir::new().unwrap();
        let replica = ready_replica(dir.path()).await;
        replica.close().await.unwrap();
        replica.close().await.unwrap();
        assert!(replica.list_schemas().await.is_err());
        assert!(replica
            .apply(Entry::new(Op::Schema { id: schema() }))
            .await
            .is_err());
    }
}
