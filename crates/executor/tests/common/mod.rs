//! Recording mock collaborators shared by the executor integration tests.
#![allow(dead_code)]

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use roomq_executor::{
    AccessDescriptor, Backend, BlindPeer, Components, Discovery, DiscoveryKey, Error, Mirror,
    NamedQuery, Result, ResultRecord, RoomStore, Schema, SchemaId,
};
use serde_json::Value;

/// Ordered record of every collaborator call.
#[derive(Clone, Default)]
pub struct Journal(Arc<Mutex<Vec<String>>>);

impl Journal {
    pub fn push(&self, event: impl Into<String>) {
        self.0.lock().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    pub fn count(&self, event: &str) -> usize {
        self.0.lock().iter().filter(|e| *e == event).count()
    }
}

/// A scripted answer: `Ok` payload or an execution error message.
pub type Reply<T> = std::result::Result<T, String>;

fn pop<T: Clone>(script: &Mutex<VecDeque<Reply<T>>>, fallback: &Reply<T>) -> Result<T> {
    let reply = script.lock().pop_front().unwrap_or_else(|| fallback.clone());
    reply.map_err(Error::execution)
}

pub struct MockStore {
    journal: Journal,
    fail_ready: bool,
    schemas: Mutex<VecDeque<Reply<Vec<Schema>>>>,
    schemas_fallback: Reply<Vec<Schema>>,
    queries: Vec<NamedQuery>,
    results: Mutex<VecDeque<Reply<Vec<ResultRecord>>>>,
    results_fallback: Reply<Vec<ResultRecord>>,
}

impl MockStore {
    /// One schema `main`, no named queries, no results.
    pub fn new(journal: Journal) -> Self {
        Self {
            journal,
            fail_ready: false,
            schemas: Mutex::new(VecDeque::new()),
            schemas_fallback: Ok(vec![Schema {
                id: SchemaId::new("main"),
            }]),
            queries: Vec::new(),
            results: Mutex::new(VecDeque::new()),
            results_fallback: Ok(Vec::new()),
        }
    }

    pub fn failing_ready(mut self) -> Self {
        self.fail_ready = true;
        self
    }

    /// Answers for successive `list_schemas` calls; the last one repeats.
    pub fn schemas(mut self, mut script: Vec<Reply<Vec<Schema>>>) -> Self {
        if let Some(last) = script.pop() {
            self.schemas_fallback = last;
        }
        self.schemas = Mutex::new(script.into());
        self
    }

    pub fn named_query(mut self, name: &str, expression: &str) -> Self {
        self.queries.push(NamedQuery {
            name: name.to_string(),
            expression: expression.to_string(),
        });
        self
    }

    /// Answers for successive `query` calls; the last one repeats.
    pub fn results(mut self, script: Vec<Reply<Vec<Value>>>) -> Self {
        let mut script: VecDeque<Reply<Vec<ResultRecord>>> = script
            .into_iter()
            .map(|r| r.map(|values| values.into_iter().map(ResultRecord::new).collect()))
            .collect();
        if let Some(last) = script.pop_back() {
            self.results_fallback = last;
        }
        self.results = Mutex::new(script);
        self
    }
}

#[async_trait]
impl RoomStore for MockStore {
    async fn ready(&self) -> Result<()> {
        self.journal.push("store.ready");
        if self.fail_ready {
            return Err(Error::session("ready", "log corrupt"));
        }
        Ok(())
    }

    async fn list_schemas(&self) -> Result<Vec<Schema>> {
        self.journal.push("store.list_schemas");
        pop(&self.schemas, &self.schemas_fallback)
    }

    async fn list_named_queries(&self, schema: &SchemaId) -> Result<Vec<NamedQuery>> {
        self.journal.push(format!("store.list_named_queries {}", schema));
        Ok(self.queries.clone())
    }

    async fn query(&self, _schema: &SchemaId, expression: &str) -> Result<Vec<ResultRecord>> {
        self.journal.push(format!("store.query {}", expression));
        pop(&self.results, &self.results_fallback)
    }

    async fn close(&self) -> Result<()> {
        self.journal.push("store.close");
        Ok(())
    }
}

pub struct MockDiscovery {
    journal: Journal,
    fail_join: bool,
}

#[async_trait]
impl Discovery for MockDiscovery {
    async fn join(&self, topic: DiscoveryKey) -> Result<()> {
        self.journal.push(format!("discovery.join {}", topic.to_hex()));
        if self.fail_join {
            return Err(Error::execution("no route to swarm"));
        }
        Ok(())
    }

    async fn destroy(&self) -> Result<()> {
        self.journal.push("discovery.destroy");
        Ok(())
    }
}

pub struct MockMirror {
    journal: Journal,
}

#[async_trait]
impl Mirror for MockMirror {
    async fn close(&self) -> Result<()> {
        self.journal.push("mirror.close");
        Ok(())
    }
}

/// Backend handing out one [`MockStore`]; creates the storage directory on
/// open like a real backend would.
pub struct MockBackend {
    pub journal: Journal,
    store: Arc<MockStore>,
    fail_join: bool,
    opened: Mutex<Vec<(PathBuf, bool, usize)>>,
}

impl MockBackend {
    pub fn new(journal: Journal, store: MockStore) -> Self {
        Self {
            journal,
            store: Arc::new(store),
            fail_join: false,
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_join(mut self) -> Self {
        self.fail_join = true;
        self
    }

    /// `(storage, ephemeral, blind peer count)` for every open.
    pub fn opened(&self) -> Vec<(PathBuf, bool, usize)> {
        self.opened.lock().clone()
    }
}

#[async_trait]
impl Backend for MockBackend {
    async fn open(
        &self,
        storage: &Path,
        ephemeral: bool,
        _access: &AccessDescriptor,
        blind_peers: &[BlindPeer],
    ) -> Result<Components> {
        self.journal.push("backend.open");
        std::fs::create_dir_all(storage)?;
        std::fs::write(storage.join("oplog.jsonl"), "")?;
        self.opened
            .lock()
            .push((storage.to_path_buf(), ephemeral, blind_peers.len()));
        Ok(Components {
            store: self.store.clone(),
            discovery: Arc::new(MockDiscovery {
                journal: self.journal.clone(),
                fail_join: self.fail_join,
            }),
            mirror: Arc::new(MockMirror {
                journal: self.journal.clone(),
            }),
        })
    }
}

/// A valid room key.
pub fn room_key() -> String {
    AccessDescriptor::new([7u8; 32], b"room-secret".to_vec()).encode()
}
