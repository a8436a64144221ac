//! Operation log entries and the view materialized from them
//!
//! The replica is an append-only log of [`Entry`] values, one JSON object per
//! line. Entries are idempotent by `id`, so replaying or re-receiving an
//! entry is harmless.
//!
//! ```text
//! {"id":"…","op":{"type":"schema","id":"main"}}
//! {"id":"…","op":{"type":"query","schema":"main","name":"env","expression":"settings"}}
//! {"id":"…","op":{"type":"record","schema":"main","collection":"settings","key":"prod","value":{…}}}
//! ```

use roomq_core::{NamedQuery, SchemaId};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single log operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Op {
    /// Declares a schema
    Schema {
        /// Schema identifier
        id: SchemaId,
    },
    /// Registers (or replaces) a named query
    Query {
        /// Owning schema
        schema: SchemaId,
        /// Lookup name
        name: String,
        /// Expression text
        expression: String,
    },
    /// Writes a record into a collection
    Record {
        /// Owning schema
        schema: SchemaId,
        /// Collection name
        collection: String,
        /// Records with the same key replace each other; keyless ones append
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        /// Record payload
        value: Value,
    },
}

/// A log entry: an operation plus its unique id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entry {
    /// Unique entry id (UUID v4 text)
    pub id: String,
    /// The operation
    pub op: Op,
}

impl Entry {
    /// Wrap an operation with a fresh id.
    pub fn new(op: Op) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            op,
        }
    }
}

/// A record as seen by the evaluator.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredRecord {
    /// Owning schema
    pub schema: SchemaId,
    /// Collection name
    pub collection: String,
    /// Replacement key, if any
    pub key: Option<String>,
    /// Payload
    pub value: Value,
}

/// Current state derived from the log.
#[derive(Debug, Default)]
pub struct View {
    schemas: Vec<SchemaId>,
    queries: Vec<(SchemaId, NamedQuery)>,
    records: Vec<StoredRecord>,
}

impl View {
    /// Fold one operation into the view.
    pub fn apply(&mut self, op: &Op) {
        match op {
            Op::Schema { id } => {
                if !self.schemas.contains(id) {
                    self.schemas.push(id.clone());
                }
            }
            Op::Query {
                schema,
                name,
                expression,
            } => {
                let existing = self
                    .queries
                    .iter_mut()
                    .find(|(s, q)| s == schema && &q.name == name);
                match existing {
                    Some((_, query)) => query.expression = expression.clone(),
                    None => self.queries.push((
                        schema.clone(),
                        NamedQuery {
                            name: name.clone(),
                            expression: expression.clone(),
                        },
                    )),
                }
            }
            Op::Record {
                schema,
                collection,
                key,
                value,
            } => {
                let record = StoredRecord {
                    schema: schema.clone(),
                    collection: collection.clone(),
                    key: key.clone(),
                    value: value.clone(),
                };
                if key.is_some() {
                    self.records.retain(|r| {
                        !(&r.schema == schema && &r.collection == collection && &r.key == key)
                    });
                }
                self.records.push(record);
            }
        }
    }

    /// Schemas in first-seen order.
    pub fn schemas(&self) -> &[SchemaId] {
        &self.schemas
    }

    /// Named queries registered for `schema`, in first-seen order.
    pub fn queries(&self, schema: &SchemaId) -> Vec<NamedQuery> {
        self.queries
            .iter()
            .filter(|(s, _)| s == schema)
            .map(|(_, q)| q.clone())
            .collect()
    }

    /// Records of one collection in `schema`, in log order.
    pub fn records<'a>(
        &'a self,
        schema: &'a SchemaId,
        collection: &'a str,
    ) -> impl Iterator<Item = &'a StoredRecord> + 'a {
        self.records
            .iter()
            .filter(move |r| &r.schema == schema && r.collection == collection)
    }
}
