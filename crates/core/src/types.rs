//! Records exchanged with the room store
//!
//! - [`SchemaId`] / [`Schema`]: logical grouping of queryable records
//! - [`NamedQuery`]: pre-registered expression bound to a name
//! - [`ResultRecord`]: one row of a query result
//!
//! `ResultRecord::json` is a `serde_json::Value` built with the
//! `preserve_order` feature, so object fields keep the order the store
//! produced them in. Single-value output depends on that order.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Opaque schema identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaId(pub String);

impl SchemaId {
    /// Create a schema id from any string-like value
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the id as a string
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SchemaId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A schema discovered in the room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Schema {
    /// Schema identifier
    pub id: SchemaId,
}

/// A named query registered against a schema
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NamedQuery {
    /// Exact, case-sensitive lookup name
    pub name: String,
    /// Expression executed when the name is resolved
    pub expression: String,
}

/// One result row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    /// Row payload; object fields keep store order
    pub json: Value,
}

impl ResultRecord {
    /// Wrap a JSON value as a result record
    pub fn new(json: Value) -> Self {
        Self { json }
    }
}
