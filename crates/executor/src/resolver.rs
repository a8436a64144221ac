//! Schema and query resolution
//!
//! Schema discovery tolerates a store that has not replicated anything yet:
//! it lists schemas up to [`SchemaRetryPolicy::attempts`] times, pausing in
//! between, and stops at the first non-empty answer. The first schema wins.
//!
//! Query resolution does not retry; a miss is surfaced immediately and the
//! race controller decides whether the whole attempt gets another chance.

use std::time::Duration;

use roomq_core::{Error, QuerySpec, Result, RoomStore, Schema, SchemaId};
use tracing::{debug, warn};

/// Bounded retry for schema listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaRetryPolicy {
    /// Total listing attempts, including the first
    pub attempts: usize,
    /// Pause between consecutive attempts
    pub pause: Duration,
}

impl SchemaRetryPolicy {
    /// Three attempts, two seconds apart.
    pub const DEFAULT: Self = Self {
        attempts: 3,
        pause: Duration::from_secs(2),
    };

    /// Custom policy; `attempts` is clamped to at least one.
    pub fn new(attempts: usize, pause: Duration) -> Self {
        Self {
            attempts: attempts.max(1),
            pause,
        }
    }
}

impl Default for SchemaRetryPolicy {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// A query ready to hand to the store's evaluator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutableQuery {
    /// Query name or expression, for diagnostics
    pub label: String,
    /// Expression text passed to the evaluator
    pub expression: String,
}

/// List schemas under `policy` and select the first one.
///
/// # Errors
///
/// [`Error::NoSchema`] once every attempt has come back empty or failed.
pub async fn discover_schema(store: &dyn RoomStore, policy: &SchemaRetryPolicy) -> Result<Schema> {
    for attempt in 1..=policy.attempts {
        match store.list_schemas().await {
            Ok(schemas) => {
                if let Some(first) = schemas.into_iter().next() {
                    debug!(target: "roomq::resolver", attempt, schema = %first.id, "Schema selected");
                    return Ok(first);
                }
                debug!(target: "roomq::resolver", attempt, "No schemas yet");
            }
            Err(e) => {
                warn!(target: "roomq::resolver", attempt, error = %e, "Schema listing failed");
            }
        }
        if attempt < policy.attempts {
            tokio::time::sleep(policy.pause).await;
        }
    }
    Err(Error::NoSchema {
        attempts: policy.attempts,
    })
}

/// Turn a parsed query argument into an executable query.
///
/// Expressions pass through untouched. Named queries are looked up by exact
/// name among the schema's registered queries.
pub async fn resolve_query(
    store: &dyn RoomStore,
    schema: &SchemaId,
    spec: &QuerySpec,
) -> Result<ExecutableQuery> {
    match spec {
        QuerySpec::Expression { text } => Ok(ExecutableQuery {
            label: text.clone(),
            expression: text.clone(),
        }),
        QuerySpec::Named { name, .. } => {
            let queries = store.list_named_queries(schema).await?;
            let found = queries
                .into_iter()
                .find(|q| &q.name == name)
                .ok_or_else(|| Error::QueryNotFound { name: name.clone() })?;
            debug!(target: "roomq::resolver", name = %found.name, expression = %found.expression, "Named query resolved");
            Ok(ExecutableQuery {
                label: found.name,
                expression: found.expression,
            })
        }
    }
}
