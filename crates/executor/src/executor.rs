//! Query execution

use roomq_core::{Error, Result, ResultRecord, RoomStore, SchemaId};
use tracing::debug;

use crate::resolver::ExecutableQuery;

/// Run `query` against `schema`.
///
/// # Errors
///
/// [`Error::NoResults`] when the store returns an empty sequence; evaluator
/// failures are passed through.
pub async fn execute(
    store: &dyn RoomStore,
    schema: &SchemaId,
    query: &ExecutableQuery,
) -> Result<Vec<ResultRecord>> {
    let records = store.query(schema, &query.expression).await?;
    if records.is_empty() {
        return Err(Error::NoResults {
            query: query.label.clone(),
        });
    }
    debug!(target: "roomq::executor", query = %query.label, results = records.len(), "Query executed");
    Ok(records)
}
