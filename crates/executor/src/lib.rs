//! # roomq executor
//!
//! Orchestration layer that answers one query against a replicated room.
//!
//! This is the only crate callers need besides a [`Backend`]. It provides:
//! - [`Client`] - runs an [`Invocation`] end to end
//! - [`StoreSession`] - readiness and discovery for one open store
//! - [`discover_schema`] / [`resolve_query`] - schema retry and query lookup
//! - [`RaceController`] - immediate attempt plus one delayed fallback
//! - [`format`] - projection and shell/JSON encoding
//! - [`Lifecycle`] - exactly-once teardown and ephemeral storage removal
//!
//! ## Quick Start
//!
//! ```text
//! use roomq_executor::{Client, Invocation, OutputOptions, QuerySpec};
//! use roomq_storage::LocalBackend;
//!
//! let client = Client::new(LocalBackend::new());
//! let output = client.run(&Invocation {
//!     locator: room_key,
//!     query: QuerySpec::parse("api-config:api-key", true),
//!     storage: None,
//!     blind_peers: vec![],
//!     output: OutputOptions { json: false, export: true },
//!     debug: false,
//! }).await?;
//! ```

#![warn(missing_docs)]

mod client;
mod executor;
mod lifecycle;
mod output;
mod race;
mod resolver;
mod session;

// =============================================================================
// Public API
// =============================================================================

pub use client::{Client, Invocation};
pub use executor::execute;
pub use lifecycle::{Lifecycle, StoragePath, EPHEMERAL_PREFIX};
pub use output::{
    escape_shell_value, format, project, property_to_var_name, render, render_value,
    OutputMode, OutputOptions, Projection,
};
pub use race::{Attempt, RaceController, RETRY_DELAY};
pub use resolver::{discover_schema, resolve_query, ExecutableQuery, SchemaRetryPolicy};
pub use session::StoreSession;

// Re-export core types so callers don't need roomq-core directly
pub use roomq_core::{
    AccessDescriptor, Backend, BlindPeer, Components, Discovery, DiscoveryKey, Error, Mirror,
    NamedQuery, QuerySpec, Result, ResultRecord, RoomStore, Schema, SchemaId,
};
