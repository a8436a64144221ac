//! roomq - resolve configuration values from a replicated room
//!
//! A room is a peer-synchronized store addressed by an encoded room key.
//! roomq opens a local replica, waits briefly for data to arrive, runs one
//! named query or expression and renders the result as a bare value, shell
//! assignments or JSON.
//!
//! # Quick Start
//!
//! ```ignore
//! use roomq::{Client, Invocation, LocalBackend, OutputOptions, QuerySpec};
//!
//! let client = Client::new(LocalBackend::new());
//! let output = client
//!     .run(&Invocation {
//!         locator: room_key,
//!         query: QuerySpec::parse("api-config", true),
//!         storage: None,
//!         blind_peers: vec![],
//!         output: OutputOptions::default(),
//!         debug: false,
//!     })
//!     .await?;
//! ```
//!
//! # Architecture
//!
//! Orchestration lives in the executor and talks to the store only through
//! the collaborator traits ([`Backend`], [`RoomStore`], [`Discovery`],
//! [`Mirror`]). [`LocalBackend`] is the file-replica implementation the
//! command-line tool uses.

// Re-export the public API from roomq-executor
pub use roomq_executor::*;

// The default backend
pub use roomq_storage::{LocalBackend, ReplicaConfig};
