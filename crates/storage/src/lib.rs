//! Local replica collaborator for roomq
//!
//! This crate implements the store-side collaborators behind the traits in
//! `roomq-core`:
//! - Replica: file-backed append-only operation log with an in-memory view
//! - Expression: the minimal `collection where field = value` evaluator
//! - Swarm: TCP replication listener plus file-based peer announcements
//! - BlindMirror: replication links to known blind peers
//! - LocalBackend: opens all of the above for one storage directory

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod backend;
pub mod config;
pub mod discovery;
pub mod expr;
pub mod mirror;
pub mod oplog;
pub mod replica;
pub mod swarm;
pub mod wire;

pub use backend::LocalBackend;
pub use config::{ReplicaConfig, CONFIG_FILE_NAME};
pub use discovery::Announcements;
pub use expr::Expression;
pub use mirror::BlindMirror;
pub use oplog::{Entry, Op, StoredRecord, View};
pub use replica::Replica;
pub use swarm::Swarm;
pub use wire::{replicate, Frame};
