//! Core types and traits for roomq
//!
//! This crate defines the foundational types used throughout the system:
//! - AccessDescriptor: store identifier + secret decoded from a room key
//! - QuerySpec: the named-query / expression input grammars
//! - Schema, NamedQuery, ResultRecord: records exchanged with the store
//! - Error: the fatal-condition taxonomy and its retry classification
//! - Traits: collaborator boundary (Backend, RoomStore, Discovery, Mirror)

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod access;
pub mod error;
pub mod query;
pub mod traits;
pub mod types;

pub use access::{to_hex, AccessDescriptor, BlindPeer, DiscoveryKey, IDENTIFIER_LEN};
pub use error::{Error, Result};
pub use query::QuerySpec;
pub use traits::{Backend, Components, Discovery, Mirror, RoomStore};
pub use types::{NamedQuery, ResultRecord, Schema, SchemaId};
