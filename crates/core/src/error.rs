//! Error types for roomq
//!
//! Every fatal condition an invocation can hit is a variant of [`Error`].
//! We use `thiserror` for automatic `Display` and `Error` trait implementations.
//!
//! # Retry classification
//!
//! | Variant | Retryable | Description |
//! |---------|-----------|-------------|
//! | `Decode` | No | Malformed room key or blind peer key |
//! | `Session` | No | Store could not be opened, made ready or announced |
//! | `NoSchema` | No | Schema listing exhausted its own retry budget |
//! | `QueryNotFound` | Yes | Named query not (yet) replicated |
//! | `NoResults` | Yes | Query returned an empty sequence |
//! | `Execution` | Yes | Anything else, including evaluator failures |
//! | `Io` | Yes | Local I/O failure during a query |
//! | `Interrupted` | No | Operator cancelled the invocation |

use std::io;
use thiserror::Error;

/// Result type alias for roomq operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for roomq
#[derive(Debug, Error)]
pub enum Error {
    /// The locator (or a blind peer key) is not validly encoded
    #[error("invalid key: {reason}")]
    Decode {
        /// What was wrong with the input
        reason: String,
    },

    /// Transport, readiness or discovery failure
    #[error("session error ({operation}): {reason}")]
    Session {
        /// Operation that failed (open, ready, join, ...)
        operation: String,
        /// Underlying failure
        reason: String,
    },

    /// No schema appeared within the listing retry budget
    #[error("no schema found after {attempts} attempts")]
    NoSchema {
        /// Number of listing attempts performed
        attempts: usize,
    },

    /// Named query lookup miss
    #[error("query not found: {name}")]
    QueryNotFound {
        /// The name that was looked up
        name: String,
    },

    /// Query executed but returned nothing
    #[error("no results for query: {query}")]
    NoResults {
        /// The query name or expression that was executed
        query: String,
    },

    /// Any other failure, including ones reported by the expression evaluator
    #[error("execution error: {reason}")]
    Execution {
        /// Underlying failure
        reason: String,
    },

    /// I/O error (file operations, network, etc.)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The invocation was cancelled by a signal
    #[error("interrupted")]
    Interrupted,
}

impl Error {
    /// Create a decode error
    pub fn decode(reason: impl Into<String>) -> Self {
        Self::Decode {
            reason: reason.into(),
        }
    }

    /// Create a session error for the given operation
    pub fn session(operation: impl Into<String>, reason: impl ToString) -> Self {
        Self::Session {
            operation: operation.into(),
            reason: reason.to_string(),
        }
    }

    /// Create a generic execution error
    pub fn execution(reason: impl ToString) -> Self {
        Self::Execution {
            reason: reason.to_string(),
        }
    }

    /// Whether a failed query attempt may be given another chance.
    ///
    /// Decode and session failures mean the input or connectivity is
    /// unusable; a missing schema has already spent its own retry budget.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Decode { .. } => false,
            Self::Session { .. } => false,
            Self::NoSchema { .. } => false,
            Self::Interrupted => false,
            Self::QueryNotFound { .. } => true,
            Self::NoResults { .. } => true,
            Self::Execution { .. } => true,
            Self::Io(_) => true,
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::execution(e)
    }
}
