//! Error types for associum operations
//!
//! Misses (a key that was never stored, a query part that was never interned)
//! are not errors: they surface as `None`, `false` or an empty result. The
//! variants here are usage faults and resource limits, each carrying enough
//! context to tell the caller which limit was hit.

use thiserror::Error;

/// Associum error types with detailed context
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AssocError {
    /// A key has more components than the container allows
    #[error("key has {arity} components, limit is {limit}")]
    KeyTooWide {
        /// Number of components in the rejected key
        arity: usize,
        /// Configured `max_key_arity`
        limit: usize,
    },

    /// A structured key names the same field twice
    #[error("field {field} appears more than once in a structured key")]
    DuplicateField {
        /// Debug rendering of the repeated field name
        field: String,
    },

    /// A collection value would exceed the configured length
    #[error("collection would grow to {len} elements, limit is {limit}")]
    CollectionTooLong {
        /// Length the collection would have reached
        len: usize,
        /// Configured `max_collection_len`
        limit: usize,
    },

    /// Every keylet identifier of an interner is in use
    #[error("keylet space exhausted after {issued} identifiers")]
    KeyletSpaceExhausted {
        /// Identifiers issued so far
        issued: u64,
    },

    /// Configuration rejected by `AssocConfig::validate`
    #[error("invalid configuration: {reason}")]
    InvalidConfig {
        /// Which parameter was rejected and why
        reason: String,
    },
}

/// Result type alias for associum operations
pub type AssocResult<T> = Result<T, AssocError>;
