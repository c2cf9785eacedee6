//! Error types for the cache
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type shared by every backend.
///
/// Absence is not uniformly an error: `get`/`exists`/`exist_hash`/`mget`
/// report missing keys through their return values, while the hash accessors
/// (`get_hash`, `get_hash_field`, `del_hash`, `expire_hash`) fail with
/// [`CacheError::NotFound`]. Callers relying on one shape for both will
/// mishandle the other.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Key not found in cache
    #[error("Key not found: {0}")]
    NotFound(String),

    /// Key exists but its TTL has lapsed
    #[error("Key expired: {0}")]
    Expired(String),

    /// Hash exists but does not contain the requested field
    #[error("Field {field} not found in hash {key}")]
    FieldNotFound { key: String, field: String },

    /// Invalid request data
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// The codec cannot encode a value of this shape
    #[error("Unsupported type for field {field}: {reason}")]
    UnsupportedType { field: String, reason: String },

    /// Malformed data encountered while encoding or decoding
    #[error("Encoding failure: {0}")]
    Encoding(String),

    /// Operation attempted after `close`
    #[error("Cache is closed")]
    Closed,

    /// The networked backend could not reach or talk to the remote store
    #[error("Connection error: {0}")]
    Connection(String),

    /// The remote store replied with something the backend cannot interpret
    #[error("Protocol error: {0}")]
    Protocol(String),
}

// == Result Type Alias ==
/// Convenience Result type for cache operations.
pub type Result<T> = std::result::Result<T, CacheError>;
