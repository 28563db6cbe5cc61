//! Error types for the protocol layer.
//!
//! Each crate in Courier defines its own error enum. [`ProtocolError`]
//! covers encoding, decoding and input shape. [`StorageError`] is the
//! error every durable-storage seam (`IdentityStore`, `GroupStore`)
//! reports, so it lives here where all crates can see it.

/// Errors that can occur in the protocol layer.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[cfg(feature = "json")]
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed: malformed JSON, a missing field, an
    /// unknown request type.
    #[cfg(feature = "json")]
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),

    /// The value is not shaped like an email address.
    #[error("invalid email address: {0:?}")]
    InvalidEmail(String),
}

/// Errors reported by durable storage collaborators.
///
/// Lookups that simply find nothing return `Ok(None)`. `NotFound` is for
/// writes that target a record that doesn't exist.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StorageError {
    /// A record with the same unique key already exists.
    #[error("record already exists: {0}")]
    Conflict(String),

    /// The record to update or delete does not exist.
    #[error("record not found: {0}")]
    NotFound(String),

    /// The backing store failed.
    #[error("storage unavailable: {0}")]
    Unavailable(String),
}
