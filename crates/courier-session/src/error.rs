//! Error types for the session layer.

use courier_protocol::StorageError;
use courier_transport::MailError;

/// Errors raised while constructing session components.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The signing secret is too short to be used for HMAC-SHA256.
    #[error("session secret must be at least {min} bytes, got {len}")]
    WeakSecret { len: usize, min: usize },

    /// The secret was rejected by the MAC implementation.
    #[error("invalid signing key: {0}")]
    InvalidKey(String),
}

/// Why a session credential was not accepted.
///
/// Callers outside this crate should collapse every variant into a single
/// "unauthorized" answer. The variants exist for logging.
#[derive(Debug, thiserror::Error)]
pub enum TokenError {
    /// Not three dot-separated base64url segments, or a segment that does
    /// not decode to the expected JSON.
    #[error("malformed credential: {0}")]
    Malformed(&'static str),

    /// The header names an algorithm other than HS256.
    #[error("unsupported algorithm {0:?}")]
    UnsupportedAlgorithm(String),

    /// The signature does not match the header and claims.
    #[error("signature mismatch")]
    BadSignature,

    /// `now` is past `exp` plus the configured leeway.
    #[error("credential expired at {exp} (now {now})")]
    Expired { exp: u64, now: u64 },

    /// The claims could not be serialized while issuing.
    #[error("failed to encode claims: {0}")]
    Encode(#[source] serde_json::Error),
}

/// Errors from the registration and login flow.
///
/// The `Display` text of the authentication variants is what a caller
/// sees, so each one is deliberately uniform: `InvalidCredentials` reads
/// the same whether the email was unknown or the password was wrong.
#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    /// The request itself is malformed (bad email, empty password).
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An identity with this email already exists.
    #[error("email is already registered")]
    Conflict,

    /// The registration token is unknown, already used, or expired.
    #[error("invalid or expired token")]
    InvalidOrExpiredToken,

    /// Unknown email or wrong password. Never says which.
    #[error("invalid email or password")]
    InvalidCredentials,

    /// The login code is wrong, already used, or expired.
    #[error("invalid or expired login code")]
    InvalidOrExpiredCode,

    /// Durable identity storage failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// The notification mail could not be delivered.
    #[error("failed to deliver notification: {0}")]
    Delivery(#[from] MailError),

    /// Password hashing failed or its worker task died.
    #[error("password hashing failed: {0}")]
    Hashing(String),

    /// The session credential could not be issued.
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Errors from the ownership gate.
#[derive(Debug, thiserror::Error)]
pub enum GateError {
    /// Missing, invalid or expired credential, or not the owner.
    #[error("unauthorized")]
    Unauthorized,

    /// The credential is valid but its identity no longer exists.
    #[error("identity not found")]
    NotFound,

    /// Identity lookup failed.
    #[error(transparent)]
    Storage(#[from] StorageError),
}
