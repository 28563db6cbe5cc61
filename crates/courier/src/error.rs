//! Unified error type for Courier.

use courier_dispatch::DispatchError;
use courier_protocol::{Outcome, ProtocolError, StorageError};
use courier_session::{AuthError, GateError, SessionError};

/// Errors from group management.
#[derive(Debug, thiserror::Error)]
pub enum GroupError {
    /// The group draft or patch breaks a validation rule.
    #[error("invalid group: {0}")]
    InvalidDraft(String),

    /// A recipient list or body could not be read from its source.
    #[error("could not resolve content: {0}")]
    Content(String),

    /// No group with this id exists.
    #[error("group not found")]
    NotFound,
}

/// Errors raised while loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required environment variable is unset.
    #[error("missing environment variable {0}")]
    Missing(&'static str),

    /// An environment variable is set but unusable.
    #[error("invalid value for {var}: {reason}")]
    Invalid { var: &'static str, reason: String },

    #[error(transparent)]
    Session(#[from] SessionError),
}

/// Top-level error that wraps all crate-specific errors.
///
/// Every request handler returns this, and [`CourierError::outcome`]
/// decides what the caller sees. The `#[from]` attribute on each variant
/// lets `?` convert sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum CourierError {
    /// Malformed request bytes or fields.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// Durable storage failure.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Registration or login failure.
    #[error(transparent)]
    Auth(#[from] AuthError),

    /// Credential or ownership failure.
    #[error(transparent)]
    Gate(#[from] GateError),

    /// Dispatch failure, with per-recipient detail when sends ran.
    #[error(transparent)]
    Dispatch(#[from] DispatchError),

    /// Group validation or lookup failure.
    #[error(transparent)]
    Group(#[from] GroupError),

    /// Session component construction failure.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Configuration failure.
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl CourierError {
    /// The caller-facing outcome for this error.
    pub fn outcome(&self) -> Outcome {
        match self {
            Self::Protocol(_) => Outcome::InvalidInput,
            Self::Storage(e) => storage_outcome(e),
            Self::Auth(e) => match e {
                AuthError::InvalidInput(_) => Outcome::InvalidInput,
                AuthError::Conflict => Outcome::Conflict,
                AuthError::InvalidOrExpiredToken => Outcome::InvalidOrExpiredToken,
                AuthError::InvalidCredentials => Outcome::InvalidCredentials,
                AuthError::InvalidOrExpiredCode => Outcome::InvalidOrExpiredCode,
                AuthError::Storage(_)
                | AuthError::Delivery(_)
                | AuthError::Hashing(_)
                | AuthError::Token(_) => Outcome::Internal,
            },
            Self::Gate(e) => match e {
                GateError::Unauthorized => Outcome::Unauthorized,
                GateError::NotFound => Outcome::NotFound,
                GateError::Storage(_) => Outcome::Internal,
            },
            Self::Dispatch(e) => match e {
                DispatchError::NoValidRecipients => Outcome::NoValidRecipients,
                DispatchError::Failed(_) => Outcome::DispatchPartialOrFullFailure,
            },
            Self::Group(e) => match e {
                GroupError::InvalidDraft(_) | GroupError::Content(_) => Outcome::InvalidInput,
                GroupError::NotFound => Outcome::NotFound,
            },
            Self::Session(_) | Self::Config(_) => Outcome::Internal,
        }
    }

    /// The status code paired with [`outcome`](Self::outcome).
    pub fn status(&self) -> u16 {
        self.outcome().status()
    }

    /// Text safe to show the caller.
    ///
    /// Internal failures are summarized without their cause; the cause is
    /// logged instead.
    pub fn public_message(&self) -> String {
        match self.outcome() {
            Outcome::Internal => "internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

fn storage_outcome(e: &StorageError) -> Outcome {
    match e {
        StorageError::Conflict(_) => Outcome::Conflict,
        StorageError::NotFound(_) => Outcome::NotFound,
        StorageError::Unavailable(_) => Outcome::Internal,
    }
}
