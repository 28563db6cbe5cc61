//! Shared vocabulary for Courier.
//!
//! This crate defines the types every other layer speaks:
//!
//! - **Domain types** ([`Identity`], [`Group`], [`UserId`], [`GroupId`],
//!   [`EmailAddress`]): the records passed between session, dispatch and
//!   storage.
//! - **Wire types** ([`Envelope`], [`Request`], [`Response`],
//!   [`Outcome`]): what callers send and receive.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how envelopes become
//!   bytes.
//! - **Errors** ([`ProtocolError`], [`StorageError`]).
//!
//! ```text
//! Caller (bytes) → Protocol (Envelope) → Session / Dispatch
//! ```

mod codec;
mod error;
mod types;

pub use codec::Codec;
#[cfg(feature = "json")]
pub use codec::JsonCodec;
pub use error::{ProtocolError, StorageError};
pub use types::{
    DispatchSummary, EmailAddress, Envelope, Group, GroupId, GroupPatch,
    Identity, IdentityView, NewGroup, Outcome, Payload, RecipientFailure,
    Request, Response, UserId, is_valid_email,
};
