//! Identity and session management for Courier.
//!
//! This crate proves who a caller is and what they own:
//!
//! 1. **Registration**: an email and password become a pending identity,
//!    confirmed by a token sent to that address ([`AuthFlow::register`],
//!    [`AuthFlow::verify_registration`]).
//! 2. **Two-step login**: a password check mails a one-time code, and the
//!    code buys a signed session credential ([`AuthFlow::login`],
//!    [`AuthFlow::verify_login_code`]).
//! 3. **Authorization**: the [`OwnershipGate`] turns a credential back
//!    into an identity and compares it with a resource's owner.
//!
//! # How it fits in the stack
//!
//! ```text
//! Courier service (above)  ← runs requests through the flow and the gate
//!     ↕
//! Session layer (this crate)  ← credential store, issuer, flow, gate
//!     ↕
//! Protocol + Transport (below)  ← identities, emails, the Mailer seam
//! ```

#![allow(async_fn_in_trait)]

mod config;
mod directory;
mod error;
mod flow;
mod gate;
mod secrets;
mod store;
mod token;

pub use config::{Notices, SessionConfig, SessionSecret, TOKEN_PLACEHOLDER};
pub use courier_transport::MESSAGE_PLACEHOLDER;
pub use directory::{IdentityStore, MemoryIdentityStore};
pub use error::{AuthError, GateError, SessionError, TokenError};
pub use flow::AuthFlow;
pub use gate::{OwnershipGate, check_owner};
pub use secrets::{
    USER_ID_LEN, derive_user_id, generate_code, generate_token, hash_password, verify_password,
};
pub use store::{CredentialStore, SweepStats, spawn_sweeper};
pub use token::{Claims, SessionIssuer, SessionToken};
