//! # Courier
//!
//! Account-gated group mailing.
//!
//! Callers register with an email and password, confirm the address with
//! a mailed token, and sign in with a password plus a mailed one-time
//! code. A signed-in caller owns groups (a recipient list, a subject and
//! an HTML body) and can send a group's message to every recipient
//! concurrently.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use courier::prelude::*;
//!
//! # async fn run() -> Result<(), CourierError> {
//! courier::telemetry::init();
//! let config = CourierConfig::from_env()?;
//! let courier = Courier::builder(config)
//!     .build_in_memory(LogMailer::new())
//!     .await?;
//!
//! let response = courier
//!     .handle(Envelope {
//!         credential: None,
//!         request: Request::Register {
//!             email: "alice@example.com".into(),
//!             password: "correct horse".into(),
//!         },
//!     })
//!     .await;
//! assert_eq!(response.outcome, Outcome::Accepted);
//! # Ok(())
//! # }
//! ```

mod config;
mod content;
mod error;
mod groups;
mod handler;
mod service;
pub mod telemetry;

pub use config::{
    CourierConfig, ENV_DISPATCH_CONCURRENCY, ENV_SEND_TIMEOUT_SECS, ENV_SESSION_SECRET,
    ENV_SESSION_TTL_SECS, ENV_TOKEN_LEEWAY_SECS,
};
pub use content::{BodySource, ContentResolver, CsvSource, FsContentResolver, first_column};
pub use error::{ConfigError, CourierError, GroupError};
pub use groups::{GroupDraft, GroupService, GroupStore, MemoryGroupStore, new_group_id};
pub use handler::{RequestHandler, error_response};
pub use service::{Courier, CourierBuilder};

/// Re-exports of the types most callers need.
pub mod prelude {
    pub use crate::{
        ContentResolver, Courier, CourierBuilder, CourierConfig, CourierError, FsContentResolver,
        GroupStore, MemoryGroupStore, RequestHandler,
    };
    pub use courier_dispatch::{DispatchConfig, DispatchError, DispatchReport};
    pub use courier_protocol::{
        Envelope, Group, GroupId, GroupPatch, NewGroup, Outcome, Payload, Request, Response,
        UserId,
    };
    pub use courier_session::{
        IdentityStore, MemoryIdentityStore, Notices, SessionConfig, SessionSecret,
    };
    pub use courier_transport::{LogMailer, MailError, Mailer, OutboundMail};
}
