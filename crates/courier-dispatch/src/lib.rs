//! Concurrent message dispatch for Courier.
//!
//! [`Dispatcher::dispatch`] takes one subject and body plus a raw recipient
//! list, cleans the list ([`filter_recipients`]), and sends to every
//! remaining address concurrently through a [`Mailer`](courier_transport::Mailer).
//! The call returns once every send has finished:
//!
//! ```text
//! recipients ──filter──→ [a, b, c] ──┬─ send(a) ─┐
//!                                    ├─ send(b) ─┼──→ DispatchReport
//!                                    └─ send(c) ─┘
//! ```
//!
//! A single failed send fails the whole dispatch, but the error carries the
//! full per-recipient report so the caller knows exactly who got the
//! message.

mod config;
mod dispatcher;
mod error;
mod recipients;
mod report;

pub use config::DispatchConfig;
pub use dispatcher::Dispatcher;
pub use error::DispatchError;
pub use recipients::{RecipientSet, filter_recipients};
pub use report::{DispatchReport, RecipientOutcome, SendFailure};
