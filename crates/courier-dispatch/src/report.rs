//! Per-recipient results of one dispatch.

use std::time::Duration;

use courier_protocol::{DispatchSummary, RecipientFailure};
use courier_transport::MailError;

/// Why one recipient did not get the message.
#[derive(Debug, thiserror::Error)]
pub enum SendFailure {
    /// The mailer returned an error.
    #[error(transparent)]
    Mail(#[from] MailError),

    /// The send did not finish within the configured deadline.
    #[error("send timed out after {0:?}")]
    TimedOut(Duration),

    /// The send task panicked or was cancelled.
    #[error("send task aborted: {0}")]
    Aborted(String),
}

/// What happened for one recipient.
#[derive(Debug)]
pub struct RecipientOutcome {
    pub address: String,
    pub result: Result<(), SendFailure>,
}

impl RecipientOutcome {
    pub fn is_delivered(&self) -> bool {
        self.result.is_ok()
    }
}

/// Every send a dispatch launched, in recipient order.
#[derive(Debug, Default)]
pub struct DispatchReport {
    pub outcomes: Vec<RecipientOutcome>,
    /// Input entries dropped before sending.
    pub skipped: usize,
}

impl DispatchReport {
    /// Number of recipients the mailer accepted.
    pub fn delivered(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_delivered()).count()
    }

    /// The outcomes that failed.
    pub fn failures(&self) -> impl Iterator<Item = &RecipientOutcome> {
        self.outcomes.iter().filter(|o| !o.is_delivered())
    }

    /// `true` when every launched send succeeded.
    pub fn is_success(&self) -> bool {
        self.outcomes.iter().all(RecipientOutcome::is_delivered)
    }

    /// Converts into the wire summary: delivered count plus every
    /// failure with its error text.
    pub fn summary(&self) -> DispatchSummary {
        DispatchSummary {
            delivered: self.delivered(),
            failures: self
                .outcomes
                .iter()
                .filter_map(|o| match &o.result {
                    Ok(()) => None,
                    Err(e) => Some(RecipientFailure {
                        address: o.address.clone(),
                        error: e.to_string(),
                    }),
                })
                .collect(),
        }
    }
}
