//! Error types for dispatch.

use crate::DispatchReport;

/// Why a dispatch did not fully succeed.
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Nothing in the recipient list looked like an email address.
    /// No send was attempted.
    #[error("no valid recipients")]
    NoValidRecipients,

    /// At least one send failed. The report holds every recipient's
    /// result; sends that succeeded are not rolled back.
    #[error("{} of {} sends failed", .0.failures().count(), .0.outcomes.len())]
    Failed(DispatchReport),
}
