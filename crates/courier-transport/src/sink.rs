//! A [`Mailer`] that writes to the log instead of delivering.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::{MailError, MailId, Mailer, OutboundMail};

/// Logs every mail at `info` and reports success.
///
/// Only for development and demos. The body is never logged (it may carry
/// a registration token or a login code); only its size is.
#[derive(Debug, Default)]
pub struct LogMailer {
    next_id: AtomicU64,
}

impl LogMailer {
    /// Creates a new log mailer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of mails handed to this mailer so far.
    pub fn sent(&self) -> u64 {
        self.next_id.load(Ordering::Relaxed)
    }
}

impl Mailer for LogMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        let id = MailId::new(self.next_id.fetch_add(1, Ordering::Relaxed) + 1);
        tracing::info!(
            %id,
            to = %mail.to,
            subject = %mail.subject,
            bytes = mail.html_body.len(),
            "mail written to log sink"
        );
        Ok(())
    }
}
