//! The concurrent dispatcher: one message, many recipients.

use std::sync::Arc;
use std::time::Duration;

use courier_transport::{Mailer, OutboundMail};
use futures_util::StreamExt;
use futures_util::stream;

use crate::{
    DispatchConfig, DispatchError, DispatchReport, RecipientOutcome, SendFailure,
    filter_recipients,
};

/// Fans a message out to a recipient list through a shared [`Mailer`].
///
/// Every send runs in its own task, so a send that panics only fails its
/// own recipient. At most `max_concurrency` sends are in flight.
pub struct Dispatcher<M> {
    mailer: Arc<M>,
    config: DispatchConfig,
}

impl<M: Mailer> Dispatcher<M> {
    pub fn new(mailer: Arc<M>, config: DispatchConfig) -> Self {
        Self { mailer, config }
    }

    pub fn config(&self) -> &DispatchConfig {
        &self.config
    }

    /// Sends `body`, rendered into the configured template, to every
    /// valid address in `recipients` and waits for all sends to finish.
    ///
    /// # Errors
    /// - [`DispatchError::NoValidRecipients`] if filtering leaves nothing.
    ///   The mailer is never called.
    /// - [`DispatchError::Failed`] if any send failed. The report inside
    ///   carries every recipient's result.
    pub async fn dispatch<S: AsRef<str>>(
        &self,
        subject: &str,
        body: &str,
        recipients: &[S],
    ) -> Result<DispatchReport, DispatchError> {
        let set = filter_recipients(recipients);
        if set.is_empty() {
            tracing::debug!(skipped = set.skipped, "dispatch aborted: no valid recipients");
            return Err(DispatchError::NoValidRecipients);
        }

        let html = self.config.template.render(body);
        let timeout = self.config.send_timeout;
        let total = set.len();

        let mut indexed: Vec<(usize, RecipientOutcome)> =
            stream::iter(set.addresses.into_iter().enumerate())
                .map(|(index, address)| {
                    let mailer = Arc::clone(&self.mailer);
                    let mail = OutboundMail::new(address.as_str(), subject, html.as_str());
                    async move {
                        let task = tokio::spawn(async move {
                            send_one(mailer.as_ref(), &mail, timeout).await
                        });
                        let result = match task.await {
                            Ok(result) => result,
                            Err(join_err) => Err(SendFailure::Aborted(join_err.to_string())),
                        };
                        if let Err(e) = &result {
                            tracing::warn!(%address, error = %e, "delivery failed");
                        }
                        (index, RecipientOutcome { address, result })
                    }
                })
                .buffer_unordered(self.config.effective_concurrency())
                .collect()
                .await;

        indexed.sort_unstable_by_key(|(index, _)| *index);
        let report = DispatchReport {
            outcomes: indexed.into_iter().map(|(_, outcome)| outcome).collect(),
            skipped: set.skipped,
        };

        let delivered = report.delivered();
        tracing::info!(
            delivered,
            failed = total - delivered,
            skipped = report.skipped,
            "dispatch finished"
        );

        if report.is_success() {
            Ok(report)
        } else {
            Err(DispatchError::Failed(report))
        }
    }
}

async fn send_one<M: Mailer>(
    mailer: &M,
    mail: &OutboundMail,
    timeout: Option<Duration>,
) -> Result<(), SendFailure> {
    match timeout {
        Some(limit) => match tokio::time::timeout(limit, mailer.send(mail)).await {
            Ok(result) => result.map_err(SendFailure::from),
            Err(_) => Err(SendFailure::TimedOut(limit)),
        },
        None => mailer.send(mail).await.map_err(SendFailure::from),
    }
}
