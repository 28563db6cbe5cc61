/// Errors a [`Mailer`](crate::Mailer) can report for a single delivery.
///
/// Every variant is about ONE recipient: the dispatcher attributes it to
/// the address it was sending to.
#[derive(Debug, thiserror::Error)]
pub enum MailError {
    /// The relay refused this recipient or this message.
    #[error("rejected by relay: {0}")]
    Rejected(String),

    /// Could not reach the relay at all.
    #[error("connection failed: {0}")]
    ConnectionFailed(#[source] std::io::Error),

    /// The relay accepted the connection but the exchange failed midway.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// The mailer was shut down.
    #[error("mailer shut down")]
    Shutdown,
}
