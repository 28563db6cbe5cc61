//! Outbound mail abstraction for Courier.
//!
//! Provides the [`Mailer`] trait that every delivery path goes through:
//! the registration token mail, the login code mail, and each send of a
//! group dispatch. How the bytes actually reach a relay (SMTP, an HTTP
//! mail API, a queue) is the implementor's business.
//!
//! [`LogMailer`] is a development implementation that only logs.

mod error;
mod sink;

pub use error::MailError;
pub use sink::LogMailer;

use std::fmt;
use std::future::Future;
use std::sync::Arc;

/// A single HTML message addressed to a single recipient.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMail {
    pub to: String,
    pub subject: String,
    pub html_body: String,
}

impl OutboundMail {
    /// Creates a new outbound mail.
    pub fn new(
        to: impl Into<String>,
        subject: impl Into<String>,
        html_body: impl Into<String>,
    ) -> Self {
        Self {
            to: to.into(),
            subject: subject.into(),
            html_body: html_body.into(),
        }
    }
}

/// Placeholder substituted with the message text in login-code and
/// dispatch templates.
pub const MESSAGE_PLACEHOLDER: &str = "{{MESSAGE}}";

/// An HTML template with a single `{{PLACEHOLDER}}`-style slot.
///
/// Rendering is a plain substitution of every occurrence; the value is NOT
/// escaped, because group bodies are themselves HTML.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlTemplate {
    source: String,
    placeholder: &'static str,
}

impl HtmlTemplate {
    /// Creates a template from its HTML source and the placeholder it fills.
    pub fn new(source: impl Into<String>, placeholder: &'static str) -> Self {
        Self {
            source: source.into(),
            placeholder,
        }
    }

    /// Substitutes `value` for every occurrence of the placeholder.
    pub fn render(&self, value: &str) -> String {
        self.source.replace(self.placeholder, value)
    }

    /// The placeholder this template fills, e.g. `{{MESSAGE}}`.
    pub fn placeholder(&self) -> &'static str {
        self.placeholder
    }
}

/// Opaque identifier for a mail handed to a [`LogMailer`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MailId(u64);

impl MailId {
    /// Creates a new `MailId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for MailId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "mail-{}", self.0)
    }
}

/// Delivers one message to one recipient.
///
/// # Trait bounds
///
/// - `Send + Sync` → one mailer is shared by every request task and by
///   every concurrent send inside a dispatch.
/// - `'static` → it lives as long as the service.
///
/// Each call is independent: a failure for one recipient says nothing
/// about the next. Implementations must not retry on their own; the
/// caller decides what a failure means.
///
/// # Example
///
/// ```rust
/// use courier_transport::{MailError, Mailer, OutboundMail};
///
/// /// Refuses everything. Handy for exercising failure paths.
/// struct Blackhole;
///
/// impl Mailer for Blackhole {
///     async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
///         Err(MailError::Rejected(format!("{} is not deliverable", mail.to)))
///     }
/// }
/// ```
pub trait Mailer: Send + Sync + 'static {
    /// Hands `mail` to the delivery channel.
    ///
    /// # Returns
    /// - `Ok(())`: the channel accepted the message
    /// - `Err(MailError)`: this recipient did not get it
    fn send(
        &self,
        mail: &OutboundMail,
    ) -> impl Future<Output = Result<(), MailError>> + Send;
}

impl<M: Mailer> Mailer for Arc<M> {
    fn send(
        &self,
        mail: &OutboundMail,
    ) -> impl Future<Output = Result<(), MailError>> + Send {
        (**self).send(mail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_template_render_replaces_every_placeholder() {
        let tpl = HtmlTemplate::new("<p>{{MESSAGE}}</p><i>{{MESSAGE}}</i>", "{{MESSAGE}}");
        assert_eq!(tpl.render("hi"), "<p>hi</p><i>hi</i>");
    }

    #[test]
    fn test_template_render_without_placeholder_is_unchanged() {
        let tpl = HtmlTemplate::new("<p>static</p>", "{{TOKEN}}");
        assert_eq!(tpl.render("abc"), "<p>static</p>");
        assert_eq!(tpl.placeholder(), "{{TOKEN}}");
    }

    #[test]
    fn test_mail_id_display() {
        assert_eq!(MailId::new(7).to_string(), "mail-7");
        assert_eq!(MailId::new(7).into_inner(), 7);
    }

    #[tokio::test]
    async fn test_arc_mailer_delegates() {
        let mailer = Arc::new(LogMailer::new());
        let mail = OutboundMail::new("a@x.com", "hello", "<p>hi</p>");
        mailer.send(&mail).await.expect("log mailer never fails");
        assert_eq!(mailer.sent(), 1);
    }
}
