//! Session configuration: lifetimes, limits, the signing secret, and the
//! wording of the two notification mails.

use std::fmt;
use std::time::Duration;

use courier_transport::{HtmlTemplate, MESSAGE_PLACEHOLDER};

use crate::SessionError;

// ---------------------------------------------------------------------------
// SessionConfig
// ---------------------------------------------------------------------------

/// Timeouts and limits for the auth flow.
///
/// Create one with `SessionConfig::default()` and override the fields you
/// care about.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Lifetime of an issued session credential. Default: 24 hours.
    pub session_ttl: Duration,

    /// Clock-skew allowance applied when checking a credential's expiry.
    /// Default: zero, so a credential dies exactly at `exp`.
    pub leeway: Duration,

    /// How long an unconfirmed registration stays redeemable.
    /// `None` keeps it until redeemed or the process restarts.
    /// Default: 24 hours.
    pub pending_ttl: Option<Duration>,

    /// How long a login code stays redeemable. `None` means no expiry.
    /// Default: 10 minutes.
    pub challenge_ttl: Option<Duration>,

    /// Wrong guesses allowed against one login code before it is thrown
    /// away. Default: 5.
    pub max_code_attempts: u32,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(24 * 60 * 60),
            leeway: Duration::ZERO,
            pending_ttl: Some(Duration::from_secs(24 * 60 * 60)),
            challenge_ttl: Some(Duration::from_secs(10 * 60)),
            max_code_attempts: 5,
        }
    }
}

// ---------------------------------------------------------------------------
// SessionSecret
// ---------------------------------------------------------------------------

/// The HMAC key session credentials are signed with.
///
/// Supplied by deployment configuration and never compiled in. `Debug`
/// prints only the length.
#[derive(Clone)]
pub struct SessionSecret(Vec<u8>);

impl SessionSecret {
    /// Minimum accepted key length: one full SHA-256 block of entropy.
    pub const MIN_LEN: usize = 32;

    /// Wraps `bytes` as a signing secret.
    ///
    /// # Errors
    /// Returns [`SessionError::WeakSecret`] if `bytes` is shorter than
    /// [`Self::MIN_LEN`].
    pub fn new(bytes: impl Into<Vec<u8>>) -> Result<Self, SessionError> {
        let bytes = bytes.into();
        if bytes.len() < Self::MIN_LEN {
            return Err(SessionError::WeakSecret {
                len: bytes.len(),
                min: Self::MIN_LEN,
            });
        }
        Ok(Self(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        &self.0
    }
}

impl fmt::Debug for SessionSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SessionSecret({} bytes)", self.0.len())
    }
}

// ---------------------------------------------------------------------------
// Notices
// ---------------------------------------------------------------------------

/// Placeholder the verification template substitutes the token into.
pub const TOKEN_PLACEHOLDER: &str = "{{TOKEN}}";

/// Subjects and bodies of the registration and login-code mails.
#[derive(Debug, Clone)]
pub struct Notices {
    pub verification_subject: String,
    /// Rendered with the registration token.
    pub verification_template: HtmlTemplate,
    pub login_subject: String,
    /// Rendered with the 6-digit login code.
    pub login_template: HtmlTemplate,
}

impl Default for Notices {
    fn default() -> Self {
        Self {
            verification_subject: "Verify Your Account".to_string(),
            verification_template: HtmlTemplate::new(
                "<html><body><p>Confirm your account with this token:</p>\
                 <p><strong>{{TOKEN}}</strong></p></body></html>",
                TOKEN_PLACEHOLDER,
            ),
            login_subject: "Your Login Code".to_string(),
            login_template: HtmlTemplate::new(
                "<html><body><p>{{MESSAGE}}</p></body></html>",
                MESSAGE_PLACEHOLDER,
            ),
        }
    }
}
