//! Integration tests for registration, two-step login and the gate.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use courier_protocol::{EmailAddress, UserId};
use courier_session::{
    AuthError, AuthFlow, CredentialStore, GateError, IdentityStore, MESSAGE_PLACEHOLDER,
    MemoryIdentityStore, Notices, OwnershipGate, SessionConfig, SessionIssuer, SessionSecret,
    TOKEN_PLACEHOLDER,
};
use courier_transport::{HtmlTemplate, MailError, Mailer, OutboundMail};
use parking_lot::Mutex;

// =========================================================================
// Stubs
// =========================================================================

/// Records every mail and fails all sends while switched off.
#[derive(Default)]
struct RecordingMailer {
    sent: Mutex<Vec<OutboundMail>>,
    fail: AtomicBool,
}

impl RecordingMailer {
    fn failing() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            fail: AtomicBool::new(true),
        }
    }

    fn set_failing(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }

    fn last_body_for(&self, to: &str) -> Option<String> {
        self.sent
            .lock()
            .iter()
            .rev()
            .find(|m| m.to == to)
            .map(|m| m.html_body.clone())
    }

    fn count(&self) -> usize {
        self.sent.lock().len()
    }
}

impl Mailer for RecordingMailer {
    async fn send(&self, mail: &OutboundMail) -> Result<(), MailError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(MailError::Rejected("relay down".into()));
        }
        self.sent.lock().push(mail.clone());
        Ok(())
    }
}

/// Templates whose rendered body is exactly the token or code line.
fn bare_notices() -> Notices {
    Notices {
        verification_template: HtmlTemplate::new(TOKEN_PLACEHOLDER, TOKEN_PLACEHOLDER),
        login_template: HtmlTemplate::new(MESSAGE_PLACEHOLDER, MESSAGE_PLACEHOLDER),
        ..Notices::default()
    }
}

struct Harness {
    flow: Arc<AuthFlow<MemoryIdentityStore, RecordingMailer>>,
    gate: OwnershipGate<MemoryIdentityStore>,
    identities: Arc<MemoryIdentityStore>,
    store: Arc<CredentialStore>,
    mailer: Arc<RecordingMailer>,
}

fn harness_with(mailer: RecordingMailer) -> Harness {
    let config = SessionConfig::default();
    let secret = SessionSecret::new(b"integration-test-secret-0123456789abcdef".to_vec()).unwrap();
    let issuer = Arc::new(SessionIssuer::new(&secret, &config).unwrap());
    let store = Arc::new(CredentialStore::new(&config));
    let identities = Arc::new(MemoryIdentityStore::new());
    let mailer = Arc::new(mailer);

    let flow = AuthFlow::new(
        Arc::clone(&store),
        Arc::clone(&issuer),
        Arc::clone(&identities),
        Arc::clone(&mailer),
        bare_notices(),
    );
    Harness {
        flow: Arc::new(flow),
        gate: OwnershipGate::new(issuer, Arc::clone(&identities)),
        identities,
        store,
        mailer,
    }
}

fn harness() -> Harness {
    harness_with(RecordingMailer::default())
}

fn code_from(body: &str) -> String {
    body.rsplit(' ').next().unwrap_or_default().to_string()
}

async fn register_and_verify(h: &Harness, email: &str, password: &str) {
    h.flow.register(email, password).await.unwrap();
    let token = h.mailer.last_body_for(email).unwrap();
    h.flow.verify_registration(&token).await.unwrap();
}

// =========================================================================
// Registration
// =========================================================================

#[tokio::test]
async fn test_register_mails_32_hex_token() {
    let h = harness();
    h.flow.register("a@x.com", "pw").await.unwrap();

    let token = h.mailer.last_body_for("a@x.com").unwrap();
    assert_eq!(token.len(), 32);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(h.identities.is_empty(), "identity must wait for verification");
}

#[tokio::test]
async fn test_register_malformed_email_returns_invalid_input() {
    let h = harness();
    let err = h.flow.register("not-an-email", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidInput(_)));
    assert_eq!(h.mailer.count(), 0);
}

#[tokio::test]
async fn test_register_empty_password_returns_invalid_input() {
    let h = harness();
    let err = h.flow.register("a@x.com", "").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidInput(_)));
}

#[tokio::test]
async fn test_register_existing_email_returns_conflict() {
    let h = harness();
    register_and_verify(&h, "a@x.com", "pw").await;

    let err = h.flow.register("a@x.com", "other").await.unwrap_err();
    assert!(matches!(err, AuthError::Conflict));
}

#[tokio::test]
async fn test_register_mail_failure_returns_delivery() {
    let h = harness_with(RecordingMailer::failing());
    let err = h.flow.register("a@x.com", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::Delivery(_)));
    assert_eq!(h.store.pending_len(), 0, "pending registration must be withdrawn");
}

#[tokio::test]
async fn test_verify_registration_creates_identity_with_derived_id() {
    let h = harness();
    register_and_verify(&h, "a@x.com", "pw").await;

    let email = EmailAddress::parse("a@x.com").unwrap();
    let identity = h.identities.find_by_email(&email).await.unwrap().unwrap();
    assert_eq!(identity.id, UserId("i6fl5r2dav".into()));
    assert_ne!(identity.password_hash, "pw");
}

#[tokio::test]
async fn test_verify_registration_second_use_returns_invalid_token() {
    let h = harness();
    h.flow.register("a@x.com", "pw").await.unwrap();
    let token = h.mailer.last_body_for("a@x.com").unwrap();

    assert!(h.flow.verify_registration(&token).await.is_ok());
    let err = h.flow.verify_registration(&token).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidOrExpiredToken));
}

#[tokio::test]
async fn test_verify_registration_unknown_token_returns_invalid_token() {
    let h = harness();
    let err = h.flow.verify_registration("deadbeef").await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidOrExpiredToken));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_verify_registration_concurrent_redeemers_exactly_one_wins() {
    let h = harness();
    h.flow.register("race@x.com", "pw").await.unwrap();
    let token = h.mailer.last_body_for("race@x.com").unwrap();

    let mut handles = Vec::new();
    for _ in 0..16 {
        let flow = Arc::clone(&h.flow);
        let token = token.clone();
        handles.push(tokio::spawn(async move { flow.verify_registration(&token).await }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(h.identities.len(), 1);
}

// =========================================================================
// Login
// =========================================================================

#[tokio::test]
async fn test_login_wrong_password_and_unknown_email_are_indistinguishable() {
    let h = harness();
    register_and_verify(&h, "a@x.com", "right").await;

    let wrong_password = h.flow.login("a@x.com", "wrong").await.unwrap_err();
    let unknown_email = h.flow.login("nobody@x.com", "right").await.unwrap_err();

    assert!(matches!(wrong_password, AuthError::InvalidCredentials));
    assert!(matches!(unknown_email, AuthError::InvalidCredentials));
    assert_eq!(wrong_password.to_string(), unknown_email.to_string());
}

#[tokio::test]
async fn test_login_then_verify_code_issues_session() {
    let h = harness();
    register_and_verify(&h, "a@x.com", "pw").await;

    h.flow.login("a@x.com", "pw").await.unwrap();
    let code = code_from(&h.mailer.last_body_for("a@x.com").unwrap());
    assert_eq!(code.len(), 6);

    let token = h.flow.verify_login_code("a@x.com", &code).await.unwrap();
    assert_eq!(token.claims.sub, "a@x.com");
    assert_eq!(token.claims.exp - token.claims.iat, 86_400);
}

#[tokio::test]
async fn test_verify_login_code_is_single_use() {
    let h = harness();
    register_and_verify(&h, "a@x.com", "pw").await;
    h.flow.login("a@x.com", "pw").await.unwrap();
    let code = code_from(&h.mailer.last_body_for("a@x.com").unwrap());

    assert!(h.flow.verify_login_code("a@x.com", &code).await.is_ok());
    let err = h.flow.verify_login_code("a@x.com", &code).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidOrExpiredCode));
}

#[tokio::test]
async fn test_verify_login_code_other_email_returns_invalid_code() {
    let h = harness();
    register_and_verify(&h, "a@x.com", "pw").await;
    register_and_verify(&h, "b@x.com", "pw").await;
    h.flow.login("a@x.com", "pw").await.unwrap();
    let code = code_from(&h.mailer.last_body_for("a@x.com").unwrap());

    let err = h.flow.verify_login_code("b@x.com", &code).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidOrExpiredCode));
}

#[tokio::test]
async fn test_login_twice_only_latest_code_valid() {
    let h = harness();
    register_and_verify(&h, "a@x.com", "pw").await;

    h.flow.login("a@x.com", "pw").await.unwrap();
    let first = code_from(&h.mailer.last_body_for("a@x.com").unwrap());
    h.flow.login("a@x.com", "pw").await.unwrap();
    let second = code_from(&h.mailer.last_body_for("a@x.com").unwrap());

    if first != second {
        assert!(h.flow.verify_login_code("a@x.com", &first).await.is_err());
    }
    assert!(h.flow.verify_login_code("a@x.com", &second).await.is_ok());
}

#[tokio::test]
async fn test_login_mail_failure_keeps_earlier_code() {
    let h = harness();
    register_and_verify(&h, "a@x.com", "pw").await;
    h.flow.login("a@x.com", "pw").await.unwrap();
    let delivered = code_from(&h.mailer.last_body_for("a@x.com").unwrap());

    h.mailer.set_failing(true);
    let err = h.flow.login("a@x.com", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::Delivery(_)));
    assert_eq!(h.store.challenge_len(), 1);

    h.mailer.set_failing(false);
    assert!(h.flow.verify_login_code("a@x.com", &delivered).await.is_ok());
}

#[tokio::test]
async fn test_login_mail_failure_stores_no_code() {
    let h = harness();
    register_and_verify(&h, "a@x.com", "pw").await;

    h.mailer.set_failing(true);
    let err = h.flow.login("a@x.com", "pw").await.unwrap_err();
    assert!(matches!(err, AuthError::Delivery(_)));
    assert_eq!(h.store.challenge_len(), 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_verify_login_code_concurrent_redeemers_exactly_one_wins() {
    let h = harness();
    register_and_verify(&h, "race@x.com", "pw").await;
    h.flow.login("race@x.com", "pw").await.unwrap();
    let code = code_from(&h.mailer.last_body_for("race@x.com").unwrap());

    let mut handles = Vec::new();
    for _ in 0..16 {
        let flow = Arc::clone(&h.flow);
        let code = code.clone();
        handles.push(tokio::spawn(async move {
            flow.verify_login_code("race@x.com", &code).await
        }));
    }

    let mut wins = 0;
    for handle in handles {
        if handle.await.unwrap().is_ok() {
            wins += 1;
        }
    }
    assert_eq!(wins, 1);
    assert_eq!(h.store.challenge_len(), 0);
}

// =========================================================================
// Gate
// =========================================================================

#[tokio::test]
async fn test_gate_resolves_issued_session_to_identity() {
    let h = harness();
    register_and_verify(&h, "a@x.com", "pw").await;
    h.flow.login("a@x.com", "pw").await.unwrap();
    let code = code_from(&h.mailer.last_body_for("a@x.com").unwrap());
    let token = h.flow.verify_login_code("a@x.com", &code).await.unwrap();

    let identity = h.gate.resolve(Some(&token.credential)).await.unwrap();
    assert_eq!(identity.email.as_str(), "a@x.com");

    h.flow.logout();
    // Logout does not revoke.
    assert!(h.gate.resolve(Some(&token.credential)).await.is_ok());

    let err = h
        .gate
        .authorize(Some(&token.credential), &UserId("0000000000".into()))
        .await
        .unwrap_err();
    assert!(matches!(err, GateError::Unauthorized));
}
