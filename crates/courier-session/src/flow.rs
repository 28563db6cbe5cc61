//! The registration and two-step login flow.
//!
//! ```text
//! register() ──→ [pending] ──→ verify_registration() ──→ [registered]
//!                                                            │
//!                       login() ←───────────────────────────┘
//!                          │
//!                          ▼
//!                    [challenged] ──→ verify_login_code() ──→ credential
//! ```
//!
//! Each step that proves something (a token, a code) consumes it. Two
//! identities' flows share no locks beyond the store's map-level ones,
//! which are never held across an `.await`.

use std::sync::Arc;

use courier_protocol::{EmailAddress, Identity, StorageError};
use courier_transport::{Mailer, OutboundMail};

use crate::secrets::{self, derive_user_id};
use crate::{AuthError, CredentialStore, IdentityStore, Notices, SessionIssuer, SessionToken};

/// Drives registration, login and code verification.
///
/// Generic over the identity store `S` and the mailer `M` so tests can
/// inject stubs for both.
pub struct AuthFlow<S, M> {
    store: Arc<CredentialStore>,
    issuer: Arc<SessionIssuer>,
    identities: Arc<S>,
    mailer: Arc<M>,
    notices: Notices,
}

impl<S: IdentityStore, M: Mailer> AuthFlow<S, M> {
    pub fn new(
        store: Arc<CredentialStore>,
        issuer: Arc<SessionIssuer>,
        identities: Arc<S>,
        mailer: Arc<M>,
        notices: Notices,
    ) -> Self {
        Self {
            store,
            issuer,
            identities,
            mailer,
            notices,
        }
    }

    /// Starts a registration and mails the confirmation token.
    ///
    /// The identity is not stored durably until the token comes back
    /// through [`verify_registration`](Self::verify_registration).
    ///
    /// # Errors
    /// - [`AuthError::InvalidInput`] for a malformed email or empty password
    /// - [`AuthError::Conflict`] if the email is already registered
    /// - [`AuthError::Delivery`] if the token mail could not be sent; the
    ///   pending registration is withdrawn in that case
    pub async fn register(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let email = EmailAddress::parse(email)
            .map_err(|_| AuthError::InvalidInput("email address is malformed".into()))?;
        if password.is_empty() {
            return Err(AuthError::InvalidInput("password must not be empty".into()));
        }

        if self.identities.find_by_email(&email).await?.is_some() {
            tracing::debug!(%email, "registration rejected: email already registered");
            return Err(AuthError::Conflict);
        }

        let password_hash = hash_off_executor(password.to_owned()).await?;
        let identity = Identity {
            id: derive_user_id(&email),
            email: email.clone(),
            password_hash,
        };

        let token = secrets::generate_token();
        self.store.put_pending(token.clone(), identity);

        let mail = OutboundMail::new(
            email.as_str(),
            self.notices.verification_subject.clone(),
            self.notices.verification_template.render(&token),
        );
        if let Err(e) = self.mailer.send(&mail).await {
            self.store.take_pending(&token);
            tracing::warn!(%email, error = %e, "verification mail failed, registration withdrawn");
            return Err(AuthError::Delivery(e));
        }

        tracing::info!(%email, "registration accepted, awaiting verification");
        Ok(())
    }

    /// Confirms a registration and creates the durable identity.
    ///
    /// # Errors
    /// - [`AuthError::InvalidOrExpiredToken`] if the token is unknown,
    ///   already used, or expired
    /// - [`AuthError::Conflict`] if the email was registered meanwhile
    pub async fn verify_registration(&self, token: &str) -> Result<Identity, AuthError> {
        let Some(identity) = self.store.take_pending(token) else {
            tracing::debug!("registration token rejected");
            return Err(AuthError::InvalidOrExpiredToken);
        };

        match self.identities.create(identity.clone()).await {
            Ok(()) => {
                tracing::info!(user_id = %identity.id, email = %identity.email, "identity verified");
                Ok(identity)
            }
            Err(StorageError::Conflict(_)) => Err(AuthError::Conflict),
            Err(e) => {
                tracing::error!(error = %e, "failed to persist verified identity");
                Err(AuthError::Storage(e))
            }
        }
    }

    /// Checks the password and mails a one-time login code.
    ///
    /// # Errors
    /// - [`AuthError::InvalidCredentials`] for an unknown email or a wrong
    ///   password alike. The two cases do the same hashing work.
    /// - [`AuthError::Delivery`] if the code mail could not be sent; any
    ///   earlier outstanding code is left in place
    pub async fn login(&self, email: &str, password: &str) -> Result<(), AuthError> {
        let Ok(email) = EmailAddress::parse(email) else {
            return Err(AuthError::InvalidCredentials);
        };

        let stored_hash = self
            .identities
            .find_by_email(&email)
            .await?
            .map(|identity| identity.password_hash);

        let password = password.to_owned();
        let matched = tokio::task::spawn_blocking(move || match stored_hash {
            Some(hash) => secrets::verify_password(&hash, &password),
            None => secrets::verify_decoy(&password),
        })
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?;

        if !matched {
            tracing::debug!(%email, "login rejected");
            return Err(AuthError::InvalidCredentials);
        }

        let code = secrets::generate_code();
        let body = format!("Your login code is: {code}");
        let mail = OutboundMail::new(
            email.as_str(),
            self.notices.login_subject.clone(),
            self.notices.login_template.render(&body),
        );
        // An undelivered code never replaces the outstanding one.
        self.mailer.send(&mail).await.inspect_err(|e| {
            tracing::warn!(%email, error = %e, "login code mail failed");
        })?;
        self.store.put_challenge(email.clone(), code);

        tracing::info!(%email, "login challenge issued");
        Ok(())
    }

    /// Redeems a login code and issues a session credential.
    ///
    /// # Errors
    /// [`AuthError::InvalidOrExpiredCode`] if no code is outstanding for
    /// `email`, the code does not match, or it was already used.
    pub async fn verify_login_code(
        &self,
        email: &str,
        code: &str,
    ) -> Result<SessionToken, AuthError> {
        let Ok(email) = EmailAddress::parse(email) else {
            return Err(AuthError::InvalidOrExpiredCode);
        };

        if !self.store.redeem_challenge(&email, code.trim()) {
            tracing::debug!(%email, "login code rejected");
            return Err(AuthError::InvalidOrExpiredCode);
        }

        let token = self.issuer.issue(&email)?;
        tracing::info!(%email, exp = token.claims.exp, "session issued");
        Ok(token)
    }

    /// Signs the caller out.
    ///
    /// Nothing changes on the server: credentials are not tracked, so the
    /// presented credential stays valid until its expiry and the client is
    /// expected to discard it. Always succeeds.
    pub fn logout(&self) {
        tracing::debug!("sign-out requested");
    }
}

async fn hash_off_executor(password: String) -> Result<String, AuthError> {
    tokio::task::spawn_blocking(move || secrets::hash_password(&password))
        .await
        .map_err(|e| AuthError::Hashing(e.to_string()))?
}
