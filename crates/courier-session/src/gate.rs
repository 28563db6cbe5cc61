//! The ownership gate: binds a session credential to a resource owner.

use std::sync::Arc;

use courier_protocol::{EmailAddress, Identity, UserId};

use crate::{GateError, IdentityStore, SessionIssuer};

/// Verifies credentials and checks resource ownership.
pub struct OwnershipGate<S> {
    issuer: Arc<SessionIssuer>,
    identities: Arc<S>,
}

impl<S: IdentityStore> OwnershipGate<S> {
    pub fn new(issuer: Arc<SessionIssuer>, identities: Arc<S>) -> Self {
        Self { issuer, identities }
    }

    /// Resolves `credential` to the stored identity it was issued to.
    ///
    /// # Errors
    /// - [`GateError::Unauthorized`] if the credential is missing,
    ///   malformed, tampered with, or expired
    /// - [`GateError::NotFound`] if the credential is valid but its
    ///   identity no longer exists
    pub async fn resolve(&self, credential: Option<&str>) -> Result<Identity, GateError> {
        let credential = credential.ok_or(GateError::Unauthorized)?;
        let claims = self.issuer.verify(credential).map_err(|e| {
            tracing::debug!(reason = %e, "credential rejected");
            GateError::Unauthorized
        })?;
        let email = EmailAddress::parse(&claims.sub).map_err(|_| GateError::Unauthorized)?;

        self.identities
            .find_by_email(&email)
            .await?
            .ok_or(GateError::NotFound)
    }

    /// Verifies the credential and requires its identity to be `owner`.
    ///
    /// Returns the resolved identity on success.
    pub async fn authorize(
        &self,
        credential: Option<&str>,
        owner: &UserId,
    ) -> Result<Identity, GateError> {
        let identity = self.resolve(credential).await?;
        check_owner(&identity, owner)?;
        Ok(identity)
    }
}

/// Passes only when `identity` is exactly `owner`.
pub fn check_owner(identity: &Identity, owner: &UserId) -> Result<(), GateError> {
    if &identity.id == owner {
        Ok(())
    } else {
        tracing::debug!(user_id = %identity.id, %owner, "ownership check failed");
        Err(GateError::Unauthorized)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{MemoryIdentityStore, SessionConfig, SessionSecret, derive_user_id};

    async fn setup() -> (OwnershipGate<MemoryIdentityStore>, Arc<SessionIssuer>, Identity) {
        let secret = SessionSecret::new(vec![3u8; 32]).unwrap();
        let issuer = Arc::new(SessionIssuer::new(&secret, &SessionConfig::default()).unwrap());
        let identities = Arc::new(MemoryIdentityStore::new());

        let email = EmailAddress::parse("owner@example.com").unwrap();
        let identity = Identity {
            id: derive_user_id(&email),
            email,
            password_hash: String::new(),
        };
        identities.create(identity.clone()).await.unwrap();

        (
            OwnershipGate::new(Arc::clone(&issuer), identities),
            issuer,
            identity,
        )
    }

    #[tokio::test]
    async fn test_authorize_exact_owner_returns_identity() {
        let (gate, issuer, identity) = setup().await;
        let token = issuer.issue(&identity.email).unwrap();

        let resolved = gate
            .authorize(Some(&token.credential), &identity.id)
            .await
            .unwrap();
        assert_eq!(resolved.id, identity.id);
    }

    #[tokio::test]
    async fn test_authorize_owner_mismatch_returns_unauthorized() {
        let (gate, issuer, identity) = setup().await;
        let token = issuer.issue(&identity.email).unwrap();

        let result = gate
            .authorize(Some(&token.credential), &UserId("someoneelse".into()))
            .await;
        assert!(matches!(result, Err(GateError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authorize_missing_credential_returns_unauthorized() {
        let (gate, _, identity) = setup().await;
        let result = gate.authorize(None, &identity.id).await;
        assert!(matches!(result, Err(GateError::Unauthorized)));
    }

    #[tokio::test]
    async fn test_authorize_flipped_byte_never_authorized() {
        let (gate, issuer, identity) = setup().await;
        let credential = issuer.issue(&identity.email).unwrap().credential;

        for i in 0..credential.len() {
            let mut bytes = credential.clone().into_bytes();
            bytes[i] ^= 0x01;
            let Ok(tampered) = String::from_utf8(bytes) else {
                continue;
            };
            let result = gate.authorize(Some(&tampered), &identity.id).await;
            assert!(result.is_err(), "byte {i} flip was authorized");
        }
    }

    #[tokio::test]
    async fn test_resolve_deleted_identity_returns_not_found() {
        let secret = SessionSecret::new(vec![3u8; 32]).unwrap();
        let issuer = Arc::new(SessionIssuer::new(&secret, &SessionConfig::default()).unwrap());
        let gate = OwnershipGate::new(Arc::clone(&issuer), Arc::new(MemoryIdentityStore::new()));

        let email = EmailAddress::parse("ghost@example.com").unwrap();
        let token = issuer.issue(&email).unwrap();
        let result = gate.resolve(Some(&token.credential)).await;
        assert!(matches!(result, Err(GateError::NotFound)));
    }
}
