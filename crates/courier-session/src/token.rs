//! Signed session credentials.
//!
//! A credential is a compact HS256 JWT: `header.claims.signature`, each
//! segment base64url without padding. The claims carry the identity's
//! email (`sub`), the issue time and the expiry, both in Unix seconds.
//!
//! Verification is stateless. Nothing records which credentials were
//! issued, so a credential cannot be revoked before it expires.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use courier_protocol::EmailAddress;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;

use crate::{SessionConfig, SessionError, SessionSecret, TokenError};

type HmacSha256 = Hmac<Sha256>;

const ALGORITHM: &str = "HS256";

#[derive(Debug, Serialize, Deserialize)]
struct Header {
    alg: String,
    typ: String,
}

/// The verified contents of a session credential.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Email of the identity the credential was issued to.
    pub sub: String,
    /// Issued-at, Unix seconds.
    pub iat: u64,
    /// Expiry, Unix seconds.
    pub exp: u64,
}

/// A freshly issued credential together with its claims.
#[derive(Debug, Clone)]
pub struct SessionToken {
    pub credential: String,
    pub claims: Claims,
}

/// Issues and verifies session credentials with one HMAC key.
pub struct SessionIssuer {
    mac: HmacSha256,
    ttl: Duration,
    leeway: Duration,
}

impl std::fmt::Debug for SessionIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionIssuer")
            .field("ttl", &self.ttl)
            .field("leeway", &self.leeway)
            .finish_non_exhaustive()
    }
}

fn unix_now() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

impl SessionIssuer {
    /// Creates an issuer keyed by `secret`, with lifetimes from `config`.
    ///
    /// # Errors
    /// Returns [`SessionError::InvalidKey`] if the MAC rejects the key.
    pub fn new(secret: &SessionSecret, config: &SessionConfig) -> Result<Self, SessionError> {
        let mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| SessionError::InvalidKey(e.to_string()))?;
        Ok(Self {
            mac,
            ttl: config.session_ttl,
            leeway: config.leeway,
        })
    }

    /// Issues a credential for `email`, valid from now for the session TTL.
    pub fn issue(&self, email: &EmailAddress) -> Result<SessionToken, TokenError> {
        self.issue_at(email, unix_now())
    }

    /// Issues a credential as if the current time were `now` (Unix seconds).
    pub fn issue_at(&self, email: &EmailAddress, now: u64) -> Result<SessionToken, TokenError> {
        let header = Header {
            alg: ALGORITHM.to_string(),
            typ: "JWT".to_string(),
        };
        let claims = Claims {
            sub: email.as_str().to_string(),
            iat: now,
            exp: now.saturating_add(self.ttl.as_secs()),
        };

        let header_json = serde_json::to_vec(&header).map_err(TokenError::Encode)?;
        let claims_json = serde_json::to_vec(&claims).map_err(TokenError::Encode)?;

        let signing_input = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(header_json),
            URL_SAFE_NO_PAD.encode(claims_json)
        );
        let signature = self.sign(signing_input.as_bytes());
        let credential = format!("{signing_input}.{}", URL_SAFE_NO_PAD.encode(signature));

        Ok(SessionToken { credential, claims })
    }

    /// Verifies `credential` against the current time.
    pub fn verify(&self, credential: &str) -> Result<Claims, TokenError> {
        self.verify_at(credential, unix_now())
    }

    /// Verifies `credential` as if the current time were `now`.
    ///
    /// Checks, in order: shape, algorithm, signature, claims, expiry. The
    /// claims are never parsed before the signature has been checked.
    pub fn verify_at(&self, credential: &str, now: u64) -> Result<Claims, TokenError> {
        let mut parts = credential.split('.');
        let (Some(header_b64), Some(claims_b64), Some(sig_b64), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TokenError::Malformed("expected three segments"));
        };

        let header_bytes = URL_SAFE_NO_PAD
            .decode(header_b64)
            .map_err(|_| TokenError::Malformed("header is not base64url"))?;
        let header: Header = serde_json::from_slice(&header_bytes)
            .map_err(|_| TokenError::Malformed("header is not valid JSON"))?;
        if header.alg != ALGORITHM {
            return Err(TokenError::UnsupportedAlgorithm(header.alg));
        }

        let signature = URL_SAFE_NO_PAD
            .decode(sig_b64)
            .map_err(|_| TokenError::Malformed("signature is not base64url"))?;
        let signed_len = header_b64.len() + 1 + claims_b64.len();
        let mut mac = self.mac.clone();
        mac.update(&credential.as_bytes()[..signed_len]);
        mac.verify_slice(&signature)
            .map_err(|_| TokenError::BadSignature)?;

        let claims_bytes = URL_SAFE_NO_PAD
            .decode(claims_b64)
            .map_err(|_| TokenError::Malformed("claims are not base64url"))?;
        let claims: Claims = serde_json::from_slice(&claims_bytes)
            .map_err(|_| TokenError::Malformed("claims are not valid JSON"))?;

        if now > claims.exp.saturating_add(self.leeway.as_secs()) {
            return Err(TokenError::Expired {
                exp: claims.exp,
                now,
            });
        }

        Ok(claims)
    }

    fn sign(&self, input: &[u8]) -> Vec<u8> {
        let mut mac = self.mac.clone();
        mac.update(input);
        mac.finalize().into_bytes().to_vec()
    }
}
