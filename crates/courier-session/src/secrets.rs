//! Random tokens, login codes, identity ids, and password hashes.

use std::sync::LazyLock;

use argon2::Argon2;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use courier_protocol::{EmailAddress, UserId};
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::AuthError;

/// Length of a derived [`UserId`] in base32 characters (50 bits).
pub const USER_ID_LEN: usize = 10;

const BASE32_ALPHABET: &[u8; 32] = b"abcdefghijklmnopqrstuvwxyz234567";

/// Generates a random 32-character hex string (128 bits of entropy).
///
/// Used for registration tokens and group ids. Guessing one is
/// computationally infeasible.
pub fn generate_token() -> String {
    let bytes: [u8; 16] = rand::rng().random();
    hex::encode(bytes)
}

/// Generates a 6-digit login code, zero-padded, uniform over 000000-999999.
pub fn generate_code() -> String {
    let code: u32 = rand::rng().random_range(0..1_000_000);
    format!("{code:06}")
}

/// Derives the identity id for `email`.
///
/// SHA-256 of the address, encoded as lowercase unpadded RFC 4648 base32,
/// cut to [`USER_ID_LEN`] characters. Deterministic, so re-registering
/// the same email yields the same id. Only 50 bits survive the cut:
/// distinct emails can collide, and the id must not be treated as a
/// uniqueness guarantee.
pub fn derive_user_id(email: &EmailAddress) -> UserId {
    let digest = Sha256::digest(email.as_str().as_bytes());
    let mut encoded = base32_lower(&digest);
    encoded.truncate(USER_ID_LEN);
    UserId(encoded)
}

fn base32_lower(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len().div_ceil(5) * 8);
    let mut buffer: u32 = 0;
    let mut bits: u32 = 0;
    for &byte in bytes {
        buffer = (buffer << 8) | u32::from(byte);
        bits += 8;
        while bits >= 5 {
            bits -= 5;
            out.push(BASE32_ALPHABET[((buffer >> bits) & 0x1f) as usize] as char);
        }
        buffer &= (1 << bits) - 1;
    }
    if bits > 0 {
        out.push(BASE32_ALPHABET[((buffer << (5 - bits)) & 0x1f) as usize] as char);
    }
    out
}

/// Hashes `password` with Argon2id under a fresh 16-byte salt.
///
/// CPU-bound on purpose. Call it from `spawn_blocking`, never while
/// holding a lock.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt_bytes: [u8; 16] = rand::rng().random();
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| AuthError::Hashing(e.to_string()))?;
    let phc = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| AuthError::Hashing(e.to_string()))?
        .to_string();
    Ok(phc)
}

/// Returns `true` if `password` matches the PHC string `hash`.
///
/// An unparseable hash never matches.
pub fn verify_password(hash: &str, password: &str) -> bool {
    match PasswordHash::new(hash) {
        Ok(parsed) => Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok(),
        Err(_) => false,
    }
}

/// A hash of a random password, used to spend the same Argon2 work on
/// unknown emails as on known ones.
static DECOY_HASH: LazyLock<Option<String>> = LazyLock::new(|| {
    let decoy = generate_token();
    hash_password(&decoy).ok()
});

/// Runs a full verification against the decoy hash and always fails.
pub(crate) fn verify_decoy(password: &str) -> bool {
    if let Some(hash) = DECOY_HASH.as_deref() {
        let _ = verify_password(hash, password);
    }
    false
}
