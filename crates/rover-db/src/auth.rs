//! Credential and token digest helpers.
//!
//! Passwords are stored as `salt$hexdigest` where the digest is
//! SHA-256 over `salt` concatenated with the password. Session tokens
//! are stored only as their SHA-256 hex digest.

use rand::Rng;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

fn sha256_hex(input: &str) -> String {
    format!("{:x}", Sha256::digest(input.as_bytes()))
}

/// Produce a salted password digest suitable for the `password_digest` column.
///
/// A fresh random salt is drawn per call, so hashing the same password
/// twice yields different strings.
#[must_use]
pub fn hash_password(password: &str) -> String {
    let salt: u128 = rand::rng().random();
    let salt = format!("{salt:032x}");
    let digest = sha256_hex(&format!("{salt}{password}"));
    format!("{salt}${digest}")
}

/// Check a candidate password against a stored `salt$hexdigest` value.
///
/// The digest comparison is constant-time. Malformed stored values
/// never verify.
#[must_use]
pub fn verify_password(password: &str, stored: &str) -> bool {
    let Some((salt, expected)) = stored.split_once('$') else {
        return false;
    };
    let candidate = sha256_hex(&format!("{salt}{password}"));
    candidate.as_bytes().ct_eq(expected.as_bytes()).into()
}

/// Digest a bearer session token for storage and lookup.
#[must_use]
pub fn token_digest(token: &str) -> String {
    sha256_hex(token)
}
