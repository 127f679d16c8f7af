//! # Password Hashing & Strength Rules
//!
//! Drivers are the authentication principals of the fleet service. Their
//! passwords are stored as opaque hash strings of the form
//!
//! ```text
//! sha256$<iterations>$<salt-hex>$<digest-hex>
//! ```
//!
//! where the digest is SHA-256 applied `iterations` times over
//! `salt || password`, then over the previous digest. Verification is
//! constant-time.

use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

const ALGORITHM: &str = "sha256";
const DEFAULT_ITERATIONS: u32 = 20_000;
const SALT_LEN: usize = 16;

/// Minimum password length accepted by [`validate_password_strength`].
pub const MIN_PASSWORD_LENGTH: usize = 8;

const COMMON_PASSWORDS: &[&str] = &[
    "123456", "12345678", "123456789", "1234567890", "password", "password1",
    "password123", "qwerty", "qwerty123", "qwertyuiop", "abc123", "111111",
    "iloveyou", "letmein", "welcome", "monkey", "dragon", "football",
    "baseball", "sunshine", "princess", "admin123", "passw0rd", "trustno1",
    "superman", "1q2w3e4r", "zaq12wsx", "starwars", "whatever", "master",
];

/// An encoded password hash.
///
/// The raw password never leaves [`PasswordHash::hash`]; only the encoded
/// form is stored and compared.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hash a raw password with a fresh random salt.
    pub fn hash(raw: &str) -> Self {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        Self::hash_with(raw, &salt, DEFAULT_ITERATIONS)
    }

    fn hash_with(raw: &str, salt: &[u8], iterations: u32) -> Self {
        let digest = stretch(raw, salt, iterations);
        Self(format!(
            "{ALGORITHM}${iterations}${}${}",
            to_hex(salt),
            to_hex(&digest)
        ))
    }

    /// Wrap an encoded hash loaded from storage.
    ///
    /// No parsing happens here; a malformed value simply never verifies.
    pub fn from_encoded(encoded: impl Into<String>) -> Self {
        Self(encoded.into())
    }

    /// A hash that no password matches, for principals that must not log in.
    pub fn unusable() -> Self {
        Self("!".to_string())
    }

    /// Access the encoded hash string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this hash was produced by [`PasswordHash::hash`].
    pub fn is_usable(&self) -> bool {
        self.parts().is_some()
    }

    /// Check a raw password against this hash in constant time.
    pub fn verify(&self, raw: &str) -> bool {
        let Some((iterations, salt, expected)) = self.parts() else {
            return false;
        };
        let actual = stretch(raw, &salt, iterations);
        if actual.len() != expected.len() {
            return false;
        }
        actual[..].ct_eq(&expected[..]).into()
    }

    fn parts(&self) -> Option<(u32, Vec<u8>, Vec<u8>)> {
        let mut fields = self.0.split('$');
        if fields.next()? != ALGORITHM {
            return None;
        }
        let iterations: u32 = fields.next()?.parse().ok()?;
        let salt = from_hex(fields.next()?)?;
        let digest = from_hex(fields.next()?)?;
        if fields.next().is_some() || iterations == 0 {
            return None;
        }
        Some((iterations, salt, digest))
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash([REDACTED])")
    }
}

fn stretch(raw: &str, salt: &[u8], iterations: u32) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(salt);
    hasher.update(raw.as_bytes());
    let mut digest: [u8; 32] = hasher.finalize().into();
    for _ in 1..iterations {
        let mut hasher = Sha256::new();
        hasher.update(salt);
        hasher.update(digest);
        digest = hasher.finalize().into();
    }
    digest
}

fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn from_hex(s: &str) -> Option<Vec<u8>> {
    if s.len() % 2 != 0 || !s.is_ascii() {
        return None;
    }
    (0..s.len())
        .step_by(2)
        .map(|i| u8::from_str_radix(&s[i..i + 2], 16).ok())
        .collect()
}

/// Apply the password strength rules, returning every failed rule's message.
///
/// Rules: at least [`MIN_PASSWORD_LENGTH`] characters, not entirely numeric,
/// not a common password, and not too similar to the username.
pub fn validate_password_strength(password: &str, username: &str) -> Vec<String> {
    let mut messages = Vec::new();

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        messages.push(format!(
            "This password is too short. It must contain at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }

    let lowered = password.to_lowercase();
    if COMMON_PASSWORDS.contains(&lowered.as_str()) {
        messages.push("This password is too common.".to_string());
    }

    if !password.is_empty() && password.chars().all(|c| c.is_ascii_digit()) {
        messages.push("This password is entirely numeric.".to_string());
    }

    if too_similar(&lowered, &username.to_lowercase()) {
        messages.push("The password is too similar to the username.".to_string());
    }

    messages
}

fn too_similar(password: &str, username: &str) -> bool {
    if username.chars().count() < 3 || password.is_empty() {
        return false;
    }
    password.contains(username) || username.contains(password)
}
