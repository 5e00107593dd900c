//! Password hashing and small primitives shared with the CSRF guard.

use rand::RngCore;

use crate::error::{ModelError, ModelResult};

/// bcrypt work factor used unless configured otherwise.
pub const DEFAULT_PASSWORD_COST: u32 = bcrypt::DEFAULT_COST;

/// Cheapest work factor bcrypt accepts.
pub const MIN_PASSWORD_COST: u32 = 4;

/// Most expensive work factor bcrypt accepts.
pub const MAX_PASSWORD_COST: u32 = 31;

/// Compares two byte strings without an early exit on the first difference.
///
/// Lengths are not secret; a length mismatch returns immediately.
#[must_use]
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Fills a fresh buffer of `N` random bytes from the thread RNG.
#[must_use]
pub fn random_bytes<const N: usize>() -> [u8; N] {
    let mut buf = [0u8; N];
    rand::thread_rng().fill_bytes(&mut buf);
    buf
}

/// A bcrypt password hash in its modular crypt form (`$2b$12$...`).
///
/// The salt and cost travel inside the string, so a hash made at one cost
/// still verifies after the configured cost changes.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Hashes `password` with a fresh salt at work factor `cost`.
    pub fn new(password: &str, cost: u32) -> ModelResult<Self> {
        bcrypt::hash(password, cost)
            .map(Self)
            .map_err(|err| ModelError::storage(format!("password hashing failed: {err}")))
    }

    /// Checks `password` against the hash. A malformed hash never matches.
    #[must_use]
    pub fn verify(&self, password: &str) -> bool {
        bcrypt::verify(password, &self.0).unwrap_or(false)
    }

    /// The encoded hash.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Debug for PasswordHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(..)")
    }
}
