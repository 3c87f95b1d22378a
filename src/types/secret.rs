//! Sync key material.
//!
//! The plaintext of a sync key exists in exactly one place: the
//! [`IssuedSyncKey`] returned by generation, which hands it out by value once.
//! Everything persisted or read back is a [`StoredSyncKey`], which can only
//! answer whether a presented candidate matches.

use std::fmt;

use rand::RngCore;
use sha2::{Digest, Sha256};

const SYNC_KEY_PREFIX: &str = "ad-sync-";
const SYNC_KEY_BYTES: usize = 32;

/// A freshly generated sync key. Consumed by [`IssuedSyncKey::into_secret`].
pub struct IssuedSyncKey {
    secret: String,
    stored: StoredSyncKey,
}

impl IssuedSyncKey {
    /// Generates a new key of the form `ad-sync-<64 hex chars>`.
    #[must_use]
    pub fn generate() -> Self {
        let mut bytes = [0u8; SYNC_KEY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        let secret = format!("{SYNC_KEY_PREFIX}{}", hex::encode(bytes));
        let stored = StoredSyncKey::derive(&secret);
        Self { secret, stored }
    }

    /// The verifier to persist for this key.
    #[must_use]
    pub fn stored(&self) -> &StoredSyncKey {
        &self.stored
    }

    /// Hands out the plaintext. The issued key is gone afterwards.
    #[must_use]
    pub fn into_secret(self) -> String {
        self.secret
    }
}

impl fmt::Debug for IssuedSyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("IssuedSyncKey([REDACTED])")
    }
}

/// Persisted verifier for a sync key: the SHA-256 digest of the secret.
#[derive(Clone, PartialEq, Eq)]
pub struct StoredSyncKey {
    digest: [u8; 32],
}

impl StoredSyncKey {
    fn derive(secret: &str) -> Self {
        Self {
            digest: Sha256::digest(secret.as_bytes()).into(),
        }
    }

    /// Rebuilds a verifier from its hex encoding as stored in the database.
    pub fn from_hex(encoded: &str) -> Option<Self> {
        let bytes = hex::decode(encoded).ok()?;
        let digest: [u8; 32] = bytes.try_into().ok()?;
        Some(Self { digest })
    }

    /// Hex encoding for storage. This is the digest, never the key.
    #[must_use]
    pub fn to_hex(&self) -> String {
        hex::encode(self.digest)
    }

    /// Constant-time check of a presented key against this verifier.
    #[must_use]
    pub fn matches(&self, candidate: &str) -> bool {
        let presented: [u8; 32] = Sha256::digest(candidate.as_bytes()).into();
        presented
            .iter()
            .zip(self.digest.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
    }
}

impl fmt::Debug for StoredSyncKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StoredSyncKey([REDACTED])")
    }
}
