//! Operator bearer tokens of the form `onpoints_<lookup>_<secret>`.
//!
//! The lookup part is stored in clear for indexing; the full token is only
//! kept as an argon2id hash.

use argon2::{
    Algorithm, Argon2, Params, Version,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use chrono::{Duration, Utc};
use rand::RngCore;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::types::Token;

const ARGON2_MEMORY: u32 = 64 * 1024; // KiB
const ARGON2_ITERATIONS: u32 = 1;
const ARGON2_PARALLELISM: u32 = 4;
const ARGON2_OUTPUT_LEN: usize = 32;

const TOKEN_PREFIX: &str = "onpoints";
const LOOKUP_LENGTH: usize = 8;
const SECRET_BYTES: usize = 16;

pub struct TokenGenerator {
    argon2: Argon2<'static>,
}

/// A token record ready to persist, plus the raw value to show once.
pub struct IssuedToken {
    pub token: Token,
    pub raw: String,
}

impl Default for TokenGenerator {
    fn default() -> Self {
        Self::new()
    }
}

impl TokenGenerator {
    #[must_use]
    pub fn new() -> Self {
        let params = Params::new(
            ARGON2_MEMORY,
            ARGON2_ITERATIONS,
            ARGON2_PARALLELISM,
            Some(ARGON2_OUTPUT_LEN),
        )
        .unwrap_or_default();

        Self {
            argon2: Argon2::new(Algorithm::Argon2id, Version::V0x13, params),
        }
    }

    /// Builds a new token record. Admin tokens carry no user binding.
    pub fn issue(
        &self,
        is_admin: bool,
        user_id: Option<String>,
        ttl: Option<Duration>,
    ) -> Result<IssuedToken> {
        let lookup = Uuid::new_v4().simple().to_string()[..LOOKUP_LENGTH].to_string();

        let mut secret = [0u8; SECRET_BYTES];
        rand::thread_rng().fill_bytes(&mut secret);
        let raw = format!("{TOKEN_PREFIX}_{lookup}_{}", hex::encode(secret));

        let now = Utc::now();
        let token = Token {
            id: Uuid::new_v4().to_string(),
            token_hash: self.hash(&raw)?,
            token_lookup: lookup,
            is_admin,
            user_id: if is_admin { None } else { user_id },
            created_at: now,
            expires_at: ttl.map(|ttl| now + ttl),
            last_used_at: None,
        };

        Ok(IssuedToken { token, raw })
    }

    fn hash(&self, raw: &str) -> Result<String> {
        let salt = SaltString::generate(&mut OsRng);
        self.argon2
            .hash_password(raw.as_bytes(), &salt)
            .map(|hash| hash.to_string())
            .map_err(|e| Error::Config(format!("failed to hash token: {e}")))
    }

    /// Checks a raw token against a stored argon2 hash.
    pub fn verify(&self, raw: &str, hash: &str) -> Result<bool> {
        let parsed = PasswordHash::new(hash)
            .map_err(|e| Error::Config(format!("invalid hash format: {e}")))?;

        match self.argon2.verify_password(raw.as_bytes(), &parsed) {
            Ok(()) => Ok(true),
            Err(argon2::password_hash::Error::Password) => Ok(false),
            Err(e) => Err(Error::Config(format!("failed to verify token: {e}"))),
        }
    }
}

/// Splits a raw token into its lookup part, rejecting anything malformed.
pub fn parse_token(raw: &str) -> Result<&str> {
    let rest = raw
        .strip_prefix(TOKEN_PREFIX)
        .and_then(|r| r.strip_prefix('_'))
        .ok_or(Error::InvalidTokenFormat)?;

    let (lookup, secret) = rest.split_once('_').ok_or(Error::InvalidTokenFormat)?;

    if lookup.len() != LOOKUP_LENGTH
        || secret.len() != SECRET_BYTES * 2
        || !secret.chars().all(|c| c.is_ascii_hexdigit())
    {
        return Err(Error::InvalidTokenFormat);
    }

    Ok(lookup)
}
