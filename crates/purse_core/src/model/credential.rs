//! Password credential hashing.
//!
//! # Responsibility
//! - Turn a plaintext password into an Argon2id PHC string before it reaches
//!   storage.
//! - Keep hashes out of `Debug` output.
//!
//! # Invariants
//! - Plaintext passwords are never stored or logged.
//! - Every hash uses a fresh random salt.

use argon2::password_hash::{PasswordHash as PhcString, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use rand_core::{OsRng, RngCore};
use std::error::Error;
use std::fmt::{Debug, Display, Formatter};

const SALT_LEN: usize = 16;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    /// Hashing failed (e.g. parameters rejected by Argon2).
    Hash(String),
    /// Stored value is not a parseable PHC string.
    MalformedHash(String),
}

impl Display for CredentialError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Hash(message) => write!(f, "password hashing failed: {message}"),
            Self::MalformedHash(message) => write!(f, "malformed password hash: {message}"),
        }
    }
}

impl Error for CredentialError {}

/// Opaque Argon2 PHC string as persisted in `users.password_hash`.
#[derive(Clone, PartialEq, Eq)]
pub struct PasswordHash(String);

impl PasswordHash {
    /// Wraps an already-hashed value loaded from storage.
    pub fn from_phc(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Debug for PasswordHash {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("PasswordHash(<redacted>)")
    }
}

/// Argon2id hasher with configurable cost.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl Default for CredentialHasher {
    fn default() -> Self {
        Self::new(Params::default())
    }
}

impl CredentialHasher {
    pub fn new(params: Params) -> Self {
        Self { params }
    }

    /// Minimum-cost parameters; only suitable for tests and local tooling.
    pub fn low_cost() -> Self {
        Self::new(
            Params::new(Params::MIN_M_COST, Params::MIN_T_COST, Params::MIN_P_COST, None)
                .unwrap_or_default(),
        )
    }

    pub fn hash(&self, password: &str) -> Result<PasswordHash, CredentialError> {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        let salt = SaltString::encode_b64(&salt)
            .map_err(|err| CredentialError::Hash(err.to_string()))?;

        let phc = self
            .argon2()
            .hash_password(password.as_bytes(), &salt)
            .map_err(|err| CredentialError::Hash(err.to_string()))?;
        Ok(PasswordHash(phc.to_string()))
    }

    /// Checks `password` against a stored hash using the hash's own params.
    pub fn verify(&self, password: &str, hash: &PasswordHash) -> Result<bool, CredentialError> {
        let parsed = PhcString::new(hash.as_str())
            .map_err(|err| CredentialError::MalformedHash(err.to_string()))?;
        Ok(self
            .argon2()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok())
    }

    fn argon2(&self) -> Argon2<'static> {
        Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone())
    }
}
