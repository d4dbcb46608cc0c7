//! Credential hashing.
//!
//! Passwords are turned into digests with Argon2id keyed by a process-wide
//! salt. The digest is deterministic for a given salt, which lets login
//! look an account up by email and digest together in a single store
//! query. The salt comes from configuration and never leaves the process.

use core::fmt;

use argon2::Argon2;
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use accounts_core::Password;

/// Digest output length in bytes.
const DIGEST_LEN: usize = 32;

/// Error produced when a password cannot be hashed.
#[derive(Debug, Error)]
#[error("password hashing failed: {0}")]
pub struct HashError(String);

/// One-way digest of a password, as stored.
///
/// `Debug` is redacted so digests do not end up in logs.
#[derive(Clone, PartialEq, Eq)]
pub struct CredentialDigest(String);

impl CredentialDigest {
    /// Wrap a digest read back from the store.
    #[must_use]
    pub const fn from_stored(encoded: String) -> Self {
        Self(encoded)
    }

    /// The encoded digest, for persistence.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for CredentialDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("CredentialDigest([REDACTED])")
    }
}

/// Deterministic keyed password hasher.
#[derive(Clone)]
pub struct CredentialHasher {
    salt: SecretString,
}

impl CredentialHasher {
    /// Create a hasher with the process-wide salt.
    #[must_use]
    pub const fn new(salt: SecretString) -> Self {
        Self { salt }
    }

    /// Hash a password.
    ///
    /// The same password always yields the same digest under the same salt.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if Argon2 rejects its inputs (e.g. a salt
    /// shorter than 8 bytes).
    pub fn hash(&self, password: &Password) -> Result<CredentialDigest, HashError> {
        let mut out = [0u8; DIGEST_LEN];
        Argon2::default()
            .hash_password_into(
                password.expose().as_bytes(),
                self.salt.expose_secret().as_bytes(),
                &mut out,
            )
            .map_err(|e| HashError(e.to_string()))?;
        Ok(CredentialDigest(URL_SAFE_NO_PAD.encode(out)))
    }
}

impl fmt::Debug for CredentialHasher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialHasher")
            .field("salt", &"[REDACTED]")
            .finish()
    }
}
