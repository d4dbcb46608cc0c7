//! Plaintext secret wrapper.

use core::fmt;

/// Error returned when a password is missing.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("password is required")]
pub struct PasswordError;

/// A plaintext password as submitted by a client.
///
/// Lives only for the duration of a request. It is never serialized, and
/// its `Debug` output is redacted so it cannot leak into logs.
#[derive(Clone)]
pub struct Password(String);

impl Password {
    /// Wrap a plaintext password, rejecting the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`PasswordError`] if `s` is empty.
    pub fn parse(s: &str) -> Result<Self, PasswordError> {
        if s.is_empty() {
            return Err(PasswordError);
        }
        Ok(Self(s.to_owned()))
    }

    /// Expose the plaintext for hashing.
    #[must_use]
    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Password {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Password([REDACTED])")
    }
}
