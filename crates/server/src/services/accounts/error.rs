//! Account lifecycle error types.

use thiserror::Error;

use accounts_core::FieldError;

use crate::db::RepositoryError;

/// Errors that can occur during account lifecycle operations.
///
/// The `Display` text of client-facing variants is what ends up in the
/// envelope's `errorMessage`; see [`AccountError::public_message`].
#[derive(Debug, Error)]
pub enum AccountError {
    /// A required field is missing or a present field is malformed.
    #[error("{0}")]
    Validation(#[from] FieldError),

    /// Another account already owns the email.
    #[error("email already exists")]
    DuplicateEmail,

    /// Unknown email or wrong password; deliberately indistinguishable.
    #[error("Email or Password was wrong.")]
    InvalidCredentials,

    /// The id is not in the store's identifier format.
    #[error("invalid user ID format: {0}")]
    InvalidIdentifier(String),

    /// No account has this id.
    #[error("user not found")]
    NotFound,

    /// Missing, malformed, forged or expired bearer token.
    #[error("{0}")]
    Unauthorized(String),

    /// Opaque persistence failure.
    #[error("store error: {0}")]
    Store(RepositoryError),

    /// Anything else that should not have happened.
    #[error("internal error: {0}")]
    Internal(String),

    /// The request deadline passed before the store answered.
    #[error("request deadline exceeded")]
    DeadlineExceeded,
}

impl From<RepositoryError> for AccountError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::NotFound => Self::NotFound,
            RepositoryError::InvalidIdentifier(raw) => Self::InvalidIdentifier(raw),
            RepositoryError::Conflict(_) => Self::DuplicateEmail,
            other => Self::Store(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repository_error_mapping() {
        assert!(matches!(
            AccountError::from(RepositoryError::NotFound),
            AccountError::NotFound
        ));
        assert!(matches!(
            AccountError::from(RepositoryError::Conflict("email".into())),
            AccountError::DuplicateEmail
        ));
        assert!(matches!(
            AccountError::from(RepositoryError::InvalidIdentifier("x".into())),
            AccountError::InvalidIdentifier(_)
        ));
        assert!(matches!(
            AccountError::from(RepositoryError::DataCorruption("bad".into())),
            AccountError::Store(_)
        ));
    }

    #[test]
    fn test_validation_display_is_field_error() {
        let err = AccountError::from(FieldError::required("email"));
        assert_eq!(err.to_string(), "email: is required");
    }
}
