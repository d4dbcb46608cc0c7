//! Mint an access token for manual testing.
//!
//! # Usage
//!
//! ```bash
//! accounts-cli token --user-id 67e55044-10b1-426f-9247-bb680e5fe0c8
//! ```
//!
//! # Environment Variables
//!
//! - `JWT_SECRET` - Signing secret; must match the server's

use std::time::Duration;

use secrecy::SecretString;
use thiserror::Error;

use accounts_core::{IdParseError, UserId};
use accounts_server::services::TokenIssuer;
use accounts_server::services::tokens::{AccessToken, TokenError};

/// Errors that can occur while minting a token.
#[derive(Debug, Error)]
pub enum TokenCommandError {
    /// Required environment variable is missing.
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    /// The user id is not a canonical UUID.
    #[error(transparent)]
    InvalidUserId(#[from] IdParseError),

    /// Signing failed.
    #[error(transparent)]
    Token(#[from] TokenError),
}

/// Issue a token for `user_id` valid for `ttl`.
///
/// # Errors
///
/// Returns `TokenCommandError` if `JWT_SECRET` is unset, the id is
/// malformed, or signing fails.
pub fn issue(user_id: &str, ttl: Duration) -> Result<AccessToken, TokenCommandError> {
    dotenvy::dotenv().ok();

    let secret = std::env::var("JWT_SECRET")
        .ok()
        .filter(|s| !s.is_empty())
        .map(SecretString::from);
    issue_with(secret.as_ref(), user_id, ttl)
}

fn issue_with(
    secret: Option<&SecretString>,
    user_id: &str,
    ttl: Duration,
) -> Result<AccessToken, TokenCommandError> {
    let secret = secret.ok_or(TokenCommandError::MissingEnvVar("JWT_SECRET"))?;
    let subject = UserId::parse(user_id)?;

    Ok(TokenIssuer::new(secret).issue(subject, ttl)?)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6e";
    const USER: &str = "67e55044-10b1-426f-9247-bb680e5fe0c8";

    #[test]
    fn test_issued_token_verifies() {
        let secret = SecretString::from(SECRET);
        let token = issue_with(Some(&secret), USER, Duration::from_secs(300)).unwrap();

        let verified = TokenIssuer::new(&secret).verify(&token.access_token).unwrap();
        assert_eq!(verified.subject, UserId::parse(USER).unwrap());
        assert_eq!(token.token_type, "Bearer");
    }

    #[test]
    fn test_missing_secret() {
        let err = issue_with(None, USER, Duration::from_secs(300)).unwrap_err();
        assert!(matches!(err, TokenCommandError::MissingEnvVar("JWT_SECRET")));
    }

    #[test]
    fn test_malformed_user_id() {
        let secret = SecretString::from(SECRET);
        let err = issue_with(Some(&secret), "507f1f77bcf86cd799439011", Duration::from_secs(300))
            .unwrap_err();
        assert!(matches!(err, TokenCommandError::InvalidUserId(_)));
    }

    #[test]
    fn test_wrong_secret_does_not_verify() {
        let token = issue_with(
            Some(&SecretString::from(SECRET)),
            USER,
            Duration::from_secs(300),
        )
        .unwrap();
        let other = SecretString::from("Pm4^bX7*cD1&eF9%gH2(iJ5)kL8_mN3+");
        assert!(TokenIssuer::new(&other).verify(&token.access_token).is_err());
    }
}
