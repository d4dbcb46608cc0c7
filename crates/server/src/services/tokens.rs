//! Access token issuing and verification.
//!
//! Tokens are HS256 JWTs carrying the account id as `sub` plus `iat` and
//! `exp` in Unix seconds. A token is rejected once the current time reaches
//! its expiry; there is no clock-skew leeway and no revocation list.

use std::collections::HashSet;
use std::time::Duration;

use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use accounts_core::UserId;

/// Errors from issuing or verifying a token.
#[derive(Debug, Error)]
pub enum TokenError {
    /// The signature does not match the signing key.
    #[error("token signature is invalid")]
    InvalidSignature,

    /// The token is not a well-formed JWT with the expected claims.
    #[error("token is malformed: {0}")]
    Malformed(String),

    /// The current time is at or after the token's expiry.
    #[error("token has expired")]
    Expired,

    /// The lifetime does not fit a JWT timestamp.
    #[error("token lifetime is out of range")]
    InvalidLifetime,

    /// The token could not be signed.
    #[error("token signing failed: {0}")]
    Signing(String),
}

/// JWT claims embedded in access tokens.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Claims {
    /// Subject: the account id.
    pub sub: String,
    /// Issued at (unix timestamp).
    pub iat: i64,
    /// Expiry (unix timestamp).
    pub exp: i64,
}

/// Claims that passed verification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VerifiedToken {
    /// Account the token was issued to.
    pub subject: UserId,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// A freshly issued token.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AccessToken {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_at: DateTime<Utc>,
}

/// Mints and verifies access tokens with a process-wide HMAC key.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
}

impl TokenIssuer {
    /// Create an issuer from the signing secret.
    #[must_use]
    pub fn new(secret: &SecretString) -> Self {
        let key = secret.expose_secret().as_bytes();

        let mut validation = Validation::new(Algorithm::HS256);
        // Expiry is checked against an explicit clock in `verify_at`.
        validation.validate_exp = false;
        validation.leeway = 0;
        validation.required_spec_claims =
            HashSet::from(["sub".to_string(), "exp".to_string()]);

        Self {
            encoding: EncodingKey::from_secret(key),
            decoding: DecodingKey::from_secret(key),
            validation,
        }
    }

    /// Issue a token for `subject` valid for `ttl` from now.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::Signing`] if encoding fails.
    pub fn issue(&self, subject: UserId, ttl: Duration) -> Result<AccessToken, TokenError> {
        self.issue_at(subject, ttl, Utc::now())
    }

    /// Issue a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidLifetime`] if `ttl` overflows and
    /// [`TokenError::Signing`] if encoding fails.
    pub fn issue_at(
        &self,
        subject: UserId,
        ttl: Duration,
        now: DateTime<Utc>,
    ) -> Result<AccessToken, TokenError> {
        let ttl = chrono::Duration::from_std(ttl).map_err(|_| TokenError::InvalidLifetime)?;
        let expires_at = now
            .checked_add_signed(ttl)
            .ok_or(TokenError::InvalidLifetime)?;

        let claims = Claims {
            sub: subject.to_string(),
            iat: now.timestamp(),
            exp: expires_at.timestamp(),
        };

        let token = jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| TokenError::Signing(e.to_string()))?;

        Ok(AccessToken {
            access_token: token,
            token_type: "Bearer",
            expires_at,
        })
    }

    /// Verify a token against the current time.
    ///
    /// # Errors
    ///
    /// See [`TokenIssuer::verify_at`].
    pub fn verify(&self, token: &str) -> Result<VerifiedToken, TokenError> {
        self.verify_at(token, Utc::now())
    }

    /// Verify a token as if the current time were `now`.
    ///
    /// # Errors
    ///
    /// Returns [`TokenError::InvalidSignature`] for a foreign or tampered
    /// token, [`TokenError::Malformed`] for structural problems, and
    /// [`TokenError::Expired`] when `now` is at or past `exp`.
    pub fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<VerifiedToken, TokenError> {
        let data = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
            .map_err(|e| match e.kind() {
                ErrorKind::InvalidSignature => TokenError::InvalidSignature,
                _ => TokenError::Malformed(e.to_string()),
            })?;
        let claims = data.claims;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        let subject = UserId::parse(&claims.sub)
            .map_err(|_| TokenError::Malformed("subject is not an account id".to_string()))?;
        let issued_at = DateTime::from_timestamp(claims.iat, 0)
            .ok_or_else(|| TokenError::Malformed("iat out of range".to_string()))?;
        let expires_at = DateTime::from_timestamp(claims.exp, 0)
            .ok_or_else(|| TokenError::Malformed("exp out of range".to_string()))?;

        Ok(VerifiedToken {
            subject,
            issued_at,
            expires_at,
        })
    }
}
