//! HTTP mapping for lifecycle errors.
//!
//! Every failure leaves the service as an `ER` envelope (see
//! [`crate::envelope`]); this module decides its status code, its `errorCode`
//! and how much of the error text the client gets to see.

use axum::http::StatusCode;

use crate::services::AccountError;

/// Message returned in place of store and internal error details.
pub const GENERIC_SERVER_MESSAGE: &str = "Internal server error";

impl AccountError {
    /// HTTP status for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Validation(_)
            | Self::DuplicateEmail
            | Self::InvalidCredentials
            | Self::InvalidIdentifier(_) => StatusCode::BAD_REQUEST,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Store(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::DeadlineExceeded => StatusCode::GATEWAY_TIMEOUT,
        }
    }

    /// Envelope `errorCode`: `ER` followed by the status code.
    #[must_use]
    pub const fn error_code(&self) -> &'static str {
        match self {
            Self::Validation(_)
            | Self::DuplicateEmail
            | Self::InvalidCredentials
            | Self::InvalidIdentifier(_) => "ER400",
            Self::NotFound => "ER404",
            Self::Unauthorized(_) => "ER401",
            Self::Store(_) | Self::Internal(_) => "ER500",
            Self::DeadlineExceeded => "ER504",
        }
    }

    /// Whether the error is the server's fault and worth reporting.
    #[must_use]
    pub const fn is_server_error(&self) -> bool {
        matches!(self, Self::Store(_) | Self::Internal(_))
    }

    /// Text for the envelope's `errorMessage`.
    ///
    /// Store and internal failures are replaced by a generic message; their
    /// detail only goes to the server log.
    #[must_use]
    pub fn public_message(&self) -> String {
        if self.is_server_error() {
            GENERIC_SERVER_MESSAGE.to_owned()
        } else {
            self.to_string()
        }
    }
}
