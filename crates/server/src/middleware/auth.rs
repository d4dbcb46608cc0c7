//! Access-control gate for protected routes.
//!
//! Reads `Authorization: Bearer <token>`, verifies the token and stores the
//! token's subject in the request extensions as [`Subject`]. Anything else
//! is answered with a 401 `ER` envelope before the handler runs.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use accounts_core::UserId;

use crate::context::RequestContext;
use crate::services::AccountError;
use crate::state::AppState;

/// The case-sensitive scheme prefix, including its single space.
const BEARER_PREFIX: &str = "Bearer ";

/// Message for a missing header or a header without the bearer prefix.
pub const MISSING_TOKEN_MESSAGE: &str = "Missing or invalid token";

/// Account the verified token was issued to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Subject(pub UserId);

/// Extract the raw token from an `Authorization` header value.
fn bearer_token(header: Option<&str>) -> Option<&str> {
    header?.strip_prefix(BEARER_PREFIX)
}

/// Middleware that rejects requests without a valid bearer token.
///
/// Use with `axum::middleware::from_fn_with_state`.
pub async fn require_bearer(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let verified = match bearer_token(header) {
        None => Err(AccountError::Unauthorized(MISSING_TOKEN_MESSAGE.to_owned())),
        Some(token) => state
            .tokens()
            .verify(token)
            .map_err(|e| AccountError::Unauthorized(format!("Unauthorized: {e}"))),
    };

    match verified {
        Ok(claims) => {
            tracing::Span::current().record("user_id", tracing::field::display(claims.subject));
            request.extensions_mut().insert(Subject(claims.subject));
            next.run(request).await
        }
        Err(err) => {
            let ctx =
                RequestContext::from_extensions(request.extensions(), state.config().request_timeout);
            reject(&state, &ctx, &err)
        }
    }
}

fn reject(state: &AppState, ctx: &RequestContext, err: &AccountError) -> Response {
    state
        .envelopes()
        .error::<()>(ctx, "Authorize", err)
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bearer_token_extraction() {
        assert_eq!(bearer_token(Some("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(bearer_token(Some("Bearer ")), Some(""));
    }

    #[test]
    fn test_bearer_prefix_is_strict() {
        assert_eq!(bearer_token(None), None);
        assert_eq!(bearer_token(Some("bearer abc")), None);
        assert_eq!(bearer_token(Some("Bearerabc")), None);
        assert_eq!(bearer_token(Some("Basic abc")), None);
        assert_eq!(bearer_token(Some("abc")), None);
    }
}
