//! HTTP route handlers.
//!
//! # Route Structure
//!
//! All paths are nested under the configured prefix (default `/develop`).
//!
//! ```text
//! GET    /healthcheck          - Liveness
//! GET    /healthcheck/ready    - Readiness (pings the account store)
//!
//! # Auth
//! POST   /auth/register        - Register an account
//! POST   /auth/login           - Exchange credentials for an access token
//!
//! # Users (bearer token required)
//! GET    /users                - List accounts
//! GET    /users/{id}           - Fetch one account
//! PATCH  /users/{id}           - Change name and/or email
//! DELETE /users/{id}           - Delete an account
//! ```
//!
//! Anything else answers 404 with an `ER404` envelope.

pub mod auth;
pub mod health;
pub mod users;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    http::{Method, StatusCode, Uri, header},
    middleware::{from_fn, from_fn_with_state},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{DefaultOnResponse, OnResponse, TraceLayer};
use tracing::Span;

use accounts_core::FieldError;

use crate::context::RequestContext;
use crate::middleware::{request_id_middleware, require_bearer, security_headers_middleware};
use crate::services::AccountError;
use crate::state::AppState;

/// Create the auth routes router.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
}

/// Create the user routes router. Every route sits behind the bearer gate.
pub fn user_routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/", get(users::list))
        .route(
            "/{id}",
            get(users::fetch).patch(users::update).delete(users::delete),
        )
        .route_layer(from_fn_with_state(state.clone(), require_bearer))
}

/// Create all API routes, relative to the prefix.
pub fn routes(state: &AppState) -> Router<AppState> {
    Router::new()
        .route("/healthcheck", get(health::live))
        .route("/healthcheck/ready", get(health::ready))
        .nest("/auth", auth_routes())
        .nest("/users", user_routes(state))
}

/// Assemble the full application: prefixed routes, fallback and the
/// middleware stack.
pub fn app(state: AppState) -> Router {
    let prefix = state.config().prefix.clone();
    let api = routes(&state);

    let router = if prefix.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(&prefix, api)
    };

    router
        .fallback(not_found)
        .layer(from_fn(security_headers_middleware))
        .layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        user_id = tracing::field::Empty,
                        operation = tracing::field::Empty,
                        outcome = tracing::field::Empty,
                        error_code = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .layer(cors())
        .with_state(state)
}

fn cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::HEAD,
            Method::PUT,
            Method::DELETE,
            Method::PATCH,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
}

/// Fallback for unmatched paths.
async fn not_found(State(state): State<AppState>, ctx: RequestContext, uri: Uri) -> Response {
    state
        .envelopes()
        .reject::<()>(
            &ctx,
            "NotFound",
            StatusCode::NOT_FOUND,
            "ER404",
            format!("path not found: {}", uri.path()),
            None,
        )
        .into_response()
}

/// Turn a lifecycle result into an envelope response.
///
/// `Ok(None)` produces an envelope without `data`.
pub(crate) fn respond<T: Serialize>(
    state: &AppState,
    ctx: &RequestContext,
    operation: &'static str,
    message: Option<&str>,
    result: Result<Option<T>, AccountError>,
) -> Response {
    match result {
        Ok(data) => state
            .envelopes()
            .ok(ctx, operation, message, data)
            .into_response(),
        Err(err) => state
            .envelopes()
            .error::<()>(ctx, operation, &err)
            .into_response(),
    }
}

/// Map an unparseable JSON body to a validation error.
pub(crate) fn malformed_body(rejection: &JsonRejection) -> AccountError {
    AccountError::Validation(FieldError::new("body", rejection.body_text()))
}
