//! Health check handlers.

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
};

use crate::context::RequestContext;
use crate::state::AppState;

/// Liveness health check endpoint.
///
/// Answers `OK` if the server is running. Does not check dependencies.
pub async fn live(State(state): State<AppState>, ctx: RequestContext) -> Response {
    state
        .envelopes()
        .ok::<()>(&ctx, "Healthcheck", Some("OK"), None)
        .into_response()
}

/// Readiness health check endpoint.
///
/// Pings the account store under the request deadline. Answers 503 if the
/// store does not respond.
pub async fn ready(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let ping = tokio::time::timeout_at(ctx.deadline, state.repo().count()).await;

    let detail = match ping {
        Ok(Ok(_)) => {
            return state
                .envelopes()
                .ok::<()>(&ctx, "Ready", Some("OK"), None)
                .into_response();
        }
        Ok(Err(e)) => e.to_string(),
        Err(_) => "store ping timed out".to_owned(),
    };

    state
        .envelopes()
        .reject::<()>(
            &ctx,
            "Ready",
            StatusCode::SERVICE_UNAVAILABLE,
            "ER503",
            "Service unavailable".to_owned(),
            Some(&detail),
        )
        .into_response()
}
