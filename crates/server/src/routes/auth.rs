//! Registration and login handlers.

use axum::{
    Json,
    extract::{State, rejection::JsonRejection},
    response::Response,
};

use super::{malformed_body, respond};
use crate::context::RequestContext;
use crate::models::{LoginRequest, RegisterRequest};
use crate::state::AppState;

/// `POST /auth/register`
pub async fn register(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(request)) => state.accounts().register(&ctx, request).await,
        Err(rejection) => Err(malformed_body(&rejection)),
    };

    respond(
        &state,
        &ctx,
        "Register",
        Some("Register completed"),
        result.map(|()| None::<()>),
    )
}

/// `POST /auth/login`
pub async fn login(
    State(state): State<AppState>,
    ctx: RequestContext,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(request)) => state.accounts().authenticate(&ctx, request).await,
        Err(rejection) => Err(malformed_body(&rejection)),
    };

    respond(&state, &ctx, "Login", Some("Login completed"), result.map(Some))
}
