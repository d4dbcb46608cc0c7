//! User management handlers. All of them run behind the bearer gate.

use axum::{
    Json,
    extract::{Path, State, rejection::JsonRejection},
    response::Response,
};

use super::{malformed_body, respond};
use crate::context::RequestContext;
use crate::models::UpdateAccountRequest;
use crate::state::AppState;

/// `GET /users`
pub async fn list(State(state): State<AppState>, ctx: RequestContext) -> Response {
    let result = state.accounts().list(&ctx).await;
    respond(&state, &ctx, "GetAll", None, result.map(Some))
}

/// `GET /users/{id}`
pub async fn fetch(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Response {
    let result = state.accounts().fetch(&ctx, &id).await;
    respond(&state, &ctx, "Get", None, result.map(Some))
}

/// `PATCH /users/{id}`
pub async fn update(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
    payload: Result<Json<UpdateAccountRequest>, JsonRejection>,
) -> Response {
    let result = match payload {
        Ok(Json(request)) => state.accounts().update(&ctx, &id, request).await,
        Err(rejection) => Err(malformed_body(&rejection)),
    };

    respond(
        &state,
        &ctx,
        "Update",
        Some("Update completed"),
        result.map(|()| None::<()>),
    )
}

/// `DELETE /users/{id}`
pub async fn delete(
    State(state): State<AppState>,
    ctx: RequestContext,
    Path(id): Path<String>,
) -> Response {
    let result = state.accounts().delete(&ctx, &id).await;
    respond(
        &state,
        &ctx,
        "Delete",
        Some("Delete completed"),
        result.map(|()| None::<()>),
    )
}
