//! User management endpoints behind the bearer gate.

#![allow(clippy::unwrap_used)]

use axum::http::{Method, StatusCode};
use serde_json::json;

use accounts_core::UserId;
use accounts_integration_tests::TestApp;
use accounts_server::db::AccountRepository;

async fn app_with_tee() -> (TestApp, String, String) {
    let app = TestApp::new();
    app.register("Tee", "tee@email.com", "123456").await;
    let token = app.login("tee@email.com", "123456").await;
    let id = app.repo.get_all().await.unwrap()[0].id.to_string();
    (app, token, id)
}

// =============================================================================
// Fetch
// =============================================================================

#[tokio::test]
async fn test_fetch_excludes_credential_digest() {
    let (app, token, id) = app_with_tee().await;

    let response = app
        .send(Method::GET, &format!("/users/{id}"), None, Some(&token))
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let data = response.body["data"].as_object().unwrap();
    assert_eq!(data["id"], id.as_str());
    assert_eq!(data["name"], "Tee");
    assert!(data.contains_key("createdAt"));
    assert!(!data.contains_key("credentialDigest"));
    assert!(!data.contains_key("password"));
}

#[tokio::test]
async fn test_fetch_missing_is_404() {
    let (app, token, _) = app_with_tee().await;

    let response = app
        .send(
            Method::GET,
            &format!("/users/{}", UserId::new_v4()),
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["errorCode"], "ER404");
}

#[tokio::test]
async fn test_fetch_malformed_id_is_400() {
    let (app, token, _) = app_with_tee().await;

    let response = app
        .send(
            Method::GET,
            "/users/507f1f77bcf86cd799439011",
            None,
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert!(
        response.body["errorMessage"]
            .as_str()
            .unwrap()
            .starts_with("invalid user ID format")
    );
}

// =============================================================================
// Update
// =============================================================================

#[tokio::test]
async fn test_update_only_email_keeps_name() {
    let (app, token, id) = app_with_tee().await;

    let response = app
        .send(
            Method::PATCH,
            &format!("/users/{id}"),
            Some(json!({"email": "new@email.com"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);

    let fetched = app
        .send(Method::GET, &format!("/users/{id}"), None, Some(&token))
        .await;
    assert_eq!(fetched.body["data"]["name"], "Tee");
    assert_eq!(fetched.body["data"]["email"], "new@email.com");
}

#[tokio::test]
async fn test_update_with_nothing_succeeds() {
    let (app, token, id) = app_with_tee().await;

    let response = app
        .send(
            Method::PATCH,
            &format!("/users/{id}"),
            Some(json!({"name": "", "email": ""})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["status"], "OK");

    let fetched = app
        .send(Method::GET, &format!("/users/{id}"), None, Some(&token))
        .await;
    assert_eq!(fetched.body["data"]["name"], "Tee");
    assert_eq!(fetched.body["data"]["email"], "tee@email.com");
}

#[tokio::test]
async fn test_update_to_taken_email_is_rejected() {
    let (app, token, _) = app_with_tee().await;
    app.register("Bee", "bee@email.com", "123456").await;
    let bee = app
        .repo
        .get_all()
        .await
        .unwrap()
        .into_iter()
        .find(|a| a.email.as_str() == "bee@email.com")
        .unwrap();

    let response = app
        .send(
            Method::PATCH,
            &format!("/users/{}", bee.id),
            Some(json!({"email": "tee@email.com"})),
            Some(&token),
        )
        .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["errorMessage"], "email already exists");
}

// =============================================================================
// Delete
// =============================================================================

#[tokio::test]
async fn test_delete_is_idempotent() {
    let (app, token, id) = app_with_tee().await;

    let first = app
        .send(Method::DELETE, &format!("/users/{id}"), None, Some(&token))
        .await;
    assert_eq!(first.status, StatusCode::OK);

    let second = app
        .send(Method::DELETE, &format!("/users/{id}"), None, Some(&token))
        .await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(app.repo.count().await.unwrap(), 0);
}

#[tokio::test]
async fn test_token_outlives_deleted_account() {
    // Tokens are not revoked; the gate only checks signature and expiry.
    let (app, token, id) = app_with_tee().await;
    app.send(Method::DELETE, &format!("/users/{id}"), None, Some(&token))
        .await;

    let users = app.send(Method::GET, "/users", None, Some(&token)).await;
    assert_eq!(users.status, StatusCode::OK);
    assert_eq!(users.body["data"], json!([]));
}
