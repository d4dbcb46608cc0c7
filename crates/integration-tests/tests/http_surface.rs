//! Gate, envelope and routing behaviour that is not specific to one
//! operation.

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode, header};
use chrono::Utc;

use accounts_core::UserId;
use accounts_integration_tests::{JWT_SECRET, TestApp};
use accounts_server::services::TokenIssuer;

// =============================================================================
// Access-Control Gate
// =============================================================================

#[tokio::test]
async fn test_missing_token_is_401() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/users", None, None).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["status"], "ER");
    assert_eq!(response.body["errorCode"], "ER401");
    assert_eq!(response.body["errorMessage"], "Missing or invalid token");
}

#[tokio::test]
async fn test_wrong_scheme_is_401() {
    let app = TestApp::new();
    let token = TokenIssuer::new(&JWT_SECRET.into())
        .issue(UserId::new_v4(), Duration::from_secs(60))
        .unwrap();

    let request = Request::builder()
        .uri("/develop/users")
        .header(header::AUTHORIZATION, format!("bearer {}", token.access_token))
        .body(Body::empty())
        .unwrap();
    let response = app.raw(request).await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["errorMessage"], "Missing or invalid token");
}

#[tokio::test]
async fn test_expired_token_is_401() {
    let app = TestApp::new();
    let token = TokenIssuer::new(&JWT_SECRET.into())
        .issue_at(
            UserId::new_v4(),
            Duration::from_secs(60),
            Utc::now() - chrono::Duration::hours(1),
        )
        .unwrap();

    let response = app
        .send(Method::GET, "/users", None, Some(&token.access_token))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(response.body["errorCode"], "ER401");
    assert_eq!(
        response.body["errorMessage"],
        "Unauthorized: token has expired"
    );
}

#[tokio::test]
async fn test_garbage_token_is_401_with_reason() {
    let app = TestApp::new();

    let response = app
        .send(Method::GET, "/users", None, Some("not.a.token"))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert!(
        response.body["errorMessage"]
            .as_str()
            .unwrap()
            .starts_with("Unauthorized: ")
    );
}

#[tokio::test]
async fn test_foreign_signature_is_401() {
    let app = TestApp::new();
    let forged = TokenIssuer::new(&"Pm4^bX7*cD1&eF9%gH2(iJ5)kL8_mN3+".into())
        .issue(UserId::new_v4(), Duration::from_secs(60))
        .unwrap();

    let response = app
        .send(Method::GET, "/users", None, Some(&forged.access_token))
        .await;
    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.body["errorMessage"],
        "Unauthorized: token signature is invalid"
    );
}

#[tokio::test]
async fn test_public_routes_need_no_token() {
    let app = TestApp::new();

    let health = app.send(Method::GET, "/healthcheck", None, None).await;
    assert_eq!(health.status, StatusCode::OK);
    assert_eq!(health.body["status"], "OK");

    let ready = app.send(Method::GET, "/healthcheck/ready", None, None).await;
    assert_eq!(ready.status, StatusCode::OK);
}

// =============================================================================
// Envelope
// =============================================================================

#[tokio::test]
async fn test_transaction_code_follows_request_id() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/develop/healthcheck")
        .header("x-request-id", "trace-abc")
        .body(Body::empty())
        .unwrap();
    let response = app.raw(request).await;

    assert_eq!(response.body["transactionCode"], "trace-abc");
    assert_eq!(response.headers["x-request-id"], "trace-abc");
}

#[tokio::test]
async fn test_transaction_code_generated_when_absent() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/healthcheck", None, None).await;
    let code = response.body["transactionCode"].as_str().unwrap();
    assert!(!code.is_empty());
    assert_eq!(response.headers["x-request-id"], code);
}

#[tokio::test]
async fn test_status_code_is_never_in_body() {
    let app = TestApp::new();

    let ok = app.send(Method::GET, "/healthcheck", None, None).await;
    let err = app.send(Method::GET, "/users", None, None).await;
    assert!(ok.body.get("statusCode").is_none());
    assert!(err.body.get("statusCode").is_none());
}

#[tokio::test]
async fn test_malformed_json_is_400_envelope() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::POST)
        .uri("/develop/auth/register")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let response = app.raw(request).await;

    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["errorCode"], "ER400");
    assert!(
        response.body["errorMessage"]
            .as_str()
            .unwrap()
            .starts_with("body: ")
    );
}

// =============================================================================
// Routing
// =============================================================================

#[tokio::test]
async fn test_unmatched_path_is_404_envelope() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/nope", None, None).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["errorCode"], "ER404");
}

#[tokio::test]
async fn test_routes_live_under_prefix_only() {
    let app = TestApp::new();

    let request = Request::builder()
        .uri("/healthcheck")
        .body(Body::empty())
        .unwrap();
    let response = app.raw(request).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_custom_prefix() {
    let app = TestApp::with_env(&[("APP_PREFIX", "api/v1/")]);
    assert_eq!(app.prefix, "/api/v1");

    let response = app.send(Method::GET, "/healthcheck", None, None).await;
    assert_eq!(response.status, StatusCode::OK);
}

#[tokio::test]
async fn test_security_headers_present() {
    let app = TestApp::new();

    let response = app.send(Method::GET, "/nope", None, None).await;
    assert_eq!(response.headers["x-content-type-options"], "nosniff");
    assert_eq!(response.headers["x-frame-options"], "DENY");
}

#[tokio::test]
async fn test_cors_preflight_allows_patch() {
    let app = TestApp::new();

    let request = Request::builder()
        .method(Method::OPTIONS)
        .uri("/develop/users/x")
        .header(header::ORIGIN, "https://example.com")
        .header(header::ACCESS_CONTROL_REQUEST_METHOD, "PATCH")
        .body(Body::empty())
        .unwrap();
    let response = app.raw(request).await;

    assert!(response.status.is_success());
    let allowed = response.headers[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap()
        .to_owned();
    assert!(allowed.contains("PATCH"));
}
