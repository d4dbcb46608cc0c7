//! Integration tests for the accounts service.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p accounts-integration-tests
//! ```
//!
//! The tests drive the fully assembled router (middleware, gate, routes,
//! envelopes) in process with `tower::ServiceExt::oneshot`, backed by the
//! in-memory account store. No database or network listener is needed.

use std::collections::HashMap;
use std::sync::Arc;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{HeaderMap, Method, Request, StatusCode, header};
use serde_json::Value;
use tower::ServiceExt;

use accounts_server::config::AppConfig;
use accounts_server::db::{AccountRepository, MemoryAccountRepository};
use accounts_server::{AppState, app};

/// Signing secret used by every test app.
pub const JWT_SECRET: &str = "aB3$xY9!mK2@nL5#pQ7&rT0*uW4^zC6e";

/// Credential salt used by every test app.
pub const PASSWORD_SALT: &str = "Zq8!vN2#kR5@wT1$";

/// A response reduced to what the tests look at.
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

/// In-process application over a fresh in-memory store.
pub struct TestApp {
    pub router: Router,
    pub repo: Arc<MemoryAccountRepository>,
    pub prefix: String,
}

impl TestApp {
    /// Build an app with the default `/develop` prefix.
    #[must_use]
    pub fn new() -> Self {
        Self::with_env(&[])
    }

    /// Build an app with extra environment overrides.
    ///
    /// # Panics
    ///
    /// Panics if the resulting configuration is invalid.
    #[must_use]
    pub fn with_env(overrides: &[(&str, &str)]) -> Self {
        let mut vars: HashMap<String, String> = HashMap::from([
            ("JWT_SECRET".to_owned(), JWT_SECRET.to_owned()),
            ("PASSWORD_SALT".to_owned(), PASSWORD_SALT.to_owned()),
            ("ACCOUNT_STORE".to_owned(), "memory".to_owned()),
        ]);
        for (key, value) in overrides {
            vars.insert((*key).to_owned(), (*value).to_owned());
        }

        let config = AppConfig::from_source(&|key| vars.get(key).cloned())
            .expect("test configuration should be valid");
        let prefix = config.prefix.clone();
        let repo = Arc::new(MemoryAccountRepository::new());
        let shared: Arc<dyn AccountRepository> = repo.clone();

        Self {
            router: app(AppState::new(config, shared)),
            repo,
            prefix,
        }
    }

    /// Send a request to `path` (relative to the prefix).
    ///
    /// # Panics
    ///
    /// Panics if the request cannot be built or the body is not JSON.
    pub async fn send(
        &self,
        method: Method,
        path: &str,
        body: Option<Value>,
        token: Option<&str>,
    ) -> TestResponse {
        let mut builder = Request::builder()
            .method(method)
            .uri(format!("{}{path}", self.prefix));

        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }

        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string())),
            None => builder.body(Body::empty()),
        }
        .expect("request should build");

        self.raw(request).await
    }

    /// Send a prebuilt request; the URI is used as is.
    ///
    /// # Panics
    ///
    /// Panics if the router fails or the body is not JSON.
    pub async fn raw(&self, request: Request<Body>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("router is infallible");

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should be readable");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("body should be JSON")
        };

        TestResponse {
            status,
            headers,
            body,
        }
    }

    /// Register an account, asserting success.
    ///
    /// # Panics
    ///
    /// Panics if registration does not return 200.
    pub async fn register(&self, name: &str, email: &str, password: &str) {
        let response = self
            .send(
                Method::POST,
                "/auth/register",
                Some(serde_json::json!({"name": name, "email": email, "password": password})),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
    }

    /// Log in and return the bearer token, asserting success.
    ///
    /// # Panics
    ///
    /// Panics if login does not return a token.
    pub async fn login(&self, email: &str, password: &str) -> String {
        let response = self
            .send(
                Method::POST,
                "/auth/login",
                Some(serde_json::json!({"email": email, "password": password})),
                None,
            )
            .await;
        assert_eq!(response.status, StatusCode::OK, "{:?}", response.body);
        response.body["data"]["accessToken"]
            .as_str()
            .expect("login should return a token")
            .to_owned()
    }
}

impl Default for TestApp {
    fn default() -> Self {
        Self::new()
    }
}
