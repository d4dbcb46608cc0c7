//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors, transactions)
//! 2. CORS
//! 3. `TraceLayer` (request span with method, URI, status, latency)
//! 4. Request ID (correlation id and request start time)
//! 5. Security headers
//! 6. Access-control gate (protected routes only)

pub mod auth;
pub mod request_id;
pub mod security_headers;

pub use auth::{MISSING_TOKEN_MESSAGE, Subject, require_bearer};
pub use request_id::{REQUEST_ID_HEADER, RequestId, RequestStart, request_id_middleware};
pub use security_headers::security_headers_middleware;
