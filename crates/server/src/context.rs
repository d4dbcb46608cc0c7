//! Per-request context threaded through every lifecycle operation.
//!
//! Identity, correlation and deadline travel as an explicit value rather than
//! through request-local globals. Handlers obtain it with the
//! [`RequestContext`] extractor, which reads what the request-id middleware
//! and the access-control gate left in the request extensions.

use std::convert::Infallible;
use std::time::Duration;

use axum::extract::FromRequestParts;
use axum::http::Extensions;
use axum::http::request::Parts;
use tokio::time::Instant;
use uuid::Uuid;

use accounts_core::UserId;

use crate::middleware::{RequestId, RequestStart, Subject};
use crate::state::AppState;

/// Stand-in deadline when `start + timeout` does not fit in an `Instant`.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

fn deadline_after(start: Instant, timeout: Duration) -> Instant {
    start
        .checked_add(timeout)
        .unwrap_or_else(|| start + FAR_FUTURE)
}

/// Who is calling, how to correlate their logs, and when to give up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Account resolved by the access-control gate, if the route is protected.
    pub subject: Option<UserId>,
    /// Correlation identifier echoed as `transactionCode`.
    pub correlation_id: String,
    /// Store calls still pending at this instant are abandoned.
    pub deadline: Instant,
}

impl RequestContext {
    /// Context for an anonymous caller with `timeout` left from now.
    #[must_use]
    pub fn new(correlation_id: impl Into<String>, timeout: Duration) -> Self {
        Self {
            subject: None,
            correlation_id: correlation_id.into(),
            deadline: deadline_after(Instant::now(), timeout),
        }
    }

    /// Assemble the context from what the middleware stack stored on the
    /// request.
    #[must_use]
    pub fn from_extensions(extensions: &Extensions, timeout: Duration) -> Self {
        let correlation_id = extensions
            .get::<RequestId>()
            .map_or_else(|| Uuid::new_v4().to_string(), |id| id.0.clone());
        let started = extensions
            .get::<RequestStart>()
            .map_or_else(Instant::now, |start| start.0);
        let subject = extensions.get::<Subject>().map(|s| s.0);

        Self {
            subject,
            correlation_id,
            deadline: deadline_after(started, timeout),
        }
    }
}

impl FromRequestParts<AppState> for RequestContext {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Self::from_extensions(
            &parts.extensions,
            state.config().request_timeout,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_sets_deadline_in_future() {
        let ctx = RequestContext::new("req-1", Duration::from_secs(5));
        assert!(ctx.deadline > Instant::now());
        assert_eq!(ctx.correlation_id, "req-1");
        assert!(ctx.subject.is_none());
    }

    #[tokio::test]
    async fn test_from_extensions() {
        let id = UserId::new_v4();
        let mut extensions = Extensions::new();
        extensions.insert(RequestId("abc".to_owned()));
        extensions.insert(Subject(id));

        let ctx = RequestContext::from_extensions(&extensions, Duration::from_secs(1));
        assert_eq!(ctx.correlation_id, "abc");
        assert_eq!(ctx.subject, Some(id));
    }

    #[tokio::test]
    async fn test_from_empty_extensions_generates_id() {
        let ctx = RequestContext::from_extensions(&Extensions::new(), Duration::from_secs(1));
        assert!(Uuid::parse_str(&ctx.correlation_id).is_ok());
        assert!(ctx.subject.is_none());
    }

    #[tokio::test]
    async fn test_oversized_timeout_saturates() {
        let ctx = RequestContext::new("req-2", Duration::MAX);
        assert!(ctx.deadline > Instant::now() + Duration::from_secs(86_400));

        let ctx = RequestContext::from_extensions(&Extensions::new(), Duration::MAX);
        assert!(ctx.deadline > Instant::now());
    }
}
