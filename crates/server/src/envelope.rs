//! Uniform response envelope.
//!
//! Every endpoint answers with
//!
//! ```json
//! {"status": "OK", "message": "...", "transactionCode": "...", "data": ...}
//! {"status": "ER", "errorMessage": "...", "errorCode": "ER400", "transactionCode": "..."}
//! ```
//!
//! The HTTP status travels on the response line only; it is never echoed in
//! the body. Building an envelope emits exactly one log event, parented to
//! the span the builder was constructed with, and records the operation and
//! outcome on the current request span.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use tracing::Span;
use tracing::field::display;

use crate::context::RequestContext;
use crate::services::AccountError;

/// Outcome marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Status {
    #[serde(rename = "OK")]
    Ok,
    #[serde(rename = "ER")]
    Er,
}

impl Status {
    /// Wire form.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::Er => "ER",
        }
    }
}

/// The serialisable envelope.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope<T> {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<&'static str>,
    pub transaction_code: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
}

/// An envelope paired with the status code it is sent with.
#[derive(Debug)]
pub struct Reply<T> {
    pub status_code: StatusCode,
    pub envelope: Envelope<T>,
}

impl<T: Serialize> IntoResponse for Reply<T> {
    fn into_response(self) -> Response {
        (self.status_code, Json(self.envelope)).into_response()
    }
}

/// Builds envelopes and logs each one.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    span: Span,
}

impl EnvelopeBuilder {
    /// Create a builder whose log events are parented to `span`.
    #[must_use]
    pub const fn new(span: Span) -> Self {
        Self { span }
    }

    /// A `200 OK` envelope.
    pub fn ok<T: Serialize>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        message: Option<&str>,
        data: Option<T>,
    ) -> Reply<T> {
        record_outcome(operation, Status::Ok, None);
        tracing::info!(
            parent: &self.span,
            operation,
            status = Status::Ok.as_str(),
            status_code = StatusCode::OK.as_u16(),
            transaction_code = %ctx.correlation_id,
            user_id = ctx.subject.map(display),
            "response success"
        );

        Reply {
            status_code: StatusCode::OK,
            envelope: Envelope {
                status: Status::Ok,
                message: message.map(str::to_owned),
                error_message: None,
                error_code: None,
                transaction_code: ctx.correlation_id.clone(),
                data,
            },
        }
    }

    /// An `ER` envelope for a lifecycle error.
    ///
    /// Store and internal errors are reported to Sentry and logged with
    /// their detail; the client only sees a generic message.
    pub fn error<T>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        err: &AccountError,
    ) -> Reply<T> {
        let detail = err.is_server_error().then(|| {
            let event_id = sentry::capture_error(err);
            format!("{err} (sentry event {event_id})")
        });

        self.reject(
            ctx,
            operation,
            err.status_code(),
            err.error_code(),
            err.public_message(),
            detail.as_deref(),
        )
    }

    /// An `ER` envelope with an explicit status and code.
    ///
    /// `detail` is logged but never sent to the client.
    pub fn reject<T>(
        &self,
        ctx: &RequestContext,
        operation: &'static str,
        status_code: StatusCode,
        error_code: &'static str,
        error_message: String,
        detail: Option<&str>,
    ) -> Reply<T> {
        record_outcome(operation, Status::Er, Some(error_code));
        tracing::error!(
            parent: &self.span,
            operation,
            status = Status::Er.as_str(),
            status_code = status_code.as_u16(),
            transaction_code = %ctx.correlation_id,
            user_id = ctx.subject.map(display),
            error_code,
            error_message = %error_message,
            error_detail = detail,
            "response error"
        );

        Reply {
            status_code,
            envelope: Envelope {
                status: Status::Er,
                message: None,
                error_message: Some(error_message),
                error_code: Some(error_code),
                transaction_code: ctx.correlation_id.clone(),
                data: None,
            },
        }
    }
}

/// Fill the request span's `operation`, `outcome` and `error_code` fields.
fn record_outcome(operation: &'static str, status: Status, error_code: Option<&'static str>) {
    let span = Span::current();
    span.record("operation", operation);
    span.record("outcome", status.as_str());
    if let Some(code) = error_code {
        span.record("error_code", code);
    }
}
