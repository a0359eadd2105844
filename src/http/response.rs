//! Mapping relay results onto HTTP responses.
//!
//! # Headers
//! - `X-Retries-Taken`: attempts minus one, on every relay decision
//! - `ETag`: echoed validator, when there is one
//! - `X-Bouncer-Error`: set only on responses the gateway produced itself,
//!   so callers can tell them apart from relayed upstream answers

use axum::body::Body;
use axum::extract::rejection::BytesRejection;
use axum::http::header::{CONTENT_TYPE, ETAG};
use axum::http::{HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::relay::{OutcomeKind, RelayOutcome, RequestError};

pub const X_RETRIES_TAKEN: &str = "x-retries-taken";
pub const X_BOUNCER_ERROR: &str = "x-bouncer-error";

/// Inbound call rejected before any upstream work.
#[derive(Debug)]
pub enum Rejection {
    MethodNotAllowed(Method),
    /// Body unreadable or over the configured size limit.
    Body(BytesRejection),
    InvalidRequest(RequestError),
}

impl Rejection {
    pub fn status(&self) -> StatusCode {
        match self {
            Rejection::MethodNotAllowed(_) => StatusCode::METHOD_NOT_ALLOWED,
            Rejection::Body(rejection) => rejection.status(),
            Rejection::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    fn message(&self) -> String {
        match self {
            Rejection::MethodNotAllowed(method) => {
                format!("only GET and POST are accepted here, got {method}")
            }
            Rejection::Body(rejection) => rejection.body_text(),
            Rejection::InvalidRequest(err) => err.to_string(),
        }
    }
}

impl From<RequestError> for Rejection {
    fn from(err: RequestError) -> Self {
        Rejection::InvalidRequest(err)
    }
}

impl From<BytesRejection> for Rejection {
    fn from(rejection: BytesRejection) -> Self {
        Rejection::Body(rejection)
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        let body = json!({ "error": self.message() }).to_string();
        let mut response = (self.status(), body).into_response();
        let headers = response.headers_mut();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(X_BOUNCER_ERROR, HeaderValue::from_static("invalid_request"));
        response
    }
}

impl IntoResponse for RelayOutcome {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::BAD_GATEWAY);
        let retries_taken = HeaderValue::from(self.retries_taken());
        let gateway_error = match self.kind {
            OutcomeKind::DispatchFailed => Some("dispatch_failed"),
            OutcomeKind::RetriesExhausted => Some("retries_exhausted"),
            OutcomeKind::Cancelled => Some("cancelled"),
            _ => None,
        };
        let validator = self
            .validator
            .as_deref()
            .and_then(|v| HeaderValue::from_str(v).ok());

        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(X_RETRIES_TAKEN, retries_taken);
        if let Some(validator) = validator {
            headers.insert(ETAG, validator);
        }
        if let Some(kind) = gateway_error {
            headers.insert(X_BOUNCER_ERROR, HeaderValue::from_static(kind));
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }
        response
    }
}
