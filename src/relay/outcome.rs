//! The single result of one inbound relay request.

use axum::body::Bytes;
use axum::http::header::ETAG;
use serde_json::json;
use url::Url;

use crate::transport::{TransportError, UpstreamResponse};

/// Status returned when the upstream could not be reached at all.
pub const DISPATCH_FAILED_STATUS: u16 = 502;

/// Status returned when every attempt got a transient answer.
pub const RETRIES_EXHAUSTED_STATUS: u16 = 503;

/// Recorded when the caller went away; never actually delivered.
pub const CLIENT_CLOSED_STATUS: u16 = 499;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutcomeKind {
    Success,
    NotModified,
    PassThrough,
    DispatchFailed,
    RetriesExhausted,
    Cancelled,
}

/// Terminal result of the retry loop.
#[derive(Debug, Clone)]
pub struct RelayOutcome {
    pub kind: OutcomeKind,
    pub status: u16,
    pub body: Bytes,
    /// Validator echoed back to the caller, if any.
    pub validator: Option<String>,
    /// Upstream dispatches made; never above the retry ceiling.
    pub attempts: u32,
}

impl RelayOutcome {
    /// Value for `X-Retries-Taken`.
    pub fn retries_taken(&self) -> u32 {
        self.attempts.saturating_sub(1)
    }

    pub(crate) fn success(response: UpstreamResponse, attempts: u32) -> Self {
        Self {
            kind: OutcomeKind::Success,
            status: response.status,
            validator: etag_of(&response),
            body: response.body,
            attempts,
        }
    }

    pub(crate) fn not_modified(
        response: UpstreamResponse,
        requested: Option<&str>,
        attempts: u32,
    ) -> Self {
        Self {
            kind: OutcomeKind::NotModified,
            status: response.status,
            validator: etag_of(&response).or_else(|| requested.map(str::to_string)),
            body: Bytes::new(),
            attempts,
        }
    }

    pub(crate) fn pass_through(response: UpstreamResponse, attempts: u32) -> Self {
        Self {
            kind: OutcomeKind::PassThrough,
            status: response.status,
            validator: None,
            body: response.body,
            attempts,
        }
    }

    pub(crate) fn dispatch_failed(err: &TransportError, attempts: u32) -> Self {
        Self {
            kind: OutcomeKind::DispatchFailed,
            status: DISPATCH_FAILED_STATUS,
            validator: None,
            body: diagnostic(json!({
                "error": "error trying to execute request",
                "cause": err.to_string(),
            })),
            attempts,
        }
    }

    pub(crate) fn retries_exhausted(url: &Url, attempts: u32) -> Self {
        Self {
            kind: OutcomeKind::RetriesExhausted,
            status: RETRIES_EXHAUSTED_STATUS,
            validator: None,
            body: diagnostic(json!({
                "error": "maximum retries exceeded",
                "url": url.as_str(),
                "attempts": attempts,
            })),
            attempts,
        }
    }

    pub(crate) fn cancelled(attempts: u32) -> Self {
        Self {
            kind: OutcomeKind::Cancelled,
            status: CLIENT_CLOSED_STATUS,
            validator: None,
            body: Bytes::new(),
            attempts,
        }
    }
}

fn etag_of(response: &UpstreamResponse) -> Option<String> {
    response.header(ETAG.as_str()).map(str::to_string)
}

fn diagnostic(value: serde_json::Value) -> Bytes {
    Bytes::from(value.to_string())
}
