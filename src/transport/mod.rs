//! Upstream transport subsystem.
//!
//! # Data Flow
//! ```text
//! RelayEngine
//!     → cache.rs (answer validated GETs from the revalidation cache)
//!     → client.rs (reqwest, real network)
//!     → UpstreamResponse | TransportError
//! ```
//!
//! # Design Decisions
//! - The engine only sees the [`Transport`] trait, so tests plug in fakes
//! - Bodies are read fully before returning; no partial body ever escapes
//! - A response with any status is a success at this layer

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, Method};
use url::Url;

pub mod cache;
pub mod client;

pub use cache::CachingTransport;
pub use client::HttpTransport;

/// A fully built outbound call. Cloned for every attempt.
#[derive(Debug, Clone)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: Url,
    pub headers: HeaderMap,
    pub body: Bytes,
}

/// A fully buffered upstream response.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Header value as a string, if present and valid UTF-8.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// The call never produced a complete response.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("connection failed: {0}")]
    Connect(String),

    #[error("upstream timed out: {0}")]
    Timeout(String),

    #[error("failed to read upstream body: {0}")]
    Body(String),

    #[error("request failed: {0}")]
    Other(String),
}

/// Narrow capability the relay engine dispatches through.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn dispatch(&self, request: OutboundRequest) -> Result<UpstreamResponse, TransportError>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for std::sync::Arc<T> {
    async fn dispatch(&self, request: OutboundRequest) -> Result<UpstreamResponse, TransportError> {
        (**self).dispatch(request).await
    }
}
