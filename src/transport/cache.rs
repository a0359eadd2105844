//! ETag revalidation cache in front of another transport.
//!
//! # Behavior
//! - Only GET requests are considered
//! - A 200 carrying an `ETag` is stored under its URL
//! - A later GET for the same URL is sent with `If-None-Match`; an upstream
//!   304 is answered with the stored body as a 200 (`X-From-Cache: 1`)
//! - Requests that already carry `If-None-Match` belong to the caller and
//!   bypass the cache, so their 304 reaches the caller untouched
//!
//! Eviction is arbitrary once `max_entries` is reached.

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::header::{CONTENT_LENGTH, ETAG, IF_NONE_MATCH};
use axum::http::{HeaderMap, HeaderValue, Method};
use dashmap::DashMap;

use super::{OutboundRequest, Transport, TransportError, UpstreamResponse};
use crate::observability::metrics;

pub const X_FROM_CACHE: &str = "x-from-cache";

#[derive(Debug, Clone)]
struct CachedEntry {
    etag: HeaderValue,
    headers: HeaderMap,
    body: Bytes,
}

/// Wraps a transport with a shared revalidation cache.
pub struct CachingTransport<T> {
    inner: T,
    entries: DashMap<String, CachedEntry>,
    max_entries: usize,
}

impl<T: Transport> CachingTransport<T> {
    pub fn new(inner: T, max_entries: usize) -> Self {
        Self {
            inner,
            entries: DashMap::new(),
            max_entries,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn store(&self, key: String, etag: HeaderValue, response: &UpstreamResponse) {
        if self.max_entries == 0 {
            return;
        }
        if self.entries.len() >= self.max_entries && !self.entries.contains_key(&key) {
            let victim = self.entries.iter().next().map(|e| e.key().clone());
            if let Some(victim) = victim {
                self.entries.remove(&victim);
            }
        }

        self.entries.insert(
            key,
            CachedEntry {
                etag,
                headers: response.headers.clone(),
                body: response.body.clone(),
            },
        );
        metrics::record_cache_size(self.entries.len());
    }

    fn replay(&self, key: &str, revalidation: &UpstreamResponse) -> Option<UpstreamResponse> {
        let entry = self.entries.get(key)?;
        let mut headers = entry.headers.clone();
        for (name, value) in revalidation.headers.iter() {
            if *name != CONTENT_LENGTH {
                headers.insert(name.clone(), value.clone());
            }
        }
        headers.insert(X_FROM_CACHE, HeaderValue::from_static("1"));

        Some(UpstreamResponse {
            status: 200,
            headers,
            body: entry.body.clone(),
        })
    }
}

#[async_trait]
impl<T: Transport> Transport for CachingTransport<T> {
    async fn dispatch(&self, mut request: OutboundRequest) -> Result<UpstreamResponse, TransportError> {
        if request.method != Method::GET || request.headers.contains_key(IF_NONE_MATCH) {
            return self.inner.dispatch(request).await;
        }

        let key = request.url.to_string();
        let cached_etag = self.entries.get(&key).map(|entry| entry.etag.clone());
        if let Some(etag) = &cached_etag {
            request.headers.insert(IF_NONE_MATCH, etag.clone());
        }

        let response = self.inner.dispatch(request).await?;

        match response.status {
            304 if cached_etag.is_some() => match self.replay(&key, &response) {
                Some(replayed) => {
                    tracing::debug!(url = %key, "Served from revalidated cache");
                    metrics::record_cache_hit();
                    Ok(replayed)
                }
                None => Ok(response),
            },
            200 => {
                if let Some(etag) = response.headers.get(ETAG).cloned() {
                    self.store(key, etag, &response);
                }
                Ok(response)
            }
            _ => Ok(response),
        }
    }
}
