//! In-memory collaborators for exercising the relay engine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::body::Bytes;
use axum::http::{HeaderMap, HeaderValue};
use tokio_util::sync::CancellationToken;

use crate::observability::OutcomeRecorder;
use crate::resilience::{Cancelled, RateLimiter};
use crate::transport::{OutboundRequest, Transport, TransportError, UpstreamResponse};

type Handler = dyn Fn(usize, &OutboundRequest) -> Result<UpstreamResponse, TransportError> + Send + Sync;

/// Transport answering from a closure of (call index, request).
pub struct FakeTransport {
    handler: Box<Handler>,
    calls: AtomicUsize,
    seen: Mutex<Vec<(tokio::time::Instant, OutboundRequest)>>,
}

impl FakeTransport {
    pub fn new<F>(handler: F) -> Arc<Self>
    where
        F: Fn(usize, &OutboundRequest) -> Result<UpstreamResponse, TransportError>
            + Send
            + Sync
            + 'static,
    {
        Arc::new(Self {
            handler: Box::new(handler),
            calls: AtomicUsize::new(0),
            seen: Mutex::new(Vec::new()),
        })
    }

    /// Always answers with the same status.
    pub fn constant(status: u16) -> Arc<Self> {
        Self::new(move |_, _| Ok(response(status, "body")))
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requests(&self) -> Vec<OutboundRequest> {
        self.seen.lock().unwrap().iter().map(|(_, r)| r.clone()).collect()
    }

    pub fn dispatch_times(&self) -> Vec<tokio::time::Instant> {
        self.seen.lock().unwrap().iter().map(|(t, _)| *t).collect()
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn dispatch(&self, request: OutboundRequest) -> Result<UpstreamResponse, TransportError> {
        let index = self.calls.fetch_add(1, Ordering::SeqCst);
        let result = (self.handler)(index, &request);
        self.seen
            .lock()
            .unwrap()
            .push((tokio::time::Instant::now(), request));
        result
    }
}

pub fn response(status: u16, body: &'static str) -> UpstreamResponse {
    UpstreamResponse {
        status,
        headers: HeaderMap::new(),
        body: Bytes::from_static(body.as_bytes()),
    }
}

pub fn with_header(mut response: UpstreamResponse, name: &'static str, value: &'static str) -> UpstreamResponse {
    response
        .headers
        .insert(name, HeaderValue::from_static(value));
    response
}

/// Limiter that never waits and counts acquisitions.
#[derive(Default)]
pub struct CountingLimiter {
    acquired: AtomicUsize,
}

impl CountingLimiter {
    pub fn acquired(&self) -> usize {
        self.acquired.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RateLimiter for CountingLimiter {
    async fn acquire(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }
        self.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Recorder that keeps every (status, latency) pair.
#[derive(Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<(u16, Duration)>>,
}

impl MemoryRecorder {
    pub fn statuses(&self) -> Vec<u16> {
        self.records.lock().unwrap().iter().map(|(s, _)| *s).collect()
    }
}

impl OutcomeRecorder for MemoryRecorder {
    fn record(&self, status: u16, elapsed: Duration) {
        self.records.lock().unwrap().push((status, elapsed));
    }
}
