//! Metrics collection and exposition.
//!
//! # Metrics
//! - `bouncer_requests` (histogram): inbound request latency by final `code`
//! - `bouncer_upstream_attempts_total` (counter): upstream responses by `status`
//! - `bouncer_rate_limit_delay_seconds` (histogram): time spent waiting for a slot
//! - `bouncer_error_budget_remaining` (gauge): last quota signal seen
//! - `bouncer_error_budget_trips_total` (counter): OPEN → TRIPPED transitions
//! - `bouncer_cache_hits_total` (counter), `bouncer_cache_entries` (gauge)
//!
//! The exporter listens on its own address, separate from relay traffic.

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

const REQUESTS: &str = "bouncer_requests";
const LATENCY_BUCKETS: &[f64] = &[0.1, 0.2, 0.5, 1.0, 2.0, 5.0, 10.0];

/// Records the final status and latency of each inbound request.
pub trait OutcomeRecorder: Send + Sync {
    fn record(&self, status: u16, elapsed: Duration);
}

/// Forwards outcomes to the global `metrics` recorder.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrometheusRecorder;

impl OutcomeRecorder for PrometheusRecorder {
    fn record(&self, status: u16, elapsed: Duration) {
        metrics::histogram!(REQUESTS, "code" => status.to_string()).record(elapsed.as_secs_f64());
    }
}

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(Matcher::Full(REQUESTS.to_string()), LATENCY_BUCKETS)?
        .install()?;

    metrics::describe_histogram!(
        REQUESTS,
        metrics::Unit::Seconds,
        "Inbound relay latency by final status (roughly upstream latency)"
    );
    metrics::describe_gauge!(
        "bouncer_error_budget_remaining",
        "Remaining upstream error quota as last reported"
    );

    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_upstream_attempt(status: u16) {
    metrics::counter!("bouncer_upstream_attempts_total", "status" => status.to_string())
        .increment(1);
}

pub fn record_rate_limit_delay(delay: Duration) {
    metrics::histogram!("bouncer_rate_limit_delay_seconds").record(delay.as_secs_f64());
}

pub fn record_error_budget_remaining(remaining: i64) {
    metrics::gauge!("bouncer_error_budget_remaining").set(remaining as f64);
}

pub fn record_error_budget_trip() {
    metrics::counter!("bouncer_error_budget_trips_total").increment(1);
}

pub fn record_cache_hit() {
    metrics::counter!("bouncer_cache_hits_total").increment(1);
}

pub fn record_cache_size(entries: usize) {
    metrics::gauge!("bouncer_cache_entries").set(entries as f64);
}
