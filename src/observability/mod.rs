//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters, gauges, histograms via `metrics`)
//!
//! Consumers:
//!     → stdout log aggregation
//!     → Prometheus scrape on the metrics listener
//! ```
//!
//! # Design Decisions
//! - The relay engine records through the `OutcomeRecorder` trait so tests
//!   can count records without a global recorder
//! - Metric updates are cheap when no exporter is installed (no-op recorder)

pub mod logging;
pub mod metrics;

pub use self::metrics::{OutcomeRecorder, PrometheusRecorder};
