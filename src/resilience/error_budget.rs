//! Upstream error budget gate.
//!
//! # States
//! - Open: dispatch proceeds
//! - Tripped: every outbound dispatch waits until the cooldown deadline
//!
//! # State Transitions
//! ```text
//! Open → Tripped: reported remaining quota < threshold
//! Tripped → Open: cooldown deadline passes
//! ```
//!
//! The quota is counted per upstream account, so the gate is process-wide:
//! tripping it pauses the whole gateway, not just the request that saw the
//! low value. Low reports while tripped do not move the deadline.

use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::watch;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::Cancelled;
use crate::config::ErrorBudgetConfig;
use crate::observability::metrics;

/// Process-wide protection against exhausting the upstream error quota.
#[async_trait]
pub trait ErrorBudget: Send + Sync {
    /// Record the remaining quota reported by an upstream response.
    fn report_remaining(&self, remaining: i64);

    /// Suspend until the gate is open.
    async fn wait_until_open(&self, cancel: &CancellationToken) -> Result<(), Cancelled>;
}

/// Observable gate state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    Open,
    Tripped { until: Instant },
}

/// Sentinel for "no quota signal observed yet".
const UNKNOWN_REMAINING: i64 = i64::MIN;

/// [`ErrorBudget`] backed by a watch channel holding the current state.
pub struct QuotaGate {
    threshold: i64,
    cooldown: Duration,
    remaining: AtomicI64,
    state: watch::Sender<GateState>,
}

impl QuotaGate {
    pub fn new(threshold: i64, cooldown: Duration) -> Self {
        let (state, _) = watch::channel(GateState::Open);
        Self {
            threshold,
            cooldown,
            remaining: AtomicI64::new(UNKNOWN_REMAINING),
            state,
        }
    }

    pub fn from_config(config: &ErrorBudgetConfig) -> Self {
        Self::new(config.threshold, config.cooldown())
    }

    /// Current state; an expired cooldown reads as open.
    pub fn state(&self) -> GateState {
        match *self.state.borrow() {
            GateState::Tripped { until } if until > Instant::now() => GateState::Tripped { until },
            _ => GateState::Open,
        }
    }

    pub fn is_open(&self) -> bool {
        self.state() == GateState::Open
    }

    /// Last remaining quota observed from the upstream, if any.
    pub fn remaining(&self) -> Option<i64> {
        match self.remaining.load(Ordering::Relaxed) {
            UNKNOWN_REMAINING => None,
            n => Some(n),
        }
    }
}

#[async_trait]
impl ErrorBudget for QuotaGate {
    fn report_remaining(&self, remaining: i64) {
        self.remaining.store(remaining, Ordering::Relaxed);
        metrics::record_error_budget_remaining(remaining);

        if remaining >= self.threshold {
            return;
        }

        let now = Instant::now();
        let cooldown = self.cooldown;
        let tripped = self.state.send_if_modified(|state| match *state {
            GateState::Tripped { until } if until > now => false,
            _ => {
                *state = GateState::Tripped {
                    until: now + cooldown,
                };
                true
            }
        });

        if tripped {
            tracing::warn!(
                remaining,
                threshold = self.threshold,
                cooldown_secs = cooldown.as_secs(),
                "Error budget low, pausing all upstream dispatch"
            );
            metrics::record_error_budget_trip();
        }
    }

    async fn wait_until_open(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        let mut rx = self.state.subscribe();
        loop {
            let until = match *rx.borrow_and_update() {
                GateState::Tripped { until } if until > Instant::now() => until,
                _ => return Ok(()),
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(Cancelled),
                _ = tokio::time::sleep_until(until) => {}
                changed = rx.changed() => {
                    // The sender lives in `self`; a closed channel cannot gate anyone.
                    if changed.is_err() {
                        return Ok(());
                    }
                }
            }
        }
    }
}
