//! Global outbound rate limiting.
//!
//! A single [`LeakyBucket`] is shared by every in-flight relay attempt. Each
//! caller reserves the next free slot on a fixed grid spaced `1 / rate`
//! apart and sleeps until that slot, so grants leave the gateway at a steady
//! pace instead of in bursts. Reservations are handed out in lock order,
//! which keeps admission first-come first-served.

use std::num::NonZeroU32;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::Cancelled;
use crate::observability::metrics;

const NANOS_PER_SEC: u64 = 1_000_000_000;

/// Highest rate with a non-zero grant interval.
pub const MAX_RATE: u32 = NANOS_PER_SEC as u32;

/// Admission control for outbound dispatch.
#[async_trait]
pub trait RateLimiter: Send + Sync {
    /// Block until the caller may dispatch one upstream request.
    async fn acquire(&self, cancel: &CancellationToken) -> Result<(), Cancelled>;
}

/// Leaky bucket limiter with a capacity of one.
pub struct LeakyBucket {
    interval: Duration,
    next_slot: Mutex<Option<Instant>>,
}

impl LeakyBucket {
    pub fn new(rate: NonZeroU32) -> Self {
        // Rounded up so rate + 1 grants never fit inside one second.
        let nanos = NANOS_PER_SEC.div_ceil(u64::from(rate.get()));
        Self {
            interval: Duration::from_nanos(nanos),
            next_slot: Mutex::new(None),
        }
    }

    /// Convenience constructor; a rate of zero is treated as one.
    pub fn per_second(rate: u32) -> Self {
        Self::new(NonZeroU32::new(rate).unwrap_or(NonZeroU32::MIN))
    }

    /// Spacing between consecutive grants.
    pub fn interval(&self) -> Duration {
        self.interval
    }

    fn reserve(&self) -> Instant {
        let now = Instant::now();
        let mut next = self
            .next_slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        let slot = match *next {
            Some(slot) if slot > now => slot,
            _ => now,
        };
        *next = Some(slot + self.interval);
        slot
    }
}

#[async_trait]
impl RateLimiter for LeakyBucket {
    async fn acquire(&self, cancel: &CancellationToken) -> Result<(), Cancelled> {
        if cancel.is_cancelled() {
            return Err(Cancelled);
        }

        let slot = self.reserve();
        let delay = slot.saturating_duration_since(Instant::now());
        if !delay.is_zero() {
            metrics::record_rate_limit_delay(delay);
        }

        // A cancelled reservation is simply left unused; it never grants late.
        tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(Cancelled),
            _ = tokio::time::sleep_until(slot) => Ok(()),
        }
    }
}
