//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Every relay attempt, before touching the upstream:
//!     → error_budget.rs (wait while the upstream error quota is exhausted)
//!     → rate_limiter.rs (wait for the next global dispatch slot)
//!     → dispatch
//! Every upstream response:
//!     → error_budget.rs (report remaining quota, maybe trip the gate)
//! ```
//!
//! # Design Decisions
//! - Both primitives are process-wide and shared through `Arc<dyn Trait>`
//! - Waits suspend on timers and channels, never poll
//! - Every wait is cancellable through the inbound request's token

pub mod cancel;
pub mod error_budget;
pub mod rate_limiter;

pub use cancel::Cancelled;
pub use error_budget::{ErrorBudget, GateState, QuotaGate};
pub use rate_limiter::{LeakyBucket, RateLimiter, MAX_RATE};
