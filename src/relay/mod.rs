//! Relay subsystem: the request-dispatch core.
//!
//! # Data Flow
//! ```text
//! inbound JSON body
//!     → request.rs (parse, validate → RelayRequest)
//!     → engine.rs (build outbound call, bounded retry loop)
//!         ↔ resilience (error budget gate, rate limiter)
//!         ↔ transport (dispatch)
//!         → policy.rs (status → disposition)
//!     → outcome.rs (RelayOutcome)
//!     → OutcomeRecorder (one record per request)
//! ```

pub mod engine;
pub mod outcome;
pub mod policy;
pub mod request;

#[cfg(test)]
pub(crate) mod testing;

pub use engine::{EngineSettings, RelayEngine, NAKED_DESCRIPTOR};
pub use outcome::{OutcomeKind, RelayOutcome};
pub use policy::{Disposition, StatusPolicy};
pub use request::{RelayRequest, RelayRequestBody, RequestError};
