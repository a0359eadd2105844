//! Cancellation signal returned by every suspending resilience operation.

/// The inbound caller went away (or its context was cancelled) while the
/// attempt was suspended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("request cancelled by caller")]
pub struct Cancelled;
