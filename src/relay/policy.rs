//! Upstream status disposition table.
//!
//! Every upstream status maps to exactly one [`Disposition`]. Statuses not in
//! the table (429, 5xx, anything unexpected) are transient and retried.

use std::collections::HashMap;

/// What the retry loop does with an upstream status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    /// Relay body and status, stop.
    Success,
    /// Relay status and validator without a body, stop.
    NotModified,
    /// An authoritative upstream answer; relay verbatim, stop.
    PassThrough,
    /// Consume one attempt and loop.
    Retry,
}

impl Disposition {
    pub fn is_terminal(self) -> bool {
        self != Disposition::Retry
    }
}

/// Status → disposition mapping used by the relay engine.
#[derive(Debug, Clone)]
pub struct StatusPolicy {
    table: HashMap<u16, Disposition>,
}

impl Default for StatusPolicy {
    fn default() -> Self {
        Self::empty()
            .with(200, Disposition::Success)
            .with(304, Disposition::NotModified)
            .with(400, Disposition::PassThrough)
            .with(404, Disposition::PassThrough)
            .with(422, Disposition::PassThrough)
    }
}

impl StatusPolicy {
    /// A policy that retries everything.
    pub fn empty() -> Self {
        Self {
            table: HashMap::new(),
        }
    }

    /// Add or replace the disposition for one status.
    pub fn with(mut self, status: u16, disposition: Disposition) -> Self {
        self.table.insert(status, disposition);
        self
    }

    pub fn classify(&self, status: u16) -> Disposition {
        self.table
            .get(&status)
            .copied()
            .unwrap_or(Disposition::Retry)
    }
}
