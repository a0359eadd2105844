//! Build version reported by `/ping`.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub dev: bool,
}

impl Version {
    /// Version of this binary; debug builds report `dev`.
    pub fn built() -> Self {
        Self {
            major: parse_component(env!("CARGO_PKG_VERSION_MAJOR")),
            minor: parse_component(env!("CARGO_PKG_VERSION_MINOR")),
            patch: parse_component(env!("CARGO_PKG_VERSION_PATCH")),
            dev: cfg!(debug_assertions),
        }
    }
}

fn parse_component(raw: &str) -> u32 {
    raw.parse().unwrap_or(0)
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)?;
        if self.dev {
            write!(f, "-dev")?;
        }
        Ok(())
    }
}
