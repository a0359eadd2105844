//! Bouncer: a forwarding gateway for a rate-limited, quota-metered upstream API.

pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod relay;
pub mod resilience;
pub mod transport;
pub mod version;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use relay::{RelayEngine, RelayOutcome, RelayRequest, RelayRequestBody};
pub use version::Version;
