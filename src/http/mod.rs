//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request id, tracing span)
//!     → relay engine (rate limit, error budget, retries)
//!     → response.rs (status, X-Retries-Taken, ETag)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{MakeRequestUuid, X_REQUEST_ID};
pub use response::{Rejection, X_BOUNCER_ERROR, X_RETRIES_TAKEN};
pub use server::{AppState, HttpServer};
