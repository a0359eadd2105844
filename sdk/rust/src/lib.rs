//! Client library for the Bouncer gateway.

mod client;

pub use client::{BouncerClient, ClientError, RelayCall, RelayResponse, Version};
