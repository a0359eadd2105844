use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

/// Gateway build version, as returned by `/ping`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Version {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
    pub dev: bool,
}

/// One upstream call to relay through the gateway.
#[derive(Debug, Clone, Default)]
pub struct RelayCall {
    pub url: String,
    pub method: String,
    pub body: Vec<u8>,
    pub max_wait: Duration,
    pub access_token: Option<String>,
    pub etag: Option<String>,
}

impl RelayCall {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            method: "GET".to_string(),
            ..Self::default()
        }
    }

    pub fn post(url: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
        Self {
            url: url.into(),
            method: "POST".to_string(),
            body: body.into(),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = Some(token.into());
        self
    }

    pub fn with_etag(mut self, etag: impl Into<String>) -> Self {
        self.etag = Some(etag.into());
        self
    }
}

#[derive(Serialize)]
struct WireBody<'a> {
    url: &'a str,
    method: &'a str,
    body: String,
    max_wait: i64,
    access_token: &'a str,
    etag: &'a str,
    descriptor: &'a str,
}

/// What the gateway answered.
#[derive(Debug, Clone)]
pub struct RelayResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
    pub etag: Option<String>,
    /// `X-Retries-Taken`; absent when the gateway rejected the call outright.
    pub retries_taken: Option<u32>,
    /// `X-Bouncer-Error`; set only when the gateway produced the response.
    pub gateway_error: Option<String>,
}

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("gateway unreachable: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway ping returned {0}")]
    Ping(StatusCode),
}

pub struct BouncerClient {
    client: Client,
    gateway_url: String,
    descriptor: String,
}

impl BouncerClient {
    /// Connect to a gateway and verify it answers `/ping`.
    pub async fn connect(
        gateway_url: &str,
        timeout: Duration,
        descriptor: &str,
    ) -> Result<(Self, Version), ClientError> {
        let client = Client::builder().timeout(timeout).build()?;
        let this = Self {
            client,
            gateway_url: gateway_url.trim_end_matches('/').to_string(),
            descriptor: descriptor.to_string(),
        };
        let version = this.ping().await?;
        Ok((this, version))
    }

    pub async fn ping(&self) -> Result<Version, ClientError> {
        let resp = self
            .client
            .get(format!("{}/ping", self.gateway_url))
            .send()
            .await?;
        if !resp.status().is_success() {
            return Err(ClientError::Ping(resp.status()));
        }
        Ok(resp.json().await?)
    }

    /// Relay one call. Non-2xx answers are returned, not turned into errors.
    pub async fn make_request(&self, call: &RelayCall) -> Result<RelayResponse, ClientError> {
        let wire = WireBody {
            url: &call.url,
            method: &call.method,
            body: STANDARD.encode(&call.body),
            max_wait: i64::try_from(call.max_wait.as_nanos()).unwrap_or(i64::MAX),
            access_token: call.access_token.as_deref().unwrap_or(""),
            etag: call.etag.as_deref().unwrap_or(""),
            descriptor: &self.descriptor,
        };

        let resp = self
            .client
            .post(format!("{}/", self.gateway_url))
            .json(&wire)
            .send()
            .await?;

        let header = |name: &str| {
            resp.headers()
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        let status = resp.status();
        let etag = header("etag");
        let retries_taken = header("x-retries-taken").and_then(|v| v.parse().ok());
        let gateway_error = header("x-bouncer-error");

        let body = resp.bytes().await?.to_vec();
        Ok(RelayResponse {
            status,
            body,
            etag,
            retries_taken,
            gateway_error,
        })
    }
}
