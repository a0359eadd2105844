//! Per-request retry state machine.
//!
//! # Loop
//! ```text
//! build outbound call
//! while attempts < max_attempts:
//!     gate.wait_until_open()        (cancellable)
//!     limiter.acquire()             (cancellable)
//!     transport.dispatch()          (cancellable)
//!         Err → DispatchFailed, stop (transport errors are never retried)
//!     report quota header to the gate
//!     policy.classify(status)
//!         terminal → stop
//!         Retry    → loop
//! RetriesExhausted
//! ```

use std::sync::Arc;

use axum::http::header::{AUTHORIZATION, IF_NONE_MATCH, USER_AGENT};
use axum::http::{HeaderMap, HeaderValue};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use super::outcome::RelayOutcome;
use super::policy::{Disposition, StatusPolicy};
use super::request::{RelayRequest, RequestError};
use crate::config::GatewayConfig;
use crate::observability::{metrics, OutcomeRecorder};
use crate::resilience::{ErrorBudget, RateLimiter};
use crate::transport::{OutboundRequest, Transport, UpstreamResponse};

/// User-Agent suffix for callers that did not describe themselves.
pub const NAKED_DESCRIPTOR: &str = "naked";

/// Static engine settings taken from configuration.
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Gateway identity, first half of the outbound User-Agent.
    pub identity: String,
    pub quota_header: String,
    pub request_id_header: String,
    pub max_attempts: u32,
}

impl EngineSettings {
    pub fn from_config(config: &GatewayConfig) -> Self {
        Self {
            identity: config.upstream.user_agent.clone(),
            quota_header: config.upstream.quota_header.clone(),
            request_id_header: config.upstream.request_id_header.clone(),
            max_attempts: config.retries.max_attempts,
        }
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self::from_config(&GatewayConfig::default())
    }
}

/// Executes the bounded retry loop for inbound relay requests.
pub struct RelayEngine {
    settings: EngineSettings,
    policy: StatusPolicy,
    gate: Arc<dyn ErrorBudget>,
    limiter: Arc<dyn RateLimiter>,
    transport: Arc<dyn Transport>,
    recorder: Arc<dyn OutcomeRecorder>,
}

impl RelayEngine {
    pub fn new(
        settings: EngineSettings,
        gate: Arc<dyn ErrorBudget>,
        limiter: Arc<dyn RateLimiter>,
        transport: Arc<dyn Transport>,
        recorder: Arc<dyn OutcomeRecorder>,
    ) -> Self {
        Self {
            settings,
            policy: StatusPolicy::default(),
            gate,
            limiter,
            transport,
            recorder,
        }
    }

    pub fn with_policy(mut self, policy: StatusPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// Relay one request and record its outcome.
    ///
    /// Errors only for input that cannot become an outbound call; nothing
    /// has been dispatched or recorded in that case.
    pub async fn relay(
        &self,
        request: RelayRequest,
        cancel: &CancellationToken,
    ) -> Result<RelayOutcome, RequestError> {
        let started = Instant::now();
        let outbound = self.build(&request)?;

        if !request.wait_budget.is_zero() {
            tracing::trace!(wait_budget = ?request.wait_budget, "Wait budget is advisory only");
        }

        let outcome = self.run(&request, outbound, cancel).await;
        self.recorder.record(outcome.status, started.elapsed());
        Ok(outcome)
    }

    /// Build the outbound call for a request.
    pub fn build(&self, request: &RelayRequest) -> Result<OutboundRequest, RequestError> {
        let mut headers = HeaderMap::new();

        let descriptor = request.descriptor.as_deref().unwrap_or(NAKED_DESCRIPTOR);
        let user_agent = format!("{} - {}", self.settings.identity, descriptor);
        headers.insert(USER_AGENT, header_value("descriptor", user_agent)?);

        if let Some(token) = &request.access_token {
            headers.insert(
                AUTHORIZATION,
                header_value("access_token", format!("Bearer {token}"))?,
            );
        }

        if let Some(validator) = &request.validator {
            headers.insert(IF_NONE_MATCH, header_value("etag", validator.clone())?);
        }

        Ok(OutboundRequest {
            method: request.method.clone(),
            url: request.url.clone(),
            headers,
            body: request.body.clone(),
        })
    }

    async fn run(
        &self,
        request: &RelayRequest,
        outbound: OutboundRequest,
        cancel: &CancellationToken,
    ) -> RelayOutcome {
        let url = &request.url;
        let mut attempts = 0;

        while attempts < self.settings.max_attempts {
            if self.gate.wait_until_open(cancel).await.is_err()
                || self.limiter.acquire(cancel).await.is_err()
            {
                tracing::debug!(url = %url, attempts, "Caller went away while waiting");
                return RelayOutcome::cancelled(attempts);
            }

            attempts += 1;
            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    tracing::debug!(url = %url, attempts, "Caller went away during dispatch");
                    return RelayOutcome::cancelled(attempts);
                }
                result = self.transport.dispatch(outbound.clone()) => result,
            };

            let response = match result {
                Ok(response) => response,
                Err(err) => {
                    tracing::error!(url = %url, attempt = attempts, error = %err, "Error making upstream request");
                    return RelayOutcome::dispatch_failed(&err, attempts);
                }
            };

            metrics::record_upstream_attempt(response.status);
            self.report_quota(&response);

            match self.policy.classify(response.status) {
                Disposition::Success => return RelayOutcome::success(response, attempts),
                Disposition::NotModified => {
                    return RelayOutcome::not_modified(
                        response,
                        request.validator.as_deref(),
                        attempts,
                    )
                }
                Disposition::PassThrough => {
                    tracing::debug!(
                        url = %url,
                        status = response.status,
                        upstream_request_id = ?self.upstream_request_id(&response),
                        "Relaying upstream client error"
                    );
                    return RelayOutcome::pass_through(response, attempts);
                }
                Disposition::Retry => {
                    tracing::info!(
                        url = %url,
                        status = response.status,
                        attempt = attempts,
                        upstream_request_id = ?self.upstream_request_id(&response),
                        "Transient upstream status, retrying"
                    );
                }
            }
        }

        tracing::warn!(url = %url, attempts, "Maximum retries exceeded");
        RelayOutcome::retries_exhausted(url, attempts)
    }

    fn report_quota(&self, response: &UpstreamResponse) {
        let Some(raw) = response.header(&self.settings.quota_header) else {
            return;
        };
        match raw.trim().parse::<i64>() {
            Ok(remaining) => self.gate.report_remaining(remaining),
            Err(_) => {
                tracing::debug!(value = raw, "Ignoring non-numeric quota header");
            }
        }
    }

    fn upstream_request_id<'a>(&self, response: &'a UpstreamResponse) -> Option<&'a str> {
        response.header(&self.settings.request_id_header)
    }
}

fn header_value(field: &'static str, value: String) -> Result<HeaderValue, RequestError> {
    HeaderValue::try_from(value).map_err(|_| RequestError::InvalidHeader(field))
}
