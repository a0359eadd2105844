//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Compose the process-wide collaborators (gate, limiter, transport,
//!   recorder) and the relay engine on top of them
//! - Create the Axum router with the relay and ping handlers
//! - Wire up middleware (request id, tracing, body limit)
//! - Serve until the shutdown signal fires

use axum::{
    body::Bytes,
    extract::{rejection::BytesRejection, DefaultBodyLimit, State},
    http::Method,
    response::{IntoResponse, Response},
    routing::{any, get},
    Json, Router,
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::http::request::{request_span, MakeRequestUuid};
use crate::http::response::Rejection;
use crate::observability::{OutcomeRecorder, PrometheusRecorder};
use crate::relay::{EngineSettings, RelayEngine, RelayRequest};
use crate::resilience::{LeakyBucket, QuotaGate};
use crate::transport::{CachingTransport, HttpTransport, Transport, TransportError};
use crate::version::Version;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<RelayEngine>,
    pub recorder: Arc<dyn OutcomeRecorder>,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server with the production collaborators.
    pub fn new(config: GatewayConfig) -> Result<Self, TransportError> {
        let http = HttpTransport::new(&config.upstream)?;
        let transport: Arc<dyn Transport> = if config.cache.enabled {
            Arc::new(CachingTransport::new(http, config.cache.max_entries))
        } else {
            Arc::new(http)
        };

        let recorder: Arc<dyn OutcomeRecorder> = Arc::new(PrometheusRecorder);
        let engine = RelayEngine::new(
            EngineSettings::from_config(&config),
            Arc::new(QuotaGate::from_config(&config.error_budget)),
            Arc::new(LeakyBucket::per_second(config.rate_limit.requests_per_second)),
            transport,
            recorder.clone(),
        );

        Ok(Self::with_engine(config, engine, recorder))
    }

    /// Create a server around an already composed engine.
    pub fn with_engine(
        config: GatewayConfig,
        engine: RelayEngine,
        recorder: Arc<dyn OutcomeRecorder>,
    ) -> Self {
        let state = AppState {
            engine: Arc::new(engine),
            recorder,
        };
        let router = Self::build_router(&config, state);
        Self { router, config }
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        Router::new()
            .route("/", any(relay_handler))
            .route("/ping", get(ping_handler))
            .with_state(state)
            // Enforced by the body extractor so oversized calls are recorded too.
            .layer(DefaultBodyLimit::max(config.limits.max_body_bytes))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http().make_span_with(request_span))
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// The fully layered router.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    /// Run the server until a shutdown signal is broadcast.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Relay handler: parse, run the retry loop, write the outcome.
async fn relay_handler(
    State(state): State<AppState>,
    method: Method,
    body: Result<Bytes, BytesRejection>,
) -> Response {
    let started = Instant::now();

    if method != Method::GET && method != Method::POST {
        return reject(&state, Rejection::MethodNotAllowed(method), started);
    }

    let body = match body {
        Ok(body) => body,
        Err(rejection) => return reject(&state, rejection.into(), started),
    };

    let request = match RelayRequest::from_json(&body) {
        Ok(request) => request,
        Err(err) => return reject(&state, err.into(), started),
    };

    tracing::debug!(url = %request.url, method = %request.method, "Relaying request");

    // Dropping this future (caller disconnected) cancels the token.
    let cancel = CancellationToken::new();
    let _cancel_on_drop = cancel.clone().drop_guard();

    match state.engine.relay(request, &cancel).await {
        Ok(outcome) => outcome.into_response(),
        Err(err) => reject(&state, err.into(), started),
    }
}

fn reject(state: &AppState, rejection: Rejection, started: Instant) -> Response {
    tracing::info!(reason = ?rejection, "Rejected relay request");
    state
        .recorder
        .record(rejection.status().as_u16(), started.elapsed());
    rejection.into_response()
}

async fn ping_handler() -> Json<Version> {
    tracing::debug!("Sent ping response");
    Json(Version::built())
}
