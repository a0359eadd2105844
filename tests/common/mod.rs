//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Router;
use bouncer_client::BouncerClient;
use bouncer_gateway::config::GatewayConfig;
use bouncer_gateway::http::HttpServer;
use bouncer_gateway::lifecycle::Shutdown;
use tokio::net::TcpListener;
use tokio::time::Instant;

/// What the mock upstream answers for one call.
pub struct Reply {
    pub status: u16,
    pub headers: Vec<(&'static str, String)>,
    pub body: String,
}

impl Reply {
    pub fn status(status: u16, body: &str) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.to_string(),
        }
    }

    pub fn header(mut self, name: &'static str, value: impl Into<String>) -> Self {
        self.headers.push((name, value.into()));
        self
    }
}

/// One call the mock upstream received.
#[derive(Clone)]
pub struct Seen {
    pub method: Method,
    pub headers: HeaderMap,
    pub at: Instant,
}

impl Seen {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

type Handler = dyn Fn(usize, &HeaderMap) -> Reply + Send + Sync;

#[derive(Clone)]
struct UpstreamState {
    handler: Arc<Handler>,
    seen: Arc<Mutex<Vec<Seen>>>,
}

/// A programmable upstream API on a loopback port.
pub struct MockUpstream {
    pub addr: SocketAddr,
    seen: Arc<Mutex<Vec<Seen>>>,
}

impl MockUpstream {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn calls(&self) -> usize {
        self.seen.lock().unwrap().len()
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().unwrap().clone()
    }
}

/// Start a programmable upstream; the handler gets (call index, request headers).
pub async fn start_upstream<F>(handler: F) -> MockUpstream
where
    F: Fn(usize, &HeaderMap) -> Reply + Send + Sync + 'static,
{
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let seen = Arc::new(Mutex::new(Vec::new()));

    let state = UpstreamState {
        handler: Arc::new(handler),
        seen: seen.clone(),
    };
    let app = Router::new().fallback(answer).with_state(state);

    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockUpstream { addr, seen }
}

async fn answer(State(state): State<UpstreamState>, method: Method, headers: HeaderMap) -> Response {
    let index = {
        let mut seen = state.seen.lock().unwrap();
        seen.push(Seen {
            method,
            headers: headers.clone(),
            at: Instant::now(),
        });
        seen.len() - 1
    };

    let reply = (state.handler)(index, &headers);
    let mut response = (
        StatusCode::from_u16(reply.status).unwrap(),
        reply.body,
    )
        .into_response();
    for (name, value) in reply.headers {
        response.headers_mut().insert(
            HeaderName::from_static(name),
            HeaderValue::from_str(&value).unwrap(),
        );
    }
    response
}

/// A gateway running on a loopback port.
pub struct Gateway {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
}

impl Gateway {
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub async fn client(&self) -> BouncerClient {
        let (client, _) = BouncerClient::connect(&self.url(), Duration::from_secs(30), "integration")
            .await
            .expect("gateway unreachable");
        client
    }
}

impl Drop for Gateway {
    fn drop(&mut self) {
        self.shutdown.trigger();
    }
}

/// Start a gateway with test-friendly defaults, adjusted by `configure`.
pub async fn start_gateway(configure: impl FnOnce(&mut GatewayConfig)) -> Gateway {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.observability.metrics_enabled = false;
    config.upstream.user_agent = "bouncer-test".into();
    config.rate_limit.requests_per_second = 1000;
    configure(&mut config);

    let listener = TcpListener::bind(&config.listener.bind_address).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let shutdown = Shutdown::new();
    let server = HttpServer::new(config).unwrap();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, server_shutdown).await;
    });

    Gateway { addr, shutdown }
}
