//! HTTP Surface
//!
//! Axum server exposing the gateway:
//!
//! - `GET`/`POST /query`: cacheable read query
//! - `GET`/`POST /execute`: mutating statement, bypasses the cache
//! - `GET /__health`: liveness
//!
//! Both endpoints accept the fields `hql` and `cluster` as query-string
//! parameters (GET) or form fields (POST); missing or empty fields yield a
//! 400 envelope. Every response is the JSON envelope
//! `{code, message, body}` with the HTTP status mirroring `code`.
//!
//! This layer owns the process's single top-level request guard: handler
//! errors become envelopes, and a panicking request is caught and converted
//! to a 500 envelope instead of taking the server down.

use std::any::Any;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::rejection::FormRejection;
use axum::extract::{ConnectInfo, Form, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use http_body_util::Full;
use hyper::body::Bytes;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tracing::{error, info, warn};

use hqlgate_common::{ApiResponse, GatewayError, GatewayRequest, Result, Timing};

use crate::gateway::Gateway;

#[derive(Clone)]
struct AppState {
    gateway: Arc<Gateway>,
    debug: bool,
}

/// Raw, unvalidated request fields.
#[derive(Debug, Deserialize)]
struct RawParams {
    #[serde(default)]
    hql: Option<String>,
    #[serde(default)]
    cluster: Option<String>,
}

/// Field validation: both fields present and non-empty.
fn validate(params: RawParams) -> Option<GatewayRequest> {
    match (params.hql, params.cluster) {
        (Some(hql), Some(cluster)) if !hql.is_empty() && !cluster.is_empty() => {
            Some(GatewayRequest::new(hql, cluster))
        }
        _ => None,
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    state: AppState,
}

impl HttpServer {
    pub fn new(gateway: Arc<Gateway>, debug: bool) -> Self {
        Self {
            state: AppState { gateway, debug },
        }
    }

    /// Builds the axum application.
    pub fn router(&self) -> Router {
        Router::new()
            .route("/query", get(query_get).post(query_post))
            .route("/execute", get(execute_get).post(execute_post))
            .route("/__health", get(health_check))
            .layer(CatchPanicLayer::custom(handle_panic))
            .layer(CorsLayer::permissive())
            .with_state(self.state.clone())
    }

    /// Binds and serves until the shutdown token fires.
    pub async fn run(self, addr: SocketAddr, shutdown: CancellationToken) -> Result<()> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to bind to {}: {}", addr, e)))?;
        self.run_on(listener, shutdown).await
    }

    /// Serves on an already-bound listener (used by tests for port 0).
    pub async fn run_on(self, listener: TcpListener, shutdown: CancellationToken) -> Result<()> {
        let local_addr = listener
            .local_addr()
            .map_err(|e| GatewayError::Transport(format!("Failed to get local addr: {}", e)))?;
        info!("gateway HTTP server listening on {}", local_addr);

        let app = self.router();
        axum::serve(
            listener,
            app.into_make_service_with_connect_info::<SocketAddr>(),
        )
        .with_graceful_shutdown(shutdown.cancelled_owned())
        .await
        .map_err(|e| GatewayError::Transport(format!("Server error: {}", e)))
    }
}

async fn query_get(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<RawParams>,
) -> Response {
    handle_query(state, peer, "GET /query", Some(params)).await
}

async fn query_post(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    params: std::result::Result<Form<RawParams>, FormRejection>,
) -> Response {
    handle_query(state, peer, "POST /query", params.ok().map(|Form(p)| p)).await
}

async fn execute_get(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    Query(params): Query<RawParams>,
) -> Response {
    handle_execute(state, peer, "GET /execute", Some(params)).await
}

async fn execute_post(
    State(state): State<AppState>,
    ConnectInfo(peer): ConnectInfo<SocketAddr>,
    params: std::result::Result<Form<RawParams>, FormRejection>,
) -> Response {
    handle_execute(state, peer, "POST /execute", params.ok().map(|Form(p)| p)).await
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, "OK")
}

async fn handle_query(
    state: AppState,
    peer: SocketAddr,
    route: &'static str,
    params: Option<RawParams>,
) -> Response {
    let mut timing = Timing::start();
    let envelope = match params.and_then(validate) {
        None => ApiResponse::bad_request(),
        Some(request) => match state.gateway.query(&request, &mut timing).await {
            Ok(body) => ApiResponse::ok(body),
            Err(err) => fail(&state, &err),
        },
    };
    write_response(peer, route, envelope, timing)
}

async fn handle_execute(
    state: AppState,
    peer: SocketAddr,
    route: &'static str,
    params: Option<RawParams>,
) -> Response {
    let mut timing = Timing::start();
    let envelope = match params.and_then(validate) {
        None => ApiResponse::bad_request(),
        Some(request) => match state.gateway.execute(&request, &mut timing).await {
            Ok(()) => ApiResponse::ok(serde_json::Value::String(String::new())),
            Err(err) => fail(&state, &err),
        },
    };
    write_response(peer, route, envelope, timing)
}

fn fail(state: &AppState, err: &GatewayError) -> ApiResponse {
    if state.debug {
        error!(error = ?err, "request failed");
    }
    ApiResponse::from(err)
}

/// Renders the envelope with a matching HTTP status and writes the access
/// log line: info for 200, warn for everything else.
fn write_response(peer: SocketAddr, route: &'static str, envelope: ApiResponse, timing: Timing) -> Response {
    if envelope.code == 200 {
        info!("{} {} {} {} [{}]", peer, route, envelope.code, envelope.message, timing);
    } else {
        warn!("{} {} {} {} [{}]", peer, route, envelope.code, envelope.message, timing);
    }
    let status = StatusCode::from_u16(envelope.code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(envelope)).into_response()
}

/// Converts a panicking request into a 500 envelope so one request's fault
/// cannot terminate the serving process.
fn handle_panic(_err: Box<dyn Any + Send + 'static>) -> hyper::Response<Full<Bytes>> {
    error!("request handler panicked");
    let body =
        serde_json::to_vec(&ApiResponse::internal_error("Internal Server Error")).unwrap_or_default();
    hyper::Response::builder()
        .status(StatusCode::INTERNAL_SERVER_ERROR)
        .header("Content-Type", "application/json")
        .body(Full::new(Bytes::from(body)))
        .unwrap()
}
