//! Backend Execution Seam
//!
//! [`QueryBackend`] is the boundary between the gateway and a backend
//! query-execution service. The production implementation,
//! [`HttpBackend`], speaks a small JSON protocol over HTTP; tests swap in
//! mock implementations.

use async_trait::async_trait;
use http_body_util::{BodyExt, Full};
use hyper::body::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;

use hqlgate_common::{GatewayError, Result};

/// A single backend query-execution service.
///
/// Implementations must be safe to call concurrently; the gateway enforces
/// single-writer exclusivity per agent above this seam, but the health
/// monitor probes concurrently with in-flight executions.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Cheap liveness check used at startup and by the health monitor.
    async fn probe(&self) -> Result<()>;

    /// Runs a read query and returns its result payload.
    async fn fetch(&self, hql: &str) -> Result<Value>;

    /// Runs a mutating statement with no result payload.
    async fn execute(&self, hql: &str) -> Result<()>;
}

/// Whether an error indicates the backend connection itself is broken,
/// as opposed to the statement being rejected by a healthy backend.
pub fn is_transport_error(err: &GatewayError) -> bool {
    matches!(
        err,
        GatewayError::Transport(_) | GatewayError::Timeout(_) | GatewayError::Io(_)
    )
}

/// One statement sent to a backend.
#[derive(Debug, Serialize, Deserialize)]
pub struct BackendStatement {
    pub hql: String,
}

/// A backend's reply envelope.
#[derive(Debug, Serialize, Deserialize)]
pub struct BackendReply {
    pub ok: bool,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

impl BackendReply {
    pub fn success(data: Value) -> Self {
        Self {
            ok: true,
            error: None,
            data: Some(data),
        }
    }

    pub fn failure(msg: impl Into<String>) -> Self {
        Self {
            ok: false,
            error: Some(msg.into()),
            data: None,
        }
    }
}

/// HTTP implementation of [`QueryBackend`].
///
/// Statements are POSTed as JSON to `/fetch` and `/execute` on the backend
/// endpoint; liveness is `GET /__health`. Each request uses a fresh client,
/// so concurrent probes and executions never share connection state.
pub struct HttpBackend {
    endpoint: String,
    timeout: Duration,
}

const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

impl HttpBackend {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }

    /// Sends one statement and decodes the backend's reply envelope.
    async fn post_statement(&self, path: &str, hql: &str) -> Result<BackendReply> {
        use hyper::Request;
        use hyper_util::client::legacy::Client;
        use hyper_util::rt::TokioExecutor;

        let url = format!("http://{}{}", self.endpoint, path);
        let body = serde_json::to_vec(&BackendStatement { hql: hql.to_string() })?;

        let http_request = Request::builder()
            .method("POST")
            .uri(&url)
            .header("Content-Type", "application/json")
            .body(Full::new(Bytes::from(body)))
            .map_err(|e| GatewayError::Transport(format!("Failed to build request: {}", e)))?;

        let client = Client::builder(TokioExecutor::new()).build_http();

        let response_future = client.request(http_request);
        let response = tokio::time::timeout(self.timeout, response_future)
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(|e| GatewayError::Transport(format!("HTTP request failed: {}", e)))?;

        let body_bytes = response
            .into_body()
            .collect()
            .await
            .map_err(|e| GatewayError::Transport(format!("Failed to read response: {}", e)))?
            .to_bytes();

        let reply: BackendReply = serde_json::from_slice(&body_bytes)?;
        Ok(reply)
    }
}

#[async_trait]
impl QueryBackend for HttpBackend {
    async fn probe(&self) -> Result<()> {
        use hyper::Request;
        use hyper_util::client::legacy::Client;
        use hyper_util::rt::TokioExecutor;

        let url = format!("http://{}/__health", self.endpoint);
        let http_request = Request::builder()
            .method("GET")
            .uri(&url)
            .body(Full::new(Bytes::new()))
            .map_err(|e| GatewayError::Transport(format!("Failed to build request: {}", e)))?;

        let client = Client::builder(TokioExecutor::new()).build_http();
        let response = tokio::time::timeout(self.timeout, client.request(http_request))
            .await
            .map_err(|_| GatewayError::Timeout(self.timeout.as_millis() as u64))?
            .map_err(|e| GatewayError::Transport(format!("HTTP request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "health probe returned {}",
                response.status()
            )));
        }
        Ok(())
    }

    async fn fetch(&self, hql: &str) -> Result<Value> {
        let reply = self.post_statement("/fetch", hql).await?;
        if !reply.ok {
            return Err(GatewayError::Backend(
                reply.error.unwrap_or_else(|| "unknown backend error".to_string()),
            ));
        }
        reply
            .data
            .ok_or_else(|| GatewayError::Backend("reply missing data".to_string()))
    }

    async fn execute(&self, hql: &str) -> Result<()> {
        let reply = self.post_statement("/execute", hql).await?;
        if !reply.ok {
            return Err(GatewayError::Backend(
                reply.error.unwrap_or_else(|| "unknown backend error".to_string()),
            ));
        }
        Ok(())
    }
}
