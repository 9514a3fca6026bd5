//! In-process mock backend for unit tests.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;

use hqlgate_common::{GatewayError, Result};

use crate::backend::QueryBackend;

/// Configurable [`QueryBackend`] double with call counters.
#[derive(Clone)]
pub(crate) struct MockBackend {
    result: Value,
    fetch_calls: Arc<AtomicUsize>,
    execute_calls: Arc<AtomicUsize>,
    probe_calls: Arc<AtomicUsize>,
    transport_failure: Arc<AtomicBool>,
    backend_failure: Arc<AtomicBool>,
    probe_failure: Arc<AtomicBool>,
    latency: Option<Duration>,
}

impl MockBackend {
    pub(crate) fn returning(result: Value) -> Self {
        Self {
            result,
            fetch_calls: Arc::new(AtomicUsize::new(0)),
            execute_calls: Arc::new(AtomicUsize::new(0)),
            probe_calls: Arc::new(AtomicUsize::new(0)),
            transport_failure: Arc::new(AtomicBool::new(false)),
            backend_failure: Arc::new(AtomicBool::new(false)),
            probe_failure: Arc::new(AtomicBool::new(false)),
            latency: None,
        }
    }

    pub(crate) fn with_latency(result: Value, latency: Duration) -> Self {
        Self {
            latency: Some(latency),
            ..Self::returning(result)
        }
    }

    pub(crate) fn fail_with_transport(&self) {
        self.transport_failure.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_with_backend_error(&self) {
        self.backend_failure.store(true, Ordering::SeqCst);
    }

    pub(crate) fn fail_probe(&self) {
        self.probe_failure.store(true, Ordering::SeqCst);
    }

    pub(crate) fn heal(&self) {
        self.transport_failure.store(false, Ordering::SeqCst);
        self.backend_failure.store(false, Ordering::SeqCst);
        self.probe_failure.store(false, Ordering::SeqCst);
    }

    pub(crate) fn fetch_calls(&self) -> usize {
        self.fetch_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }

    pub(crate) fn probe_calls(&self) -> usize {
        self.probe_calls.load(Ordering::SeqCst)
    }

    async fn outcome(&self) -> Result<()> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if self.transport_failure.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("connection reset".to_string()));
        }
        if self.backend_failure.load(Ordering::SeqCst) {
            return Err(GatewayError::Backend("statement rejected".to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl QueryBackend for MockBackend {
    async fn probe(&self) -> Result<()> {
        self.probe_calls.fetch_add(1, Ordering::SeqCst);
        if self.probe_failure.load(Ordering::SeqCst) {
            return Err(GatewayError::Transport("probe refused".to_string()));
        }
        Ok(())
    }

    async fn fetch(&self, _hql: &str) -> Result<Value> {
        self.fetch_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome().await?;
        Ok(self.result.clone())
    }

    async fn execute(&self, _hql: &str) -> Result<()> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        self.outcome().await
    }
}
