use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{Mutex, OwnedMutexGuard};

use hqlgate_common::Result;

use crate::backend::{is_transport_error, QueryBackend};

/// Connection status of an agent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum AgentStatus {
    Connected = 0,
    Error = 1,
}

impl AgentStatus {
    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => AgentStatus::Connected,
            _ => AgentStatus::Error,
        }
    }
}

/// One backend query-execution connection.
///
/// An agent can safely carry only one in-flight statement at a time, which
/// the exclusive-use lock enforces. Status lives in an atomic, independent
/// of that lock: the health monitor reads and repairs status without ever
/// waiting on a stuck in-flight execution.
pub struct Agent {
    id: usize,
    cluster: String,
    endpoint: String,
    backend: Box<dyn QueryBackend>,
    status: AtomicU8,
    lease: Arc<Mutex<()>>,
}

impl Agent {
    pub fn new(
        id: usize,
        cluster: impl Into<String>,
        endpoint: impl Into<String>,
        backend: Box<dyn QueryBackend>,
        status: AgentStatus,
    ) -> Self {
        Self {
            id,
            cluster: cluster.into(),
            endpoint: endpoint.into(),
            backend,
            status: AtomicU8::new(status as u8),
            lease: Arc::new(Mutex::new(())),
        }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn cluster(&self) -> &str {
        &self.cluster
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn status(&self) -> AgentStatus {
        AgentStatus::from_u8(self.status.load(Ordering::Acquire))
    }

    pub fn set_status(&self, status: AgentStatus) {
        self.status.store(status as u8, Ordering::Release);
    }

    /// Probes the backend; a successful probe transitions the agent to
    /// Connected. Used at startup and by the health monitor.
    pub async fn try_recover(&self) -> Result<()> {
        self.backend.probe().await?;
        self.set_status(AgentStatus::Connected);
        Ok(())
    }

    /// Acquires the agent's exclusive-use lock, blocking until any prior
    /// holder releases it. There is no acquisition timeout.
    pub(crate) async fn acquire(agent: &Arc<Agent>) -> AgentLease {
        let guard = Arc::clone(&agent.lease).lock_owned().await;
        AgentLease {
            agent: Arc::clone(agent),
            _guard: guard,
        }
    }

    async fn fetch(&self, hql: &str) -> Result<Value> {
        match self.backend.fetch(hql).await {
            Ok(value) => Ok(value),
            Err(err) => {
                if is_transport_error(&err) {
                    self.set_status(AgentStatus::Error);
                }
                Err(err)
            }
        }
    }

    async fn execute(&self, hql: &str) -> Result<()> {
        match self.backend.execute(hql).await {
            Ok(()) => Ok(()),
            Err(err) => {
                if is_transport_error(&err) {
                    self.set_status(AgentStatus::Error);
                }
                Err(err)
            }
        }
    }
}

/// Exclusive hold on an agent for the duration of one statement.
///
/// Statements can only be run through a lease, so the single-writer
/// invariant is structural. Dropping the lease releases the agent; the
/// explicit [`release`](Self::release) exists for call-site clarity where
/// the release point matters.
pub struct AgentLease {
    agent: Arc<Agent>,
    _guard: OwnedMutexGuard<()>,
}

impl AgentLease {
    pub fn agent(&self) -> &Agent {
        &self.agent
    }

    pub async fn fetch(&self, hql: &str) -> Result<Value> {
        self.agent.fetch(hql).await
    }

    pub async fn execute(&self, hql: &str) -> Result<()> {
        self.agent.execute(hql).await
    }

    /// Releases the agent, making it immediately eligible for the next
    /// caller, including one already blocked waiting.
    pub fn release(self) {}
}
