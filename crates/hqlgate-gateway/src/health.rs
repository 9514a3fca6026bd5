use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::agent::AgentStatus;
use crate::pool::AgentPool;

/// Health recovery configuration.
#[derive(Debug, Clone)]
pub struct HealthConfig {
    /// Time between recovery sweeps
    pub interval: Duration,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
        }
    }
}

/// Background recovery loop for failed agents.
///
/// Every cycle scans all agents in all pools and re-probes the ones in
/// Error status; a successful probe transitions the agent back to
/// Connected. The loop runs on a fixed period with no backoff and no retry
/// limit, and never touches an agent's exclusive-use lock, so a stuck
/// in-flight statement cannot delay recovery of other agents.
pub struct HealthMonitor {
    pool: Arc<AgentPool>,
    config: HealthConfig,
}

impl HealthMonitor {
    pub fn new(pool: Arc<AgentPool>, config: HealthConfig) -> Self {
        Self { pool, config }
    }

    /// Starts the monitor task. The first sweep runs one full interval
    /// after spawn; use [`run_once`](Self::run_once) for an immediate pass.
    pub fn spawn(self, shutdown: CancellationToken) -> JoinHandle<()> {
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + self.config.interval;
            let mut interval = tokio::time::interval_at(start, self.config.interval);
            info!(interval_secs = self.config.interval.as_secs(), "health monitor started");
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => {
                        info!("health monitor stopped");
                        break;
                    }
                    _ = interval.tick() => {
                        self.run_once().await;
                    }
                }
            }
        })
    }

    /// One recovery sweep: probe every Error-status agent concurrently.
    pub async fn run_once(&self) {
        let failed: Vec<_> = self
            .pool
            .agents()
            .filter(|agent| agent.status() == AgentStatus::Error)
            .cloned()
            .collect();

        let probes = failed.into_iter().map(|agent| async move {
            warn!(
                cluster = %agent.cluster(),
                agent = agent.id(),
                "agent is in error status, trying to recover"
            );
            match agent.try_recover().await {
                Ok(()) => {
                    info!(cluster = %agent.cluster(), agent = agent.id(), "agent recovered");
                }
                Err(err) => {
                    warn!(
                        cluster = %agent.cluster(),
                        agent = agent.id(),
                        error = %err,
                        "agent recovery failed"
                    );
                }
            }
        });

        futures::future::join_all(probes).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::Agent;
    use crate::test_support::MockBackend;
    use serde_json::json;
    use std::collections::HashMap;

    fn pool_with_backends(backends: &[MockBackend]) -> Arc<AgentPool> {
        let agents: Vec<Arc<Agent>> = backends
            .iter()
            .enumerate()
            .map(|(id, backend)| {
                Arc::new(Agent::new(
                    id,
                    "main",
                    format!("127.0.0.1:{}", 10000 + id),
                    Box::new(backend.clone()),
                    AgentStatus::Connected,
                ))
            })
            .collect();
        let mut clusters = HashMap::new();
        clusters.insert("main".to_string(), agents);
        Arc::new(AgentPool::new(clusters))
    }

    #[test]
    fn test_health_config_default() {
        assert_eq!(HealthConfig::default().interval, Duration::from_secs(10));
    }

    #[tokio::test]
    async fn test_run_once_recovers_failed_agent() {
        let backends = vec![MockBackend::returning(json!(1))];
        let pool = pool_with_backends(&backends);
        pool.cluster("main").unwrap()[0].set_status(AgentStatus::Error);

        let monitor = HealthMonitor::new(Arc::clone(&pool), HealthConfig::default());
        monitor.run_once().await;

        assert_eq!(pool.cluster("main").unwrap()[0].status(), AgentStatus::Connected);
        assert_eq!(backends[0].probe_calls(), 1);
    }

    #[tokio::test]
    async fn test_run_once_leaves_unreachable_agent_in_error() {
        let backends = vec![MockBackend::returning(json!(1))];
        backends[0].fail_probe();
        let pool = pool_with_backends(&backends);
        pool.cluster("main").unwrap()[0].set_status(AgentStatus::Error);

        let monitor = HealthMonitor::new(Arc::clone(&pool), HealthConfig::default());
        monitor.run_once().await;
        assert_eq!(pool.cluster("main").unwrap()[0].status(), AgentStatus::Error);

        // every cycle re-attempts, indefinitely
        backends[0].heal();
        monitor.run_once().await;
        assert_eq!(pool.cluster("main").unwrap()[0].status(), AgentStatus::Connected);
        assert_eq!(backends[0].probe_calls(), 2);
    }

    #[tokio::test]
    async fn test_run_once_skips_connected_agents() {
        let backends = vec![MockBackend::returning(json!(1)), MockBackend::returning(json!(1))];
        let pool = pool_with_backends(&backends);
        pool.cluster("main").unwrap()[1].set_status(AgentStatus::Error);

        let monitor = HealthMonitor::new(Arc::clone(&pool), HealthConfig::default());
        monitor.run_once().await;

        assert_eq!(backends[0].probe_calls(), 0);
        assert_eq!(backends[1].probe_calls(), 1);
    }

    #[tokio::test]
    async fn test_run_once_with_held_lease_completes() {
        let backends = vec![MockBackend::returning(json!(1))];
        let pool = pool_with_backends(&backends);
        let agent = Arc::clone(&pool.cluster("main").unwrap()[0]);
        agent.set_status(AgentStatus::Error);

        let lease = Agent::acquire(&agent).await;
        let monitor = HealthMonitor::new(Arc::clone(&pool), HealthConfig::default());
        tokio::time::timeout(Duration::from_secs(1), monitor.run_once())
            .await
            .expect("recovery sweep must not wait on exclusive locks");
        assert_eq!(agent.status(), AgentStatus::Connected);
        lease.release();
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_monitor_recovers_on_schedule() {
        let backends = vec![MockBackend::returning(json!(1))];
        let pool = pool_with_backends(&backends);
        pool.cluster("main").unwrap()[0].set_status(AgentStatus::Error);

        let monitor = HealthMonitor::new(
            Arc::clone(&pool),
            HealthConfig {
                interval: Duration::from_secs(10),
            },
        );
        let shutdown = CancellationToken::new();
        let handle = monitor.spawn(shutdown.clone());

        tokio::time::sleep(Duration::from_secs(11)).await;
        assert_eq!(pool.cluster("main").unwrap()[0].status(), AgentStatus::Connected);

        shutdown.cancel();
        handle.await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_monitor_shutdown_is_prompt() {
        let backends = vec![MockBackend::returning(json!(1))];
        let pool = pool_with_backends(&backends);

        let monitor = HealthMonitor::new(pool, HealthConfig::default());
        let shutdown = CancellationToken::new();
        let handle = monitor.spawn(shutdown.clone());

        shutdown.cancel();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("monitor should stop on cancellation")
            .unwrap();
    }
}
