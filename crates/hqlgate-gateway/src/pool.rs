//! Agent Pool and Router
//!
//! The pool owns every agent, partitioned by cluster name. Routing is
//! deterministic and sticky: the query text's character codes are summed
//! modulo the pool size to pick a base index, so identical query text
//! always starts its fail-over scan at the same agent. The scan walks
//! forward (wrapping) past agents in Error status and selects the first
//! Connected one; identical queries therefore tend to land on the same
//! backend, which keeps any agent-local caching warm.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::warn;

use hqlgate_common::{Config, GatewayError, GatewayRequest, Result};

use crate::agent::{Agent, AgentLease, AgentStatus};
use crate::backend::HttpBackend;

/// Ordered, fixed-membership pools of agents keyed by cluster name.
///
/// Membership and order are immutable after construction; only per-agent
/// status changes at runtime.
pub struct AgentPool {
    clusters: HashMap<String, Vec<Arc<Agent>>>,
}

impl AgentPool {
    pub fn new(clusters: HashMap<String, Vec<Arc<Agent>>>) -> Self {
        Self { clusters }
    }

    /// Builds the pools described by the configuration, one [`HttpBackend`]
    /// agent per endpoint. Agents start in Error status until their first
    /// successful probe.
    pub fn from_config(config: &Config) -> Self {
        let mut clusters = HashMap::new();
        for (name, endpoints) in &config.clusters {
            let agents: Vec<Arc<Agent>> = endpoints
                .iter()
                .enumerate()
                .map(|(id, endpoint)| {
                    let addr = endpoint.to_string();
                    Arc::new(Agent::new(
                        id,
                        name.clone(),
                        addr.clone(),
                        Box::new(HttpBackend::new(addr)),
                        AgentStatus::Error,
                    ))
                })
                .collect();
            clusters.insert(name.clone(), agents);
        }
        Self { clusters }
    }

    /// Deterministic routing base: sum of the query text's character codes,
    /// modulo the pool size.
    pub fn base_index(hql: &str, pool_size: usize) -> usize {
        hql.chars().fold(0usize, |sum, c| (sum + c as usize) % pool_size)
    }

    /// Selects and exclusively acquires an agent for the request.
    ///
    /// Resolves the request's cluster, scans forward from the base index
    /// past agents in Error status, and blocks on the first Connected
    /// agent's exclusive-use lock until it is free. If every agent in the
    /// cluster is in Error status, returns [`GatewayError::AllAgentsDown`]
    /// without blocking.
    pub async fn assign(&self, request: &GatewayRequest) -> Result<AgentLease> {
        let agents = self
            .clusters
            .get(&request.cluster)
            .ok_or_else(|| GatewayError::NoSuchCluster(request.cluster.clone()))?;
        if agents.is_empty() {
            return Err(GatewayError::AllAgentsDown);
        }

        let base = Self::base_index(&request.hql, agents.len());
        let mut selected = None;
        for skip in 0..agents.len() {
            let agent = &agents[(base + skip) % agents.len()];
            if agent.status() == AgentStatus::Connected {
                selected = Some(agent);
                break;
            }
            warn!(
                cluster = %agent.cluster(),
                agent = agent.id(),
                "agent is down, trying next"
            );
        }

        let agent = selected.ok_or(GatewayError::AllAgentsDown)?;
        Ok(Agent::acquire(agent).await)
    }

    /// Every agent of every cluster, for the health monitor's sweep.
    pub fn agents(&self) -> impl Iterator<Item = &Arc<Agent>> {
        self.clusters.values().flatten()
    }

    /// Agents of a single cluster, in routing order.
    pub fn cluster(&self, name: &str) -> Option<&[Arc<Agent>]> {
        self.clusters.get(name).map(|agents| agents.as_slice())
    }

    pub fn cluster_names(&self) -> impl Iterator<Item = &str> {
        self.clusters.keys().map(|name| name.as_str())
    }
}
