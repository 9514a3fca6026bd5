//! Gateway Orchestrator
//!
//! Composes the time-wheel cache and the agent pool into the two request
//! flows. A query is answered from the cache when possible; otherwise an
//! agent is acquired, the cache is re-checked to absorb the race with a
//! concurrent identical query, the statement runs, the agent is released,
//! and the result is cached. Execute requests bypass the cache entirely.
//!
//! Every step returns a typed `Result`; the HTTP layer holds the single
//! top-level guard that turns any failure into a response envelope.

use std::sync::Arc;

use md5::{Digest, Md5};
use serde_json::Value;
use tracing::debug;

use hqlgate_cache::TimeWheelCache;
use hqlgate_common::{GatewayRequest, Result, Timing};

use crate::pool::AgentPool;

/// Cache key for a query: the md5 hex digest of its text.
pub fn cache_key(hql: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(hql.as_bytes());
    hex::encode(hasher.finalize())
}

/// The request orchestrator.
pub struct Gateway {
    pool: Arc<AgentPool>,
    cache: Arc<TimeWheelCache<Value>>,
    cache_ttl_secs: u64,
}

impl Gateway {
    /// Wires the orchestrator to its collaborators. `cache_ttl_secs` is the
    /// TTL applied to every cached query result.
    pub fn new(pool: Arc<AgentPool>, cache: Arc<TimeWheelCache<Value>>, cache_ttl_secs: u64) -> Self {
        Self {
            pool,
            cache,
            cache_ttl_secs,
        }
    }

    pub fn pool(&self) -> &Arc<AgentPool> {
        &self.pool
    }

    pub fn cache(&self) -> &Arc<TimeWheelCache<Value>> {
        &self.cache
    }

    /// Answers a cacheable read query.
    ///
    /// Cache hits never touch an agent. On a miss the statement runs on an
    /// exclusively acquired agent, which is released before the result is
    /// written back to the cache. Execution failures are never cached; a
    /// rejected cache write degrades to a future miss and is otherwise
    /// ignored.
    pub async fn query(&self, request: &GatewayRequest, timing: &mut Timing) -> Result<Value> {
        let key = cache_key(&request.hql);

        timing.tick_start("read_cache");
        if let Some(hit) = self.cache.get(&key) {
            timing.tick_stop("read_cache");
            return Ok(hit);
        }
        timing.tick_stop("read_cache");

        timing.tick_start("assign_agent");
        let lease = self.pool.assign(request).await?;
        timing.tick_stop("assign_agent");

        // a concurrent identical query may have populated the cache while
        // this one waited for the agent
        timing.tick_start("read_cache2");
        if let Some(hit) = self.cache.get(&key) {
            timing.tick_stop("read_cache2");
            lease.release();
            return Ok(hit);
        }
        timing.tick_stop("read_cache2");

        timing.tick_start("backend");
        let result = lease.fetch(&request.hql).await;
        timing.tick_stop("backend");

        // free the agent before touching the cache to keep hold time short
        lease.release();

        let value = result?;

        timing.tick_start("update_cache");
        if let Err(err) = self.cache.set(key, value.clone(), self.cache_ttl_secs) {
            debug!(error = %err, "skipped cache population");
        }
        timing.tick_stop("update_cache");

        Ok(value)
    }

    /// Runs a mutating statement. The cache is bypassed in both directions.
    pub async fn execute(&self, request: &GatewayRequest, timing: &mut Timing) -> Result<()> {
        timing.tick_start("assign_agent");
        let lease = self.pool.assign(request).await?;
        timing.tick_stop("assign_agent");

        timing.tick_start("backend");
        let result = lease.execute(&request.hql).await;
        timing.tick_stop("backend");

        lease.release();
        result
    }
}
