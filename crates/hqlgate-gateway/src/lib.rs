//! hqlgate Gateway
//!
//! The serving side of hqlgate: agents and their pools, deterministic
//! content-hash routing with linear fail-over, the background health
//! recovery loop, the request orchestrator, and the HTTP surface.
//!
//! # Architecture
//!
//! ```text
//! HTTP request ──▶ HttpServer ──▶ Gateway ──▶ TimeWheelCache
//!                                   │
//!                                   └──▶ AgentPool ──▶ Agent ──▶ QueryBackend
//!                                            ▲
//!                                      HealthMonitor
//! ```
//!
//! - [`backend::QueryBackend`] is the seam to a backend execution service;
//!   [`backend::HttpBackend`] is the production implementation.
//! - [`agent::Agent`] pairs a backend with a status and an exclusive-use
//!   lock; statements run through an [`agent::AgentLease`].
//! - [`pool::AgentPool`] routes a request to an agent deterministically and
//!   fails over across degraded agents.
//! - [`health::HealthMonitor`] re-probes failed agents on a fixed period.
//! - [`gateway::Gateway`] sequences cache lookup, agent acquisition, the
//!   double-checked lookup, execution, release, and cache population.
//! - [`http_server::HttpServer`] exposes `/query` and `/execute`.

pub mod agent;
pub mod backend;
pub mod gateway;
pub mod health;
pub mod http_server;
pub mod pool;

#[cfg(test)]
mod test_support;

pub use agent::{Agent, AgentLease, AgentStatus};
pub use backend::{BackendReply, BackendStatement, HttpBackend, QueryBackend};
pub use gateway::{cache_key, Gateway};
pub use health::{HealthConfig, HealthMonitor};
pub use http_server::HttpServer;
pub use pool::AgentPool;
