//! Gateway Configuration
//!
//! Configuration is read once from a JSON file at startup and passed by
//! value into the components that need it. Nothing here is a process-wide
//! singleton; tests construct [`Config`] values directly.
//!
//! # File Format
//!
//! ```json
//! {
//!   "bind": "0.0.0.0:8080",
//!   "clusters": {
//!     "main": [
//!       {"host": "10.0.0.1", "port": 10000},
//!       {"host": "10.0.0.2", "port": 10000}
//!     ]
//!   },
//!   "cache": {"default_ttl_secs": 300, "max_ttl_secs": 3600, "granularity": 10},
//!   "health": {"interval_secs": 10},
//!   "debug": false
//! }
//! ```

use std::collections::HashMap;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{GatewayError, Result};

/// One backend connection endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

/// Time-wheel cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheSettings {
    /// TTL applied to cached query results, in seconds
    #[serde(default = "default_ttl_secs")]
    pub default_ttl_secs: u64,
    /// Longest TTL the wheel can represent, in seconds
    #[serde(default = "default_max_ttl_secs")]
    pub max_ttl_secs: u64,
    /// Sub-second ticks per second of TTL resolution
    #[serde(default = "default_granularity")]
    pub granularity: u64,
}

fn default_ttl_secs() -> u64 {
    300
}

fn default_max_ttl_secs() -> u64 {
    3600
}

fn default_granularity() -> u64 {
    10
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            default_ttl_secs: default_ttl_secs(),
            max_ttl_secs: default_max_ttl_secs(),
            granularity: default_granularity(),
        }
    }
}

/// Health monitor settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthSettings {
    /// Seconds between recovery sweeps over the agent pools
    #[serde(default = "default_health_interval_secs")]
    pub interval_secs: u64,
}

fn default_health_interval_secs() -> u64 {
    10
}

impl Default for HealthSettings {
    fn default() -> Self {
        Self {
            interval_secs: default_health_interval_secs(),
        }
    }
}

/// Top-level gateway configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP server binds to
    #[serde(default = "default_bind")]
    pub bind: String,
    /// Backend clusters keyed by name; order within a cluster is the
    /// routing base order
    pub clusters: HashMap<String, Vec<Endpoint>>,
    #[serde(default)]
    pub cache: CacheSettings,
    #[serde(default)]
    pub health: HealthSettings,
    /// Emit verbose diagnostics on internal failures
    #[serde(default)]
    pub debug: bool,
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

impl Config {
    /// Loads and validates a configuration file.
    ///
    /// # Errors
    ///
    /// Returns `GatewayError::Io` if the file cannot be read,
    /// `GatewayError::Json` if it is not valid JSON, and
    /// `GatewayError::Config` if validation fails.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Validates cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        if self.clusters.is_empty() {
            return Err(GatewayError::Config("no clusters configured".into()));
        }
        for (name, endpoints) in &self.clusters {
            if endpoints.is_empty() {
                return Err(GatewayError::Config(format!("cluster {} has no endpoints", name)));
            }
        }
        if self.cache.max_ttl_secs == 0 {
            return Err(GatewayError::Config("cache.max_ttl_secs must be nonzero".into()));
        }
        // tick period is 1000ms / granularity
        if self.cache.granularity == 0 || self.cache.granularity > 1000 {
            return Err(GatewayError::Config(
                "cache.granularity must be in 1..=1000".into(),
            ));
        }
        if self.cache.default_ttl_secs == 0 || self.cache.default_ttl_secs > self.cache.max_ttl_secs {
            return Err(GatewayError::Config(format!(
                "cache.default_ttl_secs must be in 1..={}",
                self.cache.max_ttl_secs
            )));
        }
        if self.health.interval_secs == 0 {
            return Err(GatewayError::Config("health.interval_secs must be nonzero".into()));
        }
        Ok(())
    }
}
