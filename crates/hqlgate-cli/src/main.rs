//! # hqlgate Entry Point
//!
//! Main binary for the hqlgate query gateway.
//!
//! ## Usage
//!
//! ```bash
//! # Start the gateway
//! hqlgate serve -c /etc/hqlgate/config.json
//!
//! # Override the configured bind address
//! hqlgate serve -c config.json -b 127.0.0.1:9090
//! ```
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use argh::FromArgs;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing_subscriber::EnvFilter;

use hqlgate_cache::{CacheConfig, TimeWheelCache};
use hqlgate_common::Config;
use hqlgate_gateway::{AgentPool, Gateway, HealthConfig, HealthMonitor, HttpServer};

/// Main CLI structure parsed from command-line arguments.
#[derive(FromArgs)]
/// hqlgate - HQL query gateway with result caching and agent fail-over
struct Cli {
    #[argh(subcommand)]
    command: Commands,
}

/// Available CLI subcommands.
#[derive(FromArgs)]
#[argh(subcommand)]
enum Commands {
    Serve(ServeArgs),
}

/// Arguments for running the gateway server.
#[derive(FromArgs)]
#[argh(subcommand, name = "serve")]
/// start the gateway server
struct ServeArgs {
    /// path to the JSON configuration file
    #[argh(option, short = 'c')]
    config: String,

    /// bind address override, e.g. "127.0.0.1:9090"
    ///
    /// Defaults to the configuration file's `bind` field.
    #[argh(option, short = 'b')]
    bind: Option<String>,
}

/// Picks the effective bind address: CLI override first, config second.
fn resolve_bind(override_bind: Option<&str>, config_bind: &str) -> Result<SocketAddr> {
    let bind = override_bind.unwrap_or(config_bind);
    bind.parse()
        .with_context(|| format!("invalid bind address '{}'", bind))
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli: Cli = argh::from_env();
    match cli.command {
        Commands::Serve(args) => serve(args).await,
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load config '{}'", args.config))?;
    let addr = resolve_bind(args.bind.as_deref(), &config.bind)?;

    let pool = Arc::new(AgentPool::from_config(&config));
    let cache = Arc::new(TimeWheelCache::new(CacheConfig {
        max_ttl_secs: config.cache.max_ttl_secs,
        granularity: config.cache.granularity,
    })?);

    let shutdown = CancellationToken::new();
    let purge_handle = TimeWheelCache::spawn_purge(Arc::clone(&cache), shutdown.clone());

    let monitor = HealthMonitor::new(
        Arc::clone(&pool),
        HealthConfig {
            interval: Duration::from_secs(config.health.interval_secs),
        },
    );
    // bring agents up before accepting traffic; unreachable backends stay
    // in Error status and are retried by the monitor
    monitor.run_once().await;
    let health_handle = monitor.spawn(shutdown.clone());

    let gateway = Arc::new(Gateway::new(pool, cache, config.cache.default_ttl_secs));
    let server = HttpServer::new(gateway, config.debug);

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("shutdown signal received");
            signal_token.cancel();
        }
    });

    server.run(addr, shutdown.clone()).await?;

    // the server has drained; stop the background tasks deterministically
    shutdown.cancel();
    let _ = purge_handle.await;
    let _ = health_handle.await;
    info!("gateway stopped");
    Ok(())
}
