//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, Redis setup, the expiry sweeper, and the Axum
//! server lifecycle including graceful shutdown.

use crate::application::services::{MappingService, RateLimiter};
use crate::config::Config;
use crate::domain::clock::{Clock, SystemClock};
use crate::domain::expiry_sweeper::ExpirySweeper;
use crate::domain::repositories::MappingRepository;
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache, connect_manager};
use crate::infrastructure::persistence::PgMappingRepository;
use crate::infrastructure::rate_limit::{BucketStore, MemoryBucketStore, RedisBucketStore};
use crate::routes::app_router;
use crate::state::AppState;
use crate::utils::CodeGenerator;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};
use tracing::{info, warn};

/// Attempts to reach PostgreSQL before giving up at startup.
const DB_CONNECT_ATTEMPTS: usize = 5;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool (with retries) and migrations
/// - Redis-backed cache and rate limit buckets, or local ones without Redis
/// - Background expiry sweeper
/// - Axum HTTP server
///
/// On Ctrl-C / SIGTERM the server drains in-flight requests, then the sweeper
/// is stopped.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Redis is configured but unreachable
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_database(&config).await?;
    info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let repository: Arc<dyn MappingRepository> =
        Arc::new(PgMappingRepository::new(Arc::new(pool)));

    let (cache, bucket_store) = connect_redis(config.redis_url.as_deref(), &clock).await?;

    let mapping_service = Arc::new(MappingService::new(
        Arc::clone(&repository),
        Arc::clone(&cache),
        CodeGenerator::new(config.code_hash_seed, config.code_max_attempts),
        Arc::clone(&clock),
        config.mapping_settings(),
    ));

    let rate_limiter = Arc::new(RateLimiter::new(
        bucket_store,
        config.rate_limits(),
        config.failure_policy(),
        config.dependency_timeout(),
    ));

    // A sweep may use up to one interval; the next tick waits for it anyway.
    let sweeper = ExpirySweeper::new(
        Arc::clone(&repository),
        Arc::clone(&clock),
        config.sweep_interval(),
    );
    let sweep_stats = sweeper.stats();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let sweeper_handle = sweeper.spawn(config.sweep_interval(), shutdown_rx);

    let state = AppState {
        mapping_service,
        rate_limiter,
        repository,
        cache,
        sweep_stats,
        base_url: config.base_url.clone(),
        behind_proxy: config.behind_proxy,
    };

    let app = app_router(state);

    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address '{}'", config.listen_addr))?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("HTTP server stopped");

    // Receiver only goes away if the sweeper task already ended.
    let _ = shutdown_tx.send(true);
    sweeper_handle.await.context("Expiry sweeper panicked")?;

    Ok(())
}

/// Builds the connection pool, retrying with jittered exponential backoff.
async fn connect_database(config: &Config) -> Result<PgPool> {
    let strategy = ExponentialBackoff::from_millis(200)
        .max_delay(Duration::from_secs(5))
        .map(jitter)
        .take(DB_CONNECT_ATTEMPTS - 1);

    Retry::spawn(strategy, || async {
        PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
            .idle_timeout(Duration::from_secs(config.db_idle_timeout))
            .max_lifetime(Duration::from_secs(config.db_max_lifetime))
            .connect(&config.database_url)
            .await
            .inspect_err(|e| warn!("Database connection attempt failed: {}", e))
    })
    .await
    .context("Failed to connect to database")
}

/// Connects the shared Redis backend for cache and rate limit buckets.
///
/// Without `redis_url`, caching is disabled and buckets are kept per process.
/// A configured Redis that cannot be reached fails startup; once running,
/// outages are handled by the cache-aside path and the rate limit failure policy.
pub(crate) async fn connect_redis(
    redis_url: Option<&str>,
    clock: &Arc<dyn Clock>,
) -> Result<(Arc<dyn CacheService>, Arc<dyn BucketStore>)> {
    let Some(redis_url) = redis_url else {
        info!("Redis disabled: no cache, per-process rate limits");
        return Ok((
            Arc::new(NullCache::new()),
            Arc::new(MemoryBucketStore::new(Arc::clone(clock))),
        ));
    };

    let manager = connect_manager(redis_url)
        .await
        .context("Failed to connect to Redis")?;
    info!("Redis enabled: shared cache and rate limits");

    Ok((
        Arc::new(RedisCache::new(manager.clone())),
        Arc::new(RedisBucketStore::new(manager)),
    ))
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
