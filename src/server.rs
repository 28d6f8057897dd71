//! HTTP server initialization and runtime setup.
//!
//! Handles database connections, cache setup, worker spawning, and Axum server lifecycle.

use crate::application::services::ThreadRandom;
use crate::config::Config;
use crate::domain::click_worker::run_click_worker;
use crate::infrastructure::cache::{CacheService, NullCache, RedisCache};
use crate::infrastructure::persistence::{
    PgClickRepository, PgExperimentRepository, PgLinkRepository, PgTargetRepository,
    PgTokenRepository,
};
use crate::routes::app_router;
use crate::state::{AppState, Repositories, StateOptions};
use crate::utils::clock::SystemClock;

use anyhow::{Context, Result};
use axum::ServiceExt;
use axum::extract::Request;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Runs the HTTP server with the given configuration.
///
/// Initializes:
/// - PostgreSQL connection pool
/// - Apply migrations
/// - Redis cache (or NullCache fallback)
/// - Background click worker
/// - Axum HTTP server
///
/// On Ctrl-C the server stops accepting connections, then waits for the click
/// worker to flush queued events.
///
/// # Errors
///
/// Returns an error if:
/// - Database connection or migration fails
/// - Server bind fails
/// - Server runtime error occurs
pub async fn run(config: Config) -> Result<()> {
    let pool = connect_pool(&config).await?;
    tracing::info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to migrate")?;

    let cache = connect_cache(&config).await;

    let (click_tx, click_rx) = mpsc::channel(config.click_queue_capacity);

    let pool = Arc::new(pool);
    let worker = tokio::spawn(run_click_worker(
        click_rx,
        Arc::new(PgClickRepository::new(pool.clone())),
        config.click_worker_concurrency,
    ));
    tracing::info!(
        concurrency = config.click_worker_concurrency,
        "Click worker started"
    );

    let repos = Repositories {
        links: Arc::new(PgLinkRepository::new(pool.clone())),
        targets: Arc::new(PgTargetRepository::new(pool.clone())),
        experiments: Arc::new(PgExperimentRepository::new(pool.clone())),
        tokens: Arc::new(PgTokenRepository::new(pool.clone())),
    };

    let state = AppState::new(
        repos,
        cache,
        click_tx,
        Some(pool),
        StateOptions {
            token_signing_secret: config.token_signing_secret.clone(),
            stats: config.stats_settings(),
            clock: Arc::new(SystemClock),
            random: Arc::new(ThreadRandom),
        },
    );

    let app = app_router(state, config.behind_proxy);

    let addr: SocketAddr = config.listen_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Listening on http://{addr}");

    axum::serve(
        listener,
        ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    // The router (and every sender it held) is gone; the worker drains and exits.
    if let Err(e) = worker.await {
        tracing::error!(error = %e, "Click worker panicked");
    }
    tracing::info!("Shutdown complete");

    Ok(())
}

async fn connect_pool(config: &Config) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(config.db_max_connections)
        .acquire_timeout(Duration::from_secs(config.db_connect_timeout))
        .idle_timeout(Duration::from_secs(config.db_idle_timeout))
        .max_lifetime(Duration::from_secs(config.db_max_lifetime))
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;

    Ok(pool)
}

async fn connect_cache(config: &Config) -> Arc<dyn CacheService> {
    let Some(redis_url) = &config.redis_url else {
        tracing::info!("Cache disabled (NullCache)");
        return Arc::new(NullCache::new());
    };

    match RedisCache::connect(redis_url, config.cache_ttl_seconds).await {
        Ok(redis) => {
            tracing::info!(ttl = config.cache_ttl_seconds, "Cache enabled (Redis)");
            Arc::new(redis)
        }
        Err(e) => {
            tracing::warn!("Failed to connect to Redis: {}. Using NullCache.", e);
            Arc::new(NullCache::new())
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
