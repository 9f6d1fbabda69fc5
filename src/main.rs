//! Order Cache - paginated order service with a Redis result-set cache

use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use order_cache::api::{create_router, AppState};
use order_cache::cache::{create_pool, CacheEngine, MemoryTier, RedisTier, RemoteTier};
use order_cache::config::{CacheBackend, Config, OrderSourceKind};
use order_cache::source::{ElasticOrderSource, OrderSource, StaticOrderSource};
use order_cache::spawn_sweeper;

/// Main entry point for the order service.
///
/// # Startup Sequence
/// 1. Load configuration from environment variables
/// 2. Initialize the tracing subscriber
/// 3. Connect the remote cache tier and the order source
/// 4. Start the expiration sweeper
/// 5. Serve HTTP until SIGINT/SIGTERM, then stop the sweeper
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env();
    init_logging(config.log_json);

    info!("Starting order service");
    info!(
        "Configuration loaded: backend={:?}, source={:?}, port={}, ttl={}s, sweep_interval={}s",
        config.cache_backend,
        config.order_source,
        config.server_port,
        config.order_cache_ttl,
        config.sweep_interval
    );

    let remote = build_remote_tier(&config).await?;
    let engine = Arc::new(CacheEngine::remote_only(remote));
    let orders = build_order_source(&config).await?;

    let sweeper = spawn_sweeper(
        engine.clone(),
        Duration::from_secs(config.sweep_interval.max(1)),
    );
    info!("Expiration sweeper started");

    let state = AppState::new(
        engine,
        orders,
        Duration::from_secs(config.order_cache_ttl),
    );
    let app = create_router(state);

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    sweeper.shutdown().await;
    info!("Server shutdown complete");
    Ok(())
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "order_cache=info,tower_http=info".into());

    if json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true))
            .init();
    }
}

async fn build_remote_tier(config: &Config) -> anyhow::Result<Arc<dyn RemoteTier>> {
    match config.cache_backend {
        CacheBackend::Redis => {
            let pool = create_pool(&config.redis_url, config.redis_pool_size)
                .await
                .with_context(|| format!("failed to connect to Redis at {}", config.redis_url))?;
            info!(pool_size = config.redis_pool_size, "Redis tier connected");
            Ok(Arc::new(RedisTier::new(pool)))
        }
        CacheBackend::Memory => {
            info!("Using in-process memory tier");
            Ok(Arc::new(MemoryTier::new()))
        }
    }
}

async fn build_order_source(config: &Config) -> anyhow::Result<Arc<dyn OrderSource>> {
    match config.order_source {
        OrderSourceKind::Elastic => {
            let mut source =
                ElasticOrderSource::new(config.es_addresses.clone(), config.es_index.clone())
                    .context("failed to build Elasticsearch client")?;
            if let Some(user) = &config.es_user {
                source = source.with_basic_auth(user.clone(), config.es_password.clone());
            }
            info!(addresses = ?config.es_addresses, index = %config.es_index, "Elasticsearch order source ready");
            Ok(Arc::new(source))
        }
        OrderSourceKind::Static => {
            let source = StaticOrderSource::from_file(&config.order_fixture)
                .await
                .with_context(|| format!("failed to load {}", config.order_fixture))?;
            info!(orders = source.len(), fixture = %config.order_fixture, "Static order source loaded");
            Ok(Arc::new(source))
        }
    }
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }
}
