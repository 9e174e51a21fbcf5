use schema_registry_cache::api::{router, ProxyState};
use schema_registry_cache::config::Config;
use schema_registry_cache::{CachingRegistry, ConfluentClient, SchemaRegistry};

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::signal;
use tracing::{debug, info, warn};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment from .env file if present
    let dotenv_result = dotenvy::dotenv();

    let config = Config::from_env()?;

    // Create log directory if it doesn't exist
    std::fs::create_dir_all(&config.log_dir).unwrap_or_else(|e| {
        eprintln!("Warning: Could not create log directory {}: {}", config.log_dir, e);
    });

    // Create file appender with daily rotation
    let file_appender =
        RollingFileAppender::new(Rotation::DAILY, &config.log_dir, "schema-registry-cache.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    // Initialize logging - both stdout and file
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,schema_registry_cache=debug")),
        )
        // Console output
        .with(fmt::layer().with_target(true).with_thread_ids(true))
        // File output with JSON format for easy parsing
        .with(
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_ansi(false)
                .json()
                .with_writer(non_blocking),
        )
        .init();

    debug!("Logging initialized - log directory: {}", config.log_dir);

    if let Err(e) = dotenv_result {
        warn!("No .env file found or error loading it: {}", e);
    }

    let socket_addr = config.socket_addr()?;

    info!("Starting schema registry cache on {}", socket_addr);
    info!("Upstream registry: {}", config.upstream_url);
    info!("Upstream timeout: {:?}", config.upstream_timeout);

    let upstream = ConfluentClient::new(config.upstream())?;

    let registry: Arc<dyn SchemaRegistry> = match &config.cache_dir {
        Some(dir) => Arc::new(CachingRegistry::with_disk_path(upstream, dir)),
        None => Arc::new(CachingRegistry::new(upstream)),
    };

    let state = Arc::new(ProxyState {
        registry,
        upstream_url: config.upstream_url.clone(),
        cache_dir: config.cache_dir.clone(),
        started_at: Instant::now(),
    });

    let app = router(state);

    // Create listener
    let listener = tokio::net::TcpListener::bind(&socket_addr).await?;
    info!("Server listening on {}", socket_addr);

    // Run server with graceful shutdown
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    info!("Server shutdown complete");

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Received shutdown signal");
}
