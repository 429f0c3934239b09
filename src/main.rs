mod cache;
mod config;
mod db;
mod errors;
mod metrics;
mod pubmed;
mod routes;
mod services;

use crate::config::StoreBackend;
use crate::db::{FileStore, MemoryStore, NetworkStore};
use crate::pubmed::{EutilsClient, PubMedApi};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load configuration
    dotenvy::dotenv().ok();
    let config = config::AppConfig::build()?;

    // 2. Setup logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&config.server.rust_log))
        .init();

    tracing::info!("Starting CiteGraph...");

    let config = Arc::new(config);

    // 3. Upstream client and durable summary cache
    let api: Arc<dyn PubMedApi> = Arc::new(EutilsClient::new(config.eutils.clone())?);
    let cache = cache::SummaryCache::new(&config.cache.dir);

    // 4. Network store, backend selected at construction
    let store: Arc<dyn NetworkStore> = match config.store.backend {
        StoreBackend::Memory => Arc::new(MemoryStore::new()),
        StoreBackend::File => Arc::new(FileStore::new(&config.store.dir)),
    };
    tracing::info!(backend = ?config.store.backend, "Network store ready");

    // 5. App state (services) and router
    let state = services::AppState::new(config.clone(), api, cache, store);
    let app = routes::create_router(state);

    // 6. Start server
    let addr: SocketAddr = format!("{}:{}", config.server.host, config.server.port).parse()?;
    tracing::info!("Listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Server shutdown complete");
    Ok(())
}

/// Graceful shutdown signal handler
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
        _ = ctrl_c => tracing::info!("Received Ctrl+C, starting shutdown..."),
        _ = terminate => tracing::info!("Received SIGTERM, starting shutdown..."),
    }
}
