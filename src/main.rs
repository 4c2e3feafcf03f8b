use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use outfit_tryon_server::{
    config::Config,
    create_app,
    database::{Database, MemoryDatabase, Repository},
    handlers::AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "outfit_tryon_server=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    tracing::info!(
        port = config.port,
        provider = %config.ai.provider,
        "Loaded configuration"
    );

    let repository: Arc<dyn Repository> = if config.uses_memory_store() {
        tracing::warn!("Using the in-memory store; data is lost on restart");
        Arc::new(MemoryDatabase::new())
    } else {
        let database = Database::new(&config.database_url, config.db_max_connections)
            .await
            .context("Failed to connect to database")?;
        database.migrate().await.context("Failed to run migrations")?;
        tracing::info!("Database migrations applied");
        Arc::new(database)
    };

    let port = config.port;
    let state = AppState::new(config, repository)?;
    state.storage.ensure_directories().await?;

    let app = create_app(state);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!("Listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Received Ctrl-C, shutting down");
}
