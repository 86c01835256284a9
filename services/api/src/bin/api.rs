//! services/api/src/bin/api.rs

use api_lib::{
    adapters::{run_notification_listener, BroadcastEventPublisher, DbAdapter},
    config::{Config, StorageBackend},
    error::ApiError,
    web::{build_router, AppState},
};
use course_progress_core::{DatabaseService, InMemoryDatabase};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const EVENT_BUFFER: usize = 256;

#[tokio::main]
async fn main() -> Result<(), ApiError> {
    // --- 1. Load Configuration & Set Up Logging ---
    let config = Arc::new(Config::from_env()?);
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(config.log_level.to_string()))
        .with(tracing_subscriber::fmt::layer())
        .init();
    info!("Configuration loaded. Starting server...");

    // --- 2. Connect to Storage & Run Migrations ---
    let mut pg_adapter: Option<Arc<DbAdapter>> = None;
    let db: Arc<dyn DatabaseService> = match config.storage_backend {
        StorageBackend::Postgres => {
            let database_url = config
                .database_url
                .as_deref()
                .ok_or_else(|| ApiError::Internal("DATABASE_URL is required".to_string()))?;
            info!("Connecting to database...");
            let db_pool = PgPoolOptions::new()
                .max_connections(config.db_max_connections)
                .connect(database_url)
                .await?;
            let adapter = Arc::new(DbAdapter::new(db_pool));
            info!("Running database migrations...");
            adapter.run_migrations().await?;
            info!("Database migrations complete.");
            pg_adapter = Some(adapter.clone());
            adapter
        }
        StorageBackend::Memory => {
            warn!("Using in-memory storage; all data is lost on shutdown");
            Arc::new(InMemoryDatabase::new())
        }
    };

    // --- 3. Start the Notification Listener ---
    let events = Arc::new(BroadcastEventPublisher::new(EVENT_BUFFER));
    let shutdown = CancellationToken::new();
    let listener_task = tokio::spawn(run_notification_listener(
        events.subscribe(),
        shutdown.clone(),
    ));

    // --- 4. Build the Shared AppState & Router ---
    let app_state = Arc::new(AppState::new(db, events, config.clone()));
    let app = build_router(app_state)?;

    // --- 5. Start the Server ---
    info!("Starting server on {}", config.bind_address);
    info!(
        "Swagger UI available at http://{}/swagger-ui",
        config.bind_address
    );
    let listener = tokio::net::TcpListener::bind(&config.bind_address).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    // --- 6. Drain Background Work ---
    shutdown.cancel();
    match listener_task.await {
        Ok(handled) => info!(handled, "Notification listener stopped"),
        Err(e) => warn!("Notification listener task failed: {}", e),
    }
    if let Some(adapter) = pg_adapter {
        adapter.close().await;
    }
    info!("Server stopped.");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
