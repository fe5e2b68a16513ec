// Main entry point for the EVCS notification backend

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use evcs_core::domains::charging::SteveStore;
use evcs_core::domains::notifications::{PushDispatcher, SqlEventJournal};
use evcs_core::domains::sync::{SyncConfig, SyncScheduler};
use evcs_core::server::{build_app, AppState};
use evcs_core::Config;
use fcm::{FcmOptions, FcmService};
use sqlx::mysql::MySqlPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,evcs_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting EVCS notification backend");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Local notifications store
    tracing::info!("Connecting to local database...");
    let db_pool = MySqlPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to local database")?;

    // External SteVe store (read-only)
    tracing::info!("Connecting to SteVe database...");
    let steve_pool = MySqlPoolOptions::new()
        .max_connections(5)
        .connect(&config.steve_database_url)
        .await
        .context("Failed to connect to SteVe database")?;

    // Bootstrap local schema
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&db_pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Push delivery
    let fcm_service = match &config.fcm_server_key {
        Some(key) => Some(FcmService::new(FcmOptions {
            server_key: key.clone(),
        })),
        None => {
            tracing::warn!("FCM_SERVER_KEY not set, push delivery disabled");
            None
        }
    };

    // Reconciliation loop
    let push = Arc::new(PushDispatcher::new(db_pool.clone(), fcm_service));
    let scheduler = Arc::new(SyncScheduler::new(
        Arc::new(SteveStore::new(steve_pool.clone())),
        push.clone(),
        Arc::new(SqlEventJournal::new(db_pool.clone())),
        SyncConfig {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            ..SyncConfig::default()
        },
    ));
    scheduler.start().await;

    // HTTP API
    let app = build_app(AppState {
        steve_pool,
        db_pool,
        scheduler: scheduler.clone(),
        push,
    });

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(scheduler.clone()))
        .await
        .context("Server error")?;

    Ok(())
}

/// Wait for Ctrl+C, then let the in-flight reconciliation tick finish
/// before the server drains.
async fn shutdown_signal(scheduler: Arc<SyncScheduler>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for shutdown signal");
        return;
    }

    tracing::info!("Shutdown requested, stopping transaction polling");
    scheduler.stop().await;
}
