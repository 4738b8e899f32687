//! Zonegate - edge gateway and API entry point

use anyhow::Result;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};
use zonegate_common::config::{Config, LoggingConfig};
use zonegate_core::CleanupWorker;
use zonegate_storage::DatabasePool;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration
    let config = Config::load()?;

    // Initialize logging
    init_logging(&config.logging);

    info!("Starting Zonegate...");

    // Initialize database
    let db_pool = DatabasePool::new(&config.database).await?;
    info!("Database connection established");

    // Run migrations
    db_pool.migrate().await?;
    info!("Database migrations completed");

    let config = Arc::new(config);

    // Start gateway
    let gateway_handle = {
        let config = config.clone();
        let db_pool = db_pool.clone();
        info!(
            "Starting gateway on {}:{}",
            config.server.bind_address, config.gateway.port
        );
        tokio::spawn(async move {
            if let Err(e) = zonegate_core::gateway::run(&config, db_pool).await {
                tracing::error!("Gateway error: {}", e);
            }
        })
    };

    // Start API server
    let api_handle = {
        let config = config.clone();
        let db_pool = db_pool.clone();
        let addr = format!("{}:{}", config.server.bind_address, config.api.port);
        tokio::spawn(async move {
            let app = zonegate_api::create_router(config, db_pool);
            let listener = tokio::net::TcpListener::bind(&addr)
                .await
                .expect("Failed to bind API server");
            info!("API server listening on {}", addr);
            if let Err(e) = axum::serve(listener, app).await {
                tracing::error!("API server error: {}", e);
            }
        })
    };

    // Start cleanup worker
    let cleanup_handle = {
        let worker = CleanupWorker::new(db_pool.clone()).with_interval(config.cleanup.interval_secs);
        tokio::spawn(async move {
            worker.run().await;
        })
    };

    info!("Zonegate started successfully");

    // Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received");

    gateway_handle.abort();
    api_handle.abort();
    cleanup_handle.abort();

    info!("Zonegate shutdown complete");

    Ok(())
}

fn init_logging(config: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},zonegate=debug", config.level)));

    let registry = tracing_subscriber::registry().with(filter);
    if config.format == "json" {
        registry.with(fmt::layer().json()).init();
    } else {
        registry
            .with(fmt::layer().with_target(true).with_level(true))
            .init();
    }
}
