//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;
use tubely_db::VideoRepository;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry(config.is_production())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    config.validate().context("Configuration validation failed")?;
    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let (objects, assets) = storage::setup_storage(&config).await?;

    let state = Arc::new(
        AppState::new(
            config.clone(),
            Arc::new(VideoRepository::new(pool)),
            objects,
            assets,
        )
        .context("Failed to build ingestion pipeline")?,
    );

    let router = routes::setup_routes(&config, state.clone()).await?;

    Ok((state, router))
}
