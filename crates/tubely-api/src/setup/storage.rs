//! Storage setup and initialization

use anyhow::{Context, Result};
use std::sync::Arc;
use tubely_core::Config;
use tubely_storage::{create_storage, LocalStorage, Storage};

/// Build the video object store and the local thumbnail asset store.
pub async fn setup_storage(config: &Config) -> Result<(Arc<dyn Storage>, Arc<dyn Storage>)> {
    tracing::info!("Initializing storage...");
    let objects = create_storage(config)
        .await
        .context("Failed to initialize video object store")?;

    let assets_url = format!("{}/assets", config.platform_url());
    let assets = LocalStorage::new(config.assets_root(), assets_url.clone())
        .await
        .context("Failed to initialize assets directory")?;

    tracing::info!(
        backend = ?objects.backend_type(),
        assets_root = %config.assets_root().display(),
        assets_url = %assets_url,
        "Storage initialized successfully"
    );

    Ok((objects, Arc::new(assets)))
}
