//! Application state shared by every handler.

use std::sync::Arc;
use tubely_core::Config;
use tubely_db::VideoStore;
use tubely_processing::{IngestError, IngestSettings, ThumbnailUploader, VideoIngestPipeline};
use tubely_storage::Storage;

pub struct AppState {
    pub config: Config,
    pub videos: Arc<dyn VideoStore>,
    pub ingest: VideoIngestPipeline,
    pub thumbnails: ThumbnailUploader,
}

impl AppState {
    /// Wire the upload paths to their collaborators.
    ///
    /// `objects` receives processed videos; `assets` is the local store served
    /// under `/assets` and receives thumbnails.
    pub fn new(
        config: Config,
        videos: Arc<dyn VideoStore>,
        objects: Arc<dyn Storage>,
        assets: Arc<dyn Storage>,
    ) -> Result<Self, IngestError> {
        let ingest =
            VideoIngestPipeline::new(videos.clone(), objects, IngestSettings::from_config(&config))?;
        let thumbnails = ThumbnailUploader::new(videos.clone(), assets);

        Ok(Self {
            config,
            videos,
            ingest,
            thumbnails,
        })
    }
}
