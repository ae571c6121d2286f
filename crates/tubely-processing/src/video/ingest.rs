//! Video ingestion orchestration: sniff → stage → probe → rewrite → upload → record.
//!
//! Stages run strictly in order and the first failure is terminal. Scratch
//! files are owned by a [`StagingScope`] and are removed on every exit path,
//! including a dropped request future.

use std::fmt;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::AsyncRead;
use uuid::Uuid;

use tubely_core::constants::{
    MAX_VIDEO_UPLOAD_BYTES, SNIFF_PREFIX_LEN, SUPPORTED_VIDEO_CONTENT_TYPE,
};
use tubely_core::{models::Video, AppError, Config};
use tubely_db::VideoStore;
use tubely_storage::{Storage, StorageError};

use super::prober::{MediaProber, ProbeError};
use super::rewriter::{self, ContainerRewriter, RewriteError};
use crate::access::{self, AuthorizedVideo, OwnershipError};
use crate::placement::{PlacementError, PlacementPolicy};
use crate::sniff::resolve_media_type;
use crate::staging::{StagingArea, StagingError, StagingScope};
use crate::upload::UploadStream;

/// Where an ingestion is. A failure is reported against the last stage
/// reached, i.e. the transition out of it is what failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestStage {
    Received,
    Authorized,
    FormParsed,
    TypeValidated,
    Staged,
    Flushed,
    Probed,
    Rewritten,
    Uploaded,
    MetadataUpdated,
}

impl IngestStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            IngestStage::Received => "received",
            IngestStage::Authorized => "authorized",
            IngestStage::FormParsed => "form_parsed",
            IngestStage::TypeValidated => "type_validated",
            IngestStage::Staged => "staged",
            IngestStage::Flushed => "flushed",
            IngestStage::Probed => "probed",
            IngestStage::Rewritten => "rewritten",
            IngestStage::Uploaded => "uploaded",
            IngestStage::MetadataUpdated => "metadata_updated",
        }
    }
}

impl fmt::Display for IngestStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Who is at fault for a failed ingestion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Bad request, wrong type, not the owner, empty upload.
    Client,
    /// A tool, the object store, or the metadata store failed.
    Dependency,
    /// The service is misconfigured.
    Configuration,
}

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Ownership(#[from] OwnershipError),

    #[error("upload is empty")]
    EmptyUpload,

    #[error("unsupported media type: {0}")]
    UnsupportedMediaType(String),

    #[error("upload exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("failed to read upload: {0}")]
    UploadRead(#[source] io::Error),

    #[error("failed to stage upload: {0}")]
    Staging(#[source] io::Error),

    #[error(transparent)]
    Probe(#[from] ProbeError),

    #[error(transparent)]
    Rewrite(#[from] RewriteError),

    #[error(transparent)]
    Placement(#[from] PlacementError),

    #[error("object store upload failed: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to record video URL: {0}")]
    MetadataUpdate(#[source] AppError),
}

impl From<StagingError> for IngestError {
    fn from(err: StagingError) -> Self {
        match err {
            StagingError::Read(e) => IngestError::UploadRead(e),
            StagingError::Write(e) => IngestError::Staging(e),
            StagingError::TooLarge { limit } => IngestError::PayloadTooLarge { limit },
        }
    }
}

impl IngestError {
    pub fn class(&self) -> ErrorClass {
        match self {
            IngestError::Ownership(OwnershipError::Store(_)) => ErrorClass::Dependency,
            IngestError::Ownership(_)
            | IngestError::EmptyUpload
            | IngestError::UnsupportedMediaType(_)
            | IngestError::PayloadTooLarge { .. }
            | IngestError::UploadRead(_) => ErrorClass::Client,
            IngestError::Placement(_)
            | IngestError::Probe(ProbeError::InvalidExecutable(_))
            | IngestError::Rewrite(RewriteError::InvalidExecutable(_))
            | IngestError::Storage(StorageError::ConfigError(_)) => ErrorClass::Configuration,
            IngestError::Staging(_)
            | IngestError::Probe(_)
            | IngestError::Rewrite(_)
            | IngestError::Storage(_)
            | IngestError::MetadataUpdate(_) => ErrorClass::Dependency,
        }
    }
}

/// Everything the pipeline needs from configuration.
#[derive(Debug, Clone)]
pub struct IngestSettings {
    pub ffprobe_path: String,
    pub ffmpeg_path: String,
    pub scratch_dir: PathBuf,
    pub distribution_base: Option<String>,
    pub max_upload_bytes: u64,
}

impl IngestSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            ffprobe_path: config.ffprobe_path().to_string(),
            ffmpeg_path: config.ffmpeg_path().to_string(),
            scratch_dir: config.scratch_dir().to_path_buf(),
            distribution_base: config.cf_distribution().map(String::from),
            max_upload_bytes: MAX_VIDEO_UPLOAD_BYTES,
        }
    }
}

fn advance(stage: &mut IngestStage, next: IngestStage) {
    tracing::debug!(from = %stage, to = %next, "ingest stage");
    *stage = next;
}

/// The video ingestion pipeline. Holds no per-request state; one instance
/// serves all concurrent ingestions.
pub struct VideoIngestPipeline {
    videos: Arc<dyn VideoStore>,
    storage: Arc<dyn Storage>,
    prober: MediaProber,
    rewriter: ContainerRewriter,
    staging: StagingArea,
    placement: PlacementPolicy,
    max_upload_bytes: u64,
}

impl VideoIngestPipeline {
    pub fn new(
        videos: Arc<dyn VideoStore>,
        storage: Arc<dyn Storage>,
        settings: IngestSettings,
    ) -> Result<Self, IngestError> {
        let placement = PlacementPolicy::new(settings.distribution_base.as_deref());
        if placement.distribution_base().is_err() {
            tracing::warn!("S3_CF_DISTRO is not set; video uploads will fail until it is configured");
        }

        Ok(Self {
            videos,
            storage,
            prober: MediaProber::new(settings.ffprobe_path)?,
            rewriter: ContainerRewriter::new(settings.ffmpeg_path)?,
            staging: StagingArea::new(settings.scratch_dir),
            placement,
            max_upload_bytes: settings.max_upload_bytes,
        })
    }

    pub fn staging(&self) -> &StagingArea {
        &self.staging
    }

    /// Received → Authorized. Must run before any upload byte is read.
    pub async fn authorize(
        &self,
        video_id: Uuid,
        user_id: Uuid,
    ) -> Result<AuthorizedVideo, IngestError> {
        Ok(access::authorize(self.videos.as_ref(), video_id, user_id).await?)
    }

    /// Ingest `upload` as the video for an already-authorized record and
    /// return the updated record.
    #[tracing::instrument(skip_all, fields(
        video_id = %authorized.video().id,
        user_id = %authorized.user_id()
    ))]
    pub async fn ingest<R>(
        &self,
        authorized: AuthorizedVideo,
        mut upload: UploadStream<R>,
    ) -> Result<Video, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let start = std::time::Instant::now();
        let mut stage = IngestStage::FormParsed;
        let mut scope = self.staging.scope();

        let result = self
            .run(&mut stage, &mut scope, authorized, &mut upload)
            .await;
        scope.release().await;

        match &result {
            Ok(video) => tracing::info!(
                video_url = video.video_url.as_deref().unwrap_or_default(),
                duration_ms = start.elapsed().as_millis() as u64,
                "Video ingested"
            ),
            Err(e) if e.class() == ErrorClass::Client => {
                tracing::warn!(stage = %stage, error = %e, "Video ingestion rejected")
            }
            Err(e) => tracing::error!(
                stage = %stage,
                class = ?e.class(),
                error = %e,
                "Video ingestion failed"
            ),
        }

        result
    }

    async fn run<R>(
        &self,
        stage: &mut IngestStage,
        scope: &mut StagingScope,
        authorized: AuthorizedVideo,
        upload: &mut UploadStream<R>,
    ) -> Result<Video, IngestError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let prefix = upload
            .read_prefix(SNIFF_PREFIX_LEN)
            .await
            .map_err(IngestError::UploadRead)?;
        if prefix.is_empty() {
            return Err(IngestError::EmptyUpload);
        }

        let media_type = resolve_media_type(upload.declared_type.as_deref(), &prefix);
        if media_type != SUPPORTED_VIDEO_CONTENT_TYPE {
            return Err(IngestError::UnsupportedMediaType(media_type));
        }
        advance(stage, IngestStage::TypeValidated);

        let staged = scope
            .stage(&prefix, &mut upload.reader, self.max_upload_bytes)
            .await?;
        advance(stage, IngestStage::Staged);

        let staged_path = staged.flush().await?;
        advance(stage, IngestStage::Flushed);

        let geometry = self.prober.probe_geometry(&staged_path).await?;
        let class = geometry.aspect_class();
        tracing::debug!(
            width = geometry.width,
            height = geometry.height,
            aspect = %class,
            "Video classified"
        );
        advance(stage, IngestStage::Probed);

        // Resolve the public address before anything is stored, so a missing
        // distribution never leaves an unreachable object behind.
        let key = self.placement.compute_key(class);
        let video_url = self.placement.public_url(&key)?;

        scope.register(rewriter::output_path_for(&staged_path));
        let rewritten_path = self.rewriter.rewrite(&staged_path).await?;
        advance(stage, IngestStage::Rewritten);

        let object_key = key.object_key();
        self.storage
            .put_file(&object_key, &rewritten_path, SUPPORTED_VIDEO_CONTENT_TYPE)
            .await?;
        advance(stage, IngestStage::Uploaded);

        let mut video = authorized.into_video();
        video.video_url = Some(video_url);
        let updated = self.videos.update_video(&video).await.map_err(|e| {
            // No compensating delete: the object stays in storage.
            tracing::warn!(
                key = %object_key,
                error = %e,
                "Video stored but record update failed; object is orphaned"
            );
            IngestError::MetadataUpdate(e)
        })?;
        advance(stage, IngestStage::MetadataUpdated);

        Ok(updated)
    }
}
