//! Thumbnail uploads: sniff, name randomly, write to the local assets
//! directory and record the URL. No image processing happens here.

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use bytes::Bytes;
use rand::RngCore;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncReadExt};
use uuid::Uuid;

use tubely_core::constants::{MAX_THUMBNAIL_UPLOAD_BYTES, SNIFF_PREFIX_LEN};
use tubely_core::{models::Video, AppError};
use tubely_db::VideoStore;
use tubely_storage::{Storage, StorageError};

use crate::access::{self, AuthorizedVideo, OwnershipError};
use crate::sniff::{extension_for, resolve_media_type};
use crate::upload::UploadStream;

const NAME_BYTES: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum ThumbnailError {
    #[error(transparent)]
    Ownership(#[from] OwnershipError),

    #[error("thumbnail is empty")]
    EmptyUpload,

    #[error("cannot derive a file extension for {0}")]
    UnknownExtension(String),

    #[error("thumbnail exceeds {limit} bytes")]
    PayloadTooLarge { limit: u64 },

    #[error("failed to read thumbnail: {0}")]
    UploadRead(#[source] io::Error),

    #[error("failed to store thumbnail: {0}")]
    Storage(#[from] StorageError),

    #[error("failed to record thumbnail URL: {0}")]
    MetadataUpdate(#[source] AppError),
}

/// Random, URL-safe asset name. Never derived from the video id.
fn asset_name(extension: &str) -> String {
    let mut bytes = [0u8; NAME_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    format!("{}{}", URL_SAFE_NO_PAD.encode(bytes), extension)
}

pub struct ThumbnailUploader {
    videos: Arc<dyn VideoStore>,
    assets: Arc<dyn Storage>,
    max_bytes: u64,
}

impl ThumbnailUploader {
    /// `assets` is the store served under `/assets`; its public URL is the
    /// thumbnail URL.
    pub fn new(videos: Arc<dyn VideoStore>, assets: Arc<dyn Storage>) -> Self {
        Self {
            videos,
            assets,
            max_bytes: MAX_THUMBNAIL_UPLOAD_BYTES,
        }
    }

    pub async fn authorize(
        &self,
        video_id: Uuid,
        user_id: Uuid,
    ) -> Result<AuthorizedVideo, ThumbnailError> {
        Ok(access::authorize(self.videos.as_ref(), video_id, user_id).await?)
    }

    #[tracing::instrument(skip_all, fields(video_id = %authorized.video().id))]
    pub async fn upload<R>(
        &self,
        authorized: AuthorizedVideo,
        mut upload: UploadStream<R>,
    ) -> Result<Video, ThumbnailError>
    where
        R: AsyncRead + Unpin + Send,
    {
        let prefix = upload
            .read_prefix(SNIFF_PREFIX_LEN)
            .await
            .map_err(ThumbnailError::UploadRead)?;
        if prefix.is_empty() {
            return Err(ThumbnailError::EmptyUpload);
        }

        let media_type = resolve_media_type(upload.declared_type.as_deref(), &prefix);
        let extension = extension_for(&media_type)
            .ok_or_else(|| ThumbnailError::UnknownExtension(media_type.clone()))?;

        let mut data = prefix;
        let remaining = (self.max_bytes + 1).saturating_sub(data.len() as u64);
        (&mut upload.reader)
            .take(remaining)
            .read_to_end(&mut data)
            .await
            .map_err(ThumbnailError::UploadRead)?;
        if data.len() as u64 > self.max_bytes {
            return Err(ThumbnailError::PayloadTooLarge {
                limit: self.max_bytes,
            });
        }

        let name = asset_name(&extension);
        let size = data.len();
        self.assets
            .put_object(&name, Bytes::from(data), &media_type)
            .await?;

        let mut video = authorized.into_video();
        video.thumbnail_url = Some(self.assets.public_url(&name));
        let updated = self
            .videos
            .update_video(&video)
            .await
            .map_err(ThumbnailError::MetadataUpdate)?;

        tracing::info!(
            asset = %name,
            media_type = %media_type,
            size_bytes = size,
            "Thumbnail stored"
        );

        Ok(updated)
    }
}
