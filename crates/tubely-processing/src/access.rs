//! Ownership checks shared by every write path on a video record.

use tubely_core::{models::Video, AppError};
use tubely_db::VideoStore;
use uuid::Uuid;

#[derive(Debug, thiserror::Error)]
pub enum OwnershipError {
    #[error("video {0} not found")]
    NotFound(Uuid),

    #[error("user {user_id} does not own video {video_id}")]
    NotOwner { video_id: Uuid, user_id: Uuid },

    #[error("metadata store error: {0}")]
    Store(#[source] AppError),
}

/// A video record the caller has been verified to own.
///
/// Only [`authorize`] can produce one, so holding it proves the check ran.
#[derive(Debug, Clone)]
pub struct AuthorizedVideo {
    video: Video,
    user_id: Uuid,
}

impl AuthorizedVideo {
    pub fn video(&self) -> &Video {
        &self.video
    }

    pub fn user_id(&self) -> Uuid {
        self.user_id
    }

    pub fn into_video(self) -> Video {
        self.video
    }
}

/// Load `video_id` and verify `user_id` owns it.
#[tracing::instrument(skip(store))]
pub async fn authorize(
    store: &dyn VideoStore,
    video_id: Uuid,
    user_id: Uuid,
) -> Result<AuthorizedVideo, OwnershipError> {
    let video = store.get_video(video_id).await.map_err(|e| match e {
        AppError::NotFound(_) => OwnershipError::NotFound(video_id),
        other => OwnershipError::Store(other),
    })?;

    if !video.is_owned_by(user_id) {
        return Err(OwnershipError::NotOwner { video_id, user_id });
    }

    Ok(AuthorizedVideo { video, user_id })
}
