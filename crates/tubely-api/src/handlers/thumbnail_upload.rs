//! `POST /api/thumbnail_upload/{videoID}`

use crate::auth::UserContext;
use crate::constants::THUMBNAIL_FIELD;
use crate::error::{multipart_error, HttpAppError};
use crate::handlers::parse_video_id;
use crate::state::AppState;
use axum::{
    extract::{Multipart, Path, State},
    Json,
};
use futures::TryStreamExt;
use std::io;
use std::sync::Arc;
use tokio_util::io::StreamReader;
use tubely_core::{models::Video, AppError};
use tubely_processing::UploadStream;

pub async fn upload_thumbnail(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(video_id): Path<String>,
    mut multipart: Multipart,
) -> Result<Json<Video>, HttpAppError> {
    let video_id = parse_video_id(&video_id)?;
    let authorized = state.thumbnails.authorize(video_id, user.user_id).await?;

    tracing::info!(video_id = %video_id, user_id = %user.user_id, "Uploading thumbnail");

    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(THUMBNAIL_FIELD) {
            continue;
        }

        let declared_type = field.content_type().map(String::from);
        let reader = StreamReader::new(field.map_err(io::Error::other));
        let video = state
            .thumbnails
            .upload(authorized, UploadStream::new(reader, declared_type))
            .await?;
        return Ok(Json(video));
    }

    Err(AppError::BadRequest("Unable to parse form file".to_string()).into())
}
