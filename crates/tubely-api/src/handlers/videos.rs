//! Video metadata endpoints

use crate::auth::UserContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::handlers::parse_video_id;
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use tubely_core::models::{CreateVideoRequest, Video};
use tubely_core::AppError;

/// `POST /api/videos`: create a draft owned by the caller.
pub async fn create_video(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    ValidatedJson(request): ValidatedJson<CreateVideoRequest>,
) -> Result<(StatusCode, Json<Video>), HttpAppError> {
    let title = request.title.trim();
    if title.is_empty() {
        return Err(AppError::InvalidInput("Title is required".to_string()).into());
    }

    let video = state
        .videos
        .create_video(user.user_id, title.to_string(), request.description)
        .await?;

    tracing::info!(video_id = %video.id, user_id = %user.user_id, "Video draft created");

    Ok((StatusCode::CREATED, Json(video)))
}

/// `GET /api/videos`: the caller's videos, newest first.
pub async fn list_videos(
    State(state): State<Arc<AppState>>,
    user: UserContext,
) -> Result<Json<Vec<Video>>, HttpAppError> {
    let videos = state.videos.list_videos_for_user(user.user_id).await?;
    Ok(Json(videos))
}

/// `GET /api/videos/{videoID}`: owner only.
pub async fn get_video(
    State(state): State<Arc<AppState>>,
    user: UserContext,
    Path(video_id): Path<String>,
) -> Result<Json<Video>, HttpAppError> {
    let video_id = parse_video_id(&video_id)?;
    let video = state.videos.get_video(video_id).await?;

    if !video.is_owned_by(user.user_id) {
        return Err(AppError::Unauthorized("You can't view this video".to_string()).into());
    }

    Ok(Json(video))
}
