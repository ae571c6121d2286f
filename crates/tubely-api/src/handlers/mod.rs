pub mod health;
pub mod thumbnail_upload;
pub mod video_upload;
pub mod videos;

use tubely_core::AppError;
use uuid::Uuid;

/// Path segment → video id; anything unparseable is a 400 `Invalid ID`.
pub(crate) fn parse_video_id(raw: &str) -> Result<Uuid, AppError> {
    Ok(Uuid::parse_str(raw)?)
}
