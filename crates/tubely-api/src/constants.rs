//! HTTP-layer constants

use tubely_core::constants::{MAX_THUMBNAIL_UPLOAD_BYTES, MAX_VIDEO_UPLOAD_BYTES};

/// Room for multipart boundaries and part headers on top of the file itself.
const MULTIPART_OVERHEAD_BYTES: usize = 1 << 20;

/// Request body ceiling for `POST /api/video_upload/{id}`.
pub const VIDEO_UPLOAD_BODY_LIMIT: usize =
    MAX_VIDEO_UPLOAD_BYTES as usize + MULTIPART_OVERHEAD_BYTES;

/// Request body ceiling for `POST /api/thumbnail_upload/{id}`.
pub const THUMBNAIL_UPLOAD_BODY_LIMIT: usize =
    MAX_THUMBNAIL_UPLOAD_BYTES as usize + MULTIPART_OVERHEAD_BYTES;

/// Server-level cap on in-flight requests.
pub const HTTP_CONCURRENCY_LIMIT: usize = 1024;

/// Multipart field carrying the video.
pub const VIDEO_FIELD: &str = "video";

/// Multipart field carrying the thumbnail.
pub const THUMBNAIL_FIELD: &str = "thumbnail";
