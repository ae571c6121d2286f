//! Fixed limits of the upload surface. These are not configurable.

/// Hard ceiling for a single video upload request (1 GiB).
pub const MAX_VIDEO_UPLOAD_BYTES: u64 = 1 << 30;

/// Hard ceiling for a single thumbnail upload request (10 MiB).
pub const MAX_THUMBNAIL_UPLOAD_BYTES: u64 = 10 << 20;

/// Number of leading bytes read for content-type sniffing.
pub const SNIFF_PREFIX_LEN: usize = 512;

/// The only media type accepted for video ingestion.
pub const SUPPORTED_VIDEO_CONTENT_TYPE: &str = "video/mp4";

/// Media type treated as "no useful declaration" and replaced by sniffing.
pub const GENERIC_CONTENT_TYPE: &str = "application/octet-stream";
