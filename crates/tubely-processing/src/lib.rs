//! Tubely media processing
//!
//! The video ingestion pipeline (sniff → stage → probe → rewrite → place →
//! record) and the thumbnail writer. Everything that shells out to ffmpeg or
//! touches the scratch filesystem lives here.

pub mod access;
pub mod placement;
pub mod sniff;
pub mod staging;
pub mod thumbnail;
pub mod upload;
pub mod video;

pub use access::{authorize, AuthorizedVideo, OwnershipError};
pub use placement::{PlacementError, PlacementKey, PlacementPolicy};
pub use staging::{StagedFile, StagingArea, StagingError, StagingScope};
pub use thumbnail::{ThumbnailError, ThumbnailUploader};
pub use upload::UploadStream;
pub use video::{
    AspectClass, ContainerRewriter, ErrorClass, IngestError, IngestSettings, IngestStage,
    MediaGeometry, MediaProber, ProbeError, RewriteError, VideoIngestPipeline,
};
