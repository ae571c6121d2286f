mod video;

pub use video::{VideoRepository, VideoStore};
