//! Domain models

pub mod video;

pub use video::{CreateVideoRequest, Video};
