//! Tubely Storage Library
//!
//! Storage abstraction and implementations for Tubely: S3 (or any
//! S3-compatible provider) for videos and the local filesystem for
//! thumbnails and development setups.
//!
//! # Storage key format
//!
//! Keys are relative, `/`-separated paths such as `landscape/<hex>.mp4`. They
//! must not be empty, contain `..`, or start with `/`. Key *naming* is owned
//! by the caller; this crate only validates and stores.

pub mod factory;
pub(crate) mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use traits::{Storage, StorageError, StorageResult};
pub use tubely_core::StorageBackend;
