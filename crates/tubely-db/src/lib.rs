//! Database repositories for the data access layer
//!
//! The ingestion pipeline only needs single-record reads and writes, so the
//! metadata store is exposed through the `VideoStore` trait and backed by
//! Postgres in production.

pub mod db;

pub use db::{VideoRepository, VideoStore};

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
