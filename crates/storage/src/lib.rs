//! Staging of trip resources into load packages: parquet parts plus a JSON
//! manifest, on a local directory or an S3 bucket.

pub mod backend;
pub mod error;
pub mod manifest;
pub mod staging;

pub use backend::{LocalBackend, S3Backend, StorageBackend};
pub use error::StorageError;
pub use manifest::{LoadInfo, LoadManifest, ResourceLoad};
pub use staging::StagingWriter;
