use std::path::{Path, PathBuf};
use std::sync::Arc;

use object_store::aws::AmazonS3Builder;
use object_store::local::LocalFileSystem;
use object_store::ObjectStore;
use tracing::info;

use tripdata_core::config::AwsConfig;
use tripdata_core::{Config, Destination};

use crate::error::StorageError;

/// Staging area for load packages, wrapping object_store.
#[derive(Debug)]
pub enum StorageBackend {
    Local(LocalBackend),
    S3(S3Backend),
}

impl StorageBackend {
    /// Object store destinations stage straight into the bucket; warehouse
    /// destinations stage under the local staging directory.
    pub fn for_destination(destination: Destination, config: &Config) -> Result<Self, StorageError> {
        match destination {
            Destination::Filesystem => Ok(StorageBackend::S3(S3Backend::new(&config.aws)?)),
            Destination::Duckdb | Destination::Clickhouse => {
                Ok(StorageBackend::Local(LocalBackend::new(&config.storage.staging_dir)?))
            }
        }
    }

    pub fn store(&self) -> &dyn ObjectStore {
        match self {
            StorageBackend::Local(b) => b.store.as_ref(),
            StorageBackend::S3(b) => b.store.as_ref(),
        }
    }

    pub fn is_remote(&self) -> bool {
        matches!(self, StorageBackend::S3(_))
    }

    /// Key prefix inside the bucket (empty for local staging).
    pub fn prefix(&self) -> &str {
        match self {
            StorageBackend::Local(_) => "",
            StorageBackend::S3(b) => &b.prefix,
        }
    }

    /// Object path for a `/`-separated key relative to the prefix.
    pub fn path(&self, key: &str) -> object_store::path::Path {
        let prefix = self.prefix();
        if prefix.is_empty() {
            object_store::path::Path::from(key)
        } else {
            object_store::path::Path::from(format!("{prefix}/{key}"))
        }
    }

    /// Human-readable location of a key, for logs and the load summary.
    pub fn display_location(&self, key: &str) -> String {
        match self {
            StorageBackend::Local(b) => b.staging_dir.join(key).display().to_string(),
            StorageBackend::S3(b) => format!("s3://{}/{}", b.bucket, self.path(key)),
        }
    }
}

/// Local filesystem staging directory.
pub struct LocalBackend {
    pub store: Arc<dyn ObjectStore>,
    pub staging_dir: PathBuf,
}

impl LocalBackend {
    /// Creates the directory if needed.
    pub fn new(staging_dir: &Path) -> Result<Self, StorageError> {
        std::fs::create_dir_all(staging_dir)?;
        let canonical = std::fs::canonicalize(staging_dir)?;
        let store = LocalFileSystem::new_with_prefix(&canonical)?;
        info!("Staging: local backend at {}", canonical.display());
        Ok(Self {
            store: Arc::new(store),
            staging_dir: canonical,
        })
    }
}

impl std::fmt::Debug for LocalBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LocalBackend")
            .field("staging_dir", &self.staging_dir)
            .finish()
    }
}

/// S3 bucket staging.
pub struct S3Backend {
    pub store: Arc<dyn ObjectStore>,
    pub bucket: String,
    pub prefix: String,
}

impl S3Backend {
    pub fn new(aws: &AwsConfig) -> Result<Self, StorageError> {
        let bucket = aws
            .s3_bucket
            .as_deref()
            .ok_or_else(|| StorageError::NotConfigured("S3_BUCKET not set".into()))?;

        let mut builder = AmazonS3Builder::new().with_region(&aws.region);

        if let Some(ref key) = aws.access_key_id {
            builder = builder.with_access_key_id(key);
        }
        if let Some(ref secret) = aws.secret_access_key {
            builder = builder.with_secret_access_key(secret);
        }
        if let Some(ref token) = aws.session_token {
            builder = builder.with_token(token);
        }

        match aws.endpoint_url.as_deref().filter(|e| !e.is_empty()) {
            Some(endpoint) => {
                // object_store requires absolute endpoint URLs
                let endpoint_url = if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
                    endpoint.to_string()
                } else {
                    format!("https://{}", endpoint)
                };
                builder = builder
                    .with_bucket_name(bucket)
                    .with_endpoint(&endpoint_url)
                    .with_allow_http(endpoint_url.starts_with("http://"));
            }
            None => {
                builder = builder.with_url(format!("s3://{}", bucket));
            }
        }

        let store = builder.build()?;

        let prefix = aws
            .s3_prefix
            .as_deref()
            .unwrap_or("")
            .trim_matches('/')
            .to_string();

        info!(
            "Staging: S3 backend s3://{}/{} (region: {})",
            bucket, prefix, aws.region
        );

        Ok(Self {
            store: Arc::new(store),
            bucket: bucket.to_string(),
            prefix,
        })
    }
}

impl std::fmt::Debug for S3Backend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3Backend")
            .field("bucket", &self.bucket)
            .field("prefix", &self.prefix)
            .finish()
    }
}
