//! Remote file store backends, selected by the base URL scheme.

use std::fs::File;

use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, CONTENT_LENGTH, ETAG, LAST_MODIFIED};
use tracing::info;
use url::Url;

use tripdata_core::config::SourceConfig;

use crate::error::IngestError;
use crate::plan::ProbeTask;
use crate::probe::{Probe, ProbeError, ProbeMetadata, CATEGORY_HEADER, DATE_HEADER};
use crate::reader::{HttpRangeReader, ObjectReader};

/// Where the monthly files live. Cheap to clone; the HTTP variant shares
/// one connection pool across probes and readers.
#[derive(Debug, Clone)]
pub enum RemoteStore {
    Http(Client),
    /// A `file://` mirror of the remote directory.
    Local,
}

impl RemoteStore {
    pub fn for_base(base: &Url, config: &SourceConfig) -> Result<Self, IngestError> {
        match base.scheme() {
            "http" | "https" => {
                let client = Client::builder()
                    .timeout(config.request_timeout)
                    .connect_timeout(config.connect_timeout)
                    .tcp_nodelay(true)
                    .build()
                    .map_err(|e| IngestError::Client(e.to_string()))?;
                info!(base = %base, timeout_secs = config.request_timeout.as_secs(), "Remote store: HTTP");
                Ok(RemoteStore::Http(client))
            }
            "file" => {
                info!(base = %base, "Remote store: local mirror");
                Ok(RemoteStore::Local)
            }
            other => Err(IngestError::BaseUrl {
                url: base.to_string(),
                reason: format!("unsupported scheme '{other}'"),
            }),
        }
    }

    /// Open a probed file for columnar reads.
    pub fn open(&self, meta: &ProbeMetadata) -> Result<ObjectReader, IngestError> {
        let failure = |reason: String| IngestError::StreamRead {
            locator: meta.locator.to_string(),
            reason,
        };
        match self {
            RemoteStore::Http(client) => {
                let len = meta
                    .content_length
                    .ok_or_else(|| failure("server did not report a content length".to_string()))?;
                Ok(ObjectReader::Http(HttpRangeReader::new(
                    client.clone(),
                    meta.locator.clone(),
                    len,
                )))
            }
            RemoteStore::Local => {
                let path = meta
                    .locator
                    .to_file_path()
                    .map_err(|_| failure("not a local path".to_string()))?;
                let file = File::open(&path).map_err(|e| failure(e.to_string()))?;
                Ok(ObjectReader::Local(file))
            }
        }
    }

    fn head(client: &Client, task: &ProbeTask) -> Result<ProbeMetadata, ProbeError> {
        let response = client
            .head(task.locator.clone())
            .header(CATEGORY_HEADER, task.tag.category.as_str())
            .header(DATE_HEADER, task.tag.month.format("%Y-%m-%d").to_string())
            .send()
            .map_err(|e| ProbeError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ProbeError::Status {
                status: status.as_u16(),
                url: task.locator.to_string(),
            });
        }

        let headers = response.headers();
        Ok(ProbeMetadata {
            locator: task.locator.clone(),
            content_length: header_str(headers, CONTENT_LENGTH.as_str()).and_then(|v| v.parse().ok()),
            last_modified: header_str(headers, LAST_MODIFIED.as_str()),
            etag: header_str(headers, ETAG.as_str()),
        })
    }

    fn stat(task: &ProbeTask) -> Result<ProbeMetadata, ProbeError> {
        let path = task
            .locator
            .to_file_path()
            .map_err(|_| ProbeError::NotAFile(task.locator.to_string()))?;
        let metadata = std::fs::metadata(&path)?;
        if !metadata.is_file() {
            return Err(ProbeError::NotAFile(path.display().to_string()));
        }
        let last_modified = metadata
            .modified()
            .ok()
            .map(|t| chrono::DateTime::<chrono::Utc>::from(t).to_rfc2822());
        Ok(ProbeMetadata {
            locator: task.locator.clone(),
            content_length: Some(metadata.len()),
            last_modified,
            etag: None,
        })
    }
}

impl Probe for RemoteStore {
    fn probe(&self, task: &ProbeTask) -> Result<ProbeMetadata, ProbeError> {
        match self {
            RemoteStore::Http(client) => Self::head(client, task),
            RemoteStore::Local => Self::stat(task),
        }
    }
}

fn header_str(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
