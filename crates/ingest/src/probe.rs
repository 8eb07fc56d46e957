//! Concurrent existence checks for planned files.
//!
//! Every task gets one metadata-only request. Requests run on a bounded
//! rayon pool and their outcomes are handed back in completion order, each
//! tagged with the (category, month) it belongs to. A failed probe never
//! affects its siblings and is never retried.

use std::sync::mpsc;
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;
use url::Url;

use crate::error::IngestError;
use crate::plan::{ProbeTag, ProbeTask};

/// Request header carrying the task's category.
pub const CATEGORY_HEADER: &str = "x-report-category";
/// Request header carrying the task's month as an ISO-8601 date.
pub const DATE_HEADER: &str = "x-report-date";

#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("HTTP status {status} for {url}")]
    Status { status: u16, url: String },

    #[error("transport error: {0}")]
    Transport(String),

    #[error("not a file: {0}")]
    NotAFile(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// What a successful probe learned about a file without reading it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeMetadata {
    pub locator: Url,
    pub content_length: Option<u64>,
    pub last_modified: Option<String>,
    pub etag: Option<String>,
}

/// One lightweight existence check against the remote file store.
pub trait Probe: Send + Sync {
    fn probe(&self, task: &ProbeTask) -> Result<ProbeMetadata, ProbeError>;
}

/// Outcome of one task, correlated by its tag rather than by position.
#[derive(Debug)]
pub struct ProbeResponse {
    pub tag: ProbeTag,
    pub outcome: Result<ProbeMetadata, ProbeError>,
}

/// Runs probes for a whole plan on a dedicated worker pool.
pub struct ExistenceProber {
    probe: Arc<dyn Probe>,
    pool: rayon::ThreadPool,
}

impl ExistenceProber {
    pub fn new(probe: Arc<dyn Probe>, workers: usize) -> Result<Self, IngestError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers.max(1))
            .thread_name(|i| format!("probe-{i}"))
            .build()?;
        Ok(Self { probe, pool })
    }

    pub fn workers(&self) -> usize {
        self.pool.current_num_threads()
    }

    /// Probe every task. Blocks until all probes finished, then yields the
    /// responses in the order they completed.
    pub fn run(&self, tasks: &[ProbeTask]) -> mpsc::IntoIter<ProbeResponse> {
        let (tx, rx) = mpsc::channel();
        let probe = &self.probe;

        self.pool.scope(|scope| {
            for task in tasks {
                let tx = tx.clone();
                scope.spawn(move |_| {
                    let outcome = probe.probe(task);
                    debug!(resource = %task.tag, ok = outcome.is_ok(), "probe finished");
                    tx.send(ProbeResponse {
                        tag: task.tag,
                        outcome,
                    })
                    .ok();
                });
            }
        });

        drop(tx);
        rx.into_iter()
    }
}
