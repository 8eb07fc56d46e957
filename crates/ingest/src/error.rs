use chrono::{DateTime, Utc};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestError {
    /// End instant not strictly after start. Raised before any network activity.
    #[error("invalid period: end {end} is not after start {start}")]
    InvalidPeriod {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },

    #[error("no trip categories requested")]
    NoCategories,

    #[error("invalid base url {url}: {reason}")]
    BaseUrl { url: String, reason: String },

    #[error("HTTP client error: {0}")]
    Client(String),

    #[error("thread pool error: {0}")]
    Pool(#[from] rayon::ThreadPoolBuildError),

    /// The columnar reader failed for a file that was confirmed to exist.
    #[error("stream read failure for {locator}: {reason}")]
    StreamRead { locator: String, reason: String },
}
