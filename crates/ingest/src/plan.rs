//! Expansion of a (categories × period) request into probe tasks.

use std::fmt;

use chrono::NaiveDate;
use url::Url;

use tripdata_core::TripCategory;

use crate::error::IngestError;
use crate::period::Period;

/// Correlation metadata of one (category, month) unit of work. Travels with
/// the probe request and comes back with its outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProbeTag {
    pub category: TripCategory,
    /// First day of the month.
    pub month: NaiveDate,
}

impl ProbeTag {
    /// `YYYY-MM`.
    pub fn month_label(&self) -> String {
        self.month.format("%Y-%m").to_string()
    }
}

/// The logical resource name, `category:YYYY-MM`.
impl fmt::Display for ProbeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.category, self.month.format("%Y-%m"))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeTask {
    pub tag: ProbeTag,
    /// `{category}_tripdata_{YYYY-MM}.parquet`
    pub file_name: String,
    pub locator: Url,
}

impl ProbeTask {
    fn new(category: TripCategory, month: NaiveDate, base: &Url) -> Result<Self, IngestError> {
        let tag = ProbeTag { category, month };
        let file_name = format!("{}_tripdata_{}.parquet", category, tag.month_label());
        let locator = base.join(&file_name).map_err(|e| IngestError::BaseUrl {
            url: base.to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self {
            tag,
            file_name,
            locator,
        })
    }
}

/// Parse the remote directory URL. A missing trailing slash is added so that
/// file names join under the directory instead of replacing its last segment.
pub fn base_url(raw: &str) -> Result<Url, IngestError> {
    let raw = raw.trim();
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{raw}/")
    };
    let url = Url::parse(&normalized).map_err(|e| IngestError::BaseUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.cannot_be_a_base() {
        return Err(IngestError::BaseUrl {
            url: raw.to_string(),
            reason: "not a directory-like url".to_string(),
        });
    }
    Ok(url)
}

/// Cartesian product of `categories` and the months of `period`, category
/// major. Repeated categories are planned once.
pub fn plan_tasks(
    categories: &[TripCategory],
    period: &Period,
    base: &Url,
) -> Result<Vec<ProbeTask>, IngestError> {
    if categories.is_empty() {
        return Err(IngestError::NoCategories);
    }

    let mut unique: Vec<TripCategory> = Vec::with_capacity(categories.len());
    for category in categories {
        if !unique.contains(category) {
            unique.push(*category);
        }
    }

    let months = period.months();
    let mut tasks = Vec::with_capacity(unique.len() * months.len());
    for category in unique {
        for month in &months {
            tasks.push(ProbeTask::new(category, *month, base)?);
        }
    }
    Ok(tasks)
}
