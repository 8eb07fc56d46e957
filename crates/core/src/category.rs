//! Enumerations shared by every crate in the workspace.
//!
//! All of them round-trip through their lowercase wire value, which is what
//! ends up in file names, table names, HTTP headers and load manifests.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::TripdataError;

/// TLC trip record category. Each category is published as its own monthly
/// parquet file and loaded into its own table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TripCategory {
    /// Yellow medallion taxis.
    Yellow,
    /// Green street-hail livery vehicles.
    Green,
    /// For-hire vehicles.
    Fhv,
    /// High-volume for-hire vehicles.
    Fhvhv,
}

impl TripCategory {
    pub const ALL: [TripCategory; 4] = [
        TripCategory::Yellow,
        TripCategory::Green,
        TripCategory::Fhv,
        TripCategory::Fhvhv,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            TripCategory::Yellow => "yellow",
            TripCategory::Green => "green",
            TripCategory::Fhv => "fhv",
            TripCategory::Fhvhv => "fhvhv",
        }
    }
}

impl fmt::Display for TripCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TripCategory {
    type Err = TripdataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "yellow" => Ok(TripCategory::Yellow),
            "green" => Ok(TripCategory::Green),
            "fhv" => Ok(TripCategory::Fhv),
            "fhvhv" => Ok(TripCategory::Fhvhv),
            other => Err(TripdataError::UnknownCategory(other.to_string())),
        }
    }
}

/// Where the downstream pipeline runner loads the staged data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Destination {
    /// Embedded analytical store.
    #[default]
    Duckdb,
    /// Columnar warehouse; needs an explicit table engine hint.
    Clickhouse,
    /// Object store (S3 or a local directory).
    #[serde(rename = "s3", alias = "filesystem")]
    Filesystem,
}

impl Destination {
    pub fn as_str(&self) -> &'static str {
        match self {
            Destination::Duckdb => "duckdb",
            Destination::Clickhouse => "clickhouse",
            Destination::Filesystem => "s3",
        }
    }

    /// Whether tables on this destination must carry a storage engine hint.
    pub fn requires_table_engine(&self) -> bool {
        matches!(self, Destination::Clickhouse)
    }
}

impl fmt::Display for Destination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Destination {
    type Err = TripdataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "duckdb" => Ok(Destination::Duckdb),
            "clickhouse" | "ch" => Ok(Destination::Clickhouse),
            "s3" | "filesystem" => Ok(Destination::Filesystem),
            other => Err(TripdataError::UnknownDestination(other.to_string())),
        }
    }
}

/// How the destination applies a resource to its table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WriteDisposition {
    /// Upsert keyed on the category identity key.
    #[default]
    Merge,
    /// Insert without deduplication.
    Append,
    /// Truncate the table, then insert.
    Replace,
}

impl WriteDisposition {
    pub fn as_str(&self) -> &'static str {
        match self {
            WriteDisposition::Merge => "merge",
            WriteDisposition::Append => "append",
            WriteDisposition::Replace => "replace",
        }
    }
}

impl fmt::Display for WriteDisposition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WriteDisposition {
    type Err = TripdataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge" => Ok(WriteDisposition::Merge),
            "append" => Ok(WriteDisposition::Append),
            "replace" => Ok(WriteDisposition::Replace),
            other => Err(TripdataError::UnknownWriteDisposition(other.to_string())),
        }
    }
}

/// Storage engine hint for clustered warehouse destinations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableEngine {
    #[default]
    MergeTree,
    ReplicatedMergeTree,
}

impl TableEngine {
    pub fn as_str(&self) -> &'static str {
        match self {
            TableEngine::MergeTree => "merge_tree",
            TableEngine::ReplicatedMergeTree => "replicated_merge_tree",
        }
    }
}

impl fmt::Display for TableEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TableEngine {
    type Err = TripdataError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "merge_tree" => Ok(TableEngine::MergeTree),
            "replicated_merge_tree" => Ok(TableEngine::ReplicatedMergeTree),
            other => Err(TripdataError::UnknownTableEngine(other.to_string())),
        }
    }
}
