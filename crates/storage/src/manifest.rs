//! Load package description written next to the staged parquet parts.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tripdata_core::{Destination, TableEngine, WriteDisposition};
use tripdata_ingest::ResourceDescriptor;

/// Everything the warehouse loader needs to apply one resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceLoad {
    pub name: String,
    pub table_name: String,
    pub identity_key: Vec<String>,
    pub write_disposition: WriteDisposition,
    pub file_format: String,
    pub table_engine: Option<TableEngine>,
    pub rows: u64,
    pub batches: usize,
    /// Staged part keys, relative to the backend prefix.
    pub parts: Vec<String>,
    /// Set when the row stream failed; the parts written so far are incomplete.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ResourceLoad {
    pub fn for_resource(resource: &ResourceDescriptor) -> Self {
        Self {
            name: resource.name.clone(),
            table_name: resource.table_name.clone(),
            identity_key: resource.identity_key.clone(),
            write_disposition: resource.write_disposition,
            file_format: resource.file_format.to_string(),
            table_engine: resource.hints.table_engine,
            rows: 0,
            batches: 0,
            parts: Vec::new(),
            error: None,
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadManifest {
    pub pipeline_name: String,
    pub dataset_name: String,
    pub destination: Destination,
    pub load_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub resources: Vec<ResourceLoad>,
}

impl LoadManifest {
    /// `{dataset}/_loads/{load_id}.json`
    pub fn key(dataset_name: &str, load_id: &str) -> String {
        format!("{dataset_name}/_loads/{load_id}.json")
    }

    pub fn to_json(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec_pretty(self)
    }
}

/// Summary of a finished load, logged by the caller.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LoadInfo {
    pub pipeline_name: String,
    pub dataset_name: String,
    pub destination: Destination,
    pub load_id: String,
    pub resources: usize,
    pub rows: u64,
    pub parts: usize,
    pub failed: Vec<String>,
    pub manifest: String,
}

impl LoadInfo {
    pub fn from_manifest(manifest: &LoadManifest, location: String) -> Self {
        Self {
            pipeline_name: manifest.pipeline_name.clone(),
            dataset_name: manifest.dataset_name.clone(),
            destination: manifest.destination,
            load_id: manifest.load_id.clone(),
            resources: manifest.resources.len(),
            rows: manifest.resources.iter().map(|r| r.rows).sum(),
            parts: manifest.resources.iter().map(|r| r.parts.len()).sum(),
            failed: manifest
                .resources
                .iter()
                .filter(|r| r.is_failed())
                .map(|r| r.name.clone())
                .collect(),
            manifest: location,
        }
    }

    pub fn has_failures(&self) -> bool {
        !self.failed.is_empty()
    }
}

impl fmt::Display for LoadInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Pipeline {} load {} to {} (dataset {}): {} resources, {} rows in {} parts",
            self.pipeline_name,
            self.load_id,
            self.destination,
            self.dataset_name,
            self.resources,
            self.rows,
            self.parts
        )?;
        if self.has_failures() {
            write!(f, ", failed: {}", self.failed.join(", "))?;
        }
        Ok(())
    }
}
