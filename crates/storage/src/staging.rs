//! Writes resource rows into a load package on the staging backend.
//!
//! Each batch pulled from a resource becomes one ZSTD parquet part under
//! `{dataset}/{table}/{load_id}/{YYYY-MM}/part-{n:05}.parquet`, so at most one
//! batch is held in memory. The row stream is read on the caller's thread;
//! only the object store writes run on the writer's runtime.

use std::time::Instant;

use arrow::record_batch::RecordBatch;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use parquet::arrow::ArrowWriter;
use parquet::basic::Compression;
use parquet::file::properties::WriterProperties;
use parquet::format::KeyValue;
use tokio::runtime::Runtime;
use tracing::{debug, info, warn};
use uuid::Uuid;

use tripdata_core::Destination;
use tripdata_ingest::ResourceDescriptor;

use crate::backend::StorageBackend;
use crate::error::StorageError;
use crate::manifest::{LoadInfo, LoadManifest, ResourceLoad};

pub struct StagingWriter {
    backend: StorageBackend,
    runtime: Runtime,
    pipeline_name: String,
    dataset_name: String,
    destination: Destination,
    load_id: String,
    started_at: DateTime<Utc>,
    loads: Vec<ResourceLoad>,
}

impl StagingWriter {
    pub fn new(
        backend: StorageBackend,
        pipeline_name: &str,
        dataset_name: &str,
        destination: Destination,
    ) -> Result<Self, StorageError> {
        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()?;
        let started_at = Utc::now();
        Ok(Self {
            backend,
            runtime,
            pipeline_name: pipeline_name.to_string(),
            dataset_name: dataset_name.to_string(),
            destination,
            load_id: new_load_id(started_at),
            started_at,
            loads: Vec::new(),
        })
    }

    pub fn load_id(&self) -> &str {
        &self.load_id
    }

    pub fn loads(&self) -> &[ResourceLoad] {
        &self.loads
    }

    pub fn part_key(&self, table_name: &str, month_label: &str, part: usize) -> String {
        format!(
            "{}/{}/{}/{}/part-{:05}.parquet",
            self.dataset_name, table_name, self.load_id, month_label, part
        )
    }

    /// Drain one resource into staged parts.
    ///
    /// A failing row stream is recorded on the resource and does not stop
    /// the load; a failing write to the backend does.
    pub fn stage(&mut self, resource: ResourceDescriptor) -> Result<&ResourceLoad, StorageError> {
        let start = Instant::now();
        let mut load = ResourceLoad::for_resource(&resource);
        let month_label = resource.tag.month_label();
        let contract = resource.schema;
        let mut schema_checked = false;

        for item in resource.rows {
            let batch = match item {
                Ok(batch) => batch,
                Err(e) => {
                    warn!(resource = %load.name, error = %e, "row stream failed, resource left incomplete");
                    load.error = Some(e.to_string());
                    break;
                }
            };

            if !schema_checked {
                let missing = contract.missing_fields(&batch.schema());
                if !missing.is_empty() {
                    debug!(resource = %load.name, missing = ?missing, "columns absent from file");
                }
                schema_checked = true;
            }

            let key = self.part_key(&load.table_name, &month_label, load.batches);
            let data = encode_part(&batch, &load.name, &self.load_id)?;
            let path = self.backend.path(&key);
            self.runtime
                .block_on(self.backend.store().put(&path, Bytes::from(data).into()))?;

            load.rows += batch.num_rows() as u64;
            load.batches += 1;
            load.parts.push(key);
        }

        info!(
            resource = %load.name,
            table = %load.table_name,
            write_disposition = %load.write_disposition,
            rows = load.rows,
            parts = load.parts.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Staged resource"
        );
        self.loads.push(load);
        Ok(&self.loads[self.loads.len() - 1])
    }

    /// Write the manifest and summarize the load.
    pub fn finish(self) -> Result<LoadInfo, StorageError> {
        let manifest = LoadManifest {
            pipeline_name: self.pipeline_name,
            dataset_name: self.dataset_name,
            destination: self.destination,
            load_id: self.load_id,
            started_at: self.started_at,
            finished_at: Utc::now(),
            resources: self.loads,
        };

        let key = LoadManifest::key(&manifest.dataset_name, &manifest.load_id);
        let path = self.backend.path(&key);
        let json = manifest.to_json()?;
        self.runtime
            .block_on(self.backend.store().put(&path, Bytes::from(json).into()))?;

        let location = self.backend.display_location(&key);
        debug!(manifest = %location, "wrote load manifest");
        Ok(LoadInfo::from_manifest(&manifest, location))
    }
}

/// Sortable by start time, unique across concurrent runs.
fn new_load_id(started_at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!("{}-{}", started_at.format("%Y%m%d%H%M%S"), &suffix[..8])
}

fn encode_part(batch: &RecordBatch, resource: &str, load_id: &str) -> Result<Vec<u8>, StorageError> {
    let props = WriterProperties::builder()
        .set_compression(Compression::ZSTD(Default::default()))
        .set_key_value_metadata(Some(vec![
            KeyValue::new("tripdata.resource".to_string(), Some(resource.to_string())),
            KeyValue::new("tripdata.load_id".to_string(), Some(load_id.to_string())),
        ]))
        .build();

    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, batch.schema(), Some(props))?;
    writer.write(batch)?;
    writer.close()?;
    Ok(buf)
}
