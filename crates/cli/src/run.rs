use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use tracing::info;

use tripdata_core::{Config, Destination, TripCategory};
use tripdata_ingest::period::default_end;
use tripdata_ingest::{limit_resources, Period, TripSource};
use tripdata_storage::{LoadInfo, StagingWriter, StorageBackend};

/// Settings of one `run nyc` invocation after CLI and config are merged.
#[derive(Debug, Clone)]
pub struct NycRun {
    pub pipeline_name: String,
    pub dataset_name: String,
    pub destination: Destination,
    pub max_items: Option<usize>,
    pub batch_size: Option<usize>,
    pub categories: Vec<TripCategory>,
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

/// Dev runs load into their own dataset so they never touch shared tables.
pub fn dataset_name(base: &str, debug: bool, now: DateTime<Utc>) -> String {
    if debug {
        format!("{}_{}", base, now.format("%Y%m%d%H%M%S"))
    } else {
        base.to_string()
    }
}

/// Resolve, stream and stage every available (category, month) resource.
pub fn nyc(run: &NycRun, config: &Config) -> Result<LoadInfo> {
    let end = run.end.unwrap_or_else(|| default_end(Utc::now()));
    let period = Period::new(run.start, end)?;

    let mut source_config = config.source.clone();
    if let Some(batch_size) = run.batch_size {
        source_config.batch_size = batch_size;
    }
    let source = TripSource::from_config(&source_config).context("failed to set up trip source")?;
    let resources = source.resources(&run.categories, &period)?;

    let backend = StorageBackend::for_destination(run.destination, config)
        .with_context(|| format!("failed to set up staging for {}", run.destination))?;
    let mut writer = StagingWriter::new(backend, &run.pipeline_name, &run.dataset_name, run.destination)?;
    info!(
        pipeline = %run.pipeline_name,
        dataset = %run.dataset_name,
        destination = %run.destination,
        load_id = %writer.load_id(),
        resources = resources.len(),
        max_items = ?run.max_items,
        "Starting load"
    );

    if run.destination.requires_table_engine() {
        info!(table_engine = %config.source.table_engine, "Tables carry a storage engine hint");
    }

    for resource in limit_resources(resources, run.max_items) {
        let name = resource.name.clone();
        writer
            .stage(resource)
            .with_context(|| format!("failed to stage {name}"))?;
    }

    let load_info = writer.finish().context("failed to write load manifest")?;
    info!(
        load_id = %load_info.load_id,
        rows = load_info.rows,
        manifest = %load_info.manifest,
        "{}",
        load_info
    );
    Ok(load_info)
}
