//! The `nyc` source: plans, probes, and assembles resources for a request.

use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info, warn};
use url::Url;

use tripdata_core::config::{SourceConfig, DEFAULT_BATCH_SIZE};
use tripdata_core::{TableEngine, TripCategory, WriteDisposition};

use crate::error::IngestError;
use crate::period::Period;
use crate::plan::{base_url, plan_tasks, ProbeTag, ProbeTask};
use crate::probe::{ExistenceProber, Probe};
use crate::resource::{Assembler, ResourceDescriptor};
use crate::store::RemoteStore;

/// Source identifier used in log fields.
pub const SOURCE_NAME: &str = "nyc";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceOptions {
    pub batch_size: usize,
    pub write_disposition: WriteDisposition,
    pub table_engine: TableEngine,
    /// Probe pool size, already resolved (never 0).
    pub probe_workers: usize,
}

impl SourceOptions {
    pub fn from_config(config: &SourceConfig) -> Self {
        Self {
            batch_size: config.batch_size,
            write_disposition: config.write_disposition,
            table_engine: config.table_engine,
            probe_workers: config.resolved_probe_workers(),
        }
    }
}

impl Default for SourceOptions {
    fn default() -> Self {
        Self::from_config(&SourceConfig::default())
    }
}

pub struct TripSource {
    store: RemoteStore,
    probe: Arc<dyn Probe>,
    base: Url,
    options: SourceOptions,
}

impl TripSource {
    pub fn from_config(config: &SourceConfig) -> Result<Self, IngestError> {
        let base = base_url(&config.base_url)?;
        let store = RemoteStore::for_base(&base, config)?;
        Ok(Self::new(store, base, SourceOptions::from_config(config)))
    }

    pub fn new(store: RemoteStore, base: Url, options: SourceOptions) -> Self {
        Self {
            probe: Arc::new(store.clone()),
            store,
            base,
            options,
        }
    }

    /// Replace the existence check while keeping the store for reads.
    pub fn with_probe(mut self, probe: Arc<dyn Probe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn options(&self) -> &SourceOptions {
        &self.options
    }

    pub fn base(&self) -> &Url {
        &self.base
    }

    /// Resolve every (category, month) of the request into a resource.
    ///
    /// Months whose file is missing or unreachable are logged and skipped;
    /// they never fail the call. Descriptors come back sorted by name. No
    /// row data is read here.
    pub fn resources(
        &self,
        categories: &[TripCategory],
        period: &Period,
    ) -> Result<Vec<ResourceDescriptor>, IngestError> {
        let names: Vec<&str> = categories.iter().map(|c| c.as_str()).collect();
        info!(
            source = SOURCE_NAME,
            period = %period,
            categories = %names.join(","),
            "Loading trip data"
        );

        let tasks = plan_tasks(categories, period, &self.base)?;
        let by_tag: HashMap<ProbeTag, &ProbeTask> = tasks.iter().map(|t| (t.tag, t)).collect();

        let prober = ExistenceProber::new(self.probe.clone(), self.options.probe_workers)?;
        debug!(tasks = tasks.len(), workers = prober.workers(), "probing remote files");

        let assembler = Assembler::new(
            self.store.clone(),
            batch_size_or_default(self.options.batch_size),
            self.options.write_disposition,
            self.options.table_engine,
        );

        let mut resources = Vec::with_capacity(tasks.len());
        let mut skipped = 0usize;
        for response in prober.run(&tasks) {
            match response.outcome {
                Ok(meta) => match by_tag.get(&response.tag) {
                    Some(task) => resources.push(assembler.assemble(task, meta)),
                    None => warn!(resource = %response.tag, "probe response for an unplanned task"),
                },
                Err(e) => {
                    skipped += 1;
                    warn!(
                        source = SOURCE_NAME,
                        resource = %response.tag,
                        error = %e,
                        "Resource {} failed to be fetched",
                        response.tag
                    );
                }
            }
        }

        resources.sort_by(|a, b| a.name.cmp(&b.name));
        info!(
            source = SOURCE_NAME,
            planned = tasks.len(),
            available = resources.len(),
            skipped,
            "Resolved trip data resources"
        );
        Ok(resources)
    }
}

fn batch_size_or_default(batch_size: usize) -> usize {
    if batch_size == 0 { DEFAULT_BATCH_SIZE } else { batch_size }
}
