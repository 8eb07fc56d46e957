//! Resource descriptors handed to the pipeline runner.

use serde::Serialize;
use tracing::debug;

use tripdata_core::{TableEngine, TripCategory, WriteDisposition};

use crate::catalog::{catalog, SchemaContract};
use crate::plan::{ProbeTag, ProbeTask};
use crate::probe::ProbeMetadata;
use crate::store::RemoteStore;
use crate::stream::BatchStreamer;

pub const FILE_FORMAT: &str = "parquet";

/// Destination-specific table settings attached outside the row path.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TableHints {
    pub table_engine: Option<TableEngine>,
}

/// One (category, month) unit of work: where its rows go, how they merge,
/// and a lazy source for the rows themselves.
#[derive(Debug)]
pub struct ResourceDescriptor {
    /// `category:YYYY-MM`, unique within a run.
    pub name: String,
    pub table_name: String,
    pub identity_key: Vec<String>,
    pub write_disposition: WriteDisposition,
    pub file_format: &'static str,
    pub schema: SchemaContract,
    pub hints: TableHints,
    pub tag: ProbeTag,
    pub rows: BatchStreamer,
}

impl ResourceDescriptor {
    pub fn category(&self) -> TripCategory {
        self.tag.category
    }
}

/// Builds descriptors from successful probes. Performs no I/O.
#[derive(Debug, Clone)]
pub struct Assembler {
    store: RemoteStore,
    batch_size: usize,
    write_disposition: WriteDisposition,
    table_engine: TableEngine,
}

impl Assembler {
    pub fn new(
        store: RemoteStore,
        batch_size: usize,
        write_disposition: WriteDisposition,
        table_engine: TableEngine,
    ) -> Self {
        Self {
            store,
            batch_size,
            write_disposition,
            table_engine,
        }
    }

    pub fn assemble(&self, task: &ProbeTask, meta: ProbeMetadata) -> ResourceDescriptor {
        let entry = catalog(task.tag.category);
        let write_disposition = effective_disposition(self.write_disposition, entry.identity_key);
        if write_disposition != self.write_disposition {
            debug!(
                resource = %task.tag,
                requested = %self.write_disposition,
                effective = %write_disposition,
                "category has no identity key, merge degrades to append"
            );
        }

        let resource = ResourceDescriptor {
            name: task.tag.to_string(),
            table_name: task.tag.category.as_str().to_string(),
            identity_key: entry.identity_key.iter().map(|k| k.to_string()).collect(),
            write_disposition,
            file_format: FILE_FORMAT,
            schema: entry.schema,
            hints: TableHints::default(),
            tag: task.tag,
            rows: BatchStreamer::new(self.store.clone(), meta, self.batch_size),
        };
        with_table_engine(resource, self.table_engine)
    }
}

/// A merge without key columns has nothing to deduplicate on.
fn effective_disposition(requested: WriteDisposition, identity_key: &[&str]) -> WriteDisposition {
    match requested {
        WriteDisposition::Merge if identity_key.is_empty() => WriteDisposition::Append,
        other => other,
    }
}

/// Attach the storage engine hint clustered warehouses need. Rows are untouched.
pub fn with_table_engine(mut resource: ResourceDescriptor, engine: TableEngine) -> ResourceDescriptor {
    resource.hints.table_engine = Some(engine);
    resource
}

/// Hard ceiling on the number of resources handed downstream.
pub fn limit_resources<I>(resources: I, max_items: Option<usize>) -> impl Iterator<Item = ResourceDescriptor>
where
    I: IntoIterator<Item = ResourceDescriptor>,
{
    resources.into_iter().take(max_items.unwrap_or(usize::MAX))
}
