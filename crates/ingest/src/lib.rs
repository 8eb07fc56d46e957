//! Ingestion source for the monthly TLC trip record files.
//!
//! Flow: [`plan::plan_tasks`] expands categories × months into probe tasks,
//! [`probe::ExistenceProber`] checks every file concurrently, and
//! [`resource::Assembler`] wraps each file that exists into a
//! [`resource::ResourceDescriptor`] whose rows are pulled lazily through a
//! [`stream::BatchStreamer`]. [`source::TripSource`] ties the steps together.

pub mod catalog;
pub mod error;
pub mod period;
pub mod plan;
pub mod probe;
pub mod reader;
pub mod resource;
pub mod source;
pub mod store;
pub mod stream;

pub use catalog::{catalog, CatalogEntry, SchemaContract};
pub use error::IngestError;
pub use period::Period;
pub use plan::{plan_tasks, ProbeTag, ProbeTask};
pub use probe::{ExistenceProber, Probe, ProbeError, ProbeMetadata, ProbeResponse};
pub use resource::{limit_resources, Assembler, ResourceDescriptor, TableHints};
pub use source::{SourceOptions, TripSource};
pub use store::RemoteStore;
pub use stream::BatchStreamer;
