use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use clap::{Parser, Subcommand};

use tripdata_core::{Destination, TripCategory};

pub const DEFAULT_PIPELINE_NAME: &str = "nyc_trip_data_ingestion";
pub const DEFAULT_DATASET_NAME: &str = "nyc";

/// Load NYC TLC trip records into a staged load package.
///
/// Probes the monthly parquet files for the requested categories and period,
/// streams every file that exists in fixed-size batches, and stages them for
/// the destination warehouse.
#[derive(Parser, Debug)]
#[command(name = "tripdata", version, about)]
pub struct CliArgs {
    /// Debug logging, and a timestamp suffix on the dataset name
    #[arg(long)]
    pub debug: bool,

    /// Destination: duckdb, clickhouse, or s3
    #[arg(long, default_value = "duckdb")]
    pub destination: Destination,

    #[arg(long, default_value = DEFAULT_PIPELINE_NAME)]
    pub pipeline_name: String,

    #[arg(long, default_value = DEFAULT_DATASET_NAME)]
    pub dataset_name: String,

    /// Stage at most this many (category, month) resources
    #[arg(long)]
    pub max_items: Option<usize>,

    /// Rows per batch (overrides TLC_BATCH_SIZE)
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub batch_size: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a source
    Run {
        #[command(subcommand)]
        source: SourceCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum SourceCommand {
    /// NYC TLC trip records
    Nyc {
        /// Trip categories: yellow, green, fhv, fhvhv
        #[arg(required = true, num_args = 1..)]
        categories: Vec<TripCategory>,

        /// Inclusive start (RFC 3339 or YYYY-MM-DD)
        #[arg(value_parser = parse_instant)]
        start: DateTime<Utc>,

        /// Exclusive end; defaults to the start of the current month
        #[arg(long, value_parser = parse_instant)]
        end: Option<DateTime<Utc>>,
    },
}

/// RFC 3339 instant, or a bare date taken as UTC midnight.
pub fn parse_instant(raw: &str) -> Result<DateTime<Utc>, String> {
    let raw = raw.trim();
    if let Ok(instant) = DateTime::parse_from_rfc3339(raw) {
        return Ok(instant.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|date| date.and_time(NaiveTime::MIN).and_utc())
        .map_err(|_| format!("expected RFC 3339 or YYYY-MM-DD, got '{raw}'"))
}
