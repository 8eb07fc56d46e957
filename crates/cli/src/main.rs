mod cli;
mod logging;
mod run;

use anyhow::{bail, Result};
use chrono::Utc;
use clap::Parser;
use tracing::error;

use tripdata_core::config::load_dotenv;
use tripdata_core::Config;

use crate::cli::{CliArgs, Command, SourceCommand};
use crate::run::NycRun;

// Blocking HTTP client underneath; no async runtime at this level.
fn main() -> Result<()> {
    load_dotenv();
    let args = CliArgs::parse();
    let config = Config::from_env();
    logging::init(&config.logging, args.debug);
    config.log_summary();

    let Command::Run {
        source: SourceCommand::Nyc { categories, start, end },
    } = args.command;

    let request = NycRun {
        dataset_name: run::dataset_name(&args.dataset_name, args.debug, Utc::now()),
        pipeline_name: args.pipeline_name,
        destination: args.destination,
        max_items: args.max_items,
        batch_size: args.batch_size.map(|b| b as usize),
        categories,
        start,
        end,
    };

    let info = run::nyc(&request, &config)?;
    if info.has_failures() {
        error!(failed = ?info.failed, "some resources could not be read");
        bail!("{} of {} resources failed", info.failed.len(), info.resources);
    }
    Ok(())
}
