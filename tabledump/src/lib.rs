//! Command-line front end for tabledump.
//!
//! Loads a table store from a seed file, then dumps all tables, dumps one
//! table, or lists table metadata. The binary in `main.rs` only parses
//! arguments, sets up logging and calls [`run`].

pub mod commands;
pub mod output;
pub mod seed;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Args, Parser, Subcommand};
use tabledump_core::{DumpConfig, ExtractionConfig, MemoryStore, OutputFormat, Result};
use tracing::{error, warn};

use crate::commands::{DumpOutcome, dump_all, dump_one, format_listing, list_tables};

/// Exit code for a single-table dump whose table does not exist
pub const EXIT_NOT_FOUND: u8 = 2;

#[derive(Debug, Parser)]
#[command(name = "tabledump")]
#[command(about = "Snapshot a live key/value table store to disk")]
#[command(version)]
#[command(long_about = "
tabledump - point-in-time snapshots of live key/value tables

Tables may be created, resized, written or deleted while a dump runs. A
table that disappears or becomes private mid-dump is recorded in the report
with its failure reason instead of aborting the dump.

EXAMPLES:
  tabledump --seed tables.json dump-all
  tabledump --seed tables.json dump-one cache --format json
  tabledump --seed tables.json list
")]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// JSON seed file describing the tables to load
    #[arg(long, global = true, env = "TABLEDUMP_SEED", value_name = "FILE")]
    pub seed: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Dump every live table into one report
    DumpAll(OutputArgs),
    /// Dump a single table by name or id
    DumpOne {
        /// Table name, or id such as `#Tid<3>` or `3`
        table: String,

        #[command(flatten)]
        output: OutputArgs,
    },
    /// List live tables without reading their content
    List,
}

#[derive(Debug, Clone, Args)]
pub struct OutputArgs {
    /// Directory for report files
    #[arg(
        short,
        long,
        env = "TABLEDUMP_OUTPUT_DIR",
        default_value = tabledump_core::config::DEFAULT_OUTPUT_DIR
    )]
    pub output_dir: PathBuf,

    /// Report format (text or json)
    #[arg(short, long, env = "TABLEDUMP_FORMAT", default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,

    /// Extract tables on parallel worker threads
    #[arg(long)]
    pub parallel: bool,

    /// Maximum tables extracted at once with --parallel
    #[arg(long, default_value_t = tabledump_core::config::DEFAULT_MAX_PARALLEL)]
    pub max_parallel: usize,

    /// Compress output using Zstandard (.zst)
    #[arg(long)]
    pub compress: bool,
}

impl OutputArgs {
    /// Builds the dump configuration for these flags.
    pub fn to_config(&self) -> DumpConfig {
        DumpConfig::new()
            .with_output_dir(self.output_dir.clone())
            .with_format(self.format)
            .with_compress(self.compress)
            .with_extraction(
                ExtractionConfig::new()
                    .with_parallel(self.parallel)
                    .with_max_parallel(self.max_parallel),
            )
    }
}

#[derive(Debug, Args)]
pub struct GlobalArgs {
    /// Increase verbosity
    #[arg(
        short,
        long,
        global = true,
        action = clap::ArgAction::Count,
        help = "Increase verbosity (-v, -vv)"
    )]
    pub verbose: u8,

    /// Suppress output
    #[arg(short, long, global = true, help = "Suppress all output except errors")]
    pub quiet: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    pub log_json: bool,
}

/// Builds the store the commands run against.
///
/// # Errors
/// Returns `TableDumpError::Configuration` if the seed file cannot be loaded.
pub async fn open_store(seed: Option<&std::path::Path>) -> Result<MemoryStore> {
    match seed {
        Some(path) => Ok(seed::load_seed(path).await?),
        None => {
            warn!("no seed file given; dumping an empty store");
            Ok(MemoryStore::new())
        }
    }
}

/// Runs a parsed command line.
///
/// # Errors
/// Returns any fatal, configuration or sink error. A missing table for
/// `dump-one` is not an error; it yields [`EXIT_NOT_FOUND`].
pub async fn run(cli: Cli) -> Result<ExitCode> {
    let store = open_store(cli.seed.as_deref()).await?;

    match cli.command {
        Command::DumpAll(output) => {
            let outcome = dump_all(&store, &output.to_config()).await?;
            Ok(report_outcome(&outcome))
        }
        Command::DumpOne { table, output } => {
            let outcome = dump_one(&store, &table, &output.to_config()).await?;
            Ok(report_outcome(&outcome))
        }
        Command::List => {
            let descriptors = list_tables(&store)?;
            print!("{}", format_listing(&descriptors));
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Turns the result of [`run`] into the process exit code.
///
/// Errors are logged once here and map to `ExitCode::FAILURE`; they are
/// not returned from `main`, which would print them a second time.
pub fn finish(result: Result<ExitCode>) -> ExitCode {
    match result {
        Ok(code) => code,
        Err(e) => {
            error!("{e}");
            if e.is_fatal() {
                error!("table registry is unreachable; no report was produced");
            }
            ExitCode::FAILURE
        }
    }
}

fn report_outcome(outcome: &DumpOutcome) -> ExitCode {
    match outcome {
        DumpOutcome::Written { path, table_count } => {
            println!("Dumped {table_count} table(s) to {}", path.display());
            ExitCode::SUCCESS
        }
        DumpOutcome::NotFound { table } => {
            eprintln!("Table not found: {table}");
            ExitCode::from(EXIT_NOT_FOUND)
        }
    }
}
