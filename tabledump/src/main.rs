//! Table store dump tool.
//!
//! Snapshots every table (or one table) of a live key/value store into a
//! timestamped report file, or lists table metadata.

use std::process::ExitCode;

use clap::Parser;
use tabledump::{Cli, finish, run};
use tabledump_core::logging::{LogFormat, init_logging};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let format = if cli.global.log_json {
        LogFormat::Json
    } else {
        LogFormat::Text
    };
    if let Err(e) = init_logging(cli.global.verbose, cli.global.quiet, format) {
        eprintln!("Error: {e}");
        return ExitCode::FAILURE;
    }

    finish(run(cli).await)
}
