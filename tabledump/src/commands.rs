//! Command surface: dump everything, dump one table, list tables.
//!
//! Each command returns success, a not-found outcome (single-table dumps
//! only), or the underlying discovery, extraction or write error.

use std::fmt::Write as _;
use std::path::PathBuf;

use tabledump_core::{
    DumpConfig, Result, TableDescriptor, TableStore, discover_tables, dump_all as assemble_all,
    dump_single,
};
use tracing::{info, instrument, warn};

use crate::output::{save_report, save_snapshot};

/// Result of a dump command that ran to completion
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DumpOutcome {
    /// Report written to `path`
    Written { path: PathBuf, table_count: usize },
    /// No table matched; nothing was written
    NotFound { table: String },
}

/// Dumps every live table into one report file.
///
/// # Errors
/// Returns `TableDumpError::RegistryUnavailable` if discovery fails, or a
/// sink error if the report cannot be written.
#[instrument(skip_all)]
pub async fn dump_all<S: TableStore + ?Sized>(store: &S, config: &DumpConfig) -> Result<DumpOutcome> {
    config.validate()?;
    let report = assemble_all(store, &config.extraction)?;
    if report.failed_count() > 0 {
        warn!(
            failed = report.failed_count(),
            "some tables could not be captured"
        );
    }

    let path = save_report(&report, config).await?;
    info!(tables = report.table_count, path = %path.display(), "dump complete");
    Ok(DumpOutcome::Written {
        path,
        table_count: report.table_count,
    })
}

/// Dumps one table, looked up by name or id.
///
/// A missing table is an `Ok(DumpOutcome::NotFound)`, and no file is
/// written for it.
///
/// # Errors
/// Returns `TableDumpError::RegistryUnavailable` if the lookup cannot reach
/// the registry, or a sink error if the report cannot be written.
#[instrument(skip(store, config))]
pub async fn dump_one<S: TableStore + ?Sized>(
    store: &S,
    name_or_id: &str,
    config: &DumpConfig,
) -> Result<DumpOutcome> {
    config.validate()?;
    let snapshot = match dump_single(store, name_or_id) {
        Ok(snapshot) => snapshot,
        Err(e) if e.is_not_found() => {
            warn!(table = name_or_id, "table not found");
            return Ok(DumpOutcome::NotFound {
                table: name_or_id.to_string(),
            });
        }
        Err(e) => return Err(e),
    };

    let path = save_snapshot(&snapshot, name_or_id, config).await?;
    info!(path = %path.display(), "table dump complete");
    Ok(DumpOutcome::Written {
        path,
        table_count: 1,
    })
}

/// Lists live tables without reading any content.
///
/// # Errors
/// Returns `TableDumpError::RegistryUnavailable` if discovery fails.
pub fn list_tables<S: TableStore + ?Sized>(store: &S) -> Result<Vec<TableDescriptor>> {
    discover_tables(store)
}

/// Formats a table listing, one line per table.
pub fn format_listing(descriptors: &[TableDescriptor]) -> String {
    if descriptors.is_empty() {
        return "No tables found.\n".to_string();
    }

    let mut out = String::new();
    let _ = writeln!(
        out,
        "{:<12} {:<24} {:<17} {:>8} {:>10} {:<16} {:<10} COMPRESSED",
        "ID", "NAME", "KIND", "ENTRIES", "WORDS", "OWNER", "ACCESS"
    );
    for d in descriptors {
        let _ = writeln!(
            out,
            "{:<12} {:<24} {:<17} {:>8} {:>10} {:<16} {:<10} {}",
            d.id,
            d.name,
            d.kind.to_string(),
            d.entry_count,
            d.memory_words,
            d.owner,
            d.access_level.to_string(),
            d.compressed
        );
    }
    out
}
