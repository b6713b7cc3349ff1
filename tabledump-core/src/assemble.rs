//! Dump assembly.
//!
//! Folds descriptors into a [`DumpReport`] stamped with one capture time.
//! Each table is extracted independently; in parallel mode the work is
//! split into chunks of `max_parallel` scoped threads and joined back in
//! input order.

use std::thread;

use chrono::{DateTime, Utc};
use tracing::{error, info, instrument};

use crate::config::ExtractionConfig;
use crate::error::Result;
use crate::extract::extract;
use crate::models::{ContentFailure, DumpReport, TableDescriptor, TableSnapshot};
use crate::registry::discover_tables;
use crate::store::TableStore;

/// Extracts every descriptor and assembles the report.
///
/// Never fails: per-table problems are recorded in each snapshot.
/// `tables` in the result follows the order of `descriptors`.
pub fn assemble<S: TableStore + ?Sized>(
    store: &S,
    descriptors: Vec<TableDescriptor>,
    options: &ExtractionConfig,
) -> DumpReport {
    let captured_at = Utc::now();

    let tables = if options.parallel && descriptors.len() > 1 {
        extract_parallel(store, descriptors, options.max_parallel.max(1), captured_at)
    } else {
        descriptors
            .into_iter()
            .map(|descriptor| extract(store, descriptor, captured_at))
            .collect()
    };

    let report = DumpReport::new(captured_at, tables);
    info!(
        tables = report.table_count,
        failed = report.failed_count(),
        "assembled dump report"
    );
    report
}

fn extract_parallel<S: TableStore + ?Sized>(
    store: &S,
    descriptors: Vec<TableDescriptor>,
    max_parallel: usize,
    captured_at: DateTime<Utc>,
) -> Vec<TableSnapshot> {
    descriptors
        .chunks(max_parallel)
        .flat_map(|chunk| {
            thread::scope(|s| {
                let handles: Vec<_> = chunk
                    .iter()
                    .map(|descriptor| {
                        let descriptor = descriptor.clone();
                        s.spawn(move || extract(store, descriptor, captured_at))
                    })
                    .collect();

                handles
                    .into_iter()
                    .zip(chunk)
                    .map(|(handle, descriptor)| {
                        handle.join().unwrap_or_else(|_| {
                            error!(table = %descriptor.name, "extraction thread panicked");
                            TableSnapshot::failed(
                                descriptor.clone(),
                                ContentFailure::Other("extraction thread panicked".to_string()),
                                captured_at,
                            )
                        })
                    })
                    .collect::<Vec<_>>()
            })
        })
        .collect()
}

/// Discovers every live table and assembles a full dump.
///
/// # Errors
/// Returns `TableDumpError::RegistryUnavailable` if discovery fails. No
/// partial report is produced in that case.
#[instrument(skip(store, options))]
pub fn dump_all<S: TableStore + ?Sized>(store: &S, options: &ExtractionConfig) -> Result<DumpReport> {
    let descriptors = discover_tables(store)?;
    Ok(assemble(store, descriptors, options))
}
