//! Report rendering.
//!
//! The text layout is fixed: opening banner with title, capture time and
//! table count; one block per table (identity, size metrics, owner, access,
//! compression, then `Data:`); closing banner. At most
//! [`ENTRY_DISPLAY_LIMIT`] entries are printed per table, followed by a
//! trailer giving the number left out.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::error::{Result, TableDumpError};
use crate::models::{DumpReport, TableContent, TableSnapshot};

/// Maximum number of entries printed for one table
pub const ENTRY_DISPLAY_LIMIT: usize = 100;

const BANNER: &str =
    "================================================================================";
const RULE: &str =
    "--------------------------------------------------------------------------------";

/// Renders a full dump as text.
pub fn render(report: &DumpReport) -> String {
    ReportView {
        title: "TABLE DUMP REPORT",
        captured_at: report.captured_at,
        tables: &report.tables,
    }
    .to_string()
}

/// Renders one snapshot with the same layout as a one-table report.
pub fn render_single(snapshot: &TableSnapshot) -> String {
    ReportView {
        title: "TABLE DUMP",
        captured_at: snapshot.captured_at,
        tables: std::slice::from_ref(snapshot),
    }
    .to_string()
}

/// Renders a full dump as pretty-printed JSON.
///
/// # Errors
/// Returns `TableDumpError::Serialization` if the report cannot be encoded.
pub fn render_json(report: &DumpReport) -> Result<String> {
    serde_json::to_string_pretty(report)
        .map_err(|e| TableDumpError::serialization("encoding dump report", e))
}

struct ReportView<'a> {
    title: &'static str,
    captured_at: DateTime<Utc>,
    tables: &'a [TableSnapshot],
}

impl fmt::Display for ReportView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{BANNER}")?;
        writeln!(f, "{}", self.title)?;
        writeln!(
            f,
            "Captured at: {}",
            self.captured_at.to_rfc3339_opts(SecondsFormat::Micros, true)
        )?;
        writeln!(f, "Tables: {}", self.tables.len())?;
        writeln!(f, "{BANNER}")?;

        for snapshot in self.tables {
            writeln!(f)?;
            write!(f, "{}", SnapshotView(snapshot))?;
        }

        writeln!(f)?;
        writeln!(f, "{BANNER}")?;
        writeln!(f, "END OF REPORT")?;
        writeln!(f, "{BANNER}")
    }
}

struct SnapshotView<'a>(&'a TableSnapshot);

impl fmt::Display for SnapshotView<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let d = &self.0.descriptor;
        writeln!(f, "{RULE}")?;
        writeln!(f, "ID: {}", d.id)?;
        writeln!(f, "Name: {}", d.name)?;
        writeln!(f, "Kind: {}", d.kind)?;
        writeln!(f, "Entries: {}", d.entry_count)?;
        writeln!(f, "Memory (words): {}", d.memory_words)?;
        writeln!(f, "Owner: {}", d.owner)?;
        writeln!(f, "Access: {}", d.access_level)?;
        writeln!(f, "Compressed: {}", d.compressed)?;
        writeln!(f, "Data:")?;

        match &self.0.content {
            TableContent::Failed(reason) => writeln!(f, "  ERROR: {reason}"),
            TableContent::Entries(entries) if entries.is_empty() => {
                writeln!(f, "  (empty table)")
            }
            TableContent::Entries(entries) => {
                for (n, entry) in (1usize..).zip(entries.iter().take(ENTRY_DISPLAY_LIMIT)) {
                    writeln!(f, "  {n}. {entry}")?;
                }
                let omitted = entries.len().saturating_sub(ENTRY_DISPLAY_LIMIT);
                if omitted > 0 {
                    writeln!(f, "  ... {omitted} more entries truncated")?;
                }
                Ok(())
            }
        }
    }
}
