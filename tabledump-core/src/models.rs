//! Core data models for table snapshots.
//!
//! A [`TableDescriptor`] is captured at discovery time, folded into a
//! [`TableSnapshot`] by extraction, and snapshots are collected into a
//! [`DumpReport`]. All models are serializable so the same report can be
//! rendered as text or JSON.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::value::EntryValue;

/// Report format version written to JSON output
pub const FORMAT_VERSION: &str = "1.0";

/// Live reference to a table in the host store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TableHandle(pub u64);

impl TableHandle {
    /// Placeholder for a table whose handle could not be learned; stores
    /// never issue it.
    pub const UNRESOLVED: Self = Self(0);
}

impl fmt::Display for TableHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#Tid<{}>", self.0)
    }
}

impl FromStr for TableHandle {
    type Err = std::num::ParseIntError;

    /// Accepts both the display form `#Tid<42>` and a bare `42`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let digits = trimmed
            .strip_prefix("#Tid<")
            .and_then(|rest| rest.strip_suffix('>'))
            .unwrap_or(trimmed);
        digits.parse().map(Self)
    }
}

/// Whether duplicate keys are permitted and whether iteration order is defined
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    /// One entry per key, iterated in key order
    UniqueOrdered,
    /// One entry per key, no defined order
    UniqueUnordered,
    /// Duplicate keys allowed, iterated in key order
    MultiOrdered,
    /// Duplicate keys allowed, no defined order
    MultiUnordered,
}

impl TableKind {
    /// Returns true when a key may appear only once.
    pub const fn is_unique(self) -> bool {
        matches!(self, Self::UniqueOrdered | Self::UniqueUnordered)
    }

    /// Returns true when iteration follows key order.
    pub const fn is_ordered(self) -> bool {
        matches!(self, Self::UniqueOrdered | Self::MultiOrdered)
    }
}

impl fmt::Display for TableKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UniqueOrdered => write!(f, "unique_ordered"),
            Self::UniqueUnordered => write!(f, "unique_unordered"),
            Self::MultiOrdered => write!(f, "multi_ordered"),
            Self::MultiUnordered => write!(f, "multi_unordered"),
        }
    }
}

/// Readability gate for a table's content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AccessLevel {
    /// Anyone may read and write
    Public,
    /// Anyone may read, only the owner writes
    Protected,
    /// Only the owner may read or write
    Private,
}

impl AccessLevel {
    /// Returns true if a non-owner may read the table's content.
    pub const fn is_readable(self) -> bool {
        !matches!(self, Self::Private)
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public => write!(f, "public"),
            Self::Protected => write!(f, "protected"),
            Self::Private => write!(f, "private"),
        }
    }
}

/// Point-in-time metadata for one table.
///
/// Detached from the live table except for `handle`, which may already be
/// stale by the time it is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableDescriptor {
    /// Printable identifier, never used for re-lookup
    pub id: String,
    /// Live reference used to re-query the table
    pub handle: TableHandle,
    /// Symbolic name, or the handle's display form for anonymous tables
    pub name: String,
    pub kind: TableKind,
    /// Advisory entry count at discovery time
    pub entry_count: usize,
    /// Advisory memory footprint in words at discovery time
    pub memory_words: usize,
    /// Display form of the owning execution unit
    pub owner: String,
    pub access_level: AccessLevel,
    pub compressed: bool,
}

impl TableDescriptor {
    /// Descriptor for a table that exists but whose metadata is restricted.
    ///
    /// Only the requested name and handle are known; sizes are zero, the
    /// owner is `unknown` and the access level is `Private`.
    pub fn restricted(requested: &str, handle: TableHandle) -> Self {
        Self {
            id: if handle == TableHandle::UNRESOLVED {
                requested.to_string()
            } else {
                handle.to_string()
            },
            handle,
            name: requested.to_string(),
            kind: TableKind::UniqueUnordered,
            entry_count: 0,
            memory_words: 0,
            owner: "unknown".to_string(),
            access_level: AccessLevel::Private,
            compressed: false,
        }
    }
}

/// Why a table's content could not be captured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFailure {
    /// Table no longer exists
    Deleted,
    /// Table is private to its owner
    AccessDenied,
    /// Any other store-reported failure
    Other(String),
}

impl fmt::Display for ContentFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Deleted => write!(f, "DELETED"),
            Self::AccessDenied => write!(f, "ACCESS_DENIED"),
            Self::Other(reason) => write!(f, "{reason}"),
        }
    }
}

/// Captured content: every entry, or the reason none were captured.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum TableContent {
    /// Full content read in one pass
    Entries(Vec<EntryValue>),
    /// Content could not be read
    Failed(ContentFailure),
}

impl TableContent {
    /// Returns the failure reason, if any.
    pub const fn failure(&self) -> Option<&ContentFailure> {
        match self {
            Self::Entries(_) => None,
            Self::Failed(failure) => Some(failure),
        }
    }

    /// Returns the captured entries, if any.
    pub fn entries(&self) -> Option<&[EntryValue]> {
        match self {
            Self::Entries(entries) => Some(entries),
            Self::Failed(_) => None,
        }
    }
}

/// A descriptor plus its captured content
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TableSnapshot {
    #[serde(flatten)]
    pub descriptor: TableDescriptor,
    pub content: TableContent,
    /// Capture time of the dump that produced this snapshot
    pub captured_at: DateTime<Utc>,
}

impl TableSnapshot {
    /// Creates a snapshot with captured entries.
    pub fn with_entries(
        descriptor: TableDescriptor,
        entries: Vec<EntryValue>,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            descriptor,
            content: TableContent::Entries(entries),
            captured_at,
        }
    }

    /// Creates a snapshot recording a content failure.
    pub fn failed(
        descriptor: TableDescriptor,
        failure: ContentFailure,
        captured_at: DateTime<Utc>,
    ) -> Self {
        Self {
            descriptor,
            content: TableContent::Failed(failure),
            captured_at,
        }
    }

    /// Returns true if content was captured.
    pub const fn is_captured(&self) -> bool {
        matches!(self.content, TableContent::Entries(_))
    }
}

/// All snapshots of one dump, in discovery order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DumpReport {
    pub format_version: String,
    pub captured_at: DateTime<Utc>,
    pub table_count: usize,
    pub tables: Vec<TableSnapshot>,
}

impl DumpReport {
    /// Builds a report; `table_count` always matches `tables`.
    pub fn new(captured_at: DateTime<Utc>, tables: Vec<TableSnapshot>) -> Self {
        Self {
            format_version: FORMAT_VERSION.to_string(),
            captured_at,
            table_count: tables.len(),
            tables,
        }
    }

    /// Number of tables whose content could not be captured.
    pub fn failed_count(&self) -> usize {
        self.tables.iter().filter(|t| !t.is_captured()).count()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn descriptor(handle: u64, name: &str) -> TableDescriptor {
        TableDescriptor {
            id: TableHandle(handle).to_string(),
            handle: TableHandle(handle),
            name: name.to_string(),
            kind: TableKind::UniqueUnordered,
            entry_count: 0,
            memory_words: 300,
            owner: "worker-1".to_string(),
            access_level: AccessLevel::Public,
            compressed: false,
        }
    }

    #[test]
    fn test_handle_display_and_parse() {
        let handle = TableHandle(42);
        assert_eq!(handle.to_string(), "#Tid<42>");
        assert_eq!("#Tid<42>".parse::<TableHandle>(), Ok(handle));
        assert_eq!(" 42 ".parse::<TableHandle>(), Ok(handle));
        assert!("cache".parse::<TableHandle>().is_err());
        assert!("#Tid<x>".parse::<TableHandle>().is_err());
    }

    #[test]
    fn test_kind_flags() {
        assert!(TableKind::UniqueOrdered.is_unique());
        assert!(TableKind::UniqueOrdered.is_ordered());
        assert!(!TableKind::MultiUnordered.is_unique());
        assert!(!TableKind::UniqueUnordered.is_ordered());
        assert_eq!(TableKind::MultiOrdered.to_string(), "multi_ordered");
    }

    #[test]
    fn test_access_level_readability() {
        assert!(AccessLevel::Public.is_readable());
        assert!(AccessLevel::Protected.is_readable());
        assert!(!AccessLevel::Private.is_readable());
    }

    #[test]
    fn test_report_counts() {
        let now = Utc::now();
        let report = DumpReport::new(
            now,
            vec![
                TableSnapshot::with_entries(descriptor(1, "a"), Vec::new(), now),
                TableSnapshot::failed(descriptor(2, "b"), ContentFailure::Deleted, now),
            ],
        );

        assert_eq!(report.format_version, FORMAT_VERSION);
        assert_eq!(report.table_count, 2);
        assert_eq!(report.failed_count(), 1);
    }

    #[test]
    fn test_failure_display_uses_reason_tokens() {
        assert_eq!(ContentFailure::Deleted.to_string(), "DELETED");
        assert_eq!(ContentFailure::AccessDenied.to_string(), "ACCESS_DENIED");
        assert_eq!(
            ContentFailure::Other("lock timeout".to_string()).to_string(),
            "lock timeout"
        );
    }

    #[test]
    fn test_content_serialization_shape() {
        let failed = TableContent::Failed(ContentFailure::AccessDenied);
        assert_eq!(
            serde_json::to_value(&failed).unwrap(),
            serde_json::json!({"status": "failed", "data": "access_denied"})
        );

        let other = TableContent::Failed(ContentFailure::Other("lock timeout".to_string()));
        assert_eq!(
            serde_json::to_value(&other).unwrap(),
            serde_json::json!({"status": "failed", "data": {"other": "lock timeout"}})
        );

        let entries = TableContent::Entries(vec![EntryValue::Int(1)]);
        assert_eq!(
            serde_json::to_value(&entries).unwrap(),
            serde_json::json!({"status": "entries", "data": [{"int": 1}]})
        );
    }

    #[test]
    fn test_snapshot_serde_roundtrip() {
        let snapshot = TableSnapshot::with_entries(
            descriptor(7, "sessions"),
            vec![EntryValue::tuple([EntryValue::text("a"), EntryValue::Int(1)])],
            Utc::now(),
        );
        let json = serde_json::to_string(&snapshot).unwrap();
        let back: TableSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(back, snapshot);
    }
}
