//! Seed file loading.
//!
//! The CLI has no live tables of its own, so it builds a [`MemoryStore`]
//! from a JSON seed file:
//!
//! ```json
//! {
//!   "tables": [
//!     {
//!       "name": "cache",
//!       "kind": "unique_unordered",
//!       "access": "public",
//!       "owner": "<0.120.0>",
//!       "entries": [["a", 1], ["b", 2]]
//!     }
//!   ]
//! }
//! ```
//!
//! A top-level array in `entries` is a tuple; nested arrays are lists.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use tabledump_core::{
    AccessLevel, EntryValue, MemoryStore, StoreError, TableDumpError, TableKind, TableOptions,
};
use thiserror::Error;
use tracing::{debug, info};

/// Seed loading failures
#[derive(Debug, Error)]
pub enum SeedError {
    /// Seed file could not be read
    #[error("Failed to read seed file '{}'", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Seed file is not valid seed JSON
    #[error("Invalid seed file: {source}")]
    Parse {
        #[from]
        source: serde_json::Error,
    },

    /// The store rejected a seeded table
    #[error("Failed to seed table '{table}': {source}")]
    Store {
        table: String,
        #[source]
        source: StoreError,
    },
}

impl From<SeedError> for TableDumpError {
    fn from(error: SeedError) -> Self {
        Self::configuration(error.to_string())
    }
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedFile {
    #[serde(default)]
    tables: Vec<SeedTable>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct SeedTable {
    #[serde(default)]
    name: Option<String>,
    kind: TableKind,
    #[serde(default = "default_access")]
    access: AccessLevel,
    #[serde(default = "default_owner")]
    owner: String,
    #[serde(default)]
    compressed: bool,
    #[serde(default)]
    entries: Vec<serde_json::Value>,
}

const fn default_access() -> AccessLevel {
    AccessLevel::Protected
}

fn default_owner() -> String {
    "seed".to_string()
}

/// Builds a store from seed JSON text.
///
/// # Errors
/// Returns `SeedError::Parse` for malformed JSON and `SeedError::Store` for
/// duplicate table names.
pub fn parse_seed(text: &str) -> Result<MemoryStore, SeedError> {
    let seed: SeedFile = serde_json::from_str(text)?;
    let store = MemoryStore::new();

    for table in seed.tables {
        let label = table.name.clone().unwrap_or_else(|| "<anonymous>".to_string());
        let mut options = TableOptions::new(table.kind)
            .with_access(table.access)
            .with_owner(table.owner)
            .with_compressed(table.compressed);
        if let Some(name) = table.name {
            options = options.with_name(name);
        }

        let handle = store.create_table(options).map_err(|source| SeedError::Store {
            table: label.clone(),
            source,
        })?;
        let entries = table.entries.into_iter().map(EntryValue::from_seed_entry);
        store
            .insert_many(handle, entries)
            .map_err(|source| SeedError::Store {
                table: label.clone(),
                source,
            })?;
        debug!(table = %label, %handle, "seeded table");
    }

    Ok(store)
}

/// Reads a seed file and builds a store from it.
///
/// # Errors
/// Returns `SeedError::Read` if the file cannot be read, otherwise as
/// [`parse_seed`].
pub async fn load_seed(path: &Path) -> Result<MemoryStore, SeedError> {
    let text = tokio::fs::read_to_string(path)
        .await
        .map_err(|source| SeedError::Read {
            path: path.to_path_buf(),
            source,
        })?;
    let store = parse_seed(&text)?;
    info!(
        path = %path.display(),
        tables = store.table_count(),
        "loaded seed file"
    );
    Ok(store)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use tabledump_core::{TableRef, TableStore};

    #[test]
    fn test_parse_seed_builds_tables() {
        let store = parse_seed(
            r#"{
                "tables": [
                    {
                        "name": "cache",
                        "kind": "unique_unordered",
                        "access": "public",
                        "owner": "<0.120.0>",
                        "entries": [["a", 1], ["b", 2]]
                    },
                    { "kind": "multi_ordered", "entries": [3, [1, [2, 3]]] }
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(store.table_count(), 2);
        let cache = store.whereis("cache").unwrap();
        let info = store.table_info(TableRef::Handle(cache)).unwrap();
        assert_eq!(info.access, AccessLevel::Public);
        assert_eq!(info.owner, "<0.120.0>");
        assert_eq!(info.size, 2);
        assert_eq!(
            store.read_all(cache).unwrap()[0],
            EntryValue::tuple([EntryValue::text("a"), EntryValue::Int(1)])
        );

        let anon = store.all_tables().unwrap()[1];
        let info = store.table_info(TableRef::Handle(anon)).unwrap();
        assert_eq!(info.name, None);
        assert_eq!(info.access, AccessLevel::Protected);
        assert_eq!(info.owner, "seed");
        // Ordered by key: the tuple's key is 1, so it precedes 3
        let entries = store.read_all(anon).unwrap();
        assert_eq!(
            entries[0],
            EntryValue::tuple([
                EntryValue::Int(1),
                EntryValue::List(vec![EntryValue::Int(2), EntryValue::Int(3)])
            ])
        );
        assert_eq!(entries[1], EntryValue::Int(3));
    }

    #[test]
    fn test_duplicate_names_are_rejected() {
        let err = parse_seed(
            r#"{ "tables": [
                { "name": "dup", "kind": "unique_ordered" },
                { "name": "dup", "kind": "unique_ordered" }
            ] }"#,
        )
        .unwrap_err();
        assert!(matches!(err, SeedError::Store { ref table, .. } if table == "dup"));
    }

    #[test]
    fn test_unknown_kind_is_parse_error() {
        let err = parse_seed(r#"{ "tables": [ { "kind": "bag" } ] }"#).unwrap_err();
        assert!(matches!(err, SeedError::Parse { .. }));
    }

    #[test]
    fn test_empty_seed() {
        assert_eq!(parse_seed("{}").unwrap().table_count(), 0);
    }

    #[tokio::test]
    async fn test_load_missing_file() {
        let err = load_seed(Path::new("/nonexistent/seed.json")).await.unwrap_err();
        assert!(matches!(err, SeedError::Read { .. }));
        assert!(TableDumpError::from(err).to_string().contains("Configuration error"));
    }
}
