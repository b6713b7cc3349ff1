//! Race-safe content extraction.
//!
//! A descriptor's cached access level is stale by definition, so extraction
//! re-checks the table right before reading. The check and the read are not
//! atomic against other writers; whichever way the race goes, the outcome is
//! recorded in the snapshot's content and never escapes as an error.

use chrono::{DateTime, Utc};
use tracing::{debug, instrument, warn};

use crate::error::Result;
use crate::models::{ContentFailure, TableDescriptor, TableSnapshot};
use crate::registry::{Lookup, resolve_table};
use crate::store::{StoreError, TableRef, TableStore};

fn content_failure(error: StoreError) -> ContentFailure {
    match error {
        StoreError::NoSuchTable => ContentFailure::Deleted,
        StoreError::AccessDenied => ContentFailure::AccessDenied,
        other => ContentFailure::Other(other.to_string()),
    }
}

/// Captures one table's full content.
///
/// Never fails: a table that disappeared yields `Deleted`, a table that is
/// private at extraction time yields `AccessDenied` without a read, and any
/// other store failure yields `Other`.
pub fn extract<S: TableStore + ?Sized>(
    store: &S,
    descriptor: TableDescriptor,
    captured_at: DateTime<Utc>,
) -> TableSnapshot {
    let read = store
        .table_info(TableRef::Handle(descriptor.handle))
        .and_then(|info| {
            if info.access.is_readable() {
                store.read_all(descriptor.handle)
            } else {
                Err(StoreError::AccessDenied)
            }
        });

    match read {
        Ok(entries) => {
            debug!(table = %descriptor.name, entries = entries.len(), "extracted table");
            TableSnapshot::with_entries(descriptor, entries, captured_at)
        }
        Err(e) => {
            let failure = content_failure(e);
            warn!(table = %descriptor.name, reason = %failure, "table content unavailable");
            TableSnapshot::failed(descriptor, failure, captured_at)
        }
    }
}

/// Looks up and extracts a single table by name or id.
///
/// The lookup queries metadata directly instead of running full discovery.
///
/// A table whose metadata query is refused yields `AccessDenied` content.
///
/// # Errors
/// Returns `TableDumpError::NotFound` if no such table exists at lookup
/// time. A table that disappears after the lookup is still a successful
/// snapshot with `Deleted` content.
#[instrument(skip(store))]
pub fn dump_single<S: TableStore + ?Sized>(store: &S, name_or_id: &str) -> Result<TableSnapshot> {
    let captured_at = Utc::now();
    match resolve_table(store, name_or_id)? {
        Lookup::Found(descriptor) => Ok(extract(store, descriptor, captured_at)),
        Lookup::Restricted(descriptor) => {
            warn!(table = %descriptor.name, "table metadata is restricted");
            Ok(TableSnapshot::failed(
                descriptor,
                ContentFailure::AccessDenied,
                captured_at,
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AccessLevel, TableContent, TableKind};
    use crate::registry::discover_tables;
    use crate::store::{MemoryStore, TableOptions};
    use crate::value::EntryValue;

    fn store_with_cache() -> MemoryStore {
        let store = MemoryStore::new();
        let cache = store
            .create_table(
                TableOptions::new(TableKind::UniqueUnordered)
                    .with_name("cache")
                    .with_access(AccessLevel::Public),
            )
            .unwrap();
        store
            .insert_many(
                cache,
                [
                    EntryValue::tuple([EntryValue::text("a"), EntryValue::Int(1)]),
                    EntryValue::tuple([EntryValue::text("b"), EntryValue::Int(2)]),
                ],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_extract_reads_full_content() {
        let store = store_with_cache();
        let descriptor = discover_tables(&store).unwrap().remove(0);
        let snapshot = extract(&store, descriptor, Utc::now());

        assert_eq!(snapshot.content.entries().map(<[_]>::len), Some(2));
    }

    #[test]
    fn test_extract_after_deletion_is_deleted() {
        let store = store_with_cache();
        let descriptor = discover_tables(&store).unwrap().remove(0);
        store.delete_table(descriptor.handle).unwrap();

        let snapshot = extract(&store, descriptor, Utc::now());
        assert_eq!(snapshot.content, TableContent::Failed(ContentFailure::Deleted));
    }

    #[test]
    fn test_extract_rechecks_access_level() {
        let store = store_with_cache();
        let descriptor = discover_tables(&store).unwrap().remove(0);
        assert_eq!(descriptor.access_level, AccessLevel::Public);

        store
            .set_access(descriptor.handle, AccessLevel::Private)
            .unwrap();
        let snapshot = extract(&store, descriptor, Utc::now());
        assert_eq!(
            snapshot.content,
            TableContent::Failed(ContentFailure::AccessDenied)
        );
        // Descriptor keeps the discovery-time view
        assert_eq!(snapshot.descriptor.access_level, AccessLevel::Public);
    }

    #[test]
    fn test_extract_trusts_live_access_over_stale_private() {
        let store = store_with_cache();
        let mut descriptor = discover_tables(&store).unwrap().remove(0);
        descriptor.access_level = AccessLevel::Private;

        let snapshot = extract(&store, descriptor, Utc::now());
        assert!(snapshot.is_captured());
    }

    #[test]
    fn test_dump_single_found_and_missing() {
        let store = store_with_cache();

        let snapshot = dump_single(&store, "cache").unwrap();
        assert_eq!(snapshot.descriptor.name, "cache");
        assert!(snapshot.is_captured());

        let err = dump_single(&store, "nonexistent").unwrap_err();
        assert!(err.is_not_found());
    }

    /// Store whose metadata query is gated the same way as reads
    struct StrictStore(MemoryStore);

    impl TableStore for StrictStore {
        fn all_tables(&self) -> std::result::Result<Vec<crate::models::TableHandle>, StoreError> {
            self.0.all_tables()
        }

        fn table_info(
            &self,
            table: TableRef<'_>,
        ) -> std::result::Result<crate::store::TableInfo, StoreError> {
            let info = self.0.table_info(table)?;
            if info.access.is_readable() {
                Ok(info)
            } else {
                Err(StoreError::AccessDenied)
            }
        }

        fn read_all(
            &self,
            handle: crate::models::TableHandle,
        ) -> std::result::Result<Vec<EntryValue>, StoreError> {
            self.0.read_all(handle)
        }
    }

    #[test]
    fn test_dump_single_restricted_metadata_is_access_denied() {
        let store = store_with_cache();
        let vault = store
            .create_table(
                TableOptions::new(TableKind::UniqueOrdered)
                    .with_name("vault")
                    .with_access(AccessLevel::Private),
            )
            .unwrap();
        let store = StrictStore(store);

        let snapshot = dump_single(&store, "vault").unwrap();
        assert_eq!(snapshot.descriptor.name, "vault");
        assert_eq!(
            snapshot.content,
            TableContent::Failed(ContentFailure::AccessDenied)
        );

        let by_id = dump_single(&store, &vault.to_string()).unwrap();
        assert_eq!(by_id.descriptor.handle, vault);
        assert_eq!(
            by_id.content,
            TableContent::Failed(ContentFailure::AccessDenied)
        );

        assert!(dump_single(&store, "nonexistent").unwrap_err().is_not_found());
        assert!(dump_single(&store, "cache").unwrap().is_captured());
    }

    #[test]
    fn test_other_store_errors_are_recorded() {
        let failure = content_failure(StoreError::Unavailable("lock timeout".to_string()));
        assert_eq!(
            failure,
            ContentFailure::Other("table registry unavailable: lock timeout".to_string())
        );
    }
}
