//! Table discovery and lookup.
//!
//! Discovery races against table deletion: a handle returned by enumeration
//! may be dead by the time its metadata is queried. That is expected and the
//! handle is dropped. Only a registry that cannot be queried at all is an
//! error, and that error is fatal.

use tracing::{debug, instrument};

use crate::error::{Result, TableDumpError};
use crate::models::{TableDescriptor, TableHandle};
use crate::store::{StoreError, TableRef, TableStore};

/// Enumerates every live table and captures its metadata.
///
/// Order follows the store's enumeration order. Tables that vanish or become
/// unreadable between enumeration and their metadata query are omitted.
///
/// # Errors
/// Returns `TableDumpError::RegistryUnavailable` if the store cannot list
/// tables or reports itself unavailable mid-discovery.
#[instrument(skip(store))]
pub fn discover_tables<S: TableStore + ?Sized>(store: &S) -> Result<Vec<TableDescriptor>> {
    let handles = store
        .all_tables()
        .map_err(|e| TableDumpError::registry_unavailable("listing tables", e))?;

    let mut descriptors = Vec::with_capacity(handles.len());
    for handle in handles {
        match store.table_info(TableRef::Handle(handle)) {
            Ok(info) => descriptors.push(TableDescriptor::from(info)),
            Err(e @ StoreError::Unavailable(_)) => {
                return Err(TableDumpError::registry_unavailable(
                    format!("querying {handle}"),
                    e,
                ));
            }
            Err(e) => debug!(%handle, reason = %e, "table vanished during discovery"),
        }
    }

    debug!(count = descriptors.len(), "discovered tables");
    Ok(descriptors)
}

/// Outcome of a single-table metadata lookup
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Lookup {
    /// Metadata was readable
    Found(TableDescriptor),
    /// The table exists but the store refused its metadata query
    Restricted(TableDescriptor),
}

impl Lookup {
    fn into_descriptor(self) -> TableDescriptor {
        match self {
            Self::Found(descriptor) | Self::Restricted(descriptor) => descriptor,
        }
    }
}

/// Looks up one table by name, falling back to its handle.
///
/// `name_or_id` is tried as a registered name first; if no table has that
/// name and the text parses as a handle (`#Tid<7>` or `7`), the handle is
/// tried next. A table whose metadata the store refuses to report still
/// counts as found; its descriptor carries only the requested name and a
/// `Private` access level.
///
/// # Errors
/// Returns `TableDumpError::NotFound` if neither lookup finds a live table,
/// or `TableDumpError::RegistryUnavailable` if the store is unreachable.
pub fn lookup_table<S: TableStore + ?Sized>(
    store: &S,
    name_or_id: &str,
) -> Result<TableDescriptor> {
    resolve_table(store, name_or_id).map(Lookup::into_descriptor)
}

pub(crate) fn resolve_table<S: TableStore + ?Sized>(
    store: &S,
    name_or_id: &str,
) -> Result<Lookup> {
    let parsed = name_or_id.parse::<TableHandle>().ok();
    let info = match store.table_info(TableRef::Name(name_or_id)) {
        Err(StoreError::NoSuchTable) => match parsed {
            Some(handle) => store.table_info(TableRef::Handle(handle)),
            None => Err(StoreError::NoSuchTable),
        },
        other => other,
    };

    match info {
        Ok(info) => Ok(Lookup::Found(TableDescriptor::from(info))),
        Err(e @ StoreError::Unavailable(_)) => Err(TableDumpError::registry_unavailable(
            format!("looking up '{name_or_id}'"),
            e,
        )),
        Err(StoreError::AccessDenied) => {
            debug!(table = name_or_id, "table metadata is restricted");
            Ok(Lookup::Restricted(TableDescriptor::restricted(
                name_or_id,
                parsed.unwrap_or(TableHandle::UNRESOLVED),
            )))
        }
        Err(_) => Err(TableDumpError::not_found(name_or_id)),
    }
}
