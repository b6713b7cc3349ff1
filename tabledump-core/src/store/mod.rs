//! Host table store abstraction.
//!
//! The dumper never reaches for global state: every query goes through an
//! injected [`TableStore`]. Implementations are shared across extraction
//! threads and every call may observe a different answer than the last one.
//!
//! # Module Structure
//! - `memory`: thread-safe in-process store with owner-based access control

use thiserror::Error;

use crate::models::{AccessLevel, TableDescriptor, TableHandle, TableKind};
use crate::value::EntryValue;

pub mod memory;

pub use memory::{MemoryStore, TableOptions};

/// Failures reported by a table store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The handle or name does not refer to a live table
    #[error("no such table")]
    NoSuchTable,

    /// The caller may not read this table
    #[error("access denied")]
    AccessDenied,

    /// A named table with this name already exists
    #[error("table name already in use: {0}")]
    NameTaken(String),

    /// The registry itself cannot be queried
    #[error("table registry unavailable: {0}")]
    Unavailable(String),
}

/// How a metadata query addresses a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableRef<'a> {
    /// By live handle
    Handle(TableHandle),
    /// By registered name
    Name(&'a str),
}

/// Metadata reported by the store for one live table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableInfo {
    pub handle: TableHandle,
    /// `None` for anonymous tables
    pub name: Option<String>,
    pub kind: TableKind,
    pub size: usize,
    pub memory_words: usize,
    pub owner: String,
    pub access: AccessLevel,
    pub compressed: bool,
}

impl From<TableInfo> for TableDescriptor {
    fn from(info: TableInfo) -> Self {
        let id = info.handle.to_string();
        Self {
            name: info.name.unwrap_or_else(|| id.clone()),
            id,
            handle: info.handle,
            kind: info.kind,
            entry_count: info.size,
            memory_words: info.memory_words,
            owner: info.owner,
            access_level: info.access,
            compressed: info.compressed,
        }
    }
}

/// Read-only view of a live, concurrently mutated table registry.
///
/// # Object Safety
/// This trait is object-safe, allowing `&dyn TableStore` or
/// `Arc<dyn TableStore>` to be handed to the dumper.
pub trait TableStore: Send + Sync {
    /// Lists the handles of every table currently visible.
    ///
    /// # Errors
    /// Returns `StoreError::Unavailable` if the registry cannot be queried.
    fn all_tables(&self) -> Result<Vec<TableHandle>, StoreError>;

    /// Queries one table's metadata.
    ///
    /// # Errors
    /// Returns `StoreError::NoSuchTable` if the table is gone.
    fn table_info(&self, table: TableRef<'_>) -> Result<TableInfo, StoreError>;

    /// Reads every entry of a table in one consistent pass.
    ///
    /// # Errors
    /// Returns `StoreError::NoSuchTable` if the table is gone and
    /// `StoreError::AccessDenied` if the caller may not read it.
    fn read_all(&self, handle: TableHandle) -> Result<Vec<EntryValue>, StoreError>;
}

impl<T: TableStore + ?Sized> TableStore for std::sync::Arc<T> {
    fn all_tables(&self) -> Result<Vec<TableHandle>, StoreError> {
        (**self).all_tables()
    }

    fn table_info(&self, table: TableRef<'_>) -> Result<TableInfo, StoreError> {
        (**self).table_info(table)
    }

    fn read_all(&self, handle: TableHandle) -> Result<Vec<EntryValue>, StoreError> {
        (**self).read_all(handle)
    }
}
