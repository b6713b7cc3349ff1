//! Thread-safe in-process table store.
//!
//! The registry sits behind one `RwLock` and each table's entries behind its
//! own, so a content read is a single consistent pass while other threads
//! keep creating, writing and deleting tables. Deleting a table marks it dead
//! under its own lock, so a reader holding a stale reference still observes
//! the deletion.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;

use super::{StoreError, TableInfo, TableRef, TableStore};
use crate::models::{AccessLevel, TableHandle, TableKind};
use crate::value::EntryValue;

/// Fixed per-table overhead in words, added to the entry estimate
const BASE_TABLE_WORDS: usize = 300;

/// Options for creating a table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableOptions {
    pub name: Option<String>,
    pub kind: TableKind,
    pub access: AccessLevel,
    pub owner: String,
    pub compressed: bool,
}

impl TableOptions {
    /// Anonymous, protected table owned by `main`.
    pub fn new(kind: TableKind) -> Self {
        Self {
            name: None,
            kind,
            access: AccessLevel::Protected,
            owner: "main".to_string(),
            compressed: false,
        }
    }

    /// Builder method to register the table under a name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Builder method to set the access level.
    pub const fn with_access(mut self, access: AccessLevel) -> Self {
        self.access = access;
        self
    }

    /// Builder method to set the owner display string.
    pub fn with_owner(mut self, owner: impl Into<String>) -> Self {
        self.owner = owner.into();
        self
    }

    /// Builder method to flag the table as compressed.
    pub const fn with_compressed(mut self, compressed: bool) -> Self {
        self.compressed = compressed;
        self
    }
}

#[derive(Debug)]
struct Table {
    options: TableOptions,
    entries: Vec<EntryValue>,
    deleted: bool,
}

impl Table {
    fn keys_match(&self, a: &EntryValue, b: &EntryValue) -> bool {
        if self.options.kind.is_ordered() {
            a.term_cmp(b).is_eq()
        } else {
            a == b
        }
    }

    fn insert(&mut self, entry: EntryValue) {
        let kind = self.options.kind;
        if kind.is_ordered() {
            let key = entry.key();
            let start = self
                .entries
                .partition_point(|e| e.key().term_cmp(key).is_lt());
            if kind.is_unique() {
                if let Some(slot) = self.entries.get_mut(start)
                    && slot.key().term_cmp(key).is_eq()
                {
                    *slot = entry;
                    return;
                }
                self.entries.insert(start, entry);
            } else {
                let end = self
                    .entries
                    .partition_point(|e| e.key().term_cmp(key).is_le());
                self.entries.insert(end, entry);
            }
        } else if kind.is_unique() {
            match self.entries.iter().position(|e| e.key() == entry.key()) {
                Some(index) => self.entries[index] = entry,
                None => self.entries.push(entry),
            }
        } else {
            self.entries.push(entry);
        }
    }

    fn memory_words(&self) -> usize {
        self.entries
            .iter()
            .fold(BASE_TABLE_WORDS, |acc, e| acc.saturating_add(e.word_size()))
    }

    fn info(&self, handle: TableHandle) -> TableInfo {
        TableInfo {
            handle,
            name: self.options.name.clone(),
            kind: self.options.kind,
            size: self.entries.len(),
            memory_words: self.memory_words(),
            owner: self.options.owner.clone(),
            access: self.options.access,
            compressed: self.options.compressed,
        }
    }
}

#[derive(Debug, Default)]
struct Registry {
    tables: BTreeMap<TableHandle, Arc<RwLock<Table>>>,
    names: HashMap<String, TableHandle>,
}

/// In-process table store shared between writers and the dumper.
///
/// Reads through [`TableStore`] are made as a non-owner, so `Private`
/// tables report metadata but refuse content reads.
#[derive(Debug)]
pub struct MemoryStore {
    registry: RwLock<Registry>,
    next_handle: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            next_handle: AtomicU64::new(1),
        }
    }
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a table and returns its handle.
    ///
    /// # Errors
    /// Returns `StoreError::NameTaken` if a named table already uses the name.
    pub fn create_table(&self, options: TableOptions) -> Result<TableHandle, StoreError> {
        let mut registry = self.registry.write();
        if let Some(name) = &options.name
            && registry.names.contains_key(name)
        {
            return Err(StoreError::NameTaken(name.clone()));
        }

        let handle = TableHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        if let Some(name) = &options.name {
            registry.names.insert(name.clone(), handle);
        }
        registry.tables.insert(
            handle,
            Arc::new(RwLock::new(Table {
                options,
                entries: Vec::new(),
                deleted: false,
            })),
        );
        tracing::trace!(%handle, "created table");
        Ok(handle)
    }

    /// Inserts one entry, replacing an entry with an equal key in unique tables.
    ///
    /// # Errors
    /// Returns `StoreError::NoSuchTable` if the table is gone.
    pub fn insert(&self, handle: TableHandle, entry: EntryValue) -> Result<(), StoreError> {
        self.insert_many(handle, std::iter::once(entry))
    }

    /// Inserts several entries under one write lock.
    ///
    /// # Errors
    /// Returns `StoreError::NoSuchTable` if the table is gone.
    pub fn insert_many(
        &self,
        handle: TableHandle,
        entries: impl IntoIterator<Item = EntryValue>,
    ) -> Result<(), StoreError> {
        let table = self.table(handle)?;
        let mut table = table.write();
        if table.deleted {
            return Err(StoreError::NoSuchTable);
        }
        for entry in entries {
            table.insert(entry);
        }
        Ok(())
    }

    /// Removes every entry with the given key and returns how many were removed.
    ///
    /// # Errors
    /// Returns `StoreError::NoSuchTable` if the table is gone.
    pub fn delete_key(&self, handle: TableHandle, key: &EntryValue) -> Result<usize, StoreError> {
        let table = self.table(handle)?;
        let mut table = table.write();
        if table.deleted {
            return Err(StoreError::NoSuchTable);
        }
        let before = table.entries.len();
        let entries = std::mem::take(&mut table.entries);
        let kept: Vec<EntryValue> = entries
            .into_iter()
            .filter(|e| !table.keys_match(e.key(), key))
            .collect();
        table.entries = kept;
        Ok(before.saturating_sub(table.entries.len()))
    }

    /// Deletes a table. Readers holding a stale reference observe the deletion.
    ///
    /// # Errors
    /// Returns `StoreError::NoSuchTable` if the table is already gone.
    pub fn delete_table(&self, handle: TableHandle) -> Result<(), StoreError> {
        let table = {
            let mut registry = self.registry.write();
            let table = registry
                .tables
                .remove(&handle)
                .ok_or(StoreError::NoSuchTable)?;
            registry.names.retain(|_, h| *h != handle);
            table
        };
        let mut table = table.write();
        table.deleted = true;
        table.entries.clear();
        tracing::trace!(%handle, "deleted table");
        Ok(())
    }

    /// Changes a table's access level.
    ///
    /// # Errors
    /// Returns `StoreError::NoSuchTable` if the table is gone.
    pub fn set_access(&self, handle: TableHandle, access: AccessLevel) -> Result<(), StoreError> {
        let table = self.table(handle)?;
        let mut table = table.write();
        if table.deleted {
            return Err(StoreError::NoSuchTable);
        }
        table.options.access = access;
        Ok(())
    }

    /// Looks up a named table's handle.
    pub fn whereis(&self, name: &str) -> Option<TableHandle> {
        self.registry.read().names.get(name).copied()
    }

    /// Number of live tables.
    pub fn table_count(&self) -> usize {
        self.registry.read().tables.len()
    }

    fn table(&self, handle: TableHandle) -> Result<Arc<RwLock<Table>>, StoreError> {
        self.registry
            .read()
            .tables
            .get(&handle)
            .cloned()
            .ok_or(StoreError::NoSuchTable)
    }

    fn resolve(&self, table: TableRef<'_>) -> Result<TableHandle, StoreError> {
        match table {
            TableRef::Handle(handle) => Ok(handle),
            TableRef::Name(name) => self.whereis(name).ok_or(StoreError::NoSuchTable),
        }
    }
}

impl TableStore for MemoryStore {
    fn all_tables(&self) -> Result<Vec<TableHandle>, StoreError> {
        Ok(self.registry.read().tables.keys().copied().collect())
    }

    fn table_info(&self, table: TableRef<'_>) -> Result<TableInfo, StoreError> {
        let handle = self.resolve(table)?;
        let table = self.table(handle)?;
        let table = table.read();
        if table.deleted {
            return Err(StoreError::NoSuchTable);
        }
        Ok(table.info(handle))
    }

    fn read_all(&self, handle: TableHandle) -> Result<Vec<EntryValue>, StoreError> {
        let table = self.table(handle)?;
        let table = table.read();
        if table.deleted {
            return Err(StoreError::NoSuchTable);
        }
        if !table.options.access.is_readable() {
            return Err(StoreError::AccessDenied);
        }
        Ok(table.entries.clone())
    }
}
