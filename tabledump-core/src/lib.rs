//! Core engine for snapshotting live key/value table stores.
//!
//! Tables in the host store are created, resized, written and deleted by
//! other threads while a dump runs. This crate discovers the live tables,
//! extracts each one independently, assembles the results into a
//! [`DumpReport`] with a single capture time, and renders the report as
//! bounded text or JSON.
//!
//! # Failure Tiers
//! - A table that vanishes or turns private mid-dump is recorded in its own
//!   snapshot and never aborts the batch
//! - A registry that cannot be queried at all is fatal
//!   ([`TableDumpError::RegistryUnavailable`])
//!
//! # Example
//! ```rust
//! use tabledump_core::{
//!     AccessLevel, EntryValue, ExtractionConfig, MemoryStore, TableKind, TableOptions,
//!     dump_all, render,
//! };
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = MemoryStore::new();
//! let cache = store
//!     .create_table(
//!         TableOptions::new(TableKind::UniqueUnordered)
//!             .with_name("cache")
//!             .with_access(AccessLevel::Public),
//!     )?;
//! store
//!     .insert(cache, EntryValue::tuple([EntryValue::text("a"), EntryValue::Int(1)]))?;
//!
//! let report = dump_all(&store, &ExtractionConfig::new())?;
//! assert!(render(&report).contains("1. {\"a\", 1}"));
//! # Ok(())
//! # }
//! ```

pub mod assemble;
pub mod config;
pub mod error;
pub mod extract;
pub mod logging;
pub mod models;
pub mod registry;
pub mod render;
pub mod store;
pub mod validation;
pub mod value;

pub use assemble::{assemble, dump_all};
pub use config::{DumpConfig, ExtractionConfig, OutputFormat};
pub use error::{Result, TableDumpError};
pub use extract::{dump_single, extract};
pub use models::{
    AccessLevel, ContentFailure, DumpReport, FORMAT_VERSION, TableContent, TableDescriptor,
    TableHandle, TableKind, TableSnapshot,
};
pub use registry::{discover_tables, lookup_table};
pub use render::{ENTRY_DISPLAY_LIMIT, render, render_json, render_single};
pub use store::{MemoryStore, StoreError, TableInfo, TableOptions, TableRef, TableStore};
pub use validation::{
    ValidationError, initialize_report_validator, validate_and_parse_report,
    validate_report_output,
};
pub use value::EntryValue;
