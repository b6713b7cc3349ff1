//! Error types for dump operations.
//!
//! Errors are split in two tiers. Per-table content failures are not errors
//! at all: they are recorded inside a [`TableSnapshot`](crate::models::TableSnapshot)
//! and rendered inline. Everything in [`TableDumpError`] is returned to the
//! caller, and only [`TableDumpError::RegistryUnavailable`] is fatal.

use std::path::PathBuf;

use thiserror::Error;

use crate::store::StoreError;
use crate::validation::ValidationError;

/// Main error type for table dump operations.
#[derive(Debug, Error)]
pub enum TableDumpError {
    /// The table registry itself could not be queried. Not recoverable.
    #[error("Table registry unavailable: {context}")]
    RegistryUnavailable {
        context: String,
        #[source]
        source: StoreError,
    },

    /// No table matched a name or id lookup
    #[error("Table not found: {table}")]
    NotFound { table: String },

    /// Output directory could not be created
    #[error("Failed to create output directory '{}'", .path.display())]
    MkdirFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Report file could not be written
    #[error("Failed to write report to '{}'", .path.display())]
    WriteFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Configuration or input error
    #[error("Configuration error: {message}")]
    Configuration { message: String },

    /// Serialization or deserialization failed
    #[error("Serialization failed: {context}")]
    Serialization {
        context: String,
        #[source]
        source: serde_json::Error,
    },

    /// A JSON report did not pass output validation
    #[error("Report validation failed")]
    Validation {
        #[from]
        source: ValidationError,
    },
}

/// Convenience type alias for Results with `TableDumpError`
pub type Result<T> = std::result::Result<T, TableDumpError>;

impl TableDumpError {
    /// Wraps a store failure observed while enumerating the registry.
    pub fn registry_unavailable(context: impl Into<String>, source: StoreError) -> Self {
        Self::RegistryUnavailable {
            context: context.into(),
            source,
        }
    }

    /// Creates a lookup failure for a table name or id
    pub fn not_found(table: impl Into<String>) -> Self {
        Self::NotFound {
            table: table.into(),
        }
    }

    /// Creates a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Creates a serialization error with context
    pub fn serialization(context: impl Into<String>, source: serde_json::Error) -> Self {
        Self::Serialization {
            context: context.into(),
            source,
        }
    }

    /// Returns true for errors that indicate a host-level fault outside the
    /// dumper's recovery scope.
    pub const fn is_fatal(&self) -> bool {
        matches!(self, Self::RegistryUnavailable { .. })
    }

    /// Returns true when a dump-one lookup found no table.
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
