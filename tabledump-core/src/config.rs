//! Dump configuration.
//!
//! Controls where reports go, how they are encoded, and how extraction is
//! scheduled. Built with `with_*` builder methods and checked by
//! [`DumpConfig::validate`] before use.

use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TableDumpError};

/// Default directory for dump files, relative to the working directory
pub const DEFAULT_OUTPUT_DIR: &str = "table_dumps";

/// Default number of tables extracted concurrently in parallel mode
pub const DEFAULT_MAX_PARALLEL: usize = 8;

/// Report encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Human-readable text report
    #[default]
    Text,
    /// Pretty-printed JSON report
    Json,
}

impl OutputFormat {
    /// File extension for this format, without the dot.
    pub const fn extension(self) -> &'static str {
        match self {
            Self::Text => "txt",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text => write!(f, "text"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl FromStr for OutputFormat {
    type Err = TableDumpError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "text" | "txt" => Ok(Self::Text),
            "json" => Ok(Self::Json),
            other => Err(TableDumpError::configuration(format!(
                "Unknown output format '{other}' (expected text or json)"
            ))),
        }
    }
}

/// How the assembler schedules per-table extraction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Extract tables on scoped worker threads
    pub parallel: bool,
    /// Upper bound on concurrently extracted tables
    pub max_parallel: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        Self {
            parallel: false,
            max_parallel: DEFAULT_MAX_PARALLEL,
        }
    }
}

impl ExtractionConfig {
    /// Sequential extraction.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to enable parallel extraction.
    pub const fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Builder method to bound concurrency.
    pub const fn with_max_parallel(mut self, max_parallel: usize) -> Self {
        self.max_parallel = max_parallel;
        self
    }
}

/// Configuration for one dump invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DumpConfig {
    /// Directory that receives report files
    pub output_dir: PathBuf,
    pub format: OutputFormat,
    /// Zstandard-compress the report before writing
    pub compress: bool,
    pub extraction: ExtractionConfig,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            format: OutputFormat::Text,
            compress: false,
            extraction: ExtractionConfig::default(),
        }
    }
}

impl DumpConfig {
    /// Creates a config with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the output directory.
    pub fn with_output_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.output_dir = dir.into();
        self
    }

    /// Builder method to set the report format.
    pub const fn with_format(mut self, format: OutputFormat) -> Self {
        self.format = format;
        self
    }

    /// Builder method to enable compression.
    pub const fn with_compress(mut self, compress: bool) -> Self {
        self.compress = compress;
        self
    }

    /// Builder method to set extraction scheduling.
    pub fn with_extraction(mut self, extraction: ExtractionConfig) -> Self {
        self.extraction = extraction;
        self
    }

    /// File extension for reports written with this config.
    pub fn file_extension(&self) -> String {
        if self.compress {
            format!("{}.zst", self.format.extension())
        } else {
            self.format.extension().to_string()
        }
    }

    /// Checks option values.
    ///
    /// # Errors
    /// Returns `TableDumpError::Configuration` for an empty output directory
    /// or a zero parallelism bound.
    pub fn validate(&self) -> Result<()> {
        if self.output_dir.as_os_str().is_empty() {
            return Err(TableDumpError::configuration(
                "Output directory must not be empty",
            ));
        }
        if self.extraction.max_parallel == 0 {
            return Err(TableDumpError::configuration(
                "max_parallel must be at least 1",
            ));
        }
        Ok(())
    }
}
