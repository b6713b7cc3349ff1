//! JSON Schema validation for JSON dump reports.
//!
//! JSON reports are checked against an embedded schema before they are
//! written and when they are loaded back for offline inspection. Beyond the
//! schema, a report must be internally consistent: `table_count` equals the
//! number of snapshots.
//!
//! # Example
//! ```rust
//! use tabledump_core::validation::{initialize_report_validator, validate_and_parse_report};
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! initialize_report_validator()?;
//! let json_str = r#"{
//!     "format_version": "1.0",
//!     "captured_at": "2024-01-15T10:30:00Z",
//!     "table_count": 0,
//!     "tables": []
//! }"#;
//!
//! let report = validate_and_parse_report(json_str)?;
//! assert!(report.tables.is_empty());
//! # Ok(())
//! # }
//! ```

use std::sync::OnceLock;

use jsonschema::Validator;
use serde_json::Value;
use thiserror::Error;

use crate::models::{DumpReport, FORMAT_VERSION};

/// Report validation errors
#[derive(Debug, Error)]
pub enum ValidationError {
    /// Schema compilation failed during initialization
    #[error("JSON Schema compilation failed: {message}")]
    SchemaCompilation { message: String },

    /// Report does not conform to the schema
    #[error("Report validation failed with {error_count} errors: {errors:?}")]
    ValidationFailed {
        error_count: usize,
        errors: Vec<String>,
    },

    /// Unsupported format version detected
    #[error("Unsupported format version '{version}'. Supported versions: {supported:?}")]
    UnsupportedVersion {
        version: String,
        supported: Vec<String>,
    },

    /// `table_count` disagrees with the number of snapshots
    #[error("Report declares {declared} tables but contains {actual}")]
    CountMismatch { declared: u64, actual: usize },

    /// JSON parsing error
    #[error("JSON parsing failed: {source}")]
    JsonParsing {
        #[from]
        source: serde_json::Error,
    },
}

const SUPPORTED_VERSIONS: &[&str] = &[FORMAT_VERSION];

/// Embedded JSON Schema for v1.0 reports
const REPORT_SCHEMA_V1_0: &str = r##"{
  "$schema": "https://json-schema.org/draft/2020-12/schema",
  "title": "Table Dump Report Format v1.0",
  "type": "object",
  "required": ["format_version", "captured_at", "table_count", "tables"],
  "properties": {
    "format_version": { "type": "string", "pattern": "^1\\.0$" },
    "captured_at": { "type": "string", "format": "date-time" },
    "table_count": { "type": "integer", "minimum": 0 },
    "tables": { "type": "array", "items": { "$ref": "#/$defs/snapshot" } }
  },
  "$defs": {
    "snapshot": {
      "type": "object",
      "required": [
        "id", "handle", "name", "kind", "entry_count", "memory_words",
        "owner", "access_level", "compressed", "content", "captured_at"
      ],
      "properties": {
        "id": { "type": "string", "minLength": 1 },
        "handle": { "type": "integer", "minimum": 0 },
        "name": { "type": "string", "minLength": 1 },
        "kind": {
          "enum": ["unique_ordered", "unique_unordered", "multi_ordered", "multi_unordered"]
        },
        "entry_count": { "type": "integer", "minimum": 0 },
        "memory_words": { "type": "integer", "minimum": 0 },
        "owner": { "type": "string" },
        "access_level": { "enum": ["public", "protected", "private"] },
        "compressed": { "type": "boolean" },
        "captured_at": { "type": "string", "format": "date-time" },
        "content": {
          "oneOf": [
            {
              "type": "object",
              "required": ["status", "data"],
              "properties": {
                "status": { "const": "entries" },
                "data": { "type": "array", "items": { "$ref": "#/$defs/entry" } }
              }
            },
            {
              "type": "object",
              "required": ["status", "data"],
              "properties": {
                "status": { "const": "failed" },
                "data": {
                  "oneOf": [
                    { "enum": ["deleted", "access_denied"] },
                    {
                      "type": "object",
                      "required": ["other"],
                      "properties": { "other": { "type": "string" } }
                    }
                  ]
                }
              }
            }
          ]
        }
      }
    },
    "entry": {
      "oneOf": [
        { "const": "null" },
        {
          "type": "object",
          "minProperties": 1,
          "maxProperties": 1,
          "properties": {
            "bool": { "type": "boolean" },
            "int": { "type": "integer" },
            "float": {
              "oneOf": [{ "type": "number" }, { "enum": ["NaN", "inf", "-inf"] }]
            },
            "text": { "type": "string" },
            "bytes": { "type": "string" },
            "atom": { "type": "string" },
            "tuple": { "type": "array", "items": { "$ref": "#/$defs/entry" } },
            "list": { "type": "array", "items": { "$ref": "#/$defs/entry" } },
            "map": {
              "type": "array",
              "items": {
                "type": "array",
                "prefixItems": [{ "$ref": "#/$defs/entry" }, { "$ref": "#/$defs/entry" }],
                "minItems": 2,
                "maxItems": 2
              }
            }
          },
          "additionalProperties": false
        }
      ]
    }
  }
}"##;

static COMPILED_SCHEMA: OnceLock<Validator> = OnceLock::new();

/// Compiles the embedded report schema and caches it.
///
/// Safe to call more than once; later calls are no-ops.
///
/// # Errors
/// Returns `ValidationError::SchemaCompilation` if the embedded schema is invalid.
pub fn initialize_report_validator() -> Result<(), ValidationError> {
    if COMPILED_SCHEMA.get().is_some() {
        return Ok(());
    }

    let schema_json = get_schema_definition()?;
    let compiled =
        jsonschema::validator_for(&schema_json).map_err(|e| ValidationError::SchemaCompilation {
            message: format!("Schema compilation error: {e}"),
        })?;

    // Another thread may have won the race; either validator is equivalent
    let _ = COMPILED_SCHEMA.set(compiled);
    Ok(())
}

/// Validates a JSON report value.
///
/// Checks the format version, the schema, and the declared table count.
///
/// # Errors
/// Returns the first class of problem found. Schema violations are reported
/// together in `ValidationError::ValidationFailed`.
pub fn validate_report_output(json_value: &Value) -> Result<(), ValidationError> {
    let schema = COMPILED_SCHEMA
        .get()
        .ok_or_else(|| ValidationError::SchemaCompilation {
            message: "Report validator not initialized. Call initialize_report_validator() first."
                .to_string(),
        })?;

    validate_format_version(json_value)?;

    let errors: Vec<String> = schema
        .iter_errors(json_value)
        .map(|e| e.to_string())
        .collect();
    if !errors.is_empty() {
        return Err(ValidationError::ValidationFailed {
            error_count: errors.len(),
            errors,
        });
    }

    validate_table_count(json_value)
}

fn validate_format_version(json_value: &Value) -> Result<(), ValidationError> {
    let version = json_value
        .get("format_version")
        .and_then(Value::as_str)
        .ok_or_else(|| ValidationError::ValidationFailed {
            error_count: 1,
            errors: vec!["Missing required field 'format_version'".to_string()],
        })?;

    if !SUPPORTED_VERSIONS.contains(&version) {
        return Err(ValidationError::UnsupportedVersion {
            version: version.to_string(),
            supported: SUPPORTED_VERSIONS.iter().map(|s| (*s).to_string()).collect(),
        });
    }

    Ok(())
}

fn validate_table_count(json_value: &Value) -> Result<(), ValidationError> {
    let declared = json_value.get("table_count").and_then(Value::as_u64);
    let actual = json_value
        .get("tables")
        .and_then(Value::as_array)
        .map(Vec::len);

    match (declared, actual) {
        (Some(declared), Some(actual)) if u64::try_from(actual).ok() != Some(declared) => {
            Err(ValidationError::CountMismatch { declared, actual })
        }
        _ => Ok(()),
    }
}

/// Validates and loads a JSON dump report.
///
/// # Errors
/// Returns validation errors for malformed JSON or schema violations.
pub fn validate_and_parse_report(json_str: &str) -> Result<DumpReport, ValidationError> {
    let json_value: Value = serde_json::from_str(json_str)?;
    validate_report_output(&json_value)?;
    Ok(serde_json::from_value(json_value)?)
}

/// Returns the embedded report schema.
///
/// # Errors
/// Returns `ValidationError::SchemaCompilation` if the embedded text is not JSON.
pub fn get_schema_definition() -> Result<Value, ValidationError> {
    serde_json::from_str(REPORT_SCHEMA_V1_0).map_err(|e| ValidationError::SchemaCompilation {
        message: format!("Failed to parse embedded schema: {e}"),
    })
}
