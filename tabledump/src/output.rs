//! Report sink.
//!
//! Reports are written atomically: bytes go to `<name>.tmp.<pid>` in the
//! destination directory, are synced, then renamed over the final name. A
//! failed write removes the temporary file and never leaves a truncated
//! report under the final name.

use std::path::{Path, PathBuf};

use chrono::{DateTime, SecondsFormat, Utc};
use tabledump_core::{
    DumpConfig, DumpReport, OutputFormat, Result, TableDumpError, TableSnapshot,
    initialize_report_validator, render, render_json, render_single, validate_report_output,
};
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

/// Creates the output directory and any missing parents.
///
/// Idempotent: an existing directory is fine.
///
/// # Errors
/// Returns `TableDumpError::MkdirFailed` with the underlying I/O error.
pub async fn ensure_destination(dir: &Path) -> Result<PathBuf> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| TableDumpError::MkdirFailed {
            path: dir.to_path_buf(),
            source,
        })?;
    Ok(dir.to_path_buf())
}

/// Writes `content` to `path` atomically.
///
/// # Errors
/// Returns `TableDumpError::WriteFailed` with the underlying I/O error. On
/// failure nothing is left at `path` or at the temporary name.
pub async fn write_text(path: &Path, content: &[u8]) -> Result<()> {
    let file_name = path
        .file_name()
        .and_then(|s| s.to_str())
        .unwrap_or("report");
    let tmp_path = path.with_file_name(format!("{file_name}.tmp.{}", std::process::id()));

    let written = write_and_rename(&tmp_path, path, content).await;
    if written.is_err() {
        let _ = tokio::fs::remove_file(&tmp_path).await;
    }
    written.map_err(|source| TableDumpError::WriteFailed {
        path: path.to_path_buf(),
        source,
    })
}

async fn write_and_rename(tmp_path: &Path, path: &Path, content: &[u8]) -> std::io::Result<()> {
    let mut file = tokio::fs::File::create(tmp_path).await?;
    file.write_all(content).await?;
    file.sync_all().await?;
    drop(file);
    tokio::fs::rename(tmp_path, path).await
}

/// Filesystem-safe form of a capture time.
///
/// RFC 3339 with microseconds in UTC, with `:` and `.` replaced by `-`.
pub fn timestamp_token(captured_at: DateTime<Utc>) -> String {
    captured_at
        .to_rfc3339_opts(SecondsFormat::Micros, true)
        .replace([':', '.'], "-")
}

/// File name for a full dump: `report_<timestamp>.<ext>`.
pub fn report_filename(captured_at: DateTime<Utc>, extension: &str) -> String {
    format!("report_{}.{extension}", timestamp_token(captured_at))
}

/// File name for a single-table dump: `table_<name-or-id>_<timestamp>.<ext>`.
///
/// Characters outside `[A-Za-z0-9_-]` in the table part become `_`.
pub fn table_filename(name_or_id: &str, captured_at: DateTime<Utc>, extension: &str) -> String {
    let safe: String = name_or_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    format!(
        "table_{safe}_{}.{extension}",
        timestamp_token(captured_at)
    )
}

/// Renders, validates, encodes and writes a full dump.
///
/// Returns the path of the written file.
///
/// # Errors
/// Returns sink errors, JSON validation errors, or a configuration error if
/// compression is requested without the `compression` feature.
pub async fn save_report(report: &DumpReport, config: &DumpConfig) -> Result<PathBuf> {
    let text = match config.format {
        OutputFormat::Text => render(report),
        OutputFormat::Json => validated_json(report)?,
    };
    let name = report_filename(report.captured_at, &config.file_extension());
    save(text, &name, config).await
}

/// Renders, encodes and writes a single-table dump.
///
/// # Errors
/// As [`save_report`].
pub async fn save_snapshot(
    snapshot: &TableSnapshot,
    name_or_id: &str,
    config: &DumpConfig,
) -> Result<PathBuf> {
    let text = match config.format {
        OutputFormat::Text => render_single(snapshot),
        OutputFormat::Json => {
            let report = DumpReport::new(snapshot.captured_at, vec![snapshot.clone()]);
            validated_json(&report)?
        }
    };
    let name = table_filename(name_or_id, snapshot.captured_at, &config.file_extension());
    save(text, &name, config).await
}

fn validated_json(report: &DumpReport) -> Result<String> {
    let json = render_json(report)?;
    let value: serde_json::Value = serde_json::from_str(&json)
        .map_err(|e| TableDumpError::serialization("parsing report for validation", e))?;
    initialize_report_validator()?;
    validate_report_output(&value)?;
    debug!("output validation passed");
    Ok(json)
}

async fn save(text: String, file_name: &str, config: &DumpConfig) -> Result<PathBuf> {
    let bytes = encode(text, config.compress)?;
    let dir = ensure_destination(&config.output_dir).await?;
    let path = dir.join(file_name);
    write_text(&path, &bytes).await?;
    info!(path = %path.display(), bytes = bytes.len(), "wrote dump");
    Ok(path)
}

fn encode(text: String, compress: bool) -> Result<Vec<u8>> {
    if !compress {
        return Ok(text.into_bytes());
    }

    #[cfg(feature = "compression")]
    {
        compress_bytes(text.as_bytes())
    }
    #[cfg(not(feature = "compression"))]
    {
        Err(TableDumpError::configuration(
            "Compression not available. Compile with --features compression",
        ))
    }
}

/// Zstandard-compresses `data` at level 3.
#[cfg(feature = "compression")]
fn compress_bytes(data: &[u8]) -> Result<Vec<u8>> {
    use std::io::Write;

    let mut encoder = zstd::Encoder::new(Vec::new(), 3).map_err(|e| {
        TableDumpError::configuration(format!("Failed to create compressor: {e}"))
    })?;
    encoder
        .write_all(data)
        .map_err(|e| TableDumpError::configuration(format!("Compression failed: {e}")))?;
    encoder.finish().map_err(|e| {
        TableDumpError::configuration(format!("Compression finalization failed: {e}"))
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_time() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 5).unwrap()
    }

    #[test]
    fn test_timestamp_token_is_filename_safe() {
        let token = timestamp_token(fixed_time());
        assert_eq!(token, "2024-01-15T10-30-05-000000Z");
        assert!(!token.contains(':'));
        assert!(!token.contains('.'));
    }

    #[test]
    fn test_filenames() {
        assert_eq!(
            report_filename(fixed_time(), "txt"),
            "report_2024-01-15T10-30-05-000000Z.txt"
        );
        assert_eq!(
            table_filename("cache", fixed_time(), "json.zst"),
            "table_cache_2024-01-15T10-30-05-000000Z.json.zst"
        );
        assert_eq!(
            table_filename("#Tid<7>", fixed_time(), "txt"),
            "table__Tid_7__2024-01-15T10-30-05-000000Z.txt"
        );
        assert_eq!(
            table_filename("../etc/passwd", fixed_time(), "txt"),
            "table____etc_passwd_2024-01-15T10-30-05-000000Z.txt"
        );
    }

    #[test]
    fn test_uncompressed_encoding_is_identity() {
        assert_eq!(encode("abc".to_string(), false).unwrap(), b"abc");
    }

    #[cfg(not(feature = "compression"))]
    #[test]
    fn test_compression_requires_feature() {
        assert!(encode("abc".to_string(), true).is_err());
    }

    #[cfg(feature = "compression")]
    #[test]
    fn test_compression_roundtrip() {
        let text = "entry ".repeat(1000);
        let bytes = encode(text.clone(), true).unwrap();
        assert!(bytes.len() < text.len());
        let decoded = zstd::decode_all(bytes.as_slice()).unwrap();
        assert_eq!(decoded, text.as_bytes());
    }
}
