//! CSV and JSON export of the current record list.

use std::fmt;
use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::stats::PackageStat;

/// Exported columns, in order.
pub const EXPORT_FIELDS: [&str; 8] = [
    "name",
    "translated_pct",
    "untranslated",
    "need_review",
    "changed",
    "total",
    "last_edited",
    "last_editor",
];

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV encoding failed: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON encoding failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Failed to write export: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unknown export format: {0}")]
    UnknownFormat(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Csv,
    Json,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }

    /// Suggested file name, `ubuntu-l10n.<ext>`.
    pub fn default_file_name(&self) -> String {
        format!("ubuntu-l10n.{}", self.extension())
    }

    /// Format implied by a file name's extension.
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| ext.to_ascii_lowercase().parse().ok())
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = ExportError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "csv" => Ok(ExportFormat::Csv),
            "json" => Ok(ExportFormat::Json),
            other => Err(ExportError::UnknownFormat(other.to_string())),
        }
    }
}

#[derive(Serialize)]
struct ExportRow<'a> {
    name: &'a str,
    translated_pct: f64,
    untranslated: u64,
    need_review: u64,
    changed: u64,
    total: u64,
    last_edited: &'a str,
    last_editor: &'a str,
}

impl<'a> From<&'a PackageStat> for ExportRow<'a> {
    fn from(p: &'a PackageStat) -> Self {
        Self {
            name: &p.name,
            translated_pct: p.translated_pct,
            untranslated: p.untranslated,
            need_review: p.need_review,
            changed: p.changed,
            total: p.total,
            last_edited: &p.last_edited,
            last_editor: &p.last_editor,
        }
    }
}

/// Encode `records` in `format`.
pub fn export(records: &[PackageStat], format: ExportFormat) -> Result<Vec<u8>, ExportError> {
    match format {
        ExportFormat::Csv => to_csv(records),
        ExportFormat::Json => to_json(records),
    }
}

/// Encode `records` and write them to `path`.
pub fn export_to_path(
    records: &[PackageStat],
    format: ExportFormat,
    path: &Path,
) -> Result<(), ExportError> {
    let encoded = export(records, format)?;
    std::fs::write(path, encoded)?;
    Ok(())
}

fn to_csv(records: &[PackageStat]) -> Result<Vec<u8>, ExportError> {
    // Header written by hand so an empty export still has one
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(EXPORT_FIELDS)?;
    for record in records {
        writer.serialize(ExportRow::from(record))?;
    }
    writer
        .into_inner()
        .map_err(|e| ExportError::Io(e.into_error()))
}

fn to_json(records: &[PackageStat]) -> Result<Vec<u8>, ExportError> {
    let rows: Vec<ExportRow<'_>> = records.iter().map(ExportRow::from).collect();
    Ok(serde_json::to_vec_pretty(&rows)?)
}
