//! Snapshot export.
//!
//! Serializes a displayed view to CSV (same header as its source table) or to a
//! JSON array of objects in column order. CSV output parses back into an
//! identical [`Table`].

use std::fmt;
use std::fs::{create_dir_all, File};
use std::io::{BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use csv::{ReaderBuilder, WriterBuilder};
use serde_json::{Map, Value};
use tracing::info;

use crate::error::{CrmError, Result};
use crate::table::Table;

/// Output format for exported snapshots
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    /// Comma-separated values format
    Csv,
    /// JSON format
    Json,
}

impl ExportFormat {
    /// Get the file extension for this format
    #[must_use]
    pub const fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl FromStr for ExportFormat {
    type Err = CrmError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            other => Err(CrmError::Validation(format!("Unknown export format: {other}"))),
        }
    }
}

/// Write `table` as CSV, header first.
pub fn write_csv<W: Write>(table: &Table, writer: W) -> Result<()> {
    let mut writer = WriterBuilder::new().flexible(true).from_writer(writer);
    writer.write_record(table.header())?;
    for row in table.rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    Ok(())
}

/// CSV document as a string.
pub fn to_csv_string(table: &Table) -> Result<String> {
    let mut buffer = Vec::new();
    write_csv(table, &mut buffer)?;
    String::from_utf8(buffer).map_err(|e| CrmError::Validation(format!("Export is not valid UTF-8: {e}")))
}

/// Parse a CSV document produced by [`write_csv`].
pub fn read_csv<R: Read>(reader: R) -> Result<Table> {
    let mut reader = ReaderBuilder::new().has_headers(true).flexible(true).from_reader(reader);
    let header = reader.headers()?.iter().map(ToString::to_string).collect();
    let mut table = Table::new(header);
    for record in reader.records() {
        table.push_row(record?.iter().map(ToString::to_string).collect());
    }
    Ok(table)
}

/// Parse a CSV string.
pub fn from_csv_str(document: &str) -> Result<Table> {
    read_csv(document.as_bytes())
}

/// Rows as JSON objects keyed by column, in column order. Short rows omit the
/// missing columns.
#[must_use]
pub fn to_json_value(table: &Table) -> Value {
    let rows = table
        .rows()
        .iter()
        .map(|row| {
            let object: Map<String, Value> = table
                .header()
                .iter()
                .zip(row)
                .map(|(column, cell)| (column.clone(), Value::String(cell.clone())))
                .collect();
            Value::Object(object)
        })
        .collect();
    Value::Array(rows)
}

/// Write `table` to `path` in `format`, creating parent directories.
pub fn write_table_to_file(table: &Table, format: ExportFormat, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            create_dir_all(parent)?;
        }
    }
    let file = File::create(path)?;
    let mut writer = BufWriter::new(file);

    match format {
        ExportFormat::Csv => write_csv(table, &mut writer)?,
        ExportFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &to_json_value(table))?;
            writeln!(writer)?;
        },
    }
    writer.flush()?;

    info!(rows = table.len(), format = %format, path = %path.display(), "Exported snapshot");
    Ok(())
}

/// Default export path: `<output_dir>/<table>_<timestamp>.<ext>`.
#[must_use]
pub fn export_path(output_dir: &Path, table_name: &str, format: ExportFormat, timestamp: &str) -> PathBuf {
    output_dir.join(format!("{table_name}_{timestamp}.{}", format.extension()))
}
