//! Flat-file backend: one UTF-8 CSV file per table.
//!
//! Appends write in place. Cell and row updates have no point-update primitive,
//! so they rewrite the whole file through a temporary sibling and a rename.

use std::fs::{self, File, OpenOptions};
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use csv::{ReaderBuilder, WriterBuilder};
use tracing::{debug, info};

use super::{check_header, fit_row, TableBackend};
use crate::error::{CrmError, Result};
use crate::schema::TableSpec;
use crate::table::Table;

/// Stores each table as `<data_dir>/<table>.csv`.
#[derive(Debug, Clone)]
pub struct CsvBackend {
    data_dir: PathBuf,
}

impl CsvBackend {
    /// Backend rooted at `data_dir`. The directory is created on first use.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    /// File backing `spec`.
    #[must_use]
    pub fn table_path(&self, spec: &TableSpec) -> PathBuf {
        self.data_dir.join(format!("{}.csv", spec.name))
    }

    fn write_table(&self, spec: &TableSpec, table: &Table) -> Result<()> {
        let path = self.table_path(spec);
        let tmp_path = path.with_extension("csv.tmp");
        {
            let file = File::create(&tmp_path)?;
            let mut writer = WriterBuilder::new().flexible(true).from_writer(BufWriter::new(file));
            writer.write_record(table.header())?;
            for row in table.rows() {
                writer.write_record(row)?;
            }
            writer.flush()?;
        }
        fs::rename(&tmp_path, &path)?;
        debug!(table = spec.name, rows = table.len(), path = %path.display(), "Rewrote table file");
        Ok(())
    }

    fn patch<F>(&self, spec: &TableSpec, row_index: usize, apply: F) -> Result<()>
    where
        F: FnOnce(&Table, &mut Vec<String>) -> Result<()>,
    {
        let mut table = self.read_table(spec)?;
        let snapshot = table.clone();
        let row = table.row_mut(row_index).ok_or_else(|| CrmError::RowOutOfRange {
            table: spec.name.to_string(),
            index: row_index,
        })?;
        apply(&snapshot, row)?;
        self.write_table(spec, &table)
    }
}

fn is_missing_or_empty(path: &Path) -> Result<bool> {
    match fs::metadata(path) {
        Ok(meta) => Ok(meta.len() == 0),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(true),
        Err(e) => Err(e.into()),
    }
}

impl TableBackend for CsvBackend {
    fn kind(&self) -> &'static str {
        "csv"
    }

    fn ensure_table(&self, spec: &TableSpec) -> Result<bool> {
        fs::create_dir_all(&self.data_dir)?;
        let path = self.table_path(spec);
        if !is_missing_or_empty(&path)? {
            let mut reader = ReaderBuilder::new().has_headers(true).from_path(&path)?;
            let found: Vec<String> = reader.headers()?.iter().map(ToString::to_string).collect();
            check_header(spec, &found)?;
            return Ok(false);
        }

        let mut writer = WriterBuilder::new().from_path(&path)?;
        writer.write_record(spec.header)?;
        writer.flush()?;
        info!(table = spec.name, path = %path.display(), "Created table file");
        Ok(true)
    }

    fn read_table(&self, spec: &TableSpec) -> Result<Table> {
        let path = self.table_path(spec);
        let mut reader = ReaderBuilder::new()
            .has_headers(true)
            .flexible(true)
            .from_path(&path)?;

        let header = reader.headers()?.iter().map(ToString::to_string).collect();
        let mut table = Table::new(header);
        for record in reader.records() {
            let record = record?;
            table.push_row(record.iter().map(ToString::to_string).collect());
        }

        debug!(table = spec.name, rows = table.len(), "Read table file");
        Ok(table)
    }

    fn append_row(&self, spec: &TableSpec, row: &[String]) -> Result<()> {
        let path = self.table_path(spec);
        let file = OpenOptions::new().append(true).open(&path)?;
        let mut writer = WriterBuilder::new().has_headers(false).from_writer(file);
        writer.write_record(fit_row(spec, row))?;
        writer.flush()?;
        Ok(())
    }

    fn update_cell(&self, spec: &TableSpec, row_index: usize, column: &str, value: &str) -> Result<()> {
        self.patch(spec, row_index, |table, cells| {
            let col = table.column_index(column).ok_or_else(|| CrmError::UnknownColumn {
                table: spec.name.to_string(),
                column: column.to_string(),
            })?;
            if cells.len() <= col {
                cells.resize(col + 1, String::new());
            }
            cells[col] = value.to_string();
            Ok(())
        })
    }

    fn update_row(&self, spec: &TableSpec, row_index: usize, row: &[String]) -> Result<()> {
        self.patch(spec, row_index, |_, cells| {
            *cells = fit_row(spec, row);
            Ok(())
        })
    }
}
