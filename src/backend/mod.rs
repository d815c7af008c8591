//! Storage backends for the record store.
//!
//! A backend persists named tables of string cells. The stores only talk to the
//! [`TableBackend`] trait, so the flat-file and SQLite implementations are
//! interchangeable, and a backend that could not be reached is replaced by
//! [`UnavailableBackend`].

mod csv_file;
mod sqlite;

pub use csv_file::CsvBackend;
pub use sqlite::SqliteBackend;

use crate::error::{CrmError, Result};
use crate::schema::TableSpec;
use crate::table::Table;

/// Row-oriented table storage.
///
/// Row indices are zero-based positions among the data rows, in storage order.
pub trait TableBackend {
    /// Short backend name for logs and metrics.
    fn kind(&self) -> &'static str;

    /// Create the table with its header if it does not exist.
    ///
    /// Returns `true` when the table was created. Never touches existing rows.
    fn ensure_table(&self, spec: &TableSpec) -> Result<bool>;

    /// Read the whole table in storage order.
    fn read_table(&self, spec: &TableSpec) -> Result<Table>;

    /// Append one row at the end of the table.
    fn append_row(&self, spec: &TableSpec, row: &[String]) -> Result<()>;

    /// Overwrite a single cell.
    fn update_cell(&self, spec: &TableSpec, row_index: usize, column: &str, value: &str) -> Result<()>;

    /// Overwrite every cell of one row.
    fn update_row(&self, spec: &TableSpec, row_index: usize, row: &[String]) -> Result<()>;
}

/// Stand-in for a backend that failed at construction. Every call fails with
/// the diagnostic captured at that time.
#[derive(Debug, Clone)]
pub struct UnavailableBackend {
    reason: String,
}

impl UnavailableBackend {
    /// Wrap the construction failure.
    pub fn new(reason: impl Into<String>) -> Self {
        Self { reason: reason.into() }
    }

    fn fail<T>(&self, spec: &TableSpec) -> Result<T> {
        Err(CrmError::Unavailable {
            table: spec.name.to_string(),
            reason: self.reason.clone(),
        })
    }
}

impl TableBackend for UnavailableBackend {
    fn kind(&self) -> &'static str {
        "unavailable"
    }

    fn ensure_table(&self, spec: &TableSpec) -> Result<bool> {
        self.fail(spec)
    }

    fn read_table(&self, spec: &TableSpec) -> Result<Table> {
        self.fail(spec)
    }

    fn append_row(&self, spec: &TableSpec, _row: &[String]) -> Result<()> {
        self.fail(spec)
    }

    fn update_cell(&self, spec: &TableSpec, _row_index: usize, _column: &str, _value: &str) -> Result<()> {
        self.fail(spec)
    }

    fn update_row(&self, spec: &TableSpec, _row_index: usize, _row: &[String]) -> Result<()> {
        self.fail(spec)
    }
}

/// Pad or truncate `row` to the header width so every stored row is rectangular.
pub(crate) fn fit_row(spec: &TableSpec, row: &[String]) -> Vec<String> {
    let mut cells = row.to_vec();
    cells.resize(spec.header.len(), String::new());
    cells
}

/// Fail when an existing table's header is not the schema's column list.
pub(crate) fn check_header(spec: &TableSpec, found: &[String]) -> Result<()> {
    let matches = found.len() == spec.header.len() && found.iter().zip(spec.header).all(|(f, h)| f.trim().trim_start_matches('\u{feff}') == *h);
    if matches {
        return Ok(());
    }
    let found = found.join(",");
    tracing::warn!(table = spec.name, found = found.as_str(), "Existing table has an unexpected header");
    Err(CrmError::HeaderMismatch {
        table: spec.name.to_string(),
        found,
    })
}
