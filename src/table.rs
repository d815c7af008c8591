//! In-memory table snapshots.
//!
//! A [`Table`] is the full materialization of one stored table at a single load:
//! a header plus rows of string cells in storage order. Rows are not validated on
//! load, so a row may be shorter than the header. [`RowView`] gives guarded,
//! by-name access that returns `None` for a missing column or cell.

use serde::Serialize;

use crate::schema::TableSpec;

/// Header plus rows, exactly as stored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Table {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Table {
    /// Create an empty table with the given header.
    #[must_use]
    pub const fn new(header: Vec<String>) -> Self {
        Self {
            header,
            rows: Vec::new(),
        }
    }

    /// Create a table from a header and rows.
    #[must_use]
    pub const fn from_parts(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// An empty table carrying the schema's header.
    #[must_use]
    pub fn empty(spec: &TableSpec) -> Self {
        Self::new(spec.header_row())
    }

    /// Column names in storage order.
    #[must_use]
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Raw rows in storage order.
    #[must_use]
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when there are no data rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Index of `column` in the header.
    #[must_use]
    pub fn column_index(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|c| c == column)
    }

    /// True when the header names `column`.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.column_index(column).is_some()
    }

    /// Append a row.
    pub fn push_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    /// Row at `index`.
    #[must_use]
    pub fn row(&self, index: usize) -> Option<RowView<'_>> {
        self.rows.get(index).map(|cells| RowView {
            table: self,
            index,
            cells,
        })
    }

    /// Mutable cells of the row at `index`.
    pub fn row_mut(&mut self, index: usize) -> Option<&mut Vec<String>> {
        self.rows.get_mut(index)
    }

    /// Iterate rows in storage order.
    pub fn iter(&self) -> impl Iterator<Item = RowView<'_>> {
        self.rows.iter().enumerate().map(move |(index, cells)| RowView {
            table: self,
            index,
            cells,
        })
    }

    /// Index of the first row whose `column` equals `value` exactly.
    #[must_use]
    pub fn find_row(&self, column: &str, value: &str) -> Option<usize> {
        let col = self.column_index(column)?;
        self.rows
            .iter()
            .position(|row| row.get(col).is_some_and(|cell| cell == value))
    }

    /// A new table with the same header and the given rows.
    #[must_use]
    pub fn with_rows(&self, rows: Vec<Vec<String>>) -> Self {
        Self {
            header: self.header.clone(),
            rows,
        }
    }

    /// A new table keeping only the rows for which `keep` returns true.
    #[must_use]
    pub fn filter_rows<F>(&self, mut keep: F) -> Self
    where
        F: FnMut(&RowView<'_>) -> bool,
    {
        let rows = self
            .iter()
            .filter(|row| keep(row))
            .map(|row| row.cells.to_vec())
            .collect();
        self.with_rows(rows)
    }
}

/// A borrowed row with column access by name.
#[derive(Debug, Clone, Copy)]
pub struct RowView<'a> {
    table: &'a Table,
    index: usize,
    cells: &'a [String],
}

impl<'a> RowView<'a> {
    /// Cell under `column`, or `None` when the column or the cell is missing.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&'a str> {
        let col = self.table.column_index(column)?;
        self.cells.get(col).map(String::as_str)
    }

    /// Cell under `column`, or the empty string.
    #[must_use]
    pub fn get_or_empty(&self, column: &str) -> &'a str {
        self.get(column).unwrap_or("")
    }

    /// Position in the table's storage order.
    #[must_use]
    pub const fn index(&self) -> usize {
        self.index
    }
}
