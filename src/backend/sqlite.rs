//! Embedded SQLite backend.
//!
//! Each logical table is a SQLite table of TEXT columns named after the header,
//! ordered by `rowid`. Unlike the flat-file backend, cell and row updates are
//! single targeted `UPDATE` statements.

use std::fs;
use std::path::Path;

use rusqlite::types::ValueRef;
use rusqlite::{params, params_from_iter, Connection};
use tracing::{debug, info};

use super::{check_header, fit_row, TableBackend};
use crate::error::{CrmError, Result};
use crate::schema::TableSpec;
use crate::table::Table;

/// SQLite-backed table storage.
pub struct SqliteBackend {
    conn: Connection,
}

impl SqliteBackend {
    /// Open (or create) the database file.
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let conn = Connection::open(path)?;
        info!(path = %path.display(), "Opened SQLite store");
        Ok(Self { conn })
    }

    /// In-memory database, used by tests.
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self {
            conn: Connection::open_in_memory()?,
        })
    }

    fn column<'s>(spec: &TableSpec, column: &'s str) -> Result<&'s str> {
        spec.position(column)
            .map(|_| column)
            .ok_or_else(|| CrmError::UnknownColumn {
                table: spec.name.to_string(),
                column: column.to_string(),
            })
    }

    // Target the n-th row in storage order without materializing the table.
    fn nth_row_clause(spec: &TableSpec, param: usize) -> String {
        format!(
            "rowid = (SELECT rowid FROM {} ORDER BY rowid LIMIT 1 OFFSET ?{param})",
            quote_ident(spec.name)
        )
    }

    fn expect_one_row(spec: &TableSpec, row_index: usize, changed: usize) -> Result<()> {
        if changed == 0 {
            return Err(CrmError::RowOutOfRange {
                table: spec.name.to_string(),
                index: row_index,
            });
        }
        Ok(())
    }
}

fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn cell_to_string(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => String::from_utf8_lossy(bytes).into_owned(),
    }
}

fn to_offset(row_index: usize) -> i64 {
    i64::try_from(row_index).unwrap_or(i64::MAX)
}

impl TableBackend for SqliteBackend {
    fn kind(&self) -> &'static str {
        "sqlite"
    }

    fn ensure_table(&self, spec: &TableSpec) -> Result<bool> {
        let exists: bool = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = ?1)",
            params![spec.name],
            |row| row.get(0),
        )?;
        if exists {
            let stmt = self.conn.prepare(&format!("SELECT * FROM {} LIMIT 0", quote_ident(spec.name)))?;
            let found: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
            check_header(spec, &found)?;
            return Ok(false);
        }

        let columns = spec
            .header
            .iter()
            .map(|c| format!("{} TEXT NOT NULL DEFAULT ''", quote_ident(c)))
            .collect::<Vec<_>>()
            .join(", ");
        self.conn
            .execute_batch(&format!("CREATE TABLE IF NOT EXISTS {} ({columns})", quote_ident(spec.name)))?;
        info!(table = spec.name, "Created SQLite table");
        Ok(true)
    }

    fn read_table(&self, spec: &TableSpec) -> Result<Table> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT * FROM {} ORDER BY rowid", quote_ident(spec.name)))?;
        let header: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();
        let width = header.len();

        let rows = stmt
            .query_map([], |row| {
                (0..width)
                    .map(|i| row.get_ref(i).map(cell_to_string))
                    .collect::<rusqlite::Result<Vec<String>>>()
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        debug!(table = spec.name, rows = rows.len(), "Read SQLite table");
        Ok(Table::from_parts(header, rows))
    }

    fn append_row(&self, spec: &TableSpec, row: &[String]) -> Result<()> {
        let columns = spec.header.iter().map(|c| quote_ident(c)).collect::<Vec<_>>().join(", ");
        let placeholders = (1..=spec.header.len())
            .map(|i| format!("?{i}"))
            .collect::<Vec<_>>()
            .join(", ");
        self.conn.execute(
            &format!("INSERT INTO {} ({columns}) VALUES ({placeholders})", quote_ident(spec.name)),
            params_from_iter(fit_row(spec, row)),
        )?;
        Ok(())
    }

    fn update_cell(&self, spec: &TableSpec, row_index: usize, column: &str, value: &str) -> Result<()> {
        let column = Self::column(spec, column)?;
        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {} = ?1 WHERE {}",
                quote_ident(spec.name),
                quote_ident(column),
                Self::nth_row_clause(spec, 2)
            ),
            params![value, to_offset(row_index)],
        )?;
        debug!(table = spec.name, row_index, column, "Patched SQLite cell");
        Self::expect_one_row(spec, row_index, changed)
    }

    fn update_row(&self, spec: &TableSpec, row_index: usize, row: &[String]) -> Result<()> {
        let width = spec.header.len();
        let assignments = spec
            .header
            .iter()
            .enumerate()
            .map(|(i, c)| format!("{} = ?{}", quote_ident(c), i + 1))
            .collect::<Vec<_>>()
            .join(", ");

        let mut values: Vec<rusqlite::types::Value> = fit_row(spec, row)
            .into_iter()
            .map(rusqlite::types::Value::Text)
            .collect();
        values.push(rusqlite::types::Value::Integer(to_offset(row_index)));

        let changed = self.conn.execute(
            &format!(
                "UPDATE {} SET {assignments} WHERE {}",
                quote_ident(spec.name),
                Self::nth_row_clause(spec, width + 1)
            ),
            params_from_iter(values),
        )?;
        Self::expect_one_row(spec, row_index, changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::interactions;

    fn row(name: &str, visits: &str) -> Vec<String> {
        let mut cells = vec![String::new(); interactions::HEADER.len()];
        cells[1] = name.to_string();
        cells[9] = visits.to_string();
        cells
    }

    #[test]
    fn test_ensure_table_reports_creation_once() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert!(backend.ensure_table(&interactions::SPEC).unwrap());
        assert!(!backend.ensure_table(&interactions::SPEC).unwrap());
    }

    #[test]
    fn test_existing_table_with_other_columns_is_refused() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend
            .conn
            .execute_batch(&format!("CREATE TABLE {} (\"Name\" TEXT)", quote_ident(interactions::SPEC.name)))
            .unwrap();

        let err = backend.ensure_table(&interactions::SPEC).unwrap_err();
        assert!(matches!(err, CrmError::HeaderMismatch { ref found, .. } if found == "Name"));
    }

    #[test]
    fn test_read_preserves_insertion_order_and_header() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.ensure_table(&interactions::SPEC).unwrap();
        backend.append_row(&interactions::SPEC, &row("Ana", "1")).unwrap();
        backend.append_row(&interactions::SPEC, &row("Bo", "1")).unwrap();

        let table = backend.read_table(&interactions::SPEC).unwrap();
        assert_eq!(table.header(), interactions::SPEC.header_row().as_slice());
        let names: Vec<_> = table.iter().map(|r| r.get_or_empty(interactions::CUSTOMER_NAME)).collect();
        assert_eq!(names, vec!["Ana", "Bo"]);
    }

    #[test]
    fn test_update_cell_targets_nth_row() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.ensure_table(&interactions::SPEC).unwrap();
        backend.append_row(&interactions::SPEC, &row("Ana", "1")).unwrap();
        backend.append_row(&interactions::SPEC, &row("Bo", "1")).unwrap();

        backend
            .update_cell(&interactions::SPEC, 1, interactions::TOTAL_VISITS, "2")
            .unwrap();

        let table = backend.read_table(&interactions::SPEC).unwrap();
        assert_eq!(table.row(0).unwrap().get(interactions::TOTAL_VISITS), Some("1"));
        assert_eq!(table.row(1).unwrap().get(interactions::TOTAL_VISITS), Some("2"));
    }

    #[test]
    fn test_update_row_and_bounds() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        backend.ensure_table(&interactions::SPEC).unwrap();
        backend.append_row(&interactions::SPEC, &row("Ana", "1")).unwrap();

        backend.update_row(&interactions::SPEC, 0, &row("Ana", "5")).unwrap();
        let table = backend.read_table(&interactions::SPEC).unwrap();
        assert_eq!(table.row(0).unwrap().get(interactions::TOTAL_VISITS), Some("5"));

        let err = backend.update_row(&interactions::SPEC, 3, &row("Zed", "1")).unwrap_err();
        assert!(matches!(err, CrmError::RowOutOfRange { index: 3, .. }));

        let err = backend
            .update_cell(&interactions::SPEC, 0, "Shoe Size", "9")
            .unwrap_err();
        assert!(matches!(err, CrmError::UnknownColumn { .. }));
    }

    #[test]
    fn test_read_before_create_fails() {
        let backend = SqliteBackend::open_in_memory().unwrap();
        assert!(backend.read_table(&interactions::SPEC).is_err());
    }
}
