//! The in-memory table model
//!
//! A `Table` is a rectangular block of cells with named, ordered columns.
//! Every pipeline step consumes tables and produces new ones; nothing is
//! mutated in place past construction.

use crate::error::{CoreError, Result};
use crate::types::value::{ColumnType, Value};
use serde::{Deserialize, Serialize};

/// Rectangular table: ordered column names plus row-major cells
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table with the given column names
    pub fn new<S: Into<String>>(columns: Vec<S>) -> Self {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; its arity must match the column count
    pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(CoreError::RowArity {
                expected: self.columns.len(),
                got: row.len(),
            });
        }
        self.rows.push(row);
        Ok(())
    }

    /// Column names, in declared order
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    /// Rows, in insertion order
    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column by name
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Position of a column that must exist
    pub fn require_column(&self, name: &str) -> Result<usize> {
        self.column_index(name)
            .ok_or_else(|| CoreError::ColumnNotFound(name.to_string()))
    }

    /// Cell at (row, column index)
    pub fn get(&self, row: usize, col: usize) -> Option<&Value> {
        self.rows.get(row).and_then(|r| r.get(col))
    }

    /// Iterator over one column's cells
    pub fn column_cells(&self, col: usize) -> impl Iterator<Item = &Value> {
        self.rows.iter().map(move |row| &row[col])
    }

    /// Infer the semantic type of one column
    pub fn infer_column_type(&self, col: usize) -> ColumnType {
        ColumnType::infer(self.column_cells(col))
    }

    /// Apply a cell coercion to every cell of the named column, producing a
    /// new table. The first failing cell aborts with its error.
    pub fn coerce_column<F>(&self, name: &str, coerce: F) -> Result<Table>
    where
        F: Fn(&Value) -> Result<Value>,
    {
        let col = self.require_column(name)?;
        let mut out = self.clone();
        for row in out.rows.iter_mut() {
            row[col] = coerce(&row[col])
                .map_err(|e| CoreError::TypeError(format!("column {:?}: {}", name, e)))?;
        }
        Ok(out)
    }
}
