//! Tabular listing results
//!
//! The gateway does not interpret listing rows; it hands back whatever
//! columns the store produced. The table only guarantees that every row has
//! exactly as many cells as there are columns.

use crate::errors::{GwError, GwErrorKind};
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BundleTable {
    columns: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl BundleTable {
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a row; its width must match the column count
    pub fn push_row(&mut self, row: Vec<String>) -> Result<(), GwError> {
        if row.len() != self.columns.len() {
            return Err(GwError::new(GwErrorKind::Serialization)
                .with_op("bundle_table_push_row")
                .with_message(format!(
                    "row has {} cells, table has {} columns",
                    row.len(),
                    self.columns.len()
                )));
        }
        self.rows.push(row);
        Ok(())
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Cell by row index and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let col = self.column_index(column)?;
        self.rows.get(row).map(|r| r[col].as_str())
    }
}
