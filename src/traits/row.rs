//! Backend-agnostic row containers.
//!
//! This module contains:
//! - `TabularBatch` - A header row plus data rows submitted for writing
//! - `ResultSet` - The header plus data rows returned by every read path

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{Error, Result};

/// Text shown for a missing or NULL cell when a result set is flattened.
pub const NULL_DISPLAY: &str = "NULL";

/// A batch of rows to write: the header names the columns, every data row
/// must have exactly one value per column.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TabularBatch {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TabularBatch {
    /// Create a batch from a header and data rows.
    ///
    /// Nothing is checked here; [`TabularBatch::validate`] runs before any write.
    pub fn new(header: Vec<String>, rows: Vec<Vec<String>>) -> Self {
        Self { header, rows }
    }

    /// Create a batch from row-major records where record 0 is the header.
    pub fn from_records(records: Vec<Vec<String>>) -> Result<Self> {
        let mut records = records.into_iter();
        let header = records
            .next()
            .ok_or_else(|| Error::InvalidBatch("batch has no header row".to_string()))?;
        Ok(Self::new(header, records.collect()))
    }

    /// Column names, in order
    pub fn header(&self) -> &[String] {
        &self.header
    }

    /// Data rows, header excluded
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the batch has no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Data rows paired with their 1-based position in the batch.
    ///
    /// The position is the row's index in the record layout (header at 0), which
    /// is what key-value keys and document identifiers are built from.
    pub fn numbered_rows(&self) -> impl Iterator<Item = (usize, &[String])> {
        self.rows
            .iter()
            .enumerate()
            .map(|(idx, row)| (idx + 1, row.as_slice()))
    }

    /// Check the header and the arity of every data row.
    pub fn validate(&self) -> Result<()> {
        if self.header.is_empty() {
            return Err(Error::InvalidBatch("header has no columns".to_string()));
        }

        let mut seen = HashSet::with_capacity(self.header.len());
        for name in &self.header {
            if name.is_empty() {
                return Err(Error::InvalidBatch("header has an empty column name".to_string()));
            }
            if !seen.insert(name.as_str()) {
                return Err(Error::InvalidBatch(format!("duplicate column `{}`", name)));
            }
        }

        let expected = self.header.len();
        for (row, values) in self.numbered_rows() {
            if values.len() != expected {
                return Err(Error::SchemaMismatch {
                    row,
                    expected,
                    actual: values.len(),
                });
            }
        }
        Ok(())
    }

    /// Flatten back into row-major records, header first.
    pub fn to_records(&self) -> Vec<Vec<String>> {
        std::iter::once(self.header.clone())
            .chain(self.rows.iter().cloned())
            .collect()
    }
}

/// Rows returned by a read. The columns come from the caller's filter list,
/// not from the backend.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResultSet {
    /// Column names, in filter order
    pub columns: Vec<String>,
    /// Data rows; `None` is a missing or NULL cell
    pub rows: Vec<Vec<Option<String>>>,
}

impl ResultSet {
    /// Create an empty result set with the given columns
    pub fn new(columns: Vec<String>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
        }
    }

    /// Append a data row
    pub fn push_row(&mut self, row: Vec<Option<String>>) {
        debug_assert_eq!(row.len(), self.columns.len());
        self.rows.push(row);
    }

    /// Number of data rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether there are no data rows
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Position of a column in the header
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Get a cell by row index and column name
    pub fn get(&self, row: usize, column: &str) -> Option<&str> {
        let idx = self.column_index(column)?;
        self.rows.get(row)?.get(idx)?.as_deref()
    }

    /// Flatten into row-major records: header first, NULL cells as [`NULL_DISPLAY`].
    pub fn records(&self) -> Vec<Vec<String>> {
        let data = self.rows.iter().map(|row| {
            row.iter()
                .map(|cell| cell.clone().unwrap_or_else(|| NULL_DISPLAY.to_string()))
                .collect()
        });
        std::iter::once(self.columns.clone()).chain(data).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn albums() -> TabularBatch {
        TabularBatch::from_records(vec![
            strings(&["title", "artist", "price"]),
            strings(&["Blue Train", "John Coltrane", "56.99"]),
            strings(&["Giant Steps", "John Coltrane", "63.99"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_batch_from_records() {
        let batch = albums();
        assert_eq!(batch.header(), strings(&["title", "artist", "price"]).as_slice());
        assert_eq!(batch.len(), 2);
        assert!(batch.validate().is_ok());
        assert_eq!(batch.to_records().len(), 3);
    }

    #[test]
    fn test_batch_without_header() {
        assert!(matches!(
            TabularBatch::from_records(vec![]),
            Err(Error::InvalidBatch(_))
        ));
    }

    #[test]
    fn test_numbered_rows_are_one_based() {
        let batch = albums();
        let positions: Vec<usize> = batch.numbered_rows().map(|(i, _)| i).collect();
        assert_eq!(positions, vec![1, 2]);
    }

    #[test]
    fn test_arity_mismatch_reports_row() {
        let batch = TabularBatch::new(
            strings(&["title", "artist", "price"]),
            vec![
                strings(&["Blue Train", "John Coltrane", "56.99"]),
                strings(&["Jeru", "Gerry Mulligan"]),
            ],
        );

        match batch.validate() {
            Err(Error::SchemaMismatch {
                row,
                expected,
                actual,
            }) => {
                assert_eq!(row, 2);
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("expected schema mismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_header_checks() {
        let empty = TabularBatch::new(vec![], vec![]);
        assert!(matches!(empty.validate(), Err(Error::InvalidBatch(_))));

        let dup = TabularBatch::new(strings(&["a", "b", "a"]), vec![]);
        assert!(matches!(dup.validate(), Err(Error::InvalidBatch(_))));

        let blank = TabularBatch::new(strings(&["a", ""]), vec![]);
        assert!(matches!(blank.validate(), Err(Error::InvalidBatch(_))));

        let header_only = TabularBatch::new(strings(&["a"]), vec![]);
        assert!(header_only.validate().is_ok());
        assert!(header_only.is_empty());
    }

    #[test]
    fn test_result_set_records_use_placeholder() {
        let mut rs = ResultSet::new(strings(&["title", "price"]));
        rs.push_row(vec![Some("Jeru".to_string()), None]);

        assert_eq!(rs.len(), 1);
        assert_eq!(rs.get(0, "title"), Some("Jeru"));
        assert_eq!(rs.get(0, "price"), None);
        assert_eq!(rs.get(0, "missing"), None);
        assert_eq!(
            rs.records(),
            vec![strings(&["title", "price"]), strings(&["Jeru", NULL_DISPLAY])]
        );
    }
}
