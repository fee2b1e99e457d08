use std::collections::HashSet;

use crate::record::Record;
use crate::schema::Field;

/// An ordered table of records with a named column list.
///
/// The column list is the dataset's shape. Records may omit columns; codecs
/// render those cells as empty or null.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Record>,
}

impl Dataset {
    /// Builds a dataset whose columns are the union of the records' fields,
    /// in order of first appearance.
    pub fn from_records(rows: Vec<Record>) -> Self {
        let mut columns: Vec<String> = Vec::new();
        for row in &rows {
            for column in row.columns() {
                if !columns.iter().any(|c| c == column) {
                    columns.push(column.to_string());
                }
            }
        }
        Self { columns, rows }
    }

    /// Builds a dataset with an explicit column list, as read back from a
    /// file. Fields of `rows` not named in `columns` are appended as columns.
    pub fn with_columns(columns: Vec<String>, rows: Vec<Record>) -> Self {
        let mut dataset = Self::from_records(rows);
        let extra: Vec<String> = dataset
            .columns
            .drain(..)
            .filter(|c| !columns.contains(c))
            .collect();
        dataset.columns = columns;
        dataset.columns.extend(extra);
        dataset
    }

    /// Builds a dataset shaped by the full snapshot schema, so records missing
    /// an optional field still produce every schema column.
    pub fn snapshot(rows: Vec<Record>) -> Self {
        let columns = Field::ALL.iter().map(|f| f.as_str().to_string()).collect();
        Self::with_columns(columns, rows)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Record] {
        &self.rows
    }

    pub fn into_rows(self) -> Vec<Record> {
        self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Two datasets have the same shape when they name the same columns,
    /// regardless of column order.
    pub fn same_shape(&self, other: &Dataset) -> bool {
        let ours: HashSet<&str> = self.columns.iter().map(String::as_str).collect();
        let theirs: HashSet<&str> = other.columns.iter().map(String::as_str).collect();
        ours == theirs
    }

    /// Cell value at `row` for `column`, if the record carries that field.
    pub fn cell(&self, row: usize, column: &str) -> Option<&str> {
        self.rows.get(row).and_then(|r| r.get(column))
    }
}
