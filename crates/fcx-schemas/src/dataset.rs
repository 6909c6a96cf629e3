//! Labeled numeric matrices and their storage-neutral columnar form.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Row-major labeled matrix: rows are observations, columns are derived
/// feature values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<f64>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasetShapeError {
    /// A row's width differs from the number of column labels.
    RaggedRow {
        row: usize,
        expected: usize,
        got: usize,
    },
    /// A stored column's length differs from the first column's length.
    RaggedColumn {
        column: String,
        expected: usize,
        got: usize,
    },
}

impl fmt::Display for DatasetShapeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DatasetShapeError::RaggedRow { row, expected, got } => {
                write!(f, "row {row} has {got} values, expected {expected}")
            }
            DatasetShapeError::RaggedColumn {
                column,
                expected,
                got,
            } => write!(f, "column '{column}' has {got} values, expected {expected}"),
        }
    }
}

impl std::error::Error for DatasetShapeError {}

impl Dataset {
    pub fn new(columns: Vec<String>, rows: Vec<Vec<f64>>) -> Result<Self, DatasetShapeError> {
        for (i, r) in rows.iter().enumerate() {
            if r.len() != columns.len() {
                return Err(DatasetShapeError::RaggedRow {
                    row: i,
                    expected: columns.len(),
                    got: r.len(),
                });
            }
        }
        Ok(Self { columns, rows })
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty() || self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Values of column `idx`, top to bottom; `None` past the last column.
    pub fn column_values(&self, idx: usize) -> Option<Vec<f64>> {
        if idx >= self.columns.len() {
            return None;
        }
        Some(self.rows.iter().map(|r| r[idx]).collect())
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        self.column_index(name).and_then(|i| self.column_values(i))
    }

    /// Build from column-major data. All columns must share a length.
    pub fn from_columns(columns: Vec<(String, Vec<f64>)>) -> Result<Self, DatasetShapeError> {
        let n_rows = columns.first().map(|(_, v)| v.len()).unwrap_or(0);
        for (name, values) in &columns {
            if values.len() != n_rows {
                return Err(DatasetShapeError::RaggedColumn {
                    column: name.clone(),
                    expected: n_rows,
                    got: values.len(),
                });
            }
        }
        let mut rows = vec![Vec::with_capacity(columns.len()); n_rows];
        for (_, values) in &columns {
            for (row, v) in rows.iter_mut().zip(values) {
                row.push(*v);
            }
        }
        Ok(Self {
            columns: columns.into_iter().map(|(name, _)| name).collect(),
            rows,
        })
    }

    /// Storage-neutral column-oriented form. Non-finite values become `None`.
    pub fn to_columnar(&self) -> ColumnarDataset {
        let columns = self
            .columns
            .iter()
            .enumerate()
            .map(|(i, name)| StoredColumn {
                name: name.clone(),
                values: self
                    .rows
                    .iter()
                    .map(|r| Some(r[i]).filter(|v| v.is_finite()))
                    .collect(),
            })
            .collect();
        ColumnarDataset { columns }
    }

    /// Rebuild from the columnar form. `None` comes back as `NaN`.
    pub fn from_columnar(stored: ColumnarDataset) -> Result<Self, DatasetShapeError> {
        Self::from_columns(
            stored
                .columns
                .into_iter()
                .map(|c| {
                    let values = c.values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect();
                    (c.name, values)
                })
                .collect(),
        )
    }
}

/// One named column with its ordered values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredColumn {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

/// Column name -> ordered value list, with column order preserved.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ColumnarDataset {
    pub columns: Vec<StoredColumn>,
}
