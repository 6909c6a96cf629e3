//! Reference adapter over a dated table of raw feature columns.
//!
//! ## CSV contract
//!
//! | Column     | Type / example | Notes                                         |
//! |------------|----------------|-----------------------------------------------|
//! | `date`     | `2024-01-31`   | First column, ISO date                        |
//! | any other  | `1,234.5`      | Float; thousands separators and blanks allowed |
//!
//! A feature token selects every column named exactly like the token, or
//! whose first whitespace-separated word is the token (`"rsi 14"` backs
//! `rsi`). Blank cells load as `NaN`.

use std::fmt;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use fcx_schemas::{Dataset, FeatureCombination, ParameterPeriod};
use tracing::debug;

use crate::normalize::min_max_normalize;
use crate::{EngineeringAdapter, EngineeringContext, EngineeringError};

/// Config pointer read from the context by the windowed adapter.
pub const MIN_ROWS_POINTER: &str = "/engineering/min_rows";

// ---------------------------------------------------------------------------
// Source errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceError {
    Io(String),
    /// First header is not `date`.
    MissingDateColumn,
    ParseDate { row: usize, raw: String },
    ParseValue { row: usize, column: String, raw: String },
    /// `dates` and matrix rows differ in length.
    Misaligned { dates: usize, rows: usize },
}

impl fmt::Display for SourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceError::Io(msg) => write!(f, "source io error: {msg}"),
            SourceError::MissingDateColumn => write!(f, "source csv must start with a 'date' column"),
            SourceError::ParseDate { row, raw } => {
                write!(f, "source row {row}: cannot parse date '{raw}'")
            }
            SourceError::ParseValue { row, column, raw } => {
                write!(f, "source row {row}: cannot parse '{column}' from '{raw}'")
            }
            SourceError::Misaligned { dates, rows } => {
                write!(f, "source has {dates} date(s) but {rows} row(s)")
            }
        }
    }
}

impl std::error::Error for SourceError {}

// ---------------------------------------------------------------------------
// Source table
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct SourceTable {
    dates: Vec<NaiveDate>,
    data: Dataset,
}

impl SourceTable {
    pub fn new(dates: Vec<NaiveDate>, data: Dataset) -> Result<Self, SourceError> {
        if dates.len() != data.n_rows() {
            return Err(SourceError::Misaligned {
                dates: dates.len(),
                rows: data.n_rows(),
            });
        }
        Ok(Self { dates, data })
    }

    pub fn from_csv_path(path: &Path) -> Result<Self, SourceError> {
        let file = std::fs::File::open(path)
            .map_err(|e| SourceError::Io(format!("open '{}': {e}", path.display())))?;
        Self::from_csv_reader(file)
    }

    pub fn from_csv_str(src: &str) -> Result<Self, SourceError> {
        Self::from_csv_reader(src.as_bytes())
    }

    pub fn from_csv_reader<R: Read>(reader: R) -> Result<Self, SourceError> {
        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let headers = rdr
            .headers()
            .map_err(|e| SourceError::Io(e.to_string()))?
            .clone();
        let first = headers.get(0).map(|h| h.trim_start_matches('\u{feff}'));
        if !first.is_some_and(|h| h.eq_ignore_ascii_case("date")) {
            return Err(SourceError::MissingDateColumn);
        }
        let columns: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();

        let mut dates = Vec::new();
        let mut rows = Vec::new();
        for (i, rec) in rdr.records().enumerate() {
            let row_num = i + 2; // 1-based, header = 1
            let rec = rec.map_err(|e| SourceError::Io(e.to_string()))?;

            let raw_date = rec.get(0).unwrap_or_default();
            let date = NaiveDate::parse_from_str(raw_date, "%Y-%m-%d").map_err(|_| {
                SourceError::ParseDate {
                    row: row_num,
                    raw: raw_date.to_string(),
                }
            })?;

            let mut values = Vec::with_capacity(columns.len());
            for (j, column) in columns.iter().enumerate() {
                let raw = rec.get(j + 1).unwrap_or_default();
                values.push(parse_value(raw).ok_or_else(|| SourceError::ParseValue {
                    row: row_num,
                    column: column.clone(),
                    raw: raw.to_string(),
                })?);
            }

            dates.push(date);
            rows.push(values);
        }

        let data = Dataset::new(columns, rows).map_err(|e| SourceError::Io(e.to_string()))?;
        Self::new(dates, data)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn data(&self) -> &Dataset {
        &self.data
    }

    /// Indices of the columns backing `token`, in table order.
    pub fn columns_for(&self, token: &str) -> Vec<usize> {
        self.data
            .columns()
            .iter()
            .enumerate()
            .filter(|(_, name)| name.as_str() == token || first_word(name) == token)
            .map(|(i, _)| i)
            .collect()
    }
}

fn parse_value(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return Some(f64::NAN);
    }
    cleaned.parse().ok()
}

fn first_word(name: &str) -> &str {
    name.split_whitespace().next().unwrap_or(name)
}

// ---------------------------------------------------------------------------
// Adapter
// ---------------------------------------------------------------------------

/// Builds a combination's dataset by selecting the source columns of each of
/// its tokens, relabelling them to their first word, dropping repeated labels
/// (first wins) and min-max normalizing the result.
///
/// The windowed variant requires an [`EngineeringContext`] and keeps only
/// rows dated inside `[start, end]`.
#[derive(Debug, Clone)]
pub struct TableAdapter {
    source: SourceTable,
    windowed: bool,
}

impl TableAdapter {
    pub fn new(source: SourceTable) -> Self {
        Self {
            source,
            windowed: false,
        }
    }

    pub fn windowed(source: SourceTable) -> Self {
        Self {
            source,
            windowed: true,
        }
    }

    pub fn is_windowed(&self) -> bool {
        self.windowed
    }

    pub fn source(&self) -> &SourceTable {
        &self.source
    }

    fn selected_rows(&self, ctx: Option<&EngineeringContext>) -> Result<Vec<usize>, EngineeringError> {
        if !self.windowed {
            return Ok((0..self.source.dates.len()).collect());
        }

        let ctx = ctx.ok_or(EngineeringError::MissingContext)?;
        let min_rows = ctx
            .config
            .pointer(MIN_ROWS_POINTER)
            .and_then(|v| v.as_u64())
            .unwrap_or(1) as usize;

        let rows: Vec<usize> = self
            .source
            .dates
            .iter()
            .enumerate()
            .filter(|(_, d)| ctx.contains(**d))
            .map(|(i, _)| i)
            .collect();

        if rows.len() < min_rows {
            return Err(EngineeringError::InsufficientRows {
                got: rows.len(),
                min: min_rows,
            });
        }
        Ok(rows)
    }
}

impl EngineeringAdapter for TableAdapter {
    fn name(&self) -> &'static str {
        if self.windowed {
            "table-windowed"
        } else {
            "table"
        }
    }

    fn compute_one(
        &self,
        combination: &FeatureCombination,
        period: ParameterPeriod,
        ctx: Option<&EngineeringContext>,
    ) -> Result<Dataset, EngineeringError> {
        let rows = self.selected_rows(ctx)?;
        let data = self.source.data();

        let mut merged: Vec<(String, Vec<f64>)> = Vec::new();
        for token in combination.tokens() {
            let cols = self.source.columns_for(token);
            if cols.is_empty() {
                return Err(EngineeringError::UnknownFeature(token.clone()));
            }
            for c in cols {
                let label = first_word(&data.columns()[c]).to_string();
                if merged.iter().any(|(l, _)| *l == label) {
                    continue;
                }
                let values = rows.iter().map(|&r| data.rows()[r][c]).collect();
                merged.push((label, values));
            }
        }

        debug!(
            combination = %combination,
            period = %period,
            rows = rows.len(),
            cols = merged.len(),
            "table features selected"
        );

        let dataset =
            Dataset::from_columns(merged).map_err(|e| EngineeringError::Shape(e.to_string()))?;
        Ok(min_max_normalize(&dataset))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CSV: &str = "\
date,close,rsi 14,rsi 28,macd
2024-01-01,100,30,40,\"1,000\"
2024-01-02,110,50,45,2000
2024-01-03,105,70,,1500
";

    #[test]
    fn csv_loads_dates_and_values() {
        let t = SourceTable::from_csv_str(CSV).unwrap();
        assert_eq!(t.dates().len(), 3);
        assert_eq!(t.data().column("macd").unwrap(), vec![1000.0, 2000.0, 1500.0]);
        assert!(t.data().column("rsi 28").unwrap()[2].is_nan());
    }

    #[test]
    fn csv_without_date_column_is_rejected() {
        let err = SourceTable::from_csv_str("close\n1\n").unwrap_err();
        assert_eq!(err, SourceError::MissingDateColumn);
    }

    #[test]
    fn csv_bad_value_reports_row_and_column() {
        let err = SourceTable::from_csv_str("date,close\n2024-01-01,abc\n").unwrap_err();
        assert_eq!(
            err,
            SourceError::ParseValue {
                row: 2,
                column: "close".to_string(),
                raw: "abc".to_string()
            }
        );
    }

    #[test]
    fn token_matches_first_word_of_column() {
        let t = SourceTable::from_csv_str(CSV).unwrap();
        assert_eq!(t.columns_for("rsi"), vec![1, 2]);
        assert_eq!(t.columns_for("rsi 14"), vec![1]);
        assert!(t.columns_for("obv").is_empty());
    }
}
