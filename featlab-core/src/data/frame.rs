//! DataFrame reading and typed column extraction.
//!
//! CSV files are read with every column as text and parsed here, so a FRED
//! style "." placeholder deep in a numeric column does not fail schema
//! inference. Parquet columns arrive typed and are cast as needed.

use chrono::NaiveDate;
use polars::prelude::*;
use std::path::Path;

use super::DataError;

pub fn read_frame(path: &Path) -> Result<DataFrame, DataError> {
    let display = path.display().to_string();
    let read_err = |e: PolarsError| DataError::Read {
        path: display.clone(),
        reason: e.to_string(),
    };
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    match ext.as_deref() {
        Some("parquet") => {
            let file = std::fs::File::open(path).map_err(|source| DataError::Io {
                path: display.clone(),
                source,
            })?;
            ParquetReader::new(file).finish().map_err(read_err)
        }
        Some("csv") => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(path.to_path_buf()))
            .map_err(read_err)?
            .finish()
            .map_err(read_err),
        _ => Err(DataError::UnsupportedFormat(display.clone())),
    }
}

/// Typed view over one source table.
pub struct Table<'a> {
    name: &'a str,
    df: &'a DataFrame,
}

impl<'a> Table<'a> {
    pub fn new(name: &'a str, df: &'a DataFrame) -> Self {
        Self { name, df }
    }

    pub fn height(&self) -> usize {
        self.df.height()
    }

    fn column(&self, column: &str) -> Result<&'a Column, DataError> {
        self.df
            .column(column)
            .map_err(|_| DataError::MissingColumn {
                table: self.name.to_string(),
                column: column.to_string(),
            })
    }

    fn type_error(&self, column: &str, dtype: &DataType) -> DataError {
        DataError::ColumnType {
            table: self.name.to_string(),
            column: column.to_string(),
            dtype: dtype.to_string(),
        }
    }

    /// Trimmed text values; empty strings read as null.
    pub fn strings(&self, column: &str) -> Result<Vec<Option<String>>, DataError> {
        let col = self.column(column)?;
        let cast;
        let col = if col.dtype() == &DataType::String {
            col
        } else {
            cast = col
                .cast(&DataType::String)
                .map_err(|_| self.type_error(column, col.dtype()))?;
            &cast
        };
        let ca = col.str().map_err(|_| self.type_error(column, col.dtype()))?;
        Ok(ca
            .into_iter()
            .map(|v| {
                v.map(str::trim)
                    .filter(|s| !s.is_empty())
                    .map(str::to_string)
            })
            .collect())
    }

    pub fn dates(&self, column: &str) -> Result<Vec<Option<NaiveDate>>, DataError> {
        let col = self.column(column)?;
        match col.dtype() {
            DataType::String => Ok(self
                .strings(column)?
                .into_iter()
                .map(|v| v.as_deref().and_then(parse_date))
                .collect()),
            DataType::Date => self.days(column, col),
            DataType::Datetime(_, _) => {
                let as_date = col
                    .cast(&DataType::Date)
                    .map_err(|_| self.type_error(column, col.dtype()))?;
                self.days(column, &as_date)
            }
            DataType::Null => Ok(vec![None; col.len()]),
            other => Err(self.type_error(column, other)),
        }
    }

    /// Optional date column: absent reads as all-null.
    pub fn optional_dates(&self, column: &str) -> Result<Vec<Option<NaiveDate>>, DataError> {
        if self.df.column(column).is_err() {
            return Ok(vec![None; self.height()]);
        }
        self.dates(column)
    }

    fn days(&self, column: &str, col: &Column) -> Result<Vec<Option<NaiveDate>>, DataError> {
        let ints = col
            .cast(&DataType::Int32)
            .map_err(|_| self.type_error(column, col.dtype()))?;
        let ca = ints.i32().map_err(|_| self.type_error(column, col.dtype()))?;
        Ok(ca.into_iter().map(|d| d.and_then(date_from_days)).collect())
    }

    /// Numeric values. Unparseable text reads as null.
    pub fn floats(&self, column: &str) -> Result<Vec<Option<f64>>, DataError> {
        let col = self.column(column)?;
        match col.dtype() {
            DataType::String => Ok(self
                .strings(column)?
                .into_iter()
                .map(|v| v.and_then(|s| s.parse::<f64>().ok()))
                .collect()),
            DataType::Null => Ok(vec![None; col.len()]),
            DataType::Boolean | DataType::Date | DataType::Datetime(_, _) => {
                Err(self.type_error(column, col.dtype()))
            }
            _ => {
                let cast = col
                    .cast(&DataType::Float64)
                    .map_err(|_| self.type_error(column, col.dtype()))?;
                let ca = cast.f64().map_err(|_| self.type_error(column, col.dtype()))?;
                Ok(ca.into_iter().collect())
            }
        }
    }

    /// Optional numeric column: absent reads as all-null.
    pub fn optional_floats(&self, column: &str) -> Result<Vec<Option<f64>>, DataError> {
        if self.df.column(column).is_err() {
            return Ok(vec![None; self.height()]);
        }
        self.floats(column)
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

pub fn date_from_days(days: i32) -> Option<NaiveDate> {
    epoch().checked_add_signed(chrono::Duration::days(i64::from(days)))
}

pub fn days_from_date(date: NaiveDate) -> i32 {
    (date - epoch()).num_days() as i32
}

/// `YYYY-MM-DD`, optionally followed by a time part which is ignored.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    let head = s.get(..10).unwrap_or(s);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}
