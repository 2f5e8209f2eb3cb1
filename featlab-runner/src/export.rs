//! Export: feature matrix to CSV or Parquet, run manifest to JSON.
//!
//! Both tabular formats use the column order of the matrix's
//! [`FeatureSchema`](featlab_core::FeatureSchema). Nulls are empty fields in
//! CSV and real nulls in Parquet.

use std::fs;
use std::io;
use std::path::Path;

use polars::prelude::*;
use thiserror::Error;
use tracing::info;

use featlab_core::data::frame::days_from_date;
use featlab_core::schema::{Cell, SchemaType};
use featlab_core::FeatureMatrix;

use crate::config::OutputFormat;
use crate::runner::RunManifest;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to write {path}: {source}")]
    Io { path: String, source: io::Error },

    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    #[error("parquet error: {0}")]
    Parquet(String),

    #[error("manifest serialization failed: {0}")]
    Json(#[from] serde_json::Error),
}

fn io_error(path: &Path) -> impl FnOnce(io::Error) -> ExportError + '_ {
    move |source| ExportError::Io {
        path: path.display().to_string(),
        source,
    }
}

// ─── CSV ────────────────────────────────────────────────────────────

fn format_cell(cell: Cell<'_>) -> String {
    match cell {
        Cell::Str(s) => s.to_string(),
        Cell::Date(Some(d)) => d.format("%Y-%m-%d").to_string(),
        Cell::Float(Some(v)) => v.to_string(),
        Cell::Int(Some(v)) => v.to_string(),
        Cell::Date(None) | Cell::Float(None) | Cell::Int(None) => String::new(),
    }
}

/// Write the matrix as CSV with a header row.
pub fn write_csv<W: io::Write>(matrix: &FeatureMatrix, writer: W) -> Result<(), ExportError> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(matrix.schema.names())?;
    for row in &matrix.rows {
        wtr.write_record(matrix.schema.cells(row).into_iter().map(format_cell))?;
    }
    wtr.flush().map_err(|source| ExportError::Io {
        path: "<csv>".to_string(),
        source,
    })?;
    Ok(())
}

/// CSV as an in-memory string.
pub fn export_csv_string(matrix: &FeatureMatrix) -> Result<String, ExportError> {
    let mut buf = Vec::new();
    write_csv(matrix, &mut buf)?;
    String::from_utf8(buf).map_err(|e| ExportError::Io {
        path: "<csv>".to_string(),
        source: io::Error::new(io::ErrorKind::InvalidData, e),
    })
}

// ─── Parquet ────────────────────────────────────────────────────────

enum ColumnData {
    Utf8(Vec<String>),
    Date(Vec<Option<i32>>),
    Float(Vec<Option<f64>>),
    Int(Vec<Option<i64>>),
}

impl ColumnData {
    fn new(dtype: SchemaType, capacity: usize) -> Self {
        match dtype {
            SchemaType::Utf8 => Self::Utf8(Vec::with_capacity(capacity)),
            SchemaType::Date => Self::Date(Vec::with_capacity(capacity)),
            SchemaType::Float64 => Self::Float(Vec::with_capacity(capacity)),
            SchemaType::Int64 => Self::Int(Vec::with_capacity(capacity)),
        }
    }

    fn push(&mut self, cell: Cell<'_>) {
        match (self, cell) {
            (Self::Utf8(v), Cell::Str(s)) => v.push(s.to_string()),
            (Self::Date(v), Cell::Date(d)) => v.push(d.map(days_from_date)),
            (Self::Float(v), Cell::Float(x)) => v.push(x),
            (Self::Int(v), Cell::Int(x)) => v.push(x),
            // Schema and cells are built from the same column list.
            (Self::Utf8(v), _) => v.push(String::new()),
            (Self::Date(v), _) => v.push(None),
            (Self::Float(v), _) => v.push(None),
            (Self::Int(v), _) => v.push(None),
        }
    }

    fn into_column(self, name: &str) -> Result<Column, ExportError> {
        let name: PlSmallStr = name.into();
        let series = match self {
            Self::Utf8(v) => Series::new(name, v),
            Self::Date(v) => Series::new(name, v)
                .cast(&DataType::Date)
                .map_err(|e| ExportError::Parquet(format!("date cast: {e}")))?,
            Self::Float(v) => Series::new(name, v),
            Self::Int(v) => Series::new(name, v),
        };
        Ok(Column::from(series))
    }
}

/// Build a polars DataFrame with one typed column per schema column.
pub fn to_dataframe(matrix: &FeatureMatrix) -> Result<DataFrame, ExportError> {
    let specs = matrix.schema.columns();
    let mut data: Vec<ColumnData> = specs
        .iter()
        .map(|c| ColumnData::new(c.dtype, matrix.rows.len()))
        .collect();
    for row in &matrix.rows {
        for (col, cell) in data.iter_mut().zip(matrix.schema.cells(row)) {
            col.push(cell);
        }
    }
    let columns = data
        .into_iter()
        .zip(specs)
        .map(|(d, spec)| d.into_column(&spec.name))
        .collect::<Result<Vec<_>, _>>()?;
    DataFrame::new(columns).map_err(|e| ExportError::Parquet(format!("dataframe creation: {e}")))
}

pub fn write_parquet(matrix: &FeatureMatrix, path: &Path) -> Result<(), ExportError> {
    let mut df = to_dataframe(matrix)?;
    let file = fs::File::create(path).map_err(io_error(path))?;
    ParquetWriter::new(file)
        .finish(&mut df)
        .map_err(|e| ExportError::Parquet(format!("write parquet: {e}")))?;
    Ok(())
}

// ─── Artifacts ──────────────────────────────────────────────────────

/// Write the matrix in `format`, creating parent directories as needed.
pub fn write_matrix(
    matrix: &FeatureMatrix,
    path: &Path,
    format: OutputFormat,
) -> Result<(), ExportError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(io_error(parent))?;
    }
    match format {
        OutputFormat::Csv => {
            let file = fs::File::create(path).map_err(io_error(path))?;
            write_csv(matrix, io::BufWriter::new(file))?;
        }
        OutputFormat::Parquet => write_parquet(matrix, path)?,
    }
    info!(path = %path.display(), rows = matrix.rows.len(), "feature matrix written");
    Ok(())
}

pub fn write_manifest(manifest: &RunManifest, path: &Path) -> Result<(), ExportError> {
    let json = serde_json::to_string_pretty(manifest)?;
    fs::write(path, json).map_err(io_error(path))?;
    info!(path = %path.display(), "manifest written");
    Ok(())
}

pub fn read_manifest(path: &Path) -> Result<RunManifest, ExportError> {
    let json = fs::read_to_string(path).map_err(io_error(path))?;
    Ok(serde_json::from_str(&json)?)
}
