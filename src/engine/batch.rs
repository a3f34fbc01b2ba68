//! Offline batch scoring over CSV tables
//!
//! The whole table goes through the same column contract as single requests:
//! with a known schema the model columns are picked by name, missing ones are
//! filled with zero and the rest are ignored. Predictions are appended as a
//! `prediction` column holding native labels.

use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context, Result};

use super::dispatch::predict_rows;
use super::schema::{plan_columns, ColumnSource, SchemaMode, FILL_VALUE};
use crate::error::ServeError;
use crate::loader;
use crate::model::{Label, ModelBundle};

/// Name of the column holding batch predictions
pub const PREDICTION_COLUMN: &str = "prediction";

/// In-memory CSV table
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    header: Vec<String>,
    records: Vec<Vec<String>>,
}

impl Table {
    /// Build a table; every record must match the header width
    pub fn new(header: Vec<String>, records: Vec<Vec<String>>) -> Result<Self> {
        if let Some((i, record)) = records
            .iter()
            .enumerate()
            .find(|(_, r)| r.len() != header.len())
        {
            bail!(
                "record {} has {} fields, header has {}",
                i,
                record.len(),
                header.len()
            );
        }
        Ok(Self { header, records })
    }

    pub fn read_csv<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("failed to open {}", path.display()))?;

        let header = reader.headers()?.iter().map(str::to_string).collect();
        let records = reader
            .records()
            .map(|r| r.map(|record| record.iter().map(str::to_string).collect::<Vec<String>>()))
            .collect::<Result<Vec<Vec<String>>, csv::Error>>()
            .with_context(|| format!("failed to read {}", path.display()))?;

        Self::new(header, records)
    }

    pub fn write_csv<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let mut writer = csv::Writer::from_path(path)
            .with_context(|| format!("failed to create {}", path.display()))?;
        writer.write_record(&self.header)?;
        for record in &self.records {
            writer.write_record(record)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn header(&self) -> &[String] {
        &self.header
    }

    pub fn records(&self) -> &[Vec<String>] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<Vec<&str>> {
        let idx = self.header.iter().position(|h| h == name)?;
        Some(self.records.iter().map(|r| r[idx].as_str()).collect())
    }

    /// Replace column `name`, or append it when absent
    pub fn set_column(&mut self, name: &str, values: Vec<String>) -> Result<()> {
        if values.len() != self.records.len() {
            bail!(
                "column {} has {} values for {} rows",
                name,
                values.len(),
                self.records.len()
            );
        }

        match self.header.iter().position(|h| h == name) {
            Some(idx) => {
                for (record, value) in self.records.iter_mut().zip(values) {
                    record[idx] = value;
                }
            }
            None => {
                self.header.push(name.to_string());
                for (record, value) in self.records.iter_mut().zip(values) {
                    record.push(value);
                }
            }
        }
        Ok(())
    }
}

/// Parse one cell; empty cells and `nan` mean a missing value
fn parse_cell(cell: &str, row: usize, column: &str) -> Result<f64, ServeError> {
    let cell = cell.trim();
    if cell.is_empty() || cell.eq_ignore_ascii_case("nan") {
        return Ok(f64::NAN);
    }
    cell.parse::<f64>().map_err(|_| {
        ServeError::Prediction(format!(
            "row {}, column {:?}: {:?} is not a number",
            row, column, cell
        ))
    })
}

/// Numeric feature rows for `bundle`, one per table record
pub fn feature_matrix(
    bundle: &ModelBundle,
    table: &Table,
    mode: SchemaMode,
) -> Result<Vec<Vec<f64>>, ServeError> {
    let plan = plan_columns(table.header(), bundle.feature_names(), mode)?;

    table
        .records()
        .iter()
        .enumerate()
        .map(|(row, record)| {
            plan.sources
                .iter()
                .zip(&plan.columns)
                .map(|(source, column)| match source {
                    ColumnSource::Input(i) => parse_cell(&record[*i], row, column),
                    ColumnSource::Fill => Ok(FILL_VALUE),
                })
                .collect::<Result<Vec<f64>, ServeError>>()
        })
        .collect()
}

/// Predict every row of `table`
pub fn predict_table(
    bundle: &ModelBundle,
    table: &Table,
    mode: SchemaMode,
) -> Result<Vec<Label>, ServeError> {
    let rows = feature_matrix(bundle, table, mode)?;
    predict_rows(bundle, &rows)
}

/// Outcome of a batch run
#[derive(Debug, Clone)]
pub struct BatchSummary {
    pub rows: usize,
    pub output: PathBuf,
}

/// Score `input` with the model at `model_path` and write the result to `output`
pub fn run_batch(
    model_path: &Path,
    input: &Path,
    output: &Path,
    mode: SchemaMode,
) -> Result<BatchSummary> {
    if !input.exists() {
        return Err(anyhow!(
            "Provide a processed data file at {}",
            input.display()
        ));
    }

    let bundle = loader::load_bundle(model_path)?;
    let mut table = Table::read_csv(input)?;
    tracing::info!(
        input = %input.display(),
        rows = table.len(),
        columns = table.header().len(),
        "Scoring table"
    );

    let labels = predict_table(&bundle, &table, mode)?;
    table.set_column(
        PREDICTION_COLUMN,
        labels.iter().map(ToString::to_string).collect(),
    )?;

    if let Some(parent) = output.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    table.write_csv(output)?;

    tracing::info!(output = %output.display(), "Wrote predictions");
    Ok(BatchSummary {
        rows: table.len(),
        output: output.to_path_buf(),
    })
}
