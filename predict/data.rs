//! # Batch Data Loading Module
//!
//! Reads tab-separated files of observations for batch inference and validates
//! them against the fixed observation schema.
//!
//! - Strict Schema: column names are not configurable. The header must contain
//!   every form field name (`age`, `gender`, ..., `il6_level`). An optional
//!   `sample_id` column names the rows; other columns are ignored.
//! - User-Centric Errors: failures are assumed to be user-input errors. The
//!   first invalid row stops the load and is reported with its 1-based row
//!   number and the field-level `ValidationError`.

use crate::observation::{ClinicalObservation, FormData, ObservationField, ValidationError};
use csv::{ReaderBuilder, Trim};
use std::path::Path;
use thiserror::Error;

/// A container for validated observations ready for prediction.
#[derive(Debug)]
pub struct ObservationBatch {
    /// From the `sample_id` column if present and non-empty, otherwise the
    /// 1-based row number.
    pub sample_ids: Vec<String>,
    pub observations: Vec<ClinicalObservation>,
}

/// A comprehensive error type for all batch loading and validation failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error reading the tab-separated input: {0}")]
    CsvError(#[from] csv::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error("Row {row} is invalid: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: ValidationError,
    },
    #[error("The input file contains a header but no data rows.")]
    NoRows,
}

const SAMPLE_ID_COLUMN: &str = "sample_id";

/// Loads and validates a TSV of observations.
pub fn load_observations(path: impl AsRef<Path>) -> Result<ObservationBatch, DataError> {
    let path = path.as_ref();
    log::info!("Loading observations from '{}'", path.display());

    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .trim(Trim::All)
        .from_path(path)?;

    let headers = reader.headers()?.clone();
    for field in ObservationField::ALL {
        if !headers.iter().any(|h| h == field.form_key()) {
            return Err(DataError::ColumnNotFound(field.form_key().to_string()));
        }
    }
    let sample_id_index = headers.iter().position(|h| h == SAMPLE_ID_COLUMN);

    let mut batch = ObservationBatch {
        sample_ids: Vec::new(),
        observations: Vec::new(),
    };
    for (i, record) in reader.records().enumerate() {
        let record = record?;
        let row = i + 1;

        let form: FormData = headers
            .iter()
            .zip(record.iter())
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        let observation = ClinicalObservation::from_form(&form)
            .map_err(|source| DataError::InvalidRow { row, source })?;

        let sample_id = sample_id_index
            .and_then(|idx| record.get(idx))
            .filter(|id| !id.is_empty())
            .map_or_else(|| row.to_string(), str::to_string);

        batch.sample_ids.push(sample_id);
        batch.observations.push(observation);
    }

    if batch.observations.is_empty() {
        return Err(DataError::NoRows);
    }
    log::info!(
        "Loaded {} observations with all required columns.",
        batch.observations.len()
    );
    Ok(batch)
}
