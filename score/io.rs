//! # Batch Submission I/O
//!
//! Reads many submissions from a tab-separated file and writes one prediction row per
//! submission.
//!
//! - Fixed schema: the six feature columns must be present under their canonical names
//!   (`age`, `bmi`, `systolic_bp`, `smoker`, `family_history`, `exercise_freq`). An
//!   optional `sample_id` column is carried through; other columns are ignored.
//! - Empty cells are absent values and are filled from population averages later, by
//!   the engine. Anything else must parse and lie inside the feature's domain.
//! - Errors name the offending column or the 1-based data row.

use crate::engine::{Assessment, RiskEngine};
use crate::types::{Disease, Feature, InputError, PartialFeatureSet};
use csv::{ReaderBuilder, StringRecord, WriterBuilder};
use std::path::Path;
use thiserror::Error;

const SAMPLE_ID_COLUMN: &str = "sample_id";
const IMPUTED_COLUMN: &str = "imputed";

/// One raw row of a batch file.
#[derive(Debug, Clone, PartialEq)]
pub struct Submission {
    /// From the `sample_id` column, or the 1-based row number when absent or blank.
    pub sample_id: String,
    pub features: PartialFeatureSet,
}

/// A scored submission, ready to be written out.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction<'a> {
    pub sample_id: String,
    pub assessment: Assessment<'a>,
}

/// A comprehensive error type for batch loading, scoring and writing.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error reading or writing tab-separated data: {0}")]
    CsvError(#[from] csv::Error),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error("Data row {row}: {source}")]
    InvalidRow {
        row: usize,
        #[source]
        source: InputError,
    },
}

/// Loads every submission from a tab-separated file with a header row.
pub fn load_submissions(path: &Path) -> Result<Vec<Submission>, DataError> {
    let mut reader = ReaderBuilder::new()
        .delimiter(b'\t')
        .has_headers(true)
        .from_path(path)?;
    let headers = reader.headers()?.clone();
    let column_of = |name: &str| headers.iter().position(|header| header.trim() == name);

    let mut feature_columns = [0usize; Feature::COUNT];
    for feature in Feature::ALL {
        feature_columns[feature.index()] = column_of(feature.name())
            .ok_or_else(|| DataError::ColumnNotFound(feature.name().to_string()))?;
    }
    let id_column = column_of(SAMPLE_ID_COLUMN);

    let mut submissions = Vec::new();
    for (offset, record) in reader.records().enumerate() {
        let record = record?;
        let row = offset + 1;
        submissions.push(parse_row(&record, row, &feature_columns, id_column)?);
    }

    log::info!(
        "Loaded {} submissions from {}",
        submissions.len(),
        path.display()
    );
    Ok(submissions)
}

fn parse_row(
    record: &StringRecord,
    row: usize,
    feature_columns: &[usize; Feature::COUNT],
    id_column: Option<usize>,
) -> Result<Submission, DataError> {
    let mut features = PartialFeatureSet::new();
    for feature in Feature::ALL {
        let value = feature
            .parse_optional(record.get(feature_columns[feature.index()]))
            .map_err(|source| DataError::InvalidRow { row, source })?;
        features.set(feature, value);
    }

    let sample_id = id_column
        .and_then(|column| record.get(column))
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map_or_else(|| row.to_string(), str::to_string);

    Ok(Submission {
        sample_id,
        features,
    })
}

/// Imputes, validates and scores each submission, in input order.
pub fn assess_submissions<'a>(
    engine: &'a RiskEngine,
    submissions: &[Submission],
    diseases: &[Disease],
) -> Result<Vec<Prediction<'a>>, DataError> {
    submissions
        .iter()
        .enumerate()
        .map(|(offset, submission)| -> Result<Prediction<'a>, DataError> {
            let assessment = engine
                .assess_partial(&submission.features, diseases)
                .map_err(|source| DataError::InvalidRow {
                    row: offset + 1,
                    source,
                })?;
            Ok(Prediction {
                sample_id: submission.sample_id.clone(),
                assessment,
            })
        })
        .collect()
}

/// Writes predictions as a tab-separated file.
///
/// Columns: `sample_id`, then `<disease>_risk` and `<disease>_elevated` for each of
/// `diseases` in canonical order, then `imputed` (comma-joined feature names or `-`).
pub fn write_predictions(
    path: &Path,
    predictions: &[Prediction<'_>],
    diseases: &[Disease],
) -> Result<(), DataError> {
    let selected: Vec<Disease> = Disease::ALL
        .into_iter()
        .filter(|disease| diseases.contains(disease))
        .collect();

    let mut writer = WriterBuilder::new().delimiter(b'\t').from_path(path)?;

    let mut header = vec![SAMPLE_ID_COLUMN.to_string()];
    for disease in &selected {
        header.push(format!("{}_risk", disease.key()));
        header.push(format!("{}_elevated", disease.key()));
    }
    header.push(IMPUTED_COLUMN.to_string());
    writer.write_record(&header)?;

    for prediction in predictions {
        let mut record = vec![prediction.sample_id.clone()];
        for disease in &selected {
            match prediction.assessment.report(*disease) {
                Some(report) => {
                    record.push(format!("{:.6}", report.result.probability));
                    record.push(report.result.elevated.to_string());
                }
                None => {
                    record.push(String::new());
                    record.push(String::new());
                }
            }
        }
        record.push(imputed_label(&prediction.assessment.imputed));
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn imputed_label(imputed: &[Feature]) -> String {
    if imputed.is_empty() {
        return "-".to_string();
    }
    imputed
        .iter()
        .map(|feature| feature.name())
        .collect::<Vec<_>>()
        .join(",")
}
