//! # Family Table Loading and Grouping
//!
//! Reads the flat per-individual table (one row per person, with a family identifier,
//! an individual identifier, the predicted score and the measured phenotype), validates
//! it against a fixed schema and groups it into families.
//!
//! - Strict Schema: the columns `FID`, `IID`, `predicted` and `measured` are required
//!   under exactly these names. Any other columns are ignored.
//! - User-Centric Errors: failures are assumed to be problems with the input file and
//!   are reported through [`DataError`] with the offending column named.
//! - Pairing: the predicted and measured values of a row stay together through every
//!   filter and grouping step; nothing here sorts.

use crate::types::{SelectionError, check_paired};
use ahash::AHashMap;
use log::{debug, info};
use ndarray::Array1;
use polars::prelude::*;
use std::collections::HashSet;
use std::fs::File;
use std::path::Path;
use thiserror::Error;

pub const FAMILY_ID_COLUMN: &str = "FID";
pub const INDIVIDUAL_ID_COLUMN: &str = "IID";
pub const PREDICTED_COLUMN: &str = "predicted";
pub const MEASURED_COLUMN: &str = "measured";

const REQUIRED_COLUMNS: [&str; 4] = [
    FAMILY_ID_COLUMN,
    INDIVIDUAL_ID_COLUMN,
    PREDICTED_COLUMN,
    MEASURED_COLUMN,
];

/// A comprehensive error type for all data loading and validation failures.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("Error from the underlying Polars DataFrame library: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error(
        "The required column '{0}' was not found in the input file. Please check spelling and case."
    )]
    ColumnNotFound(String),
    #[error(
        "The required column '{column_name}' could not be converted to the expected type '{expected_type}'. (Found type: {found_type})"
    )]
    ColumnWrongType {
        column_name: String,
        expected_type: &'static str,
        found_type: String,
    },
    #[error(
        "Missing or null values were found in the required column '{0}'. Every individual needs a complete record."
    )]
    MissingValuesFound(String),
    #[error(
        "Non-finite values (NaN or Infinity) were found in the required column '{0}'. This tool requires all data to be finite."
    )]
    NonFiniteValuesFound(String),
    #[error("The input file contains a header but no data rows.")]
    EmptyTable,
}

/// The validated per-individual table, in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyTable {
    pub family_ids: Vec<String>,
    pub individual_ids: Vec<i64>,
    pub predicted: Array1<f64>,
    pub measured: Array1<f64>,
}

/// One family's paired predicted and measured values.
#[derive(Debug, Clone, PartialEq)]
pub struct Family {
    pub id: String,
    pub predicted: Array1<f64>,
    pub measured: Array1<f64>,
}

impl Family {
    pub fn new(
        id: impl Into<String>,
        predicted: Array1<f64>,
        measured: Array1<f64>,
    ) -> Result<Self, SelectionError> {
        check_paired(predicted.len(), measured.len())?;
        Ok(Self {
            id: id.into(),
            predicted,
            measured,
        })
    }

    pub fn len(&self) -> usize {
        self.measured.len()
    }

    pub fn is_empty(&self) -> bool {
        self.measured.is_empty()
    }
}

impl FamilyTable {
    pub fn len(&self) -> usize {
        self.family_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.family_ids.is_empty()
    }

    /// Replaces every predicted value by the measured value of the same individual.
    ///
    /// Only meaningful as an upper bound: it is what a perfect predictor would achieve.
    pub fn with_oracle_predictions(mut self) -> Self {
        self.predicted = self.measured.clone();
        self
    }

    /// Groups rows by family identifier, in order of first appearance.
    ///
    /// With a threshold, only individuals whose `IID` is strictly below it are kept.
    /// Families left without members are not returned.
    pub fn families(&self, child_id_threshold: Option<i64>) -> Vec<Family> {
        let mut slots: AHashMap<&str, usize> = AHashMap::new();
        let mut groups: Vec<(&str, Vec<f64>, Vec<f64>)> = Vec::new();

        for row in 0..self.len() {
            if child_id_threshold.is_some_and(|threshold| self.individual_ids[row] >= threshold) {
                continue;
            }
            let fid = self.family_ids[row].as_str();
            let slot = *slots.entry(fid).or_insert_with(|| {
                groups.push((fid, Vec::new(), Vec::new()));
                groups.len() - 1
            });
            groups[slot].1.push(self.predicted[row]);
            groups[slot].2.push(self.measured[row]);
        }

        debug!(
            "Grouped {} rows into {} families (IID threshold: {:?})",
            self.len(),
            groups.len(),
            child_id_threshold
        );

        groups
            .into_iter()
            .map(|(id, predicted, measured)| Family {
                id: id.to_string(),
                predicted: Array1::from_vec(predicted),
                measured: Array1::from_vec(measured),
            })
            .collect()
    }
}

/// Families large enough to supply a random subset of size `k`, in their original order.
pub fn eligible_families(families: &[Family], k: usize) -> Vec<&Family> {
    families
        .iter()
        .filter(|family| {
            let eligible = family.len() >= k;
            if !eligible {
                debug!(
                    "Skipping family '{}': {} members, selection needs {}",
                    family.id,
                    family.len(),
                    k
                );
            }
            eligible
        })
        .collect()
}

/// Loads and validates a family table.
///
/// Files ending in `.tsv` or `.txt` are read as tab-separated, anything else as
/// comma-separated. The first line must be a header.
pub fn load_family_table(path: &Path) -> Result<FamilyTable, DataError> {
    let separator = match path.extension().and_then(|ext| ext.to_str()) {
        Some("tsv") | Some("txt") => b'\t',
        _ => b',',
    };

    info!("Loading family table from '{}'", path.display());
    let df = CsvReader::new(File::open(path)?)
        .with_options(
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_separator(separator)),
        )
        .finish()?;

    let columns_set: HashSet<String> = df
        .get_column_names()
        .into_iter()
        .map(|s| s.to_string())
        .collect();
    for col_name in REQUIRED_COLUMNS {
        if !columns_set.contains(col_name) {
            return Err(DataError::ColumnNotFound(col_name.to_string()));
        }
    }
    if df.height() == 0 {
        return Err(DataError::EmptyTable);
    }

    let table = FamilyTable {
        family_ids: internal::extract_string_column(&df, FAMILY_ID_COLUMN)?,
        individual_ids: internal::extract_integer_column(&df, INDIVIDUAL_ID_COLUMN)?,
        predicted: Array1::from_vec(internal::extract_numeric_column(&df, PREDICTED_COLUMN)?),
        measured: Array1::from_vec(internal::extract_numeric_column(&df, MEASURED_COLUMN)?),
    };

    info!("Loaded {} individuals.", table.len());
    Ok(table)
}

/// Internal module for column extraction.
mod internal {
    use super::*;

    fn reject_nulls(column: &Column, column_name: &str) -> Result<(), DataError> {
        if column.null_count() > 0 {
            return Err(DataError::MissingValuesFound(column_name.to_string()));
        }
        Ok(())
    }

    fn wrong_type(column: &Column, column_name: &str, expected_type: &'static str) -> DataError {
        DataError::ColumnWrongType {
            column_name: column_name.to_string(),
            expected_type,
            found_type: format!("{:?}", column.dtype()),
        }
    }

    pub(super) fn extract_numeric_column(
        df: &DataFrame,
        column_name: &str,
    ) -> Result<Vec<f64>, DataError> {
        let column = df.column(column_name)?;
        reject_nulls(column, column_name)?;

        let casted = column
            .cast(&DataType::Float64)
            .map_err(|_| wrong_type(column, column_name, "f64 (numeric)"))?;
        if casted.null_count() > 0 {
            return Err(wrong_type(column, column_name, "f64 (numeric)"));
        }

        let values: Vec<f64> = casted.f64()?.rechunk().into_no_null_iter().collect();
        if values.iter().any(|v| !v.is_finite()) {
            return Err(DataError::NonFiniteValuesFound(column_name.to_string()));
        }
        Ok(values)
    }

    pub(super) fn extract_integer_column(
        df: &DataFrame,
        column_name: &str,
    ) -> Result<Vec<i64>, DataError> {
        let column = df.column(column_name)?;
        reject_nulls(column, column_name)?;

        let casted = column
            .cast(&DataType::Int64)
            .map_err(|_| wrong_type(column, column_name, "i64 (integer)"))?;
        if casted.null_count() > 0 {
            return Err(wrong_type(column, column_name, "i64 (integer)"));
        }
        Ok(casted.i64()?.rechunk().into_no_null_iter().collect())
    }

    /// Family identifiers are arbitrary keys; numeric ones are read as their text.
    pub(super) fn extract_string_column(
        df: &DataFrame,
        column_name: &str,
    ) -> Result<Vec<String>, DataError> {
        let column = df.column(column_name)?;
        reject_nulls(column, column_name)?;

        let casted = column.cast(&DataType::String)?;
        Ok(casted
            .str()?
            .into_no_null_iter()
            .map(|value| value.to_string())
            .collect())
    }
}
