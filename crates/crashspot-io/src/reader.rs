//! CSV reader for the cleaned accident table, with full input validation.

use std::path::{Path, PathBuf};

use crashspot_cluster::{AccidentRecord, VictimCondition};
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::AccidentDataset;

/// Column positions resolved from the header.
struct Columns {
    latitude: usize,
    longitude: usize,
    victim_condition: usize,
    road_id: usize,
    km: usize,
    city: usize,
    state: usize,
    cause: usize,
}

/// Reads the cleaned accident table from a CSV file.
///
/// Columns are located by header name, in any order; extra columns are
/// ignored. Required: `latitude`, `longitude`, `victims_condition`,
/// `road_id`, `km`, `city`, `state` and `cause` (also accepted as
/// `general_cause_of_accident`).
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
/// | [`IoError::CsvParse`] | Malformed CSV record |
/// | [`IoError::MissingColumn`] | A required column is absent from the header |
/// | [`IoError::EmptyDataset`] | Zero data rows after header |
/// | [`IoError::NonFiniteValue`] | Coordinate or km cell is NaN, Inf, or unparseable |
/// | [`IoError::InvalidVictimCondition`] | Unknown victim-condition label |
pub struct AccidentReader {
    path: PathBuf,
}

impl AccidentReader {
    /// Create a new reader for the given CSV file path.
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    /// Read and validate the CSV file, returning an [`AccidentDataset`].
    #[instrument(skip(self), fields(path = %self.path.display()))]
    pub fn read(&self) -> Result<AccidentDataset, IoError> {
        let file = std::fs::File::open(&self.path).map_err(|e| IoError::FileNotFound {
            path: self.path.clone(),
            source: e,
        })?;
        let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(file);

        let header = rdr.headers().map_err(|e| self.csv_error(e))?.clone();
        let columns = self.resolve_columns(&header)?;
        debug!(n_columns = header.len(), "read CSV header");

        let mut records = Vec::new();
        for (row_index, result) in rdr.records().enumerate() {
            let row = result.map_err(|e| self.csv_error(e))?;
            let cell = |i: usize| row.get(i).unwrap_or("").trim();

            let victim_condition: VictimCondition =
                cell(columns.victim_condition)
                    .parse()
                    .map_err(|source| IoError::InvalidVictimCondition {
                        path: self.path.clone(),
                        row_index,
                        source,
                    })?;

            records.push(AccidentRecord {
                latitude: self.finite(cell(columns.latitude), row_index, "latitude")?,
                longitude: self.finite(cell(columns.longitude), row_index, "longitude")?,
                victim_condition,
                road_id: cell(columns.road_id).to_string(),
                km: self.finite(cell(columns.km), row_index, "km")?,
                city: cell(columns.city).to_string(),
                state: cell(columns.state).to_string(),
                cause: cell(columns.cause).to_string(),
            });
        }

        if records.is_empty() {
            return Err(IoError::EmptyDataset {
                path: self.path.clone(),
            });
        }

        info!(n_records = records.len(), "accident table loaded");
        Ok(AccidentDataset::new(records))
    }

    fn csv_error(&self, e: csv::Error) -> IoError {
        IoError::CsvParse {
            path: self.path.clone(),
            offset: e.position().map_or(0, |p| p.byte()),
            source: e,
        }
    }

    fn resolve_columns(&self, header: &csv::StringRecord) -> Result<Columns, IoError> {
        let find = |names: &[&'static str]| -> Result<usize, IoError> {
            header
                .iter()
                .position(|h| names.iter().any(|n| *n == h.trim()))
                .ok_or_else(|| IoError::MissingColumn {
                    path: self.path.clone(),
                    column: names[0],
                })
        };
        Ok(Columns {
            latitude: find(&["latitude"])?,
            longitude: find(&["longitude"])?,
            victim_condition: find(&["victims_condition"])?,
            road_id: find(&["road_id"])?,
            km: find(&["km"])?,
            city: find(&["city"])?,
            state: find(&["state"])?,
            cause: find(&["cause", "general_cause_of_accident"])?,
        })
    }

    fn finite(&self, raw: &str, row_index: usize, column: &'static str) -> Result<f64, IoError> {
        match raw.parse::<f64>() {
            Ok(v) if v.is_finite() => Ok(v),
            _ => Err(IoError::NonFiniteValue {
                path: self.path.clone(),
                row_index,
                column,
                raw: raw.to_string(),
            }),
        }
    }
}
