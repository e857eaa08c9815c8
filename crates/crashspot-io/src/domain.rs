//! Domain types for crashspot-io.

use std::collections::HashSet;

use crashspot_cluster::{AccidentRecord, Granularity};

use crate::IoError;

/// A validated experiment name for output file naming.
///
/// Must match `[a-zA-Z0-9_-]+`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExperimentName(String);

impl ExperimentName {
    /// Parse and validate an experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::InvalidExperimentName`] if the name is empty or
    /// contains characters outside `[a-zA-Z0-9_-]`.
    pub fn new(name: String) -> Result<Self, IoError> {
        if name.is_empty()
            || !name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
        {
            return Err(IoError::InvalidExperimentName { name });
        }
        Ok(Self(name))
    }

    /// Return the experiment name as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ExperimentName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// The cleaned accident table, in file order.
///
/// Produced by [`AccidentReader`](crate::AccidentReader). Shared read-only by
/// every run; [`select`](Self::select) copies the matching rows out.
#[derive(Debug, Clone)]
pub struct AccidentDataset {
    records: Vec<AccidentRecord>,
}

/// Distinct values in first-appearance order.
fn distinct<'a>(values: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen = HashSet::new();
    values
        .filter(|v| seen.insert(*v))
        .map(str::to_string)
        .collect()
}

impl AccidentDataset {
    #[must_use]
    pub fn new(records: Vec<AccidentRecord>) -> Self {
        Self { records }
    }

    #[must_use]
    pub fn records(&self) -> &[AccidentRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Rows whose city (or state) equals `target` and whose cause equals `cause`.
    #[must_use]
    pub fn select(&self, granularity: Granularity, target: &str, cause: &str) -> Vec<AccidentRecord> {
        self.records
            .iter()
            .filter(|r| {
                let place = match granularity {
                    Granularity::City => &r.city,
                    Granularity::State => &r.state,
                };
                place == target && r.cause == cause
            })
            .cloned()
            .collect()
    }

    /// Distinct city names.
    #[must_use]
    pub fn cities(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.city.as_str()))
    }

    /// Distinct state codes.
    #[must_use]
    pub fn states(&self) -> Vec<String> {
        distinct(self.records.iter().map(|r| r.state.as_str()))
    }

    /// Distinct causes recorded in `target` at the given granularity.
    #[must_use]
    pub fn causes(&self, granularity: Granularity, target: &str) -> Vec<String> {
        distinct(
            self.records
                .iter()
                .filter(|r| match granularity {
                    Granularity::City => r.city == target,
                    Granularity::State => r.state == target,
                })
                .map(|r| r.cause.as_str()),
        )
    }
}

#[cfg(test)]
mod tests {
    use crashspot_cluster::VictimCondition;

    use super::*;

    fn record(city: &str, state: &str, cause: &str) -> AccidentRecord {
        AccidentRecord {
            latitude: -19.9,
            longitude: -43.9,
            victim_condition: VictimCondition::WithoutVictims,
            road_id: "BR-381".to_string(),
            km: 450.0,
            city: city.to_string(),
            state: state.to_string(),
            cause: cause.to_string(),
        }
    }

    fn dataset() -> AccidentDataset {
        AccidentDataset::new(vec![
            record("Contagem", "MG", "Speeding"),
            record("Betim", "MG", "Fatigue"),
            record("Contagem", "MG", "Fatigue"),
            record("Niteroi", "RJ", "Speeding"),
            record("Contagem", "MG", "Speeding"),
        ])
    }

    #[test]
    fn experiment_name_validation() {
        assert!(ExperimentName::new("run_01-a".to_string()).is_ok());
        assert!(ExperimentName::new(String::new()).is_err());
        assert!(ExperimentName::new("bad name".to_string()).is_err());
        assert!(ExperimentName::new("../escape".to_string()).is_err());
    }

    #[test]
    fn select_matches_target_and_cause() {
        let ds = dataset();
        assert_eq!(ds.select(Granularity::City, "Contagem", "Speeding").len(), 2);
        assert_eq!(ds.select(Granularity::State, "MG", "Fatigue").len(), 2);
        assert!(ds.select(Granularity::City, "contagem", "Speeding").is_empty());
    }

    #[test]
    fn listings_keep_first_appearance_order() {
        let ds = dataset();
        assert_eq!(ds.cities(), vec!["Contagem", "Betim", "Niteroi"]);
        assert_eq!(ds.states(), vec!["MG", "RJ"]);
        assert_eq!(ds.causes(Granularity::City, "Contagem"), vec!["Speeding", "Fatigue"]);
        assert_eq!(ds.causes(Granularity::State, "RJ"), vec!["Speeding"]);
        assert!(ds.causes(Granularity::City, "Unknown").is_empty());
    }
}
