//! JSON result writer for hotspot reports.

use std::fs;
use std::path::{Path, PathBuf};

use crashspot_cluster::HotspotReport;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crate::IoError;
use crate::domain::ExperimentName;

/// Writes hotspot reports to JSON files.
///
/// Creates the output directory on construction if it does not exist.
/// Output files are named `{experiment}_hotspots.json`.
pub struct ResultWriter {
    output_dir: PathBuf,
    experiment: ExperimentName,
}

impl ResultWriter {
    /// Create a new writer targeting the given directory and experiment name.
    ///
    /// # Errors
    ///
    /// Returns [`IoError::OutputDirCreate`] if the directory cannot be created.
    #[instrument(skip_all, fields(dir = %output_dir.display(), experiment = %experiment))]
    pub fn new(output_dir: &Path, experiment: ExperimentName) -> Result<Self, IoError> {
        fs::create_dir_all(output_dir).map_err(|e| IoError::OutputDirCreate {
            path: output_dir.to_path_buf(),
            source: e,
        })?;
        debug!("output directory ready");
        Ok(Self {
            output_dir: output_dir.to_path_buf(),
            experiment,
        })
    }

    /// Write a hotspot report to `{experiment}_hotspots.json` and return its path.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::Serialize`] | The report cannot be encoded as JSON |
    /// | [`IoError::WriteFile`] | The file cannot be written |
    #[instrument(skip_all)]
    pub fn write_hotspots(&self, report: &HotspotReport) -> Result<PathBuf, IoError> {
        let path = self
            .output_dir
            .join(format!("{}_hotspots.json", self.experiment.as_str()));

        let artifact = HotspotArtifact {
            experiment: self.experiment.as_str(),
            report,
        };
        let json = serde_json::to_string_pretty(&artifact).map_err(|e| IoError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        fs::write(&path, &json).map_err(|e| IoError::WriteFile {
            path: path.clone(),
            source: e,
        })?;

        info!(path = %path.display(), status = ?report.status, "hotspot report written");
        Ok(path)
    }
}

#[derive(Serialize)]
struct HotspotArtifact<'a> {
    experiment: &'a str,
    #[serde(flatten)]
    report: &'a HotspotReport,
}
