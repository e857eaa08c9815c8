//! JSON settings file holding the parameter grids of both hotspot runs.

use std::path::{Path, PathBuf};

use crashspot_cluster::{CityConfig, ClusterError, StateConfig, TendencyConfig};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use crate::IoError;

/// Parameter grids and tuning knobs read from the settings file.
///
/// ```json
/// {
///   "clean_dataset": "data/accidents_clean.csv",
///   "k_distGraph": 4,
///   "dbscan_minEps": 0.1,
///   "dbscan_stepEps": 0.05,
///   "dbscan_minPtsArr": [5, 10, 15],
///   "optics_maxRadiusArr": [10.0, 25.0],
///   "optics_minPtsArr": [10, 20],
///   "optics_xiArr": [0.05, 0.1]
/// }
/// ```
///
/// `clean_dataset`, `dbscan_maxEps`, `hopkins_sample_cap` and `seed` are optional.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub clean_dataset: Option<PathBuf>,
    #[serde(rename = "k_distGraph")]
    pub k_dist_graph: usize,
    #[serde(rename = "dbscan_minEps")]
    pub dbscan_min_eps_km: f64,
    #[serde(rename = "dbscan_stepEps")]
    pub dbscan_step_eps_km: f64,
    #[serde(rename = "dbscan_minPtsArr")]
    pub dbscan_min_pts: Vec<usize>,
    /// Epsilon upper bound used when the k-distance profile has no knee.
    #[serde(rename = "dbscan_maxEps", default)]
    pub dbscan_max_eps_km: Option<f64>,
    #[serde(rename = "optics_maxRadiusArr")]
    pub optics_max_radius_km: Vec<f64>,
    #[serde(rename = "optics_minPtsArr")]
    pub optics_min_pts: Vec<usize>,
    #[serde(rename = "optics_xiArr")]
    pub optics_xi: Vec<f64>,
    #[serde(default)]
    pub hopkins_sample_cap: Option<usize>,
    #[serde(default)]
    pub seed: Option<u64>,
}

impl Settings {
    /// Parse the settings file at `path`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`IoError::FileNotFound`] | File doesn't exist or is unreadable |
    /// | [`IoError::SettingsParse`] | Invalid JSON or a required key is missing |
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn load(path: &Path) -> Result<Self, IoError> {
        let text = std::fs::read_to_string(path).map_err(|e| IoError::FileNotFound {
            path: path.to_path_buf(),
            source: e,
        })?;
        let settings: Self = serde_json::from_str(&text).map_err(|e| IoError::SettingsParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        debug!(
            k = settings.k_dist_graph,
            n_dbscan_min_pts = settings.dbscan_min_pts.len(),
            n_optics_radii = settings.optics_max_radius_km.len(),
            "settings loaded"
        );
        Ok(settings)
    }

    /// Tendency estimation with the settings' cap and the given seed override.
    #[must_use]
    pub fn tendency(&self, seed: Option<u64>) -> TendencyConfig {
        let mut tendency = TendencyConfig::default();
        if let Some(cap) = self.hopkins_sample_cap {
            tendency = tendency.with_sample_cap(cap);
        }
        if let Some(seed) = seed.or(self.seed) {
            tendency = tendency.with_seed(seed);
        }
        tendency
    }

    /// Build the city-run configuration.
    ///
    /// # Errors
    ///
    /// Same as [`CityConfig::new`] and [`CityConfig::with_max_eps_km`].
    pub fn city_config(&self, seed: Option<u64>) -> Result<CityConfig, ClusterError> {
        let mut cfg = CityConfig::new(
            self.k_dist_graph,
            self.dbscan_min_eps_km,
            self.dbscan_step_eps_km,
            self.dbscan_min_pts.clone(),
        )?
        .with_tendency(self.tendency(seed));
        if let Some(max_eps_km) = self.dbscan_max_eps_km {
            cfg = cfg.with_max_eps_km(max_eps_km)?;
        }
        Ok(cfg)
    }

    /// Build the state-run configuration.
    ///
    /// # Errors
    ///
    /// Same as [`StateConfig::new`].
    pub fn state_config(&self, seed: Option<u64>) -> Result<StateConfig, ClusterError> {
        Ok(StateConfig::new(
            self.optics_max_radius_km.clone(),
            self.optics_min_pts.clone(),
            self.optics_xi.clone(),
        )?
        .with_tendency(self.tendency(seed)))
    }
}
