//! End-to-end hotspot runs over a record subset restricted to one target and one cause.
//!
//! Both paths share the same shape: build the coordinate sample, estimate the
//! Hopkins statistic, search the parameter grid, re-run the chosen candidate
//! and score the resulting clusters. The city path bounds its DBSCAN epsilon
//! grid with the k-distance knee; the state path collapses coincident
//! locations and searches an OPTICS grid.

use serde::Serialize;
use tracing::{debug, info, instrument, warn};

use crashspot_geo::{CollapsedSample, GeoSample, PairwiseDistance};

use crate::clusterer::{DensityClusterer, Labeling};
use crate::config::{CityConfig, StateConfig};
use crate::dbscan::Dbscan;
use crate::error::ClusterError;
use crate::hotspot::{ClusterStatistics, HotspotWeights, LabeledRecord, score_hotspots};
use crate::knee::estimate_epsilon;
use crate::optics::Optics;
use crate::record::AccidentRecord;
use crate::search::{
    CancellationToken, ParameterSearch, PerformanceRecord, SearchOutcome, SearchStatus,
    dbscan_grid, epsilon_range, optics_grid,
};
use crate::tendency::TendencyConfig;

// ── request and report ────────────────────────────────────────────────────────

/// Spatial granularity of a hotspot run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    City,
    State,
}

/// The target (city or state name) and accident cause a record subset was selected by.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HotspotRequest {
    pub target: String,
    pub cause: String,
}

impl HotspotRequest {
    #[must_use]
    pub fn new(target: impl Into<String>, cause: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            cause: cause.into(),
        }
    }
}

/// Upper bound of the epsilon search and where it came from.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "source", rename_all = "snake_case")]
pub enum EpsilonBound {
    /// Knee of the k-distance profile.
    Knee {
        max_eps_km: f64,
        k: usize,
        knee_index: usize,
        profile_km: Vec<f64>,
    },
    /// No knee was found; the configured fallback bound was used.
    Fallback {
        max_eps_km: f64,
        k: usize,
        profile_km: Vec<f64>,
    },
    /// Largest configured OPTICS radius.
    MaxRadius { max_eps_km: f64 },
    /// No knee and no fallback: the grid is empty and the run reports no clusters.
    KneeAbsent { k: usize, profile_km: Vec<f64> },
}

impl EpsilonBound {
    /// Upper bound of the epsilon grid, `None` when the profile had no knee.
    #[must_use]
    pub fn max_eps_km(&self) -> Option<f64> {
        match self {
            Self::Knee { max_eps_km, .. }
            | Self::Fallback { max_eps_km, .. }
            | Self::MaxRadius { max_eps_km } => Some(*max_eps_km),
            Self::KneeAbsent { .. } => None,
        }
    }
}

/// Everything a run reports beyond its status when clusters were found.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotDetails {
    pub hopkins: f64,
    pub epsilon: EpsilonBound,
    pub n_candidates: usize,
    pub n_valid: usize,
    /// Selected performance records in ranked order; the first was re-run.
    pub selected: Vec<PerformanceRecord>,
    /// Clustered records of the re-run, noise excluded.
    pub records: Vec<LabeledRecord>,
    pub clusters: Vec<ClusterStatistics>,
}

/// Response of one hotspot run. Only the status is reported when no candidate
/// produced two or more clusters. A city run whose k-distance profile has no
/// knee (and no fallback bound) also reports its tendency and profile, with
/// empty candidate and record lists.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotReport {
    pub granularity: Granularity,
    pub target: String,
    pub cause: String,
    pub status: SearchStatus,
    #[serde(flatten)]
    pub details: Option<HotspotDetails>,
}

impl HotspotReport {
    fn no_clusters(granularity: Granularity, request: &HotspotRequest) -> Self {
        Self {
            granularity,
            target: request.target.clone(),
            cause: request.cause.clone(),
            status: SearchStatus::NoClusters,
            details: None,
        }
    }

    /// Number of clusters in the final labeling, zero without details.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.details.as_ref().map_or(0, |d| d.clusters.len())
    }
}

// ── shared ────────────────────────────────────────────────────────────────────

/// The record subset of one run and the figures computed before the search.
struct Subset<'a> {
    granularity: Granularity,
    request: &'a HotspotRequest,
    records: &'a [AccidentRecord],
    sample: GeoSample,
    hopkins: f64,
}

impl<'a> Subset<'a> {
    fn prepare(
        granularity: Granularity,
        request: &'a HotspotRequest,
        records: &'a [AccidentRecord],
        tendency: &TendencyConfig,
    ) -> Result<Self, ClusterError> {
        let sample = GeoSample::from_degrees(records.iter().map(|r| (r.latitude, r.longitude)))?;
        let hopkins = tendency.estimate(&sample)?;
        info!(n_records = sample.len(), hopkins, "clustering tendency estimated");
        Ok(Self {
            granularity,
            request,
            records,
            sample,
            hopkins,
        })
    }

    fn knee_absent(&self, k: usize, profile_km: Vec<f64>) -> HotspotReport {
        HotspotReport {
            granularity: self.granularity,
            target: self.request.target.clone(),
            cause: self.request.cause.clone(),
            status: SearchStatus::NoClusters,
            details: Some(HotspotDetails {
                hopkins: self.hopkins,
                epsilon: EpsilonBound::KneeAbsent { k, profile_km },
                n_candidates: 0,
                n_valid: 0,
                selected: Vec::new(),
                records: Vec::new(),
                clusters: Vec::new(),
            }),
        }
    }

    fn finish<P: Copy>(
        &self,
        epsilon: EpsilonBound,
        outcome: &SearchOutcome<P>,
        labeling: Option<Labeling>,
        weights: &HotspotWeights,
    ) -> HotspotReport {
        let Some(labeling) = labeling else {
            return HotspotReport::no_clusters(self.granularity, self.request);
        };
        let table = score_hotspots(self.records, &labeling, weights);
        info!(
            status = ?outcome.status,
            n_clusters = table.clusters.len(),
            n_clustered = table.records.len(),
            "hotspots detected"
        );
        HotspotReport {
            granularity: self.granularity,
            target: self.request.target.clone(),
            cause: self.request.cause.clone(),
            status: outcome.status,
            details: Some(HotspotDetails {
                hopkins: self.hopkins,
                epsilon,
                n_candidates: outcome.n_candidates,
                n_valid: outcome.n_valid,
                selected: outcome.records(),
                records: table.records,
                clusters: table.clusters,
            }),
        }
    }
}

// ── city ──────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(target = %request.target, cause = %request.cause))]
pub(crate) fn city(
    request: &HotspotRequest,
    records: &[AccidentRecord],
    config: &CityConfig,
    cancel: Option<&CancellationToken>,
) -> Result<HotspotReport, ClusterError> {
    let subset = Subset::prepare(Granularity::City, request, records, &config.tendency)?;
    if config.precompute_matrix {
        let matrix = subset.sample.pairwise();
        city_over(&subset, &matrix, config, cancel)
    } else {
        city_over(&subset, &subset.sample, config, cancel)
    }
}

fn city_over<D: PairwiseDistance>(
    subset: &Subset<'_>,
    distances: &D,
    config: &CityConfig,
    cancel: Option<&CancellationToken>,
) -> Result<HotspotReport, ClusterError> {
    let estimate = estimate_epsilon(distances, config.k)?;
    let epsilon = match (estimate.knee_index, config.max_eps_km) {
        (Some(knee_index), _) => EpsilonBound::Knee {
            max_eps_km: estimate.profile_km[knee_index],
            k: estimate.k,
            knee_index,
            profile_km: estimate.profile_km,
        },
        (None, Some(max_eps_km)) => {
            warn!(max_eps_km, "no knee in the k-distance profile, using fallback bound");
            EpsilonBound::Fallback {
                max_eps_km,
                k: estimate.k,
                profile_km: estimate.profile_km,
            }
        }
        (None, None) => {
            warn!(k = estimate.k, "no knee in the k-distance profile and no fallback bound");
            return Ok(subset.knee_absent(estimate.k, estimate.profile_km));
        }
    };

    let max_eps_km = epsilon.max_eps_km().unwrap_or(config.min_eps_km);
    let eps = epsilon_range(config.min_eps_km, config.step_eps_km, max_eps_km);
    if eps.is_empty() {
        warn!(min_eps_km = config.min_eps_km, max_eps_km, "epsilon grid is empty");
    }
    let grid = dbscan_grid(&eps, &config.min_pts);
    debug!(n_eps = eps.len(), n_candidates = grid.len(), "dbscan grid built");

    let dbscan = Dbscan::new(distances);
    let outcome = ParameterSearch::new(&dbscan, &subset.sample, distances)
        .with_cancellation(cancel)
        .run(&grid, &config.selection)?;
    let labeling = outcome
        .chosen()
        .and_then(|params| dbscan.cluster(&params).into_labeling());
    Ok(subset.finish(epsilon, &outcome, labeling, &config.weights))
}

// ── state ─────────────────────────────────────────────────────────────────────

#[instrument(skip_all, fields(target = %request.target, cause = %request.cause))]
pub(crate) fn state(
    request: &HotspotRequest,
    records: &[AccidentRecord],
    config: &StateConfig,
    cancel: Option<&CancellationToken>,
) -> Result<HotspotReport, ClusterError> {
    let subset = Subset::prepare(Granularity::State, request, records, &config.tendency)?;
    let collapsed = subset.sample.collapse_duplicates();
    debug!(
        n_records = collapsed.original_len(),
        n_unique = collapsed.unique().len(),
        "coincident locations collapsed"
    );
    if config.precompute_matrix {
        let matrix = collapsed.unique().pairwise();
        state_over(&subset, &collapsed, &matrix, config, cancel)
    } else {
        state_over(&subset, &collapsed, collapsed.unique(), config, cancel)
    }
}

fn state_over<D: PairwiseDistance>(
    subset: &Subset<'_>,
    collapsed: &CollapsedSample,
    unique_distances: &D,
    config: &StateConfig,
    cancel: Option<&CancellationToken>,
) -> Result<HotspotReport, ClusterError> {
    let grid = optics_grid(&config.max_radius_km, &config.min_pts, &config.xi);
    let epsilon = EpsilonBound::MaxRadius {
        max_eps_km: config.largest_radius_km(),
    };

    let optics = Optics::new(collapsed, unique_distances);
    let rows = collapsed.row_distances(unique_distances);
    let outcome = ParameterSearch::new(&optics, &subset.sample, &rows)
        .with_cancellation(cancel)
        .run(&grid, &config.selection)?;
    let labeling = outcome
        .chosen()
        .and_then(|params| optics.cluster(&params).into_labeling());
    Ok(subset.finish(epsilon, &outcome, labeling, &config.weights))
}
