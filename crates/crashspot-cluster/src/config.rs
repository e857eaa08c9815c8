//! Configuration builders for the city (DBSCAN) and state (OPTICS) hotspot runs.

use crate::error::ClusterError;
use crate::hotspot::HotspotWeights;
use crate::pipeline::{HotspotReport, HotspotRequest};
use crate::record::AccidentRecord;
use crate::search::{CancellationToken, SelectionPolicy};
use crate::tendency::TendencyConfig;

/// Smallest accepted minimum-points value for DBSCAN.
const DBSCAN_MIN_POINTS_FLOOR: usize = 1;
/// Smallest accepted minimum-points value for OPTICS (a core distance needs a neighbour).
const OPTICS_MIN_POINTS_FLOOR: usize = 2;

fn check_min_points(min_pts: &[usize], floor: usize) -> Result<(), ClusterError> {
    if min_pts.is_empty() {
        return Err(ClusterError::EmptyGrid { parameter: "min_pts" });
    }
    match min_pts.iter().find(|&&m| m < floor) {
        Some(&min_points) => Err(ClusterError::InvalidMinPoints { min_points, floor }),
        None => Ok(()),
    }
}

fn positive_finite(x: f64) -> bool {
    x.is_finite() && x > 0.0
}

// ── CityConfig ────────────────────────────────────────────────────────────────

/// Configuration for a city-level hotspot run.
///
/// The epsilon grid runs from `min_eps_km` in steps of `step_eps_km` up to
/// (excluding) the knee of the k-distance profile, or `max_eps_km` when the
/// profile has no knee. Every epsilon is crossed with every `min_pts` value.
///
/// # Defaults
///
/// | Parameter           | Default                      |
/// |---------------------|------------------------------|
/// | `max_eps_km`        | none                         |
/// | `precompute_matrix` | true                         |
/// | `selection`         | [`SelectionPolicy::default`] |
/// | `tendency`          | [`TendencyConfig::default`]  |
/// | `weights`           | [`HotspotWeights::default`]  |
#[derive(Debug, Clone)]
pub struct CityConfig {
    pub(crate) k: usize,
    pub(crate) min_eps_km: f64,
    pub(crate) step_eps_km: f64,
    pub(crate) min_pts: Vec<usize>,
    pub(crate) max_eps_km: Option<f64>,
    pub(crate) precompute_matrix: bool,
    pub(crate) selection: SelectionPolicy,
    pub(crate) tendency: TendencyConfig,
    pub(crate) weights: HotspotWeights,
}

impl CityConfig {
    /// Create a city configuration from the k-distance rank and the epsilon/minPts grid.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::InvalidNeighbourCount`] | `k` is zero |
    /// | [`ClusterError::InvalidEpsilonRange`] | `min_eps_km` or `step_eps_km` is not positive and finite |
    /// | [`ClusterError::EmptyGrid`] | `min_pts` is empty |
    /// | [`ClusterError::InvalidMinPoints`] | a `min_pts` value is zero |
    pub fn new(
        k: usize,
        min_eps_km: f64,
        step_eps_km: f64,
        min_pts: Vec<usize>,
    ) -> Result<Self, ClusterError> {
        if k == 0 {
            return Err(ClusterError::InvalidNeighbourCount { k, n_points: 0 });
        }
        if !positive_finite(min_eps_km) || !positive_finite(step_eps_km) {
            return Err(ClusterError::InvalidEpsilonRange {
                min_km: min_eps_km,
                step_km: step_eps_km,
            });
        }
        check_min_points(&min_pts, DBSCAN_MIN_POINTS_FLOOR)?;
        Ok(Self {
            k,
            min_eps_km,
            step_eps_km,
            min_pts,
            max_eps_km: None,
            precompute_matrix: true,
            selection: SelectionPolicy::default(),
            tendency: TendencyConfig::default(),
            weights: HotspotWeights::default(),
        })
    }

    /// Set the epsilon upper bound used when the k-distance profile has no knee.
    ///
    /// # Errors
    ///
    /// Returns [`ClusterError::InvalidEpsilonBound`] if `max_eps_km` is not
    /// positive and finite.
    pub fn with_max_eps_km(mut self, max_eps_km: f64) -> Result<Self, ClusterError> {
        if !positive_finite(max_eps_km) {
            return Err(ClusterError::InvalidEpsilonBound { max_eps_km });
        }
        self.max_eps_km = Some(max_eps_km);
        Ok(self)
    }

    /// Set whether the pairwise distance matrix is computed once and shared by all
    /// candidates. When disabled, distances are evaluated on demand.
    #[must_use]
    pub fn with_precompute_matrix(mut self, precompute_matrix: bool) -> Self {
        self.precompute_matrix = precompute_matrix;
        self
    }

    #[must_use]
    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    #[must_use]
    pub fn with_tendency(mut self, tendency: TendencyConfig) -> Self {
        self.tendency = tendency;
        self
    }

    #[must_use]
    pub fn with_weights(mut self, weights: HotspotWeights) -> Self {
        self.weights = weights;
        self
    }

    /// Return the neighbour rank of the k-distance profile.
    #[must_use]
    pub fn k(&self) -> usize {
        self.k
    }

    #[must_use]
    pub fn min_eps_km(&self) -> f64 {
        self.min_eps_km
    }

    #[must_use]
    pub fn step_eps_km(&self) -> f64 {
        self.step_eps_km
    }

    #[must_use]
    pub fn min_pts(&self) -> &[usize] {
        &self.min_pts
    }

    #[must_use]
    pub fn max_eps_km(&self) -> Option<f64> {
        self.max_eps_km
    }

    #[must_use]
    pub fn precompute_matrix(&self) -> bool {
        self.precompute_matrix
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionPolicy {
        &self.selection
    }

    #[must_use]
    pub fn tendency(&self) -> &TendencyConfig {
        &self.tendency
    }

    #[must_use]
    pub fn weights(&self) -> &HotspotWeights {
        &self.weights
    }

    /// Detect hotspots in `records`, already restricted to one city and cause.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::Geo`] | `records` is empty or holds an invalid coordinate |
    /// | [`ClusterError::InsufficientSample`] | fewer than two records |
    /// | [`ClusterError::DegenerateDistance`] | every record shares one location |
    /// | [`ClusterError::InvalidNeighbourCount`] | `k` exceeds the number of records |
    pub fn fit(
        &self,
        request: &HotspotRequest,
        records: &[AccidentRecord],
    ) -> Result<HotspotReport, ClusterError> {
        crate::pipeline::city(request, records, self, None)
    }

    /// Like [`fit`](Self::fit), checking `token` before each grid candidate.
    ///
    /// # Errors
    ///
    /// Same as [`fit`](Self::fit), plus [`ClusterError::Cancelled`].
    pub fn fit_cancellable(
        &self,
        request: &HotspotRequest,
        records: &[AccidentRecord],
        token: &CancellationToken,
    ) -> Result<HotspotReport, ClusterError> {
        crate::pipeline::city(request, records, self, Some(token))
    }
}

// ── StateConfig ───────────────────────────────────────────────────────────────

/// Configuration for a state-level hotspot run.
///
/// The grid is the cross product of `max_radius_km`, `min_pts` and `xi`.
///
/// # Defaults
///
/// | Parameter           | Default                      |
/// |---------------------|------------------------------|
/// | `precompute_matrix` | true                         |
/// | `selection`         | [`SelectionPolicy::default`] |
/// | `tendency`          | [`TendencyConfig::default`]  |
/// | `weights`           | [`HotspotWeights::default`]  |
#[derive(Debug, Clone)]
pub struct StateConfig {
    pub(crate) max_radius_km: Vec<f64>,
    pub(crate) min_pts: Vec<usize>,
    pub(crate) xi: Vec<f64>,
    pub(crate) precompute_matrix: bool,
    pub(crate) selection: SelectionPolicy,
    pub(crate) tendency: TendencyConfig,
    pub(crate) weights: HotspotWeights,
}

impl StateConfig {
    /// Create a state configuration from the OPTICS candidate lists.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::EmptyGrid`] | any list is empty |
    /// | [`ClusterError::InvalidRadius`] | a radius is not positive and finite |
    /// | [`ClusterError::InvalidMinPoints`] | a `min_pts` value is below 2 |
    /// | [`ClusterError::InvalidXi`] | a `xi` value is outside `(0, 1)` |
    pub fn new(
        max_radius_km: Vec<f64>,
        min_pts: Vec<usize>,
        xi: Vec<f64>,
    ) -> Result<Self, ClusterError> {
        if max_radius_km.is_empty() {
            return Err(ClusterError::EmptyGrid { parameter: "max_radius_km" });
        }
        if let Some(&radius_km) = max_radius_km.iter().find(|&&r| !positive_finite(r)) {
            return Err(ClusterError::InvalidRadius { radius_km });
        }
        check_min_points(&min_pts, OPTICS_MIN_POINTS_FLOOR)?;
        if xi.is_empty() {
            return Err(ClusterError::EmptyGrid { parameter: "xi" });
        }
        if let Some(&bad) = xi.iter().find(|&&x| !(x > 0.0 && x < 1.0)) {
            return Err(ClusterError::InvalidXi { xi: bad });
        }
        Ok(Self {
            max_radius_km,
            min_pts,
            xi,
            precompute_matrix: true,
            selection: SelectionPolicy::default(),
            tendency: TendencyConfig::default(),
            weights: HotspotWeights::default(),
        })
    }

    /// Set whether the pairwise matrix over unique locations is precomputed.
    #[must_use]
    pub fn with_precompute_matrix(mut self, precompute_matrix: bool) -> Self {
        self.precompute_matrix = precompute_matrix;
        self
    }

    #[must_use]
    pub fn with_selection(mut self, selection: SelectionPolicy) -> Self {
        self.selection = selection;
        self
    }

    #[must_use]
    pub fn with_tendency(mut self, tendency: TendencyConfig) -> Self {
        self.tendency = tendency;
        self
    }

    #[must_use]
    pub fn with_weights(mut self, weights: HotspotWeights) -> Self {
        self.weights = weights;
        self
    }

    #[must_use]
    pub fn max_radius_km(&self) -> &[f64] {
        &self.max_radius_km
    }

    /// Return the largest configured radius, reported as the state run's epsilon bound.
    #[must_use]
    pub fn largest_radius_km(&self) -> f64 {
        self.max_radius_km
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max)
    }

    #[must_use]
    pub fn min_pts(&self) -> &[usize] {
        &self.min_pts
    }

    #[must_use]
    pub fn xi(&self) -> &[f64] {
        &self.xi
    }

    #[must_use]
    pub fn precompute_matrix(&self) -> bool {
        self.precompute_matrix
    }

    #[must_use]
    pub fn selection(&self) -> &SelectionPolicy {
        &self.selection
    }

    #[must_use]
    pub fn tendency(&self) -> &TendencyConfig {
        &self.tendency
    }

    #[must_use]
    pub fn weights(&self) -> &HotspotWeights {
        &self.weights
    }

    /// Detect hotspots in `records`, already restricted to one state and cause.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::Geo`] | `records` is empty or holds an invalid coordinate |
    /// | [`ClusterError::InsufficientSample`] | fewer than two records |
    /// | [`ClusterError::DegenerateDistance`] | every record shares one location |
    pub fn fit(
        &self,
        request: &HotspotRequest,
        records: &[AccidentRecord],
    ) -> Result<HotspotReport, ClusterError> {
        crate::pipeline::state(request, records, self, None)
    }

    /// Like [`fit`](Self::fit), checking `token` before each grid candidate.
    ///
    /// # Errors
    ///
    /// Same as [`fit`](Self::fit), plus [`ClusterError::Cancelled`].
    pub fn fit_cancellable(
        &self,
        request: &HotspotRequest,
        records: &[AccidentRecord],
        token: &CancellationToken,
    ) -> Result<HotspotReport, ClusterError> {
        crate::pipeline::state(request, records, self, Some(token))
    }
}
