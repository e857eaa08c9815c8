//! Grid search over clustering parameters, candidate ranking and selection.

use std::cmp::Ordering;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering as AtomicOrdering};

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, info, instrument};

use crashspot_geo::{GeoSample, PairwiseDistance};

use crate::clusterer::{ClusterOutcome, DensityClusterer};
use crate::dbscan::DbscanParams;
use crate::error::ClusterError;
use crate::metrics::QualityMetrics;
use crate::optics::OpticsParams;

// ── candidates ────────────────────────────────────────────────────────────────

/// Parameters of one grid candidate, for either algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ParameterCandidate {
    Dbscan(DbscanParams),
    Optics(OpticsParams),
}

impl ParameterCandidate {
    /// Deterministic order over parameter values, used as the final ranking tie-break.
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Self::Dbscan(a), Self::Dbscan(b)) => a
                .eps_km
                .total_cmp(&b.eps_km)
                .then(a.min_samples.cmp(&b.min_samples)),
            (Self::Optics(a), Self::Optics(b)) => a
                .max_radius_km
                .total_cmp(&b.max_radius_km)
                .then(a.min_samples.cmp(&b.min_samples))
                .then(a.xi.total_cmp(&b.xi)),
            (Self::Dbscan(_), Self::Optics(_)) => Ordering::Less,
            (Self::Optics(_), Self::Dbscan(_)) => Ordering::Greater,
        }
    }
}

impl From<DbscanParams> for ParameterCandidate {
    fn from(params: DbscanParams) -> Self {
        Self::Dbscan(params)
    }
}

impl From<OpticsParams> for ParameterCandidate {
    fn from(params: OpticsParams) -> Self {
        Self::Optics(params)
    }
}

/// Epsilon values `min, min + step, ...` strictly below `max` (all in km).
#[must_use]
pub fn epsilon_range(min_km: f64, step_km: f64, max_km: f64) -> Vec<f64> {
    if max_km.is_nan() || max_km <= min_km || step_km.is_nan() || step_km <= 0.0 {
        return Vec::new();
    }
    let count = ((max_km - min_km) / step_km).ceil() as usize;
    (0..count)
        .map(|i| min_km + i as f64 * step_km)
        .take_while(|&eps| eps < max_km)
        .collect()
}

/// Cross product of epsilon values and minimum-point counts, epsilon outermost.
#[must_use]
pub fn dbscan_grid(eps_km: &[f64], min_samples: &[usize]) -> Vec<DbscanParams> {
    eps_km
        .iter()
        .flat_map(|&eps_km| {
            min_samples
                .iter()
                .map(move |&min_samples| DbscanParams { eps_km, min_samples })
        })
        .collect()
}

/// Cross product of radii, minimum-point counts and ξ values, radius outermost.
#[must_use]
pub fn optics_grid(max_radius_km: &[f64], min_samples: &[usize], xi: &[f64]) -> Vec<OpticsParams> {
    let mut grid = Vec::with_capacity(max_radius_km.len() * min_samples.len() * xi.len());
    for &max_radius_km in max_radius_km {
        for &min_samples in min_samples {
            for &xi in xi {
                grid.push(OpticsParams {
                    max_radius_km,
                    min_samples,
                    xi,
                });
            }
        }
    }
    grid
}

// ── records and ranking ───────────────────────────────────────────────────────

/// Quality figures of one valid (two or more clusters) candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceRecord {
    #[serde(flatten)]
    pub candidate: ParameterCandidate,
    #[serde(flatten)]
    pub metrics: QualityMetrics,
}

/// Ranking order: core/outlier ratio ascending, silhouette descending,
/// Davies–Bouldin ascending, Calinski–Harabasz descending, then parameters.
#[must_use]
pub fn rank_order(a: &PerformanceRecord, b: &PerformanceRecord) -> Ordering {
    let (ma, mb) = (&a.metrics, &b.metrics);
    ma.core_outlier_ratio
        .total_cmp(&mb.core_outlier_ratio)
        .then_with(|| mb.silhouette_coefficient.total_cmp(&ma.silhouette_coefficient))
        .then_with(|| ma.davies_bouldin_index.total_cmp(&mb.davies_bouldin_index))
        .then_with(|| mb.calinski_harabasz_index.total_cmp(&ma.calinski_harabasz_index))
        .then_with(|| a.candidate.total_cmp(&b.candidate))
}

/// Reliability of a search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SearchStatus {
    /// Enough candidates passed the ratio threshold.
    Ok,
    /// Too few candidates passed; the returned set is a best effort.
    Degraded,
    /// No candidate produced two or more clusters.
    NoClusters,
}

/// Threshold-and-fallback rule applied to the ranked candidates.
///
/// # Defaults
///
/// | Parameter               | Default |
/// |-------------------------|---------|
/// | `min_core_outlier_ratio`| 1.4     |
/// | `top_n`                 | 3       |
#[derive(Debug, Clone)]
pub struct SelectionPolicy {
    pub(crate) min_core_outlier_ratio: f64,
    pub(crate) top_n: usize,
}

impl Default for SelectionPolicy {
    fn default() -> Self {
        Self {
            min_core_outlier_ratio: 1.4,
            top_n: 3,
        }
    }
}

impl SelectionPolicy {
    /// Set the core/outlier ratio a candidate must strictly exceed to count as clean.
    #[must_use]
    pub fn with_min_core_outlier_ratio(mut self, ratio: f64) -> Self {
        self.min_core_outlier_ratio = ratio;
        self
    }

    /// Set how many candidates are returned. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n.max(1);
        self
    }

    #[must_use]
    pub fn min_core_outlier_ratio(&self) -> f64 {
        self.min_core_outlier_ratio
    }

    #[must_use]
    pub fn top_n(&self) -> usize {
        self.top_n
    }

    /// Rank `records` and pick the returned set.
    ///
    /// The best `top_n` records above the ratio threshold give [`SearchStatus::Ok`].
    /// With fewer passing, the last `top_n` records of the ranking are returned
    /// (still in ranked order) with [`SearchStatus::Degraded`]. No records gives
    /// [`SearchStatus::NoClusters`].
    #[must_use]
    pub fn select<P>(
        &self,
        mut records: Vec<(P, PerformanceRecord)>,
    ) -> (SearchStatus, Vec<(P, PerformanceRecord)>) {
        if records.is_empty() {
            return (SearchStatus::NoClusters, Vec::new());
        }
        records.sort_by(|a, b| rank_order(&a.1, &b.1));

        let passing = records
            .iter()
            .filter(|(_, r)| r.metrics.core_outlier_ratio > self.min_core_outlier_ratio)
            .count();
        if passing >= self.top_n {
            let selected = records
                .into_iter()
                .filter(|(_, r)| r.metrics.core_outlier_ratio > self.min_core_outlier_ratio)
                .take(self.top_n)
                .collect();
            (SearchStatus::Ok, selected)
        } else {
            let start = records.len().saturating_sub(self.top_n);
            (SearchStatus::Degraded, records.split_off(start))
        }
    }
}

// ── cancellation ──────────────────────────────────────────────────────────────

/// Cooperative cancellation flag shared between a caller and a running search.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken(Arc<AtomicBool>);

impl CancellationToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Request cancellation; candidates not yet started are skipped.
    pub fn cancel(&self) {
        self.0.store(true, AtomicOrdering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(AtomicOrdering::Relaxed)
    }
}

// ── search ────────────────────────────────────────────────────────────────────

/// Result of a grid search.
#[derive(Debug, Clone)]
pub struct SearchOutcome<P> {
    pub status: SearchStatus,
    /// Selected candidates in ranked order, each with its typed parameters.
    pub selected: Vec<(P, PerformanceRecord)>,
    /// Number of candidates evaluated.
    pub n_candidates: usize,
    /// Number of candidates that produced two or more clusters.
    pub n_valid: usize,
}

impl<P: Copy> SearchOutcome<P> {
    /// Parameters of the candidate to re-run for final labels.
    #[must_use]
    pub fn chosen(&self) -> Option<P> {
        self.selected.first().map(|(p, _)| *p)
    }

    /// The selected performance records, without typed parameters.
    #[must_use]
    pub fn records(&self) -> Vec<PerformanceRecord> {
        self.selected.iter().map(|(_, r)| *r).collect()
    }
}

/// Evaluates every grid candidate with one clusterer and scores the valid ones.
pub struct ParameterSearch<'a, C, D> {
    clusterer: &'a C,
    sample: &'a GeoSample,
    distances: &'a D,
    cancel: Option<&'a CancellationToken>,
}

impl<'a, C, D> ParameterSearch<'a, C, D>
where
    C: DensityClusterer + Sync,
    C::Params: Copy + Send + Sync + Into<ParameterCandidate>,
    D: PairwiseDistance,
{
    /// `sample` and `distances` index the records the clusterer labels.
    #[must_use]
    pub fn new(clusterer: &'a C, sample: &'a GeoSample, distances: &'a D) -> Self {
        Self {
            clusterer,
            sample,
            distances,
            cancel: None,
        }
    }

    /// Check `token` before each candidate.
    #[must_use]
    pub fn with_cancellation(mut self, token: Option<&'a CancellationToken>) -> Self {
        self.cancel = token;
        self
    }

    /// Evaluate all candidates in parallel, discarding degenerate ones.
    ///
    /// Output order follows `candidates`.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`ClusterError::Cancelled`] | the token was cancelled before a candidate started |
    #[instrument(skip_all, fields(n_candidates = candidates.len()))]
    pub fn evaluate(
        &self,
        candidates: &[C::Params],
    ) -> Result<Vec<(C::Params, PerformanceRecord)>, ClusterError> {
        let evaluated = AtomicUsize::new(0);
        let results: Vec<Option<(C::Params, PerformanceRecord)>> = candidates
            .par_iter()
            .map(|&params| {
                if self.cancel.is_some_and(CancellationToken::is_cancelled) {
                    return Err(ClusterError::Cancelled {
                        evaluated: evaluated.load(AtomicOrdering::Relaxed),
                    });
                }
                let outcome = self.clusterer.cluster(&params);
                evaluated.fetch_add(1, AtomicOrdering::Relaxed);
                Ok(match outcome {
                    ClusterOutcome::Degenerate { n_clusters } => {
                        debug!(n_clusters, "candidate discarded");
                        None
                    }
                    ClusterOutcome::Clustered(labeling) => {
                        let metrics = QualityMetrics::compute(&labeling, self.sample, self.distances);
                        Some((
                            params,
                            PerformanceRecord {
                                candidate: params.into(),
                                metrics,
                            },
                        ))
                    }
                })
            })
            .collect::<Result<_, _>>()?;
        Ok(results.into_iter().flatten().collect())
    }

    /// Evaluate all candidates, then rank and select with `policy`.
    ///
    /// # Errors
    ///
    /// Same as [`evaluate`](Self::evaluate).
    #[instrument(skip_all, fields(n_candidates = candidates.len()))]
    pub fn run(
        &self,
        candidates: &[C::Params],
        policy: &SelectionPolicy,
    ) -> Result<SearchOutcome<C::Params>, ClusterError> {
        let records = self.evaluate(candidates)?;
        let n_valid = records.len();
        let (status, selected) = policy.select(records);
        info!(
            n_candidates = candidates.len(),
            n_valid,
            n_selected = selected.len(),
            ?status,
            "parameter search complete"
        );
        Ok(SearchOutcome {
            status,
            selected,
            n_candidates: candidates.len(),
            n_valid,
        })
    }
}
