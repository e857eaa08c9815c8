//! Cluster-validity indices for a completed labeling.
//!
//! Noise records are excluded from every index except the core/outlier ratio.
//! Davies–Bouldin and Calinski–Harabasz treat the radian coordinates as plane
//! vectors (they need centroids); the silhouette uses great-circle distance.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument};

use crashspot_geo::{GeoSample, PairwiseDistance};

use crate::clusterer::Labeling;
use crate::label::ClusterLabel;

/// Core/outlier ratio reported when a labeling has no noise at all.
pub const NO_OUTLIER_RATIO: f64 = 10_000.0;

/// Tolerance under which Davies–Bouldin treats all dispersions as zero.
const ZERO_TOLERANCE: f64 = 1e-8;

/// The four quality figures recorded per valid candidate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QualityMetrics {
    pub core_outlier_ratio: f64,
    pub number_of_clusters: usize,
    pub davies_bouldin_index: f64,
    pub silhouette_coefficient: f64,
    pub calinski_harabasz_index: f64,
}

impl QualityMetrics {
    /// Score `labeling` over the records of `sample`.
    ///
    /// `distances` must index the same records as `sample`.
    #[must_use]
    #[instrument(skip_all, fields(n_records = sample.len(), n_clusters = labeling.n_clusters()))]
    pub fn compute<D: PairwiseDistance>(
        labeling: &Labeling,
        sample: &GeoSample,
        distances: &D,
    ) -> Self {
        let core = ClusteredRecords::new(labeling);
        let coords: Vec<[f64; 2]> = core
            .records
            .iter()
            .map(|&i| {
                let p = sample.points()[i];
                [p.lat(), p.lon()]
            })
            .collect();

        let metrics = Self {
            core_outlier_ratio: core_outlier_ratio(labeling.labels()),
            number_of_clusters: labeling.n_clusters(),
            davies_bouldin_index: davies_bouldin(&coords, &core.cluster, core.k),
            silhouette_coefficient: silhouette(distances, &core.records, &core.cluster, core.k),
            calinski_harabasz_index: calinski_harabasz(&coords, &core.cluster, core.k),
        };
        debug!(
            ratio = metrics.core_outlier_ratio,
            davies_bouldin = metrics.davies_bouldin_index,
            silhouette = metrics.silhouette_coefficient,
            calinski_harabasz = metrics.calinski_harabasz_index,
            "quality metrics computed"
        );
        metrics
    }
}

/// Non-noise records with their cluster ids.
struct ClusteredRecords {
    records: Vec<usize>,
    cluster: Vec<usize>,
    k: usize,
}

impl ClusteredRecords {
    fn new(labeling: &Labeling) -> Self {
        let (records, cluster) = labeling
            .labels()
            .iter()
            .enumerate()
            .filter_map(|(i, l)| l.cluster_id().map(|c| (i, c)))
            .unzip();
        Self {
            records,
            cluster,
            k: labeling.n_clusters(),
        }
    }
}

/// Clustered records per noise record, or [`NO_OUTLIER_RATIO`] without noise.
#[must_use]
pub fn core_outlier_ratio(labels: &[ClusterLabel]) -> f64 {
    let noise = labels.iter().filter(|l| l.is_noise()).count();
    if noise == 0 {
        return NO_OUTLIER_RATIO;
    }
    (labels.len() - noise) as f64 / noise as f64
}

fn centroids(coords: &[[f64; 2]], cluster: &[usize], k: usize) -> (Vec<[f64; 2]>, Vec<usize>) {
    let mut sums = vec![[0.0f64; 2]; k];
    let mut counts = vec![0usize; k];
    for (x, &c) in coords.iter().zip(cluster) {
        sums[c][0] += x[0];
        sums[c][1] += x[1];
        counts[c] += 1;
    }
    let centres = sums
        .iter()
        .zip(&counts)
        .map(|(s, &n)| {
            let n = n.max(1) as f64;
            [s[0] / n, s[1] / n]
        })
        .collect();
    (centres, counts)
}

fn euclidean(a: &[f64; 2], b: &[f64; 2]) -> f64 {
    ((a[0] - b[0]).powi(2) + (a[1] - b[1]).powi(2)).sqrt()
}

/// Davies–Bouldin index: mean over clusters of the worst
/// `(s_i + s_j) / d(c_i, c_j)` ratio. Lower is better.
///
/// Returns 0 when every intra-cluster dispersion or every centroid distance is
/// (near) zero. Coincident centroids of distinct clusters contribute nothing.
#[must_use]
pub fn davies_bouldin(coords: &[[f64; 2]], cluster: &[usize], k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let (centres, counts) = centroids(coords, cluster, k);
    let mut intra = vec![0.0f64; k];
    for (x, &c) in coords.iter().zip(cluster) {
        intra[c] += euclidean(x, &centres[c]);
    }
    for (s, &n) in intra.iter_mut().zip(&counts) {
        *s /= n.max(1) as f64;
    }

    let centre_dist = |i: usize, j: usize| euclidean(&centres[i], &centres[j]);
    let all_intra_zero = intra.iter().all(|s| s.abs() <= ZERO_TOLERANCE);
    let all_centres_zero = (0..k).all(|i| (0..k).all(|j| centre_dist(i, j) <= ZERO_TOLERANCE));
    if all_intra_zero || all_centres_zero {
        return 0.0;
    }

    let total: f64 = (0..k)
        .map(|i| {
            (0..k)
                .filter(|&j| j != i)
                .map(|j| {
                    let d = centre_dist(i, j);
                    if d == 0.0 { 0.0 } else { (intra[i] + intra[j]) / d }
                })
                .fold(0.0, f64::max)
        })
        .sum();
    total / k as f64
}

/// Calinski–Harabasz index: between-cluster over within-cluster dispersion,
/// scaled by degrees of freedom. Higher is better; 1.0 when the within-cluster
/// dispersion is zero.
#[must_use]
pub fn calinski_harabasz(coords: &[[f64; 2]], cluster: &[usize], k: usize) -> f64 {
    let n = coords.len();
    if n == 0 || k < 2 {
        return 1.0;
    }
    let mean = coords.iter().fold([0.0f64; 2], |acc, x| [acc[0] + x[0], acc[1] + x[1]]);
    let mean = [mean[0] / n as f64, mean[1] / n as f64];
    let (centres, counts) = centroids(coords, cluster, k);

    let extra: f64 = centres
        .iter()
        .zip(&counts)
        .map(|(c, &m)| m as f64 * euclidean(c, &mean).powi(2))
        .sum();
    let intra: f64 = coords
        .iter()
        .zip(cluster)
        .map(|(x, &c)| euclidean(x, &centres[c]).powi(2))
        .sum();

    if intra == 0.0 {
        return 1.0;
    }
    extra * (n - k) as f64 / (intra * (k - 1) as f64)
}

/// Mean silhouette coefficient of the given records under great-circle distance.
///
/// For record `i`, `a` is the mean distance to the rest of its cluster and `b`
/// the smallest mean distance to another cluster; the score is
/// `(b - a) / max(a, b)`, and 0 for members of single-record clusters.
#[must_use]
pub fn silhouette<D: PairwiseDistance>(
    distances: &D,
    records: &[usize],
    cluster: &[usize],
    k: usize,
) -> f64 {
    let n = records.len();
    if n == 0 || k < 2 {
        return 0.0;
    }
    let mut sizes = vec![0usize; k];
    for &c in cluster {
        sizes[c] += 1;
    }

    // Collected before summing so the result does not depend on rayon's split points.
    let scores: Vec<f64> = (0..n)
        .into_par_iter()
        .map(|a_idx| {
            let own = cluster[a_idx];
            if sizes[own] <= 1 {
                return 0.0;
            }
            let mut sums = vec![0.0f64; k];
            for (b_idx, &c) in cluster.iter().enumerate() {
                sums[c] += distances.distance(records[a_idx], records[b_idx]).radians();
            }
            let a = sums[own] / (sizes[own] - 1) as f64;
            let b = (0..k)
                .filter(|&c| c != own && sizes[c] > 0)
                .map(|c| sums[c] / sizes[c] as f64)
                .fold(f64::INFINITY, f64::min);
            let denom = a.max(b);
            if denom > 0.0 && denom.is_finite() { (b - a) / denom } else { 0.0 }
        })
        .collect();
    scores.iter().sum::<f64>() / n as f64
}
