//! Per-cluster severity aggregation and normalized hotspot scores.

use serde::Serialize;
use tracing::{debug, instrument};

use crate::clusterer::Labeling;
use crate::label::ClusterLabel;
use crate::record::{AccidentRecord, VictimCondition};

/// Weights of the raw hotspot score `alpha * count + beta * rank_sum`.
///
/// # Defaults
///
/// | Parameter | Default |
/// |-----------|---------|
/// | `alpha`   | 0.2     |
/// | `beta`    | 0.8     |
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HotspotWeights {
    pub(crate) alpha: f64,
    pub(crate) beta: f64,
}

impl Default for HotspotWeights {
    fn default() -> Self {
        Self {
            alpha: 0.2,
            beta: 0.8,
        }
    }
}

impl HotspotWeights {
    /// Set the weight of the accident count.
    #[must_use]
    pub fn with_alpha(mut self, alpha: f64) -> Self {
        self.alpha = alpha;
        self
    }

    /// Set the weight of the summed severity rank.
    #[must_use]
    pub fn with_beta(mut self, beta: f64) -> Self {
        self.beta = beta;
        self
    }

    #[must_use]
    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    #[must_use]
    pub fn beta(&self) -> f64 {
        self.beta
    }
}

/// One clustered record of the final result table.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LabeledRecord {
    pub latitude: f64,
    pub longitude: f64,
    pub victim_condition: VictimCondition,
    pub victim_condition_rank: u32,
    pub label: ClusterLabel,
    pub road_id: String,
    pub km: f64,
}

/// Severity aggregate of one cluster.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ClusterStatistics {
    pub label: ClusterLabel,
    pub accident_count: usize,
    /// Sum of victim-condition ranks over the cluster.
    pub rank_sum: u64,
    /// `alpha * accident_count + beta * rank_sum`.
    pub score: f64,
    /// `score` min-max normalized across clusters to `[0, 1]`.
    pub hotspot_score: f64,
}

/// Labeled table and per-cluster aggregates of a final labeling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HotspotTable {
    pub records: Vec<LabeledRecord>,
    pub clusters: Vec<ClusterStatistics>,
}

/// Min-max normalize `scores` to `[0, 1]`. A zero range maps every score to 1.0.
#[must_use]
pub fn min_max_normalize(scores: &[f64]) -> Vec<f64> {
    let min = scores.iter().copied().fold(f64::INFINITY, f64::min);
    let max = scores.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let range = max - min;
    scores
        .iter()
        .map(|&s| if range > 0.0 { (s - min) / range } else { 1.0 })
        .collect()
}

/// Drop noise records, attach severity ranks and score each cluster.
///
/// `labeling` must be index-aligned with `records`. Clusters are reported in
/// ascending label order; records keep their input order.
#[must_use]
#[instrument(skip_all, fields(n_records = records.len(), n_clusters = labeling.n_clusters()))]
pub fn score_hotspots(
    records: &[AccidentRecord],
    labeling: &Labeling,
    weights: &HotspotWeights,
) -> HotspotTable {
    debug_assert_eq!(records.len(), labeling.labels().len());
    let k = labeling.n_clusters();
    let mut counts = vec![0usize; k];
    let mut rank_sums = vec![0u64; k];

    let labeled: Vec<LabeledRecord> = records
        .iter()
        .zip(labeling.labels())
        .filter_map(|(record, &label)| {
            let id = label.cluster_id()?;
            let rank = record.victim_condition.rank();
            counts[id] += 1;
            rank_sums[id] += u64::from(rank);
            Some(LabeledRecord {
                latitude: record.latitude,
                longitude: record.longitude,
                victim_condition: record.victim_condition,
                victim_condition_rank: rank,
                label,
                road_id: record.road_id.clone(),
                km: record.km,
            })
        })
        .collect();

    let scores: Vec<f64> = counts
        .iter()
        .zip(&rank_sums)
        .map(|(&c, &r)| weights.alpha * c as f64 + weights.beta * r as f64)
        .collect();
    let normalized = min_max_normalize(&scores);

    let clusters: Vec<ClusterStatistics> = (0..k)
        .map(|id| ClusterStatistics {
            label: ClusterLabel::cluster(id),
            accident_count: counts[id],
            rank_sum: rank_sums[id],
            score: scores[id],
            hotspot_score: normalized[id],
        })
        .collect();

    debug!(n_labeled = labeled.len(), "hotspot scores computed");
    HotspotTable {
        records: labeled,
        clusters,
    }
}
