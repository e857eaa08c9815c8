//! The shared density-clustering contract and its outcome types.

use crate::label::ClusterLabel;

/// A single clustering pass over a fixed set of coordinates.
///
/// Implementations borrow their coordinates (or a distance source over them)
/// at construction and map one parameter set to a fresh label vector. Two
/// calls with equal parameters yield identical labels.
pub trait DensityClusterer {
    /// Algorithm-specific knobs for one pass.
    type Params;

    /// Run one pass and classify the result.
    fn cluster(&self, params: &Self::Params) -> ClusterOutcome;
}

/// A completed per-record label vector with at least one cluster counted.
#[derive(Debug, Clone, PartialEq)]
pub struct Labeling {
    labels: Vec<ClusterLabel>,
    n_clusters: usize,
}

impl Labeling {
    /// Wrap a label vector whose cluster ids are contiguous from zero.
    #[must_use]
    pub fn new(labels: Vec<ClusterLabel>) -> Self {
        let n_clusters = labels
            .iter()
            .filter_map(|l| l.cluster_id())
            .max()
            .map_or(0, |max| max + 1);
        Self { labels, n_clusters }
    }

    #[must_use]
    pub fn labels(&self) -> &[ClusterLabel] {
        &self.labels
    }

    /// Number of distinct non-noise labels.
    #[must_use]
    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    /// Number of records labelled as noise.
    #[must_use]
    pub fn noise_count(&self) -> usize {
        self.labels.iter().filter(|l| l.is_noise()).count()
    }

    /// Number of records in each cluster, indexed by cluster id.
    #[must_use]
    pub fn cluster_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0usize; self.n_clusters];
        for id in self.labels.iter().filter_map(|l| l.cluster_id()) {
            sizes[id] += 1;
        }
        sizes
    }

    /// Indices of all records carrying `label`.
    #[must_use]
    pub fn members(&self, label: ClusterLabel) -> Vec<usize> {
        self.labels
            .iter()
            .enumerate()
            .filter_map(|(i, &l)| if l == label { Some(i) } else { None })
            .collect()
    }

    #[must_use]
    pub fn into_labels(self) -> Vec<ClusterLabel> {
        self.labels
    }
}

/// Result of one clustering pass.
#[derive(Debug, Clone, PartialEq)]
pub enum ClusterOutcome {
    /// At most one cluster was found; the candidate is discarded.
    Degenerate {
        /// Number of non-noise clusters found (0 or 1).
        n_clusters: usize,
    },
    /// Two or more clusters were found.
    Clustered(Labeling),
}

impl ClusterOutcome {
    /// Classify a raw label vector.
    #[must_use]
    pub fn from_labels(labels: Vec<ClusterLabel>) -> Self {
        let labeling = Labeling::new(labels);
        if labeling.n_clusters() <= 1 {
            Self::Degenerate {
                n_clusters: labeling.n_clusters(),
            }
        } else {
            Self::Clustered(labeling)
        }
    }

    /// The labeling, if the pass was not degenerate.
    #[must_use]
    pub fn labeling(&self) -> Option<&Labeling> {
        match self {
            Self::Clustered(labeling) => Some(labeling),
            Self::Degenerate { .. } => None,
        }
    }

    #[must_use]
    pub fn into_labeling(self) -> Option<Labeling> {
        match self {
            Self::Clustered(labeling) => Some(labeling),
            Self::Degenerate { .. } => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn labels(raw: &[i32]) -> Vec<ClusterLabel> {
        raw.iter()
            .map(|&v| {
                if v < 0 {
                    ClusterLabel::NOISE
                } else {
                    ClusterLabel::cluster(v as usize)
                }
            })
            .collect()
    }

    #[test]
    fn cluster_sizes_and_noise() {
        let labeling = Labeling::new(labels(&[0, 1, -1, 0, 0, 1, -1]));
        assert_eq!(labeling.n_clusters(), 2);
        assert_eq!(labeling.cluster_sizes(), vec![3, 2]);
        assert_eq!(labeling.noise_count(), 2);
    }

    #[test]
    fn members_basic() {
        let labeling = Labeling::new(labels(&[0, 1, -1, 0, 0, 1]));
        assert_eq!(labeling.members(ClusterLabel::cluster(0)), vec![0, 3, 4]);
        assert_eq!(labeling.members(ClusterLabel::NOISE), vec![2]);
    }

    #[test]
    fn single_cluster_is_degenerate() {
        let outcome = ClusterOutcome::from_labels(labels(&[0, 0, -1]));
        assert_eq!(outcome, ClusterOutcome::Degenerate { n_clusters: 1 });
        assert!(outcome.labeling().is_none());
    }

    #[test]
    fn all_noise_is_degenerate() {
        let outcome = ClusterOutcome::from_labels(labels(&[-1, -1]));
        assert_eq!(outcome, ClusterOutcome::Degenerate { n_clusters: 0 });
    }

    #[test]
    fn two_clusters_complete() {
        let outcome = ClusterOutcome::from_labels(labels(&[0, 1, -1]));
        let labeling = outcome.into_labeling().unwrap();
        assert_eq!(labeling.n_clusters(), 2);
    }
}
