//! Fixed-radius density clustering (DBSCAN) over great-circle distances.

use rayon::prelude::*;
use serde::Serialize;
use tracing::{debug, instrument};

use crashspot_geo::{GreatCircleDistance, PairwiseDistance};

use crate::clusterer::{ClusterOutcome, DensityClusterer};
use crate::label::ClusterLabel;

/// One DBSCAN parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct DbscanParams {
    /// Neighbourhood radius in kilometres.
    pub eps_km: f64,
    /// Minimum neighbourhood size (the point itself included) for a core point.
    pub min_samples: usize,
}

/// DBSCAN over a borrowed distance source.
///
/// Neighbourhoods are closed balls (`d <= eps`) that include the point itself.
/// Points are visited in index order and clusters grow depth-first through core
/// points, so a border point reachable from two clusters joins the one that
/// reaches it first.
#[derive(Debug, Clone, Copy)]
pub struct Dbscan<'a, D> {
    distances: &'a D,
}

impl<'a, D: PairwiseDistance> Dbscan<'a, D> {
    #[must_use]
    pub fn new(distances: &'a D) -> Self {
        Self { distances }
    }

    /// Label every point; noise is [`ClusterLabel::NOISE`].
    #[must_use]
    #[instrument(skip(self), fields(n_points = self.distances.n_points()))]
    pub fn labels(&self, params: &DbscanParams) -> Vec<ClusterLabel> {
        let n = self.distances.n_points();
        let eps = GreatCircleDistance::from_km(params.eps_km);

        let neighbourhoods: Vec<Vec<usize>> = (0..n)
            .into_par_iter()
            .map(|i| self.distances.neighbours_within(i, eps))
            .collect();
        let is_core: Vec<bool> = neighbourhoods
            .iter()
            .map(|nb| nb.len() >= params.min_samples)
            .collect();

        let mut labels = vec![ClusterLabel::NOISE; n];
        let mut next_id = 0usize;
        let mut stack: Vec<usize> = Vec::new();

        for seed in 0..n {
            if !labels[seed].is_noise() || !is_core[seed] {
                continue;
            }
            let label = ClusterLabel::cluster(next_id);
            let mut i = seed;
            loop {
                if labels[i].is_noise() {
                    labels[i] = label;
                    if is_core[i] {
                        stack.extend(
                            neighbourhoods[i]
                                .iter()
                                .copied()
                                .filter(|&j| labels[j].is_noise()),
                        );
                    }
                }
                match stack.pop() {
                    Some(next) => i = next,
                    None => break,
                }
            }
            next_id += 1;
        }

        debug!(
            eps_km = params.eps_km,
            min_samples = params.min_samples,
            n_clusters = next_id,
            "dbscan pass complete"
        );
        labels
    }
}

impl<D: PairwiseDistance> DensityClusterer for Dbscan<'_, D> {
    type Params = DbscanParams;

    fn cluster(&self, params: &DbscanParams) -> ClusterOutcome {
        ClusterOutcome::from_labels(self.labels(params))
    }
}
