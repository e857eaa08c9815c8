//! Neighbourhood queries shared by the matrix-backed and on-the-fly distance sources.

use rayon::prelude::*;

use crate::distance::GreatCircleDistance;
use crate::matrix::{DistanceMatrix, pair_distance};
use crate::sample::GeoSample;

/// A symmetric source of great-circle distances between indexed points.
///
/// Implemented by [`DistanceMatrix`] (precomputed) and [`GeoSample`]
/// (computed on demand). Both produce bit-identical distances, so any
/// algorithm generic over this trait yields the same result with either.
pub trait PairwiseDistance: Sync {
    /// Number of indexed points.
    fn n_points(&self) -> usize;

    /// Distance between points `i` and `j`.
    fn distance(&self, i: usize, j: usize) -> GreatCircleDistance;

    /// Indices of all points within `radius` of point `i` (closed ball, `i` included),
    /// in ascending index order.
    fn neighbours_within(&self, i: usize, radius: GreatCircleDistance) -> Vec<usize> {
        let r = radius.radians();
        (0..self.n_points())
            .filter(|&j| self.distance(i, j).radians() <= r)
            .collect()
    }

    /// Like [`neighbours_within`](Self::neighbours_within) but also returns each distance.
    fn neighbours_within_with_distance(
        &self,
        i: usize,
        radius: GreatCircleDistance,
    ) -> Vec<(usize, GreatCircleDistance)> {
        let r = radius.radians();
        (0..self.n_points())
            .filter_map(|j| {
                let d = self.distance(i, j);
                (d.radians() <= r).then_some((j, d))
            })
            .collect()
    }

    /// Distance from point `i` to its `k`-th nearest neighbour, counting `i` itself
    /// as the first (distance zero). Requires `1 <= k <= n_points()`.
    fn kth_nearest(&self, i: usize, k: usize) -> GreatCircleDistance {
        debug_assert!(k >= 1 && k <= self.n_points());
        let mut row: Vec<f64> = (0..self.n_points())
            .map(|j| self.distance(i, j).radians())
            .collect();
        let (_, kth, _) = row.select_nth_unstable_by(k - 1, f64::total_cmp);
        GreatCircleDistance::from_radians(*kth)
    }

    /// [`kth_nearest`](Self::kth_nearest) for every point, computed in parallel.
    fn kth_nearest_all(&self, k: usize) -> Vec<GreatCircleDistance> {
        (0..self.n_points())
            .into_par_iter()
            .map(|i| self.kth_nearest(i, k))
            .collect()
    }
}

impl PairwiseDistance for DistanceMatrix {
    fn n_points(&self) -> usize {
        self.len()
    }

    fn distance(&self, i: usize, j: usize) -> GreatCircleDistance {
        self.get(i, j)
    }

    fn neighbours_within(&self, i: usize, radius: GreatCircleDistance) -> Vec<usize> {
        let r = radius.radians();
        self.row(i)
            .enumerate()
            .filter_map(|(j, d)| (d.radians() <= r).then_some(j))
            .collect()
    }

    fn neighbours_within_with_distance(
        &self,
        i: usize,
        radius: GreatCircleDistance,
    ) -> Vec<(usize, GreatCircleDistance)> {
        let r = radius.radians();
        self.row(i)
            .enumerate()
            .filter(|(_, d)| d.radians() <= r)
            .collect()
    }

    fn kth_nearest(&self, i: usize, k: usize) -> GreatCircleDistance {
        debug_assert!(k >= 1 && k <= self.len());
        let mut row: Vec<f64> = self.row(i).map(GreatCircleDistance::radians).collect();
        let (_, kth, _) = row.select_nth_unstable_by(k - 1, f64::total_cmp);
        GreatCircleDistance::from_radians(*kth)
    }
}

impl PairwiseDistance for GeoSample {
    fn n_points(&self) -> usize {
        self.len()
    }

    fn distance(&self, i: usize, j: usize) -> GreatCircleDistance {
        pair_distance(self.points(), i, j)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn line_sample() -> GeoSample {
        // Points spaced 0.01 degrees apart along the equator.
        GeoSample::from_degrees((0..5).map(|i| (0.0, i as f64 * 0.01))).unwrap()
    }

    #[test]
    fn matrix_and_direct_agree() {
        let sample = line_sample();
        let matrix = sample.pairwise();
        for i in 0..sample.len() {
            for j in 0..sample.len() {
                assert_eq!(
                    PairwiseDistance::distance(&sample, i, j),
                    PairwiseDistance::distance(&matrix, i, j)
                );
            }
        }
    }

    #[test]
    fn neighbours_include_self() {
        let sample = line_sample();
        let step = PairwiseDistance::distance(&sample, 0, 1);
        let radius = GreatCircleDistance::from_radians(step.radians() * 1.5);
        assert_eq!(sample.neighbours_within(2, radius), vec![1, 2, 3]);
        assert_eq!(sample.neighbours_within(0, radius), vec![0, 1]);
    }

    #[test]
    fn neighbours_with_distance_reports_zero_for_self() {
        let sample = line_sample();
        let radius = GreatCircleDistance::from_km(0.5);
        let hits = sample.neighbours_within_with_distance(4, radius);
        assert_eq!(hits, vec![(4, GreatCircleDistance::ZERO)]);
    }

    #[test]
    fn kth_nearest_counts_self_first() {
        let sample = line_sample();
        let step = PairwiseDistance::distance(&sample, 0, 1).radians();
        assert_eq!(sample.kth_nearest(0, 1).radians(), 0.0);
        assert!((sample.kth_nearest(0, 2).radians() - step).abs() < 1e-15);
        assert!((sample.kth_nearest(2, 3).radians() - step).abs() < 1e-15);
        assert!((sample.kth_nearest(2, 5).radians() - 2.0 * step).abs() < 1e-12);
    }

    #[test]
    fn kth_nearest_all_matches_single() {
        let sample = line_sample();
        let matrix = sample.pairwise();
        let all = matrix.kth_nearest_all(3);
        for (i, d) in all.iter().enumerate() {
            assert_eq!(*d, sample.kth_nearest(i, 3));
        }
    }
}
