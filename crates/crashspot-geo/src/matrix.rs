//! Precomputed great-circle distances between every pair of sample points.

use rayon::prelude::*;
use tracing::{debug, instrument};

use crate::distance::GreatCircleDistance;
use crate::point::{GeoPoint, haversine};

/// Distance between `points[i]` and `points[j]`, always evaluated with the
/// higher index first so every distance source agrees bit for bit.
pub(crate) fn pair_distance(points: &[GeoPoint], i: usize, j: usize) -> GreatCircleDistance {
    if i == j {
        return GreatCircleDistance::ZERO;
    }
    let (hi, lo) = if i > j { (i, j) } else { (j, i) };
    haversine(&points[hi], &points[lo])
}

/// Condensed pairwise distances in upper-triangle row order.
///
/// Row `i` holds the distances to points `i+1..n` contiguously, so the pair
/// `(i, j)` with `i < j` lives at `n*i - i*(i+1)/2 + (j - i - 1)`. Memory is
/// `n*(n-1)/2` distances; the diagonal is implicit.
#[derive(Debug, Clone)]
pub struct DistanceMatrix {
    n: usize,
    condensed: Vec<GreatCircleDistance>,
}

impl DistanceMatrix {
    /// Compute all pairwise distances of `points`, one row per rayon task.
    #[instrument(skip_all, fields(n_points = points.len()))]
    pub(crate) fn from_points(points: &[GeoPoint]) -> Self {
        let n = points.len();
        let condensed: Vec<GreatCircleDistance> = (0..n)
            .into_par_iter()
            .flat_map_iter(|i| (i + 1..n).map(move |j| pair_distance(points, i, j)))
            .collect();
        debug!(n_pairs = condensed.len(), "pairwise distances computed");
        Self { n, condensed }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.n
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.n == 0
    }

    fn row_start(&self, i: usize) -> usize {
        self.n * i - i * (i + 1) / 2
    }

    /// Distances from point `i` to the points after it (`i+1..n`).
    fn tail(&self, i: usize) -> &[GreatCircleDistance] {
        let start = self.row_start(i);
        &self.condensed[start..start + (self.n - i - 1)]
    }

    /// Distance between points `i` and `j`. Zero on the diagonal.
    ///
    /// # Panics
    ///
    /// Panics if `i >= n` or `j >= n`.
    #[must_use]
    pub fn get(&self, i: usize, j: usize) -> GreatCircleDistance {
        assert!(i < self.n && j < self.n, "pair ({i}, {j}) out of bounds for {} points", self.n);
        match i.cmp(&j) {
            std::cmp::Ordering::Equal => GreatCircleDistance::ZERO,
            std::cmp::Ordering::Less => self.condensed[self.row_start(i) + (j - i - 1)],
            std::cmp::Ordering::Greater => self.condensed[self.row_start(j) + (i - j - 1)],
        }
    }

    /// Distances from point `i` to every point in index order, self included.
    ///
    /// Earlier points are gathered from their rows; later ones are a contiguous
    /// slice of row `i`.
    pub fn row(&self, i: usize) -> impl Iterator<Item = GreatCircleDistance> + '_ {
        assert!(i < self.n, "row {i} out of bounds for {} points", self.n);
        (0..i)
            .map(move |j| self.condensed[self.row_start(j) + (i - j - 1)])
            .chain(std::iter::once(GreatCircleDistance::ZERO))
            .chain(self.tail(i).iter().copied())
    }
}
