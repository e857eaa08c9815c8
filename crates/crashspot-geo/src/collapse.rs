//! Collapsing coincident coordinates into unique locations.

use std::cmp::Ordering;

use crate::distance::GreatCircleDistance;
use crate::neighbours::PairwiseDistance;
use crate::point::GeoPoint;
use crate::sample::GeoSample;

/// Unique locations of a sample together with the mapping back to the input.
///
/// Unique points are sorted ascending by latitude, then longitude. Two input
/// rows collapse only on exact coordinate equality (`-0.0` equals `0.0`).
#[derive(Debug, Clone)]
pub struct CollapsedSample {
    unique: GeoSample,
    occurrence: Vec<usize>,
}

fn canonical(x: f64) -> f64 {
    // Folds -0.0 into 0.0 so total_cmp treats them as equal.
    x + 0.0
}

fn compare(a: &GeoPoint, b: &GeoPoint) -> Ordering {
    canonical(a.lat())
        .total_cmp(&canonical(b.lat()))
        .then_with(|| canonical(a.lon()).total_cmp(&canonical(b.lon())))
}

impl CollapsedSample {
    pub(crate) fn from_sample(sample: &GeoSample) -> Self {
        let points = sample.points();
        let mut order: Vec<usize> = (0..points.len()).collect();
        order.sort_by(|&a, &b| compare(&points[a], &points[b]));

        let mut unique: Vec<GeoPoint> = Vec::new();
        let mut occurrence = vec![0usize; points.len()];

        for idx in order {
            let p = points[idx];
            if unique.last().is_none_or(|last| compare(last, &p) != Ordering::Equal) {
                unique.push(p);
            }
            occurrence[idx] = unique.len() - 1;
        }

        Self {
            unique: GeoSample::from_nonempty(unique),
            occurrence,
        }
    }

    /// The unique locations, sorted by latitude then longitude.
    #[must_use]
    pub fn unique(&self) -> &GeoSample {
        &self.unique
    }

    /// For each input row, the index of its unique location.
    #[must_use]
    pub fn occurrence(&self) -> &[usize] {
        &self.occurrence
    }

    /// Number of input rows.
    #[must_use]
    pub fn original_len(&self) -> usize {
        self.occurrence.len()
    }

    /// Project per-unique-point values back onto the input rows.
    ///
    /// # Panics
    ///
    /// Panics if `values.len()` differs from the number of unique points.
    #[must_use]
    pub fn expand<T: Copy>(&self, values: &[T]) -> Vec<T> {
        assert_eq!(
            values.len(),
            self.unique.len(),
            "expected one value per unique location"
        );
        self.occurrence.iter().map(|&u| values[u]).collect()
    }

    /// View a distance source over the unique locations as one over the input rows.
    ///
    /// `unique_distances` must index the same points as [`unique`](Self::unique).
    #[must_use]
    pub fn row_distances<'a, D: PairwiseDistance>(
        &'a self,
        unique_distances: &'a D,
    ) -> RowDistances<'a, D> {
        debug_assert_eq!(unique_distances.n_points(), self.unique.len());
        RowDistances {
            inner: unique_distances,
            occurrence: &self.occurrence,
        }
    }
}

/// Row-indexed distances backed by a source over unique locations.
#[derive(Debug, Clone, Copy)]
pub struct RowDistances<'a, D> {
    inner: &'a D,
    occurrence: &'a [usize],
}

impl<D: PairwiseDistance> PairwiseDistance for RowDistances<'_, D> {
    fn n_points(&self) -> usize {
        self.occurrence.len()
    }

    fn distance(&self, i: usize, j: usize) -> GreatCircleDistance {
        self.inner.distance(self.occurrence[i], self.occurrence[j])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicates_collapse_and_sort() {
        let s = GeoSample::from_degrees([(1.0, 5.0), (0.0, 2.0), (1.0, 5.0), (0.0, 1.0)]).unwrap();
        let c = s.collapse_duplicates();
        assert_eq!(c.unique().len(), 3);
        assert_eq!(c.occurrence(), &[2, 1, 2, 0]);
        assert_eq!(c.original_len(), 4);
        let lats: Vec<f64> = c.unique().iter().map(|p| p.lat().to_degrees()).collect();
        assert!(lats.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn negative_zero_equals_zero() {
        let s = GeoSample::from_degrees([(0.0, 0.0), (-0.0, -0.0)]).unwrap();
        let c = s.collapse_duplicates();
        assert_eq!(c.unique().len(), 1);
        assert_eq!(c.occurrence(), &[0, 0]);
    }

    #[test]
    fn expand_maps_back_to_rows() {
        let s = GeoSample::from_degrees([(2.0, 0.0), (1.0, 0.0), (2.0, 0.0)]).unwrap();
        let c = s.collapse_duplicates();
        let labels = [10, 20];
        assert_eq!(c.expand(&labels), vec![20, 10, 20]);
    }

    #[test]
    fn all_distinct_is_a_permutation() {
        let s = GeoSample::from_degrees([(3.0, 0.0), (1.0, 0.0), (2.0, 0.0)]).unwrap();
        let c = s.collapse_duplicates();
        assert_eq!(c.unique().len(), 3);
        assert_eq!(c.occurrence(), &[2, 0, 1]);
    }

    #[test]
    fn row_distances_match_direct_rows() {
        let s = GeoSample::from_degrees([(0.5, 0.1), (0.0, 0.2), (0.5, 0.1), (0.3, 0.3)]).unwrap();
        let c = s.collapse_duplicates();
        let matrix = c.unique().pairwise();
        let rows = c.row_distances(&matrix);
        assert_eq!(rows.n_points(), 4);
        assert_eq!(rows.distance(0, 2), GreatCircleDistance::ZERO);
        for i in 0..4 {
            for j in 0..4 {
                let diff = rows.distance(i, j).radians() - s.distance(i, j).radians();
                assert!(diff.abs() < 1e-15);
            }
        }
    }
}
