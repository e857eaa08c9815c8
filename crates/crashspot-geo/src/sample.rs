//! Validated, non-empty coordinate samples.

use crate::collapse::CollapsedSample;
use crate::distance::GreatCircleDistance;
use crate::error::GeoError;
use crate::matrix::DistanceMatrix;
use crate::point::{GeoPoint, haversine};

/// A non-empty sequence of validated coordinates held in radians.
///
/// Index order is the caller's input order and is preserved by every
/// derived structure (distance matrix, labels, k-distance profile).
#[derive(Debug, Clone)]
pub struct GeoSample {
    points: Vec<GeoPoint>,
}

/// Per-axis extent of a sample, in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lon: f64,
    pub max_lon: f64,
}

impl BoundingBox {
    /// True if every side has zero extent.
    #[must_use]
    pub fn is_degenerate(&self) -> bool {
        self.min_lat == self.max_lat && self.min_lon == self.max_lon
    }
}

impl GeoSample {
    /// Build a sample from `(latitude, longitude)` pairs in degrees.
    ///
    /// # Errors
    ///
    /// | Variant | Condition |
    /// |---|---|
    /// | [`GeoError::EmptyInput`] | `coords` yields nothing |
    /// | [`GeoError::NonFiniteCoordinate`] | a latitude or longitude is NaN or infinite |
    /// | [`GeoError::CoordinateOutOfRange`] | latitude outside `[-90, 90]` or longitude outside `[-180, 180]` |
    pub fn from_degrees<I>(coords: I) -> Result<Self, GeoError>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let points = coords
            .into_iter()
            .enumerate()
            .map(|(index, (latitude, longitude))| {
                if !latitude.is_finite() || !longitude.is_finite() {
                    return Err(GeoError::NonFiniteCoordinate { index });
                }
                if !(-90.0..=90.0).contains(&latitude) || !(-180.0..=180.0).contains(&longitude) {
                    return Err(GeoError::CoordinateOutOfRange {
                        index,
                        latitude,
                        longitude,
                    });
                }
                Ok(GeoPoint::from_degrees(latitude, longitude))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Self::from_points(points)
    }

    /// Wrap already-converted points.
    ///
    /// # Errors
    ///
    /// Returns [`GeoError::EmptyInput`] if `points` is empty.
    pub fn from_points(points: Vec<GeoPoint>) -> Result<Self, GeoError> {
        if points.is_empty() {
            return Err(GeoError::EmptyInput);
        }
        Ok(Self { points })
    }

    /// Caller guarantees `points` is non-empty.
    pub(crate) fn from_nonempty(points: Vec<GeoPoint>) -> Self {
        debug_assert!(!points.is_empty());
        Self { points }
    }

    /// Number of points.
    #[must_use]
    pub fn len(&self) -> usize {
        self.points.len()
    }

    /// Always false; samples are non-empty by construction.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    #[must_use]
    pub fn get(&self, index: usize) -> Option<&GeoPoint> {
        self.points.get(index)
    }

    #[must_use]
    pub fn points(&self) -> &[GeoPoint] {
        &self.points
    }

    pub fn iter(&self) -> impl Iterator<Item = &GeoPoint> {
        self.points.iter()
    }

    /// Per-axis minimum and maximum of the sample.
    #[must_use]
    pub fn bounding_box(&self) -> BoundingBox {
        let first = self.points[0];
        self.points.iter().fold(
            BoundingBox {
                min_lat: first.lat(),
                max_lat: first.lat(),
                min_lon: first.lon(),
                max_lon: first.lon(),
            },
            |b, p| BoundingBox {
                min_lat: b.min_lat.min(p.lat()),
                max_lat: b.max_lat.max(p.lat()),
                min_lon: b.min_lon.min(p.lon()),
                max_lon: b.max_lon.max(p.lon()),
            },
        )
    }

    /// Compute every pairwise haversine distance in parallel.
    ///
    /// Memory is `n*(n-1)/2` distances; for very large samples prefer using
    /// the sample itself as a [`PairwiseDistance`](crate::PairwiseDistance).
    #[must_use]
    pub fn pairwise(&self) -> DistanceMatrix {
        DistanceMatrix::from_points(&self.points)
    }

    /// Distance from `query` to the closest sample point, skipping index `exclude`.
    ///
    /// Returns [`GreatCircleDistance::INFINITY`] when no candidate remains.
    #[must_use]
    pub fn nearest_distance(&self, query: &GeoPoint, exclude: Option<usize>) -> GreatCircleDistance {
        self.points
            .iter()
            .enumerate()
            .filter(|(i, _)| Some(*i) != exclude)
            .map(|(_, p)| haversine(query, p))
            .min_by(GreatCircleDistance::total_cmp)
            .unwrap_or(GreatCircleDistance::INFINITY)
    }

    /// Merge coincident coordinates into unique locations.
    #[must_use]
    pub fn collapse_duplicates(&self) -> CollapsedSample {
        CollapsedSample::from_sample(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_rejected() {
        let err = GeoSample::from_degrees(Vec::<(f64, f64)>::new()).unwrap_err();
        assert!(matches!(err, GeoError::EmptyInput));
    }

    #[test]
    fn nan_rejected_with_index() {
        let err = GeoSample::from_degrees([(0.0, 0.0), (f64::NAN, 1.0)]).unwrap_err();
        assert!(matches!(err, GeoError::NonFiniteCoordinate { index: 1 }));
    }

    #[test]
    fn out_of_range_rejected() {
        let err = GeoSample::from_degrees([(91.0, 0.0)]).unwrap_err();
        assert!(matches!(err, GeoError::CoordinateOutOfRange { index: 0, .. }));
        let err = GeoSample::from_degrees([(0.0, -180.5)]).unwrap_err();
        assert!(matches!(err, GeoError::CoordinateOutOfRange { .. }));
    }

    #[test]
    fn boundary_values_accepted() {
        let s = GeoSample::from_degrees([(90.0, 180.0), (-90.0, -180.0)]).unwrap();
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn bounding_box_spans_extremes() {
        let s = GeoSample::from_degrees([(-15.8, -47.9), (-22.9, -43.2), (-3.7, -38.5)]).unwrap();
        let b = s.bounding_box();
        assert!((b.min_lat - (-22.9f64).to_radians()).abs() < 1e-15);
        assert!((b.max_lat - (-3.7f64).to_radians()).abs() < 1e-15);
        assert!((b.min_lon - (-47.9f64).to_radians()).abs() < 1e-15);
        assert!((b.max_lon - (-38.5f64).to_radians()).abs() < 1e-15);
        assert!(!b.is_degenerate());
    }

    #[test]
    fn pairwise_matches_direct_haversine() {
        let s = GeoSample::from_degrees([(0.0, 0.0), (0.0, 1.0), (1.0, 1.0)]).unwrap();
        let m = s.pairwise();
        assert_eq!(m.len(), 3);
        for i in 1..3 {
            for j in 0..i {
                assert_eq!(m.get(i, j), haversine(&s.points()[i], &s.points()[j]));
            }
        }
    }

    #[test]
    fn nearest_distance_skips_excluded() {
        let s = GeoSample::from_degrees([(0.0, 0.0), (0.0, 1.0), (0.0, 3.0)]).unwrap();
        let q = s.points()[0];
        assert_eq!(s.nearest_distance(&q, None), GreatCircleDistance::ZERO);
        let d = s.nearest_distance(&q, Some(0));
        assert!((d.radians() - 1f64.to_radians()).abs() < 1e-12);
    }

    #[test]
    fn nearest_distance_single_point_excluded_is_infinite() {
        let s = GeoSample::from_degrees([(0.0, 0.0)]).unwrap();
        let q = s.points()[0];
        assert_eq!(s.nearest_distance(&q, Some(0)), GreatCircleDistance::INFINITY);
    }
}
