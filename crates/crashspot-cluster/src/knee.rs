//! k-distance profile and knee detection for bounding the DBSCAN epsilon grid.

use serde::Serialize;
use tracing::{debug, instrument};

use crashspot_geo::{GreatCircleDistance, PairwiseDistance};

use crate::error::ClusterError;

/// Smallest normalized chord gap accepted as a knee.
const KNEE_TOLERANCE: f64 = 1e-12;

/// The k-distance profile of a sample and the knee located on it.
#[derive(Debug, Clone, Serialize)]
pub struct EpsilonEstimate {
    /// Neighbour rank used to build the profile (the point itself counts as rank 1).
    pub k: usize,
    /// k-th neighbour distances in kilometres, sorted non-increasing.
    pub profile_km: Vec<f64>,
    /// Position of the knee in `profile_km`, if one exists.
    pub knee_index: Option<usize>,
}

impl EpsilonEstimate {
    /// The profile value at the knee, in kilometres.
    #[must_use]
    pub fn knee_km(&self) -> Option<f64> {
        self.knee_index.map(|i| self.profile_km[i])
    }
}

/// Compute each point's distance to its `k`-th nearest neighbour, sorted non-increasing.
///
/// The point itself is the first neighbour, so `k = 1` yields an all-zero profile.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::InvalidNeighbourCount`] | `k == 0` or `k > n` |
pub fn k_distance_profile<D: PairwiseDistance>(
    distances: &D,
    k: usize,
) -> Result<Vec<GreatCircleDistance>, ClusterError> {
    let n = distances.n_points();
    if k == 0 || k > n {
        return Err(ClusterError::InvalidNeighbourCount { k, n_points: n });
    }
    let mut profile = distances.kth_nearest_all(k);
    profile.sort_by(|a, b| b.total_cmp(a));
    Ok(profile)
}

/// Locate the knee of a convex, non-increasing curve.
///
/// Both axes are scaled to `[0, 1]` and the knee is the first point of maximum
/// distance below the chord joining the endpoints. Returns `None` for curves
/// with fewer than three points, a flat curve, or no point strictly below the
/// chord (linear or concave shapes).
#[must_use]
pub fn locate_knee(curve: &[f64]) -> Option<usize> {
    let n = curve.len();
    if n < 3 {
        return None;
    }
    let first = curve[0];
    let last = curve[n - 1];
    let span = first - last;
    if !span.is_finite() || span <= 0.0 {
        return None;
    }

    let x_span = (n - 1) as f64;
    let (best_idx, best_gap) = curve
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            let x_norm = i as f64 / x_span;
            let y_norm = (y - last) / span;
            (i, 1.0 - x_norm - y_norm)
        })
        .fold((0, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });

    (best_gap > KNEE_TOLERANCE).then_some(best_idx)
}

/// Build the k-distance profile and locate its knee.
///
/// # Errors
///
/// Same as [`k_distance_profile`].
#[instrument(skip(distances), fields(n_points = distances.n_points()))]
pub fn estimate_epsilon<D: PairwiseDistance>(
    distances: &D,
    k: usize,
) -> Result<EpsilonEstimate, ClusterError> {
    let profile_km: Vec<f64> = k_distance_profile(distances, k)?
        .into_iter()
        .map(GreatCircleDistance::km)
        .collect();
    let knee_index = locate_knee(&profile_km);
    debug!(
        k,
        knee_index,
        knee_km = knee_index.map(|i| profile_km[i]),
        "k-distance knee located"
    );
    Ok(EpsilonEstimate {
        k,
        profile_km,
        knee_index,
    })
}

#[cfg(test)]
mod tests {
    use crashspot_geo::GeoSample;

    use super::*;

    #[test]
    fn convex_curve_knee() {
        let curve = [10.0, 5.0, 2.0, 1.0, 0.8, 0.6, 0.5, 0.4];
        assert_eq!(locate_knee(&curve), Some(2));
    }

    #[test]
    fn linear_curve_has_no_knee() {
        assert_eq!(locate_knee(&[5.0, 4.0, 3.0, 2.0, 1.0]), None);
    }

    #[test]
    fn concave_curve_has_no_knee() {
        assert_eq!(locate_knee(&[5.0, 4.9, 4.7, 4.0, 0.0]), None);
    }

    #[test]
    fn flat_or_short_curve_has_no_knee() {
        assert_eq!(locate_knee(&[1.0, 1.0, 1.0, 1.0]), None);
        assert_eq!(locate_knee(&[3.0, 1.0]), None);
        assert_eq!(locate_knee(&[]), None);
    }

    #[test]
    fn profile_counts_self_and_sorts_descending() {
        // Points at 0, 1, 2 and 10 degrees of longitude on the equator.
        let sample =
            GeoSample::from_degrees([(0.0, 0.0), (0.0, 1.0), (0.0, 2.0), (0.0, 10.0)]).unwrap();
        let zeros = k_distance_profile(&sample, 1).unwrap();
        assert!(zeros.iter().all(|d| d.radians() == 0.0));

        let profile = k_distance_profile(&sample, 2).unwrap();
        let degrees: Vec<f64> = profile.iter().map(|d| d.radians().to_degrees()).collect();
        let expected = [8.0, 1.0, 1.0, 1.0];
        for (got, want) in degrees.iter().zip(expected) {
            assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
        }
    }

    #[test]
    fn invalid_k_rejected() {
        let sample = GeoSample::from_degrees([(0.0, 0.0), (0.0, 1.0)]).unwrap();
        assert!(matches!(
            k_distance_profile(&sample, 0),
            Err(ClusterError::InvalidNeighbourCount { k: 0, n_points: 2 })
        ));
        assert!(matches!(
            k_distance_profile(&sample, 3),
            Err(ClusterError::InvalidNeighbourCount { k: 3, n_points: 2 })
        ));
    }

    #[test]
    fn estimate_reports_knee_value() {
        // Nine tightly packed points plus three far outliers.
        let mut coords: Vec<(f64, f64)> = (0..9)
            .map(|i| (-15.8 + (i / 3) as f64 * 0.0005, -47.9 + (i % 3) as f64 * 0.0005))
            .collect();
        coords.extend([(-15.0, -47.0), (-16.5, -48.5), (-14.5, -49.0)]);
        let sample = GeoSample::from_degrees(coords).unwrap();
        let estimate = estimate_epsilon(&sample.pairwise(), 2).unwrap();

        assert_eq!(estimate.profile_km.len(), 12);
        let knee = estimate.knee_index.expect("knee should exist");
        // The knee is the first value of the dense group, right after the outliers.
        assert_eq!(knee, 3);
        let knee_km = estimate.knee_km().unwrap();
        assert!(knee_km < 0.1, "knee at {knee_km} km");
    }
}
