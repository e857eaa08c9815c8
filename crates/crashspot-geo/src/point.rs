//! Radian coordinates and the haversine formula.

use crate::distance::GreatCircleDistance;

/// Mean Earth radius in kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

/// A location on the sphere, stored in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    lat: f64,
    lon: f64,
}

impl GeoPoint {
    /// Create a point from latitude and longitude in degrees. No range validation.
    #[must_use]
    pub fn from_degrees(latitude: f64, longitude: f64) -> Self {
        Self {
            lat: latitude.to_radians(),
            lon: longitude.to_radians(),
        }
    }

    /// Create a point directly from radians. No range validation.
    #[must_use]
    pub fn from_radians(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Latitude in radians.
    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    /// Longitude in radians.
    #[must_use]
    pub fn lon(&self) -> f64 {
        self.lon
    }

    /// Great-circle distance to `other`.
    #[must_use]
    pub fn distance_to(&self, other: &GeoPoint) -> GreatCircleDistance {
        haversine(self, other)
    }
}

/// Haversine great-circle distance between two points.
#[must_use]
pub fn haversine(a: &GeoPoint, b: &GeoPoint) -> GreatCircleDistance {
    let half_dlat = (b.lat - a.lat) / 2.0;
    let half_dlon = (b.lon - a.lon) / 2.0;
    let h = half_dlat.sin().powi(2) + a.lat.cos() * b.lat.cos() * half_dlon.sin().powi(2);
    // Rounding can push h marginally above 1 for antipodal points.
    GreatCircleDistance::from_radians(2.0 * h.sqrt().min(1.0).asin())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn identical_points_are_zero() {
        let p = GeoPoint::from_degrees(-23.55, -46.63);
        assert_eq!(haversine(&p, &p).radians(), 0.0);
    }

    #[test]
    fn one_degree_of_latitude() {
        let a = GeoPoint::from_degrees(0.0, 0.0);
        let b = GeoPoint::from_degrees(1.0, 0.0);
        let expected = EARTH_RADIUS_KM * 1.0_f64.to_radians();
        assert!((haversine(&a, &b).km() - expected).abs() < 1e-9);
    }

    #[test]
    fn symmetric() {
        let a = GeoPoint::from_degrees(-15.79, -47.88);
        let b = GeoPoint::from_degrees(-22.90, -43.17);
        assert_eq!(haversine(&a, &b), haversine(&b, &a));
    }

    #[test]
    fn known_city_pair() {
        // Brasilia to Rio de Janeiro is roughly 930 km.
        let brasilia = GeoPoint::from_degrees(-15.7939, -47.8828);
        let rio = GeoPoint::from_degrees(-22.9068, -43.1729);
        let km = brasilia.distance_to(&rio).km();
        assert!((900.0..960.0).contains(&km), "got {km}");
    }

    #[test]
    fn antipodal_is_half_circumference() {
        let a = GeoPoint::from_degrees(0.0, 0.0);
        let b = GeoPoint::from_degrees(0.0, 180.0);
        assert!((haversine(&a, &b).radians() - std::f64::consts::PI).abs() < 1e-12);
    }
}
