//! Great-circle distance newtype wrapper.

use std::cmp::Ordering;
use std::fmt;

use crate::point::EARTH_RADIUS_KM;

/// A non-negative great-circle distance, stored as a central angle in radians.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct GreatCircleDistance(f64);

impl GreatCircleDistance {
    /// Zero distance.
    pub const ZERO: Self = Self(0.0);

    /// Infinite distance, used as the "unreachable" sentinel.
    pub const INFINITY: Self = Self(f64::INFINITY);

    /// Create a distance from a central angle in radians.
    #[must_use]
    pub fn from_radians(radians: f64) -> Self {
        Self(radians)
    }

    /// Create a distance from a surface length in kilometres.
    #[must_use]
    pub fn from_km(km: f64) -> Self {
        Self(km / EARTH_RADIUS_KM)
    }

    /// Return the central angle in radians.
    #[must_use]
    pub fn radians(self) -> f64 {
        self.0
    }

    /// Return the surface length in kilometres on the mean-radius sphere.
    #[must_use]
    pub fn km(self) -> f64 {
        self.0 * EARTH_RADIUS_KM
    }

    /// Total ordering comparison using [`f64::total_cmp`].
    #[must_use]
    pub fn total_cmp(&self, other: &Self) -> Ordering {
        self.0.total_cmp(&other.0)
    }
}

impl fmt::Display for GreatCircleDistance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6} km", self.km())
    }
}
