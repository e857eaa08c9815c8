//! Great-circle geometry for accident coordinate samples.
//!
//! Pure math library with zero I/O. Converts latitude/longitude pairs to
//! radians, computes haversine distances, builds pairwise distance matrices
//! and collapses coincident locations into unique points.

mod collapse;
mod distance;
mod error;
mod matrix;
mod neighbours;
mod point;
mod sample;

pub use collapse::{CollapsedSample, RowDistances};
pub use distance::GreatCircleDistance;
pub use error::GeoError;
pub use matrix::DistanceMatrix;
pub use neighbours::PairwiseDistance;
pub use point::{EARTH_RADIUS_KM, GeoPoint, haversine};
pub use sample::{BoundingBox, GeoSample};
