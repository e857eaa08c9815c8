//! Error types for coordinate sample construction.

/// Errors from building a [`GeoSample`](crate::GeoSample).
#[derive(Debug, thiserror::Error)]
pub enum GeoError {
    /// Returned when a sample is built from zero coordinate pairs.
    #[error("coordinate sample must be non-empty")]
    EmptyInput,

    /// Returned when a latitude or longitude is NaN or infinite.
    #[error("non-finite coordinate at index {index}")]
    NonFiniteCoordinate {
        /// Position of the offending coordinate pair.
        index: usize,
    },

    /// Returned when a latitude is outside [-90, 90] or a longitude outside [-180, 180].
    #[error("coordinate ({latitude}, {longitude}) at index {index} is out of geographic range")]
    CoordinateOutOfRange {
        /// Position of the offending coordinate pair.
        index: usize,
        /// Latitude in degrees.
        latitude: f64,
        /// Longitude in degrees.
        longitude: f64,
    },
}
