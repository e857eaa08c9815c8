use crashspot_geo::GeoError;

/// Errors from the clustering tuning engine.
#[derive(Debug, thiserror::Error)]
pub enum ClusterError {
    /// Returned when the Hopkins sample size exceeds the population, or the
    /// population is too small to have a nearest other neighbour.
    #[error("sample size {requested} exceeds usable population of {available} points")]
    InsufficientSample {
        /// Number of points requested.
        requested: usize,
        /// Number of points available.
        available: usize,
    },

    /// Returned when every nearest-neighbour distance in the Hopkins estimate is zero.
    #[error("nearest-neighbour distance sums are both zero, Hopkins statistic is undefined")]
    DegenerateDistance,

    /// Returned when the k-distance neighbour count is zero or exceeds the sample.
    #[error("neighbour count k={k} is invalid for a sample of {n_points} points")]
    InvalidNeighbourCount {
        /// The requested neighbour count.
        k: usize,
        /// Number of points in the sample (0 when rejected at configuration time).
        n_points: usize,
    },

    /// Returned when a minimum-points value is below the algorithm's floor.
    #[error("minimum points {min_points} is below the required floor of {floor}")]
    InvalidMinPoints {
        /// The rejected value.
        min_points: usize,
        /// Smallest accepted value.
        floor: usize,
    },

    /// Returned when the epsilon grid bounds or step are not positive and finite.
    #[error("invalid epsilon range: min {min_km} km, step {step_km} km")]
    InvalidEpsilonRange {
        /// Lower bound in kilometres.
        min_km: f64,
        /// Grid step in kilometres.
        step_km: f64,
    },

    /// Returned when a steepness factor lies outside the open interval (0, 1).
    #[error("xi must lie strictly between 0 and 1, got {xi}")]
    InvalidXi {
        /// The rejected value.
        xi: f64,
    },

    /// Returned when a radius is not positive and finite.
    #[error("radius must be positive and finite, got {radius_km} km")]
    InvalidRadius {
        /// The rejected radius in kilometres.
        radius_km: f64,
    },

    /// Returned when a configured candidate list is empty.
    #[error("parameter list `{parameter}` must not be empty")]
    EmptyGrid {
        /// Name of the empty list.
        parameter: &'static str,
    },

    /// Returned when a fallback epsilon upper bound is not positive and finite.
    #[error("fallback epsilon bound must be positive and finite, got {max_eps_km} km")]
    InvalidEpsilonBound {
        /// The rejected bound in kilometres.
        max_eps_km: f64,
    },

    /// Returned when the caller cancelled the search.
    #[error("parameter search cancelled after {evaluated} candidates")]
    Cancelled {
        /// Candidates evaluated before the cancellation was observed.
        evaluated: usize,
    },

    /// Wraps an error building the coordinate sample.
    #[error("invalid coordinate sample: {0}")]
    Geo(#[from] GeoError),
}
