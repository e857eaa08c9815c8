//! Hopkins statistic for spatial clustering tendency.

use rand::Rng;
use rand::SeedableRng;
use rand::seq::index;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use tracing::{debug, instrument};

use crashspot_geo::{GeoPoint, GeoSample};

use crate::error::ClusterError;

/// Configuration for the Hopkins tendency estimate.
///
/// # Defaults
///
/// | Parameter     | Default |
/// |---------------|---------|
/// | `sample_cap`  | 50      |
/// | `seed`        | 42      |
#[derive(Debug, Clone)]
pub struct TendencyConfig {
    pub(crate) sample_cap: usize,
    pub(crate) seed: u64,
}

impl Default for TendencyConfig {
    fn default() -> Self {
        Self {
            sample_cap: 50,
            seed: 42,
        }
    }
}

impl TendencyConfig {
    /// Set the maximum number of real and artificial points drawn.
    #[must_use]
    pub fn with_sample_cap(mut self, sample_cap: usize) -> Self {
        self.sample_cap = sample_cap;
        self
    }

    /// Set the seed of the random source used for both draws.
    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    #[must_use]
    pub fn sample_cap(&self) -> usize {
        self.sample_cap
    }

    #[must_use]
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Estimate the Hopkins statistic of `sample` with `m = min(sample_cap, n)`.
    ///
    /// # Errors
    ///
    /// Same as [`hopkins`].
    pub fn estimate(&self, sample: &GeoSample) -> Result<f64, ClusterError> {
        let m = self.sample_cap.min(sample.len());
        let mut rng = ChaCha8Rng::seed_from_u64(self.seed);
        hopkins(sample, m, &mut rng)
    }
}

/// Compute the Hopkins statistic of `sample` from `m` real and `m` artificial points.
///
/// Real points are drawn from the sample without replacement and measured
/// against their nearest *other* sample point. Artificial points are drawn
/// uniformly inside the sample's latitude/longitude bounding box and measured
/// against their nearest sample point. The result is
/// `sum(real) / (sum(real) + sum(artificial))`: near 0 for strongly clustered
/// data, near 0.5 for spatially uniform data.
///
/// # Errors
///
/// | Variant | Condition |
/// |---|---|
/// | [`ClusterError::InsufficientSample`] | `m > n`, or `n < 2` |
/// | [`ClusterError::DegenerateDistance`] | both distance sums are zero |
#[instrument(skip(sample, rng), fields(n_points = sample.len(), m))]
pub fn hopkins<R: Rng + ?Sized>(
    sample: &GeoSample,
    m: usize,
    rng: &mut R,
) -> Result<f64, ClusterError> {
    let n = sample.len();
    if m > n {
        return Err(ClusterError::InsufficientSample {
            requested: m,
            available: n,
        });
    }
    if n < 2 {
        return Err(ClusterError::InsufficientSample {
            requested: 2,
            available: n,
        });
    }

    let real_idx: Vec<usize> = index::sample(rng, n, m).into_vec();

    let bbox = sample.bounding_box();
    let artificial: Vec<GeoPoint> = (0..m)
        .map(|_| {
            GeoPoint::from_radians(
                uniform(rng, bbox.min_lat, bbox.max_lat),
                uniform(rng, bbox.min_lon, bbox.max_lon),
            )
        })
        .collect();

    let points = sample.points();
    let real: Vec<f64> = real_idx
        .par_iter()
        .map(|&i| sample.nearest_distance(&points[i], Some(i)).radians())
        .collect();
    let synthetic: Vec<f64> = artificial
        .par_iter()
        .map(|p| sample.nearest_distance(p, None).radians())
        .collect();
    let real_sum: f64 = real.iter().sum();
    let artificial_sum: f64 = synthetic.iter().sum();

    let total = real_sum + artificial_sum;
    if total == 0.0 {
        return Err(ClusterError::DegenerateDistance);
    }
    let h = real_sum / total;
    debug!(real_sum, artificial_sum, hopkins = h, "hopkins statistic computed");
    Ok(h)
}

fn uniform<R: Rng + ?Sized>(rng: &mut R, low: f64, high: f64) -> f64 {
    if high > low {
        rng.gen_range(low..high)
    } else {
        low
    }
}
