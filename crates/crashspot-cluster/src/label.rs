//! Cluster labels with a noise sentinel.

use std::fmt;

use serde::{Serialize, Serializer};

/// A cluster assignment: a non-negative cluster id or the noise sentinel `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ClusterLabel(i32);

impl ClusterLabel {
    /// The noise label.
    pub const NOISE: Self = Self(-1);

    /// Create a label for the cluster with zero-based id `id`.
    pub(crate) fn cluster(id: usize) -> Self {
        Self(i32::try_from(id).unwrap_or(i32::MAX))
    }

    /// Return true if this is the noise label.
    #[must_use]
    pub fn is_noise(self) -> bool {
        self.0 < 0
    }

    /// Return the cluster id, or `None` for noise.
    #[must_use]
    pub fn cluster_id(self) -> Option<usize> {
        usize::try_from(self.0).ok()
    }

    /// Return the raw integer value (`-1` for noise).
    #[must_use]
    pub fn value(self) -> i32 {
        self.0
    }
}

impl fmt::Display for ClusterLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl Serialize for ClusterLabel {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i32(self.0)
    }
}
