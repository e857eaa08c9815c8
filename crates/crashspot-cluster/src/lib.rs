//! Density-clustering tuning engine for traffic-accident hotspots.
//!
//! Estimates clustering tendency (Hopkins statistic), bounds the DBSCAN
//! epsilon grid with the k-distance knee, runs DBSCAN or OPTICS over
//! great-circle distances for every grid candidate, ranks candidates by four
//! validity indices and scores the clusters of the chosen configuration by
//! accident severity.

mod clusterer;
mod config;
mod dbscan;
mod error;
mod hotspot;
mod knee;
mod label;
mod metrics;
mod optics;
mod pipeline;
mod record;
mod search;
mod tendency;

pub use clusterer::{ClusterOutcome, DensityClusterer, Labeling};
pub use config::{CityConfig, StateConfig};
pub use dbscan::{Dbscan, DbscanParams};
pub use error::ClusterError;
pub use hotspot::{
    ClusterStatistics, HotspotTable, HotspotWeights, LabeledRecord, min_max_normalize,
    score_hotspots,
};
pub use knee::{EpsilonEstimate, estimate_epsilon, k_distance_profile, locate_knee};
pub use label::ClusterLabel;
pub use metrics::{
    NO_OUTLIER_RATIO, QualityMetrics, calinski_harabasz, core_outlier_ratio, davies_bouldin,
    silhouette,
};
pub use optics::{Optics, OpticsParams, ReachabilityGraph, reachability_graph, xi_clusters};
pub use pipeline::{EpsilonBound, Granularity, HotspotDetails, HotspotReport, HotspotRequest};
pub use record::{AccidentRecord, UnknownVictimCondition, VictimCondition};
pub use search::{
    CancellationToken, ParameterCandidate, ParameterSearch, PerformanceRecord, SearchOutcome,
    SearchStatus, SelectionPolicy, dbscan_grid, epsilon_range, optics_grid, rank_order,
};
pub use tendency::{TendencyConfig, hopkins};
