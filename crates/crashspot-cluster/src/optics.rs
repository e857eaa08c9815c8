//! Ordering-based density clustering (OPTICS) with ξ-steep cluster extraction.
//!
//! The reachability ordering is built over *unique* locations: coincident
//! records would otherwise produce zero reachability distances and corrupt
//! the steep-area detection. Labels are projected back onto every record
//! through the [`CollapsedSample`] occurrence map.

use serde::Serialize;
use tracing::{debug, instrument};

use crashspot_geo::{CollapsedSample, GreatCircleDistance, PairwiseDistance};

use crate::clusterer::{ClusterOutcome, DensityClusterer};
use crate::label::ClusterLabel;

/// One OPTICS parameter set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct OpticsParams {
    /// Maximum neighbourhood search radius in kilometres.
    pub max_radius_km: f64,
    /// Neighbourhood size (the point itself included) defining the core distance.
    /// Also the minimum size of an extracted cluster.
    pub min_samples: usize,
    /// Steepness threshold in `(0, 1)`.
    pub xi: f64,
}

/// The reachability ordering of a point set.
#[derive(Debug, Clone, PartialEq)]
pub struct ReachabilityGraph {
    /// Point indices in processing order.
    pub ordering: Vec<usize>,
    /// Reachability distance per point (radians), `INFINITY` if never reached.
    pub reachability: Vec<f64>,
    /// Point from which each point was last reached, if any.
    pub predecessor: Vec<Option<usize>>,
    /// Core distance per point (radians), `INFINITY` beyond the search radius.
    pub core_distances: Vec<f64>,
}

/// Round to 15 decimals (half to even) so equal reachabilities compare equal
/// regardless of summation noise.
fn round15(x: f64) -> f64 {
    if x.is_finite() {
        (x * 1e15).round_ties_even() / 1e15
    } else {
        x
    }
}

/// Build the OPTICS reachability ordering.
///
/// The next point processed is always the unprocessed point of smallest
/// reachability, ties going to the lowest index.
#[instrument(skip(distances), fields(n_points = distances.n_points()))]
pub fn reachability_graph<D: PairwiseDistance>(
    distances: &D,
    min_samples: usize,
    max_radius: GreatCircleDistance,
) -> ReachabilityGraph {
    let n = distances.n_points();
    let max_eps = max_radius.radians();

    let core_distances: Vec<f64> = if min_samples == 0 || min_samples > n {
        vec![f64::INFINITY; n]
    } else {
        distances
            .kth_nearest_all(min_samples)
            .into_iter()
            .map(|d| {
                let d = d.radians();
                round15(if d > max_eps { f64::INFINITY } else { d })
            })
            .collect()
    };

    let mut reachability = vec![f64::INFINITY; n];
    let mut predecessor: Vec<Option<usize>> = vec![None; n];
    let mut processed = vec![false; n];
    let mut ordering = Vec::with_capacity(n);

    for _ in 0..n {
        let mut point = usize::MAX;
        let mut best = f64::NAN;
        for (j, &r) in reachability.iter().enumerate() {
            if !processed[j] && (point == usize::MAX || r < best) {
                point = j;
                best = r;
            }
        }
        processed[point] = true;
        ordering.push(point);

        let core = core_distances[point];
        if core.is_infinite() {
            continue;
        }
        for (j, d) in distances.neighbours_within_with_distance(point, max_radius) {
            if processed[j] {
                continue;
            }
            let rd = round15(d.radians().max(core));
            if rd < reachability[j] {
                reachability[j] = rd;
                predecessor[j] = Some(point);
            }
        }
    }

    ReachabilityGraph {
        ordering,
        reachability,
        predecessor,
        core_distances,
    }
}

// ── ξ extraction ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy)]
struct SteepDownArea {
    start: usize,
    end: usize,
    mib: f64,
}

/// Grow a steep area from `start`, tolerating up to `min_samples` consecutive
/// non-steep points that do not turn in the opposite direction.
fn extend_region(steep: &[bool], opposite: &[bool], start: usize, min_samples: usize) -> usize {
    let mut non_steep = 0usize;
    let mut end = start;
    for index in start..steep.len() {
        if steep[index] {
            non_steep = 0;
            end = index;
        } else if !opposite[index] {
            non_steep += 1;
            if non_steep > min_samples {
                break;
            }
        } else {
            return end;
        }
    }
    end
}

/// Drop steep-down areas that the current maximum-in-between has overtaken,
/// and raise the recorded maximum of the survivors.
fn update_sdas(sdas: &mut Vec<SteepDownArea>, mib: f64, xi_complement: f64, plot: &[f64]) {
    if mib.is_infinite() {
        sdas.clear();
        return;
    }
    sdas.retain(|sda| mib <= plot[sda.start] * xi_complement);
    for sda in sdas.iter_mut() {
        sda.mib = sda.mib.max(mib);
    }
}

/// Shrink `[s, e]` from the right until the end point's predecessor lies inside it.
fn correct_predecessor(
    plot: &[f64],
    predecessor_plot: &[Option<usize>],
    ordering: &[usize],
    s: usize,
    mut e: usize,
) -> Option<(usize, usize)> {
    while s < e {
        if plot[s] > plot[e] {
            return Some((s, e));
        }
        if let Some(p_e) = predecessor_plot[e]
            && ordering[s..e].contains(&p_e)
        {
            return Some((s, e));
        }
        e -= 1;
    }
    None
}

/// Extract ξ-steep clusters as inclusive `(start, end)` ranges over the ordering.
///
/// Nested clusters are emitted before the clusters that contain them.
#[must_use]
pub fn xi_clusters(
    graph: &ReachabilityGraph,
    min_samples: usize,
    min_cluster_size: usize,
    xi: f64,
) -> Vec<(usize, usize)> {
    let n = graph.ordering.len();
    // A trailing infinity lets a cluster close at the end of the ordering.
    let mut plot: Vec<f64> = graph.ordering.iter().map(|&p| graph.reachability[p]).collect();
    plot.push(f64::INFINITY);
    let predecessor_plot: Vec<Option<usize>> =
        graph.ordering.iter().map(|&p| graph.predecessor[p]).collect();

    let xi_complement = 1.0 - xi;
    let ratio: Vec<f64> = (0..n).map(|i| plot[i] / plot[i + 1]).collect();
    let steep_up: Vec<bool> = ratio.iter().map(|&r| r <= xi_complement).collect();
    let steep_down: Vec<bool> = ratio.iter().map(|&r| r >= 1.0 / xi_complement).collect();
    let downward: Vec<bool> = ratio.iter().map(|&r| r > 1.0).collect();
    let upward: Vec<bool> = ratio.iter().map(|&r| r < 1.0).collect();

    let mut sdas: Vec<SteepDownArea> = Vec::new();
    let mut clusters: Vec<(usize, usize)> = Vec::new();
    let mut index = 0usize;
    let mut mib = 0.0f64;

    for steep_index in (0..n).filter(|&i| steep_up[i] || steep_down[i]) {
        if steep_index < index {
            continue;
        }
        mib = plot[index..=steep_index].iter().fold(mib, |acc, &r| acc.max(r));

        if steep_down[steep_index] {
            update_sdas(&mut sdas, mib, xi_complement, &plot);
            let end = extend_region(&steep_down, &upward, steep_index, min_samples);
            sdas.push(SteepDownArea {
                start: steep_index,
                end,
                mib: 0.0,
            });
            index = end + 1;
            mib = plot[index];
            continue;
        }

        update_sdas(&mut sdas, mib, xi_complement, &plot);
        let u_start = steep_index;
        let u_end = extend_region(&steep_up, &downward, u_start, min_samples);
        index = u_end + 1;
        mib = plot[index];

        let mut found: Vec<(usize, usize)> = Vec::new();
        for sda in &sdas {
            let mut c_start = sda.start;
            let mut c_end = u_end;
            let end_level = plot[c_end + 1];

            if end_level * xi_complement < sda.mib {
                continue;
            }

            let d_max = plot[sda.start];
            if d_max * xi_complement >= end_level {
                while c_start < sda.end && plot[c_start + 1] > end_level {
                    c_start += 1;
                }
            } else if end_level * xi_complement >= d_max {
                while c_end > u_start && plot[c_end - 1] > d_max {
                    c_end -= 1;
                }
            }

            let Some((c_start, c_end)) =
                correct_predecessor(&plot, &predecessor_plot, &graph.ordering, c_start, c_end)
            else {
                continue;
            };

            if c_end - c_start + 1 < min_cluster_size || c_start > sda.end || c_end < u_start {
                continue;
            }
            found.push((c_start, c_end));
        }

        found.reverse();
        clusters.extend(found);
    }

    clusters
}

/// Assign labels from ξ clusters: a cluster is labelled only if none of its
/// range has been claimed already.
fn labels_from_clusters(ordering: &[usize], clusters: &[(usize, usize)]) -> Vec<ClusterLabel> {
    let n = ordering.len();
    let mut by_position = vec![ClusterLabel::NOISE; n];
    let mut next_id = 0usize;
    for &(start, end) in clusters {
        let range = &mut by_position[start..=end];
        if range.iter().all(|l| l.is_noise()) {
            range.fill(ClusterLabel::cluster(next_id));
            next_id += 1;
        }
    }

    let mut labels = vec![ClusterLabel::NOISE; n];
    for (position, &point) in ordering.iter().enumerate() {
        labels[point] = by_position[position];
    }
    labels
}

/// OPTICS over the unique locations of a collapsed sample.
///
/// `distances` must index the same points as `collapsed.unique()`; it may be
/// the unique sample itself or its precomputed matrix.
#[derive(Debug, Clone, Copy)]
pub struct Optics<'a, D> {
    collapsed: &'a CollapsedSample,
    distances: &'a D,
}

impl<'a, D: PairwiseDistance> Optics<'a, D> {
    #[must_use]
    pub fn new(collapsed: &'a CollapsedSample, distances: &'a D) -> Self {
        debug_assert_eq!(collapsed.unique().len(), distances.n_points());
        Self {
            collapsed,
            distances,
        }
    }

    /// Labels of the unique locations.
    #[must_use]
    pub fn unique_labels(&self, params: &OpticsParams) -> Vec<ClusterLabel> {
        let graph = reachability_graph(
            self.distances,
            params.min_samples,
            GreatCircleDistance::from_km(params.max_radius_km),
        );
        let clusters = xi_clusters(&graph, params.min_samples, params.min_samples, params.xi);
        labels_from_clusters(&graph.ordering, &clusters)
    }

    /// Labels of every original record.
    #[must_use]
    #[instrument(skip(self), fields(n_unique = self.distances.n_points()))]
    pub fn labels(&self, params: &OpticsParams) -> Vec<ClusterLabel> {
        let unique = self.unique_labels(params);
        let labels = self.collapsed.expand(&unique);
        debug!(
            max_radius_km = params.max_radius_km,
            min_samples = params.min_samples,
            xi = params.xi,
            n_records = labels.len(),
            "optics pass complete"
        );
        labels
    }
}

impl<D: PairwiseDistance> DensityClusterer for Optics<'_, D> {
    type Params = OpticsParams;

    fn cluster(&self, params: &OpticsParams) -> ClusterOutcome {
        ClusterOutcome::from_labels(self.labels(params))
    }
}
