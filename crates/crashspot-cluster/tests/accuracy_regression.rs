//! Accuracy regression tests for crashspot-cluster.
//!
//! These tests pin the end-to-end behaviour of the tuning engine on small
//! synthetic accident layouts: two tight lattices far apart plus scattered
//! noise for the city path, and isolated or duplicated points for the state path.

use crashspot_cluster::{
    AccidentRecord, CityConfig, ClusterLabel, ClusterOutcome, Dbscan, DbscanParams,
    DensityClusterer, EpsilonBound, HotspotRequest, ParameterSearch, SearchStatus,
    SelectionPolicy, StateConfig, TendencyConfig, VictimCondition, core_outlier_ratio,
    dbscan_grid, epsilon_range,
};
use crashspot_geo::GeoSample;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Noise locations, each more than 11 km from every other point.
const NOISE: [(f64, f64); 5] = [
    (-15.70, -47.80),
    (-15.90, -47.80),
    (-15.75, -47.60),
    (-15.85, -48.00),
    (-15.65, -47.95),
];

/// Two 6 x 5 lattices with the given spacing in degrees, about 21 km apart,
/// followed by the five noise points.
fn lattices(spacing_deg: f64) -> Vec<(f64, f64)> {
    let mut coords = Vec::new();
    for (lat0, lon0) in [(-15.80, -47.90), (-15.80, -47.70)] {
        for r in 0..6 {
            for c in 0..5 {
                coords.push((lat0 + r as f64 * spacing_deg, lon0 + c as f64 * spacing_deg));
            }
        }
    }
    coords.extend(NOISE);
    coords
}

fn to_records(coords: &[(f64, f64)]) -> Vec<AccidentRecord> {
    let conditions = [
        VictimCondition::WithoutVictims,
        VictimCondition::Injured,
        VictimCondition::Fatal,
    ];
    coords
        .iter()
        .enumerate()
        .map(|(i, &(latitude, longitude))| AccidentRecord {
            latitude,
            longitude,
            victim_condition: conditions[i % 3],
            road_id: format!("BR-{:03}", 40 + i % 4),
            km: i as f64 * 0.5,
            city: "Brasilia".to_string(),
            state: "DF".to_string(),
            cause: "Driver distraction".to_string(),
        })
        .collect()
}

const M_PER_DEG: f64 = 6_371_000.0 * std::f64::consts::PI / 180.0;

/// Two equator lines of ten points, 10 m spacing, about 20 km apart.
fn two_lines() -> Vec<(f64, f64)> {
    let mut offsets: Vec<f64> = (0..10).map(|i| i as f64 * 10.0).collect();
    offsets.extend((0..10).map(|i| 20_000.0 + i as f64 * 10.0));
    offsets.into_iter().map(|m| (0.0, m / M_PER_DEG)).collect()
}

fn request() -> HotspotRequest {
    HotspotRequest::new("Brasilia", "Driver distraction")
}

// ---------------------------------------------------------------------------
// a) two_groups_yield_two_clusters_with_ratio_twelve
// ---------------------------------------------------------------------------

#[test]
fn two_groups_yield_two_clusters_with_ratio_twelve() {
    let sample = GeoSample::from_degrees(lattices(0.00045)).unwrap();
    let dbscan = Dbscan::new(&sample);

    let outcome = dbscan.cluster(&DbscanParams { eps_km: 1.0, min_samples: 5 });
    let ClusterOutcome::Clustered(labeling) = outcome else {
        panic!("expected a clustered outcome");
    };
    assert_eq!(labeling.n_clusters(), 2);
    assert_eq!(labeling.noise_count(), 5);
    assert_eq!(labeling.cluster_sizes(), vec![30, 30]);
    assert_eq!(core_outlier_ratio(labeling.labels()), 12.0);

    let eps = epsilon_range(0.5, 0.5, 2.0);
    assert_eq!(eps, vec![0.5, 1.0, 1.5]);
    let grid = dbscan_grid(&eps, &[5, 10]);
    let search = ParameterSearch::new(&dbscan, &sample, &sample)
        .run(&grid, &SelectionPolicy::default())
        .unwrap();
    assert_eq!(search.status, SearchStatus::Ok);
    assert_eq!(search.n_candidates, 6);
    assert_eq!(search.n_valid, 6);
    assert_eq!(search.selected.len(), 3);
    for (_, record) in &search.selected {
        assert_eq!(record.metrics.core_outlier_ratio, 12.0);
        assert_eq!(record.metrics.number_of_clusters, 2);
        assert!(record.metrics.silhouette_coefficient > 0.9);
    }
}

// ---------------------------------------------------------------------------
// b) city_pipeline_bounds_grid_with_knee
// ---------------------------------------------------------------------------

#[test]
fn city_pipeline_bounds_grid_with_knee() {
    let records = to_records(&lattices(0.0004));
    let cfg = CityConfig::new(4, 0.045, 0.005, vec![3, 4]).unwrap();
    let report = cfg.fit(&request(), &records).unwrap();

    assert_eq!(report.status, SearchStatus::Ok);
    let details = report.details.as_ref().expect("clusters expected");
    match &details.epsilon {
        EpsilonBound::Knee { max_eps_km, knee_index, profile_km, k } => {
            assert_eq!(*k, 4);
            assert_eq!(*knee_index, 5);
            assert_eq!(profile_km.len(), 65);
            // Diagonal of a 40 m lattice cell, at the lattice corners.
            assert!((max_eps_km - 0.0617).abs() < 0.0005, "knee at {max_eps_km} km");
        }
        other => panic!("expected a knee bound, got {other:?}"),
    }
    assert_eq!(details.n_candidates, 8);
    assert_eq!(details.n_valid, 8);
    assert!(details.hopkins < 0.3, "hopkins {}", details.hopkins);

    assert_eq!(details.clusters.len(), 2);
    assert!(details.clusters.iter().all(|c| c.accident_count == 30));
    assert_eq!(details.records.len(), 60);
    assert!(details.records.iter().all(|r| !r.label.is_noise()));
    assert!(
        details
            .clusters
            .iter()
            .all(|c| (0.0..=1.0).contains(&c.hotspot_score))
    );
}

// ---------------------------------------------------------------------------
// c) isolated_state_points_report_no_clusters
// ---------------------------------------------------------------------------

#[test]
fn isolated_state_points_report_no_clusters() {
    // Half a degree apart: farther than every configured radius.
    let coords: Vec<(f64, f64)> = (0..4)
        .flat_map(|r| (0..4).map(move |c| (-20.0 + r as f64 * 0.5, -45.0 + c as f64 * 0.5)))
        .collect();
    let cfg = StateConfig::new(vec![5.0, 10.0], vec![2, 3], vec![0.05, 0.1]).unwrap();
    let report = cfg.fit(&request(), &to_records(&coords)).unwrap();
    assert_eq!(report.status, SearchStatus::NoClusters);
    assert!(report.details.is_none());
    assert_eq!(report.n_clusters(), 0);
}

// ---------------------------------------------------------------------------
// d) state_duplicates_expand_to_every_record
// ---------------------------------------------------------------------------

#[test]
fn state_duplicates_expand_to_every_record() {
    let mut coords = two_lines();
    coords.extend(two_lines());
    let records = to_records(&coords);
    let cfg = StateConfig::new(vec![50.0], vec![3], vec![0.05]).unwrap();
    let report = cfg.fit(&request(), &records).unwrap();

    // A single valid candidate cannot fill the top three.
    assert_eq!(report.status, SearchStatus::Degraded);
    let details = report.details.as_ref().expect("clusters expected");
    assert_eq!(details.selected.len(), 1);
    assert_eq!(details.epsilon.max_eps_km(), Some(50.0));
    assert_eq!(details.records.len(), 40);
    assert_eq!(details.clusters.len(), 2);
    assert!(details.clusters.iter().all(|c| c.accident_count == 20));

    // A record and its duplicate share a label.
    for (a, b) in details.records[..20].iter().zip(&details.records[20..]) {
        assert_eq!(a.label, b.label);
    }
}

// ---------------------------------------------------------------------------
// e) rerun_is_bit_identical
// ---------------------------------------------------------------------------

#[test]
fn rerun_is_bit_identical() {
    let sample = GeoSample::from_degrees(lattices(0.00045)).unwrap();
    let matrix = sample.pairwise();
    let dbscan = Dbscan::new(&matrix);
    let params = DbscanParams { eps_km: 0.5, min_samples: 10 };
    let first: Vec<ClusterLabel> = dbscan.labels(&params);
    let second: Vec<ClusterLabel> = dbscan.labels(&params);
    assert_eq!(first, second);

    let records = to_records(&lattices(0.0004));
    let cfg = CityConfig::new(4, 0.045, 0.005, vec![3, 4]).unwrap();
    assert_eq!(
        cfg.fit(&request(), &records).unwrap(),
        cfg.fit(&request(), &records).unwrap()
    );
}

// ---------------------------------------------------------------------------
// f) hopkins_separates_grouped_from_uniform
// ---------------------------------------------------------------------------

#[test]
fn hopkins_separates_grouped_from_uniform() {
    let grouped = GeoSample::from_degrees(lattices(0.00045)).unwrap();
    let h = TendencyConfig::default().estimate(&grouped).unwrap();
    assert!((0.0..0.3).contains(&h), "grouped hopkins {h}");

    // A regular grid is the opposite of clustered.
    let spread: Vec<(f64, f64)> = (0..10)
        .flat_map(|r| (0..10).map(move |c| (-20.0 + r as f64 * 0.1, -45.0 + c as f64 * 0.1)))
        .collect();
    let spread = GeoSample::from_degrees(spread).unwrap();
    let h = TendencyConfig::default().estimate(&spread).unwrap();
    assert!(h > 0.4 && h <= 1.0, "spread hopkins {h}");
}

// ---------------------------------------------------------------------------
// g) reversed_candidate_order_keeps_selection
// ---------------------------------------------------------------------------

#[test]
fn reversed_candidate_order_keeps_selection() {
    let sample = GeoSample::from_degrees(lattices(0.00045)).unwrap();
    let dbscan = Dbscan::new(&sample);
    let grid = dbscan_grid(&[0.03, 0.06, 0.5, 1.0, 1.5], &[3, 5, 10]);
    let mut reversed = grid.clone();
    reversed.reverse();

    let policy = SelectionPolicy::default();
    let forward = ParameterSearch::new(&dbscan, &sample, &sample)
        .run(&grid, &policy)
        .unwrap();
    let backward = ParameterSearch::new(&dbscan, &sample, &sample)
        .run(&reversed, &policy)
        .unwrap();

    assert_eq!(forward.status, backward.status);
    assert_eq!(forward.records(), backward.records());
    assert_eq!(forward.chosen(), backward.chosen());
}

// ---------------------------------------------------------------------------
// h) precomputed_matrix_matches_on_demand_distances
// ---------------------------------------------------------------------------

#[test]
fn precomputed_matrix_matches_on_demand_distances() {
    let records = to_records(&lattices(0.0004));
    let with = CityConfig::new(4, 0.045, 0.005, vec![3, 4]).unwrap();
    let without = with.clone().with_precompute_matrix(false);
    assert_eq!(
        with.fit(&request(), &records).unwrap(),
        without.fit(&request(), &records).unwrap()
    );

    let mut coords = two_lines();
    coords.extend(two_lines().into_iter().step_by(2));
    let records = to_records(&coords);
    let with = StateConfig::new(vec![20.0, 50.0], vec![3, 4], vec![0.05]).unwrap();
    let without = with.clone().with_precompute_matrix(false);
    assert_eq!(
        with.fit(&request(), &records).unwrap(),
        without.fit(&request(), &records).unwrap()
    );
}
