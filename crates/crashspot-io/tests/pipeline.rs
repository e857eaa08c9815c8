//! End-to-end integration tests: CSV + settings -> hotspot run -> JSON -> deserialize.

use std::fs;
use std::path::Path;

use crashspot_cluster::{Granularity, HotspotRequest, SearchStatus};
use crashspot_io::{AccidentReader, ExperimentName, ResultWriter, Settings};
use tempfile::TempDir;

/// Path to the test fixture directory.
fn fixture_path(name: &str) -> std::path::PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

#[test]
fn city_round_trip() {
    // 1. Read CSV and settings
    let dataset = AccidentReader::new(&fixture_path("accidents.csv"))
        .read()
        .expect("fixture should parse");
    assert_eq!(dataset.len(), 71);
    let settings = Settings::load(&fixture_path("settings.json")).unwrap();

    // 2. Two 6 x 5 lattices at 40 m spacing plus five scattered accidents
    let records = dataset.select(Granularity::City, "Brasilia", "Driver distraction");
    assert_eq!(records.len(), 65);
    let report = settings
        .city_config(None)
        .unwrap()
        .fit(&HotspotRequest::new("Brasilia", "Driver distraction"), &records)
        .unwrap();
    assert_eq!(report.status, SearchStatus::Ok);
    assert_eq!(report.n_clusters(), 2);

    // 3. Write JSON artifact
    let dir = TempDir::new().unwrap();
    let experiment = ExperimentName::new("brasilia_distraction".into()).unwrap();
    let writer = ResultWriter::new(dir.path(), experiment).unwrap();
    let path = writer.write_hotspots(&report).unwrap();
    assert_eq!(path, dir.path().join("brasilia_distraction_hotspots.json"));

    // 4. Deserialize back and verify
    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["experiment"], "brasilia_distraction");
    assert_eq!(content["granularity"], "city");
    assert_eq!(content["target"], "Brasilia");
    assert_eq!(content["cause"], "Driver distraction");
    assert_eq!(content["status"], "OK");

    let epsilon = &content["epsilon"];
    assert_eq!(epsilon["source"], "knee");
    assert_eq!(epsilon["k"].as_u64().unwrap(), 4);
    let max_eps_km = epsilon["max_eps_km"].as_f64().unwrap();
    assert!((max_eps_km - 0.0617).abs() < 0.0005, "knee at {max_eps_km} km");

    assert_eq!(content["n_candidates"].as_u64().unwrap(), 8);
    assert_eq!(content["selected"].as_array().unwrap().len(), 3);

    // Noise never reaches the table
    let rows = content["records"].as_array().unwrap();
    assert_eq!(rows.len(), 60);
    for row in rows {
        assert!(row["label"].as_i64().unwrap() >= 0);
        assert!(row["victim_condition"].is_string());
    }

    let clusters = content["clusters"].as_array().unwrap();
    assert_eq!(clusters.len(), 2);
    for cluster in clusters {
        assert_eq!(cluster["accident_count"].as_u64().unwrap(), 30);
        let score = cluster["hotspot_score"].as_f64().unwrap();
        assert!((0.0..=1.0).contains(&score), "hotspot score {score}");
    }
}

#[test]
fn state_without_structure_round_trip() {
    let dataset = AccidentReader::new(&fixture_path("accidents.csv"))
        .read()
        .unwrap();
    let settings = Settings::load(&fixture_path("settings.json")).unwrap();

    // Four accidents half a degree apart, beyond every configured radius
    let records = dataset.select(Granularity::State, "DF", "Speeding");
    assert_eq!(records.len(), 4);
    let report = settings
        .state_config(None)
        .unwrap()
        .fit(&HotspotRequest::new("DF", "Speeding"), &records)
        .unwrap();
    assert_eq!(report.status, SearchStatus::NoClusters);

    let dir = TempDir::new().unwrap();
    let writer =
        ResultWriter::new(dir.path(), ExperimentName::new("df_speeding".into()).unwrap()).unwrap();
    let path = writer.write_hotspots(&report).unwrap();

    let content: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
    assert_eq!(content["status"], "NO_CLUSTERS");
    assert_eq!(content["granularity"], "state");
    assert!(content.get("epsilon").is_none());
    assert!(content.get("clusters").is_none());
}

#[test]
fn listings_follow_file_order() {
    let dataset = AccidentReader::new(&fixture_path("accidents.csv"))
        .read()
        .unwrap();
    assert_eq!(dataset.cities(), vec!["Brasilia", "Taguatinga", "Goiania"]);
    assert_eq!(dataset.states(), vec!["DF", "GO"]);
    assert_eq!(
        dataset.causes(Granularity::State, "DF"),
        vec!["Driver distraction", "Speeding"]
    );
    assert_eq!(
        dataset.causes(Granularity::City, "Goiania"),
        vec!["Driver distraction", "Fatigue"]
    );
}

#[test]
fn rerun_writes_identical_artifact() {
    let dataset = AccidentReader::new(&fixture_path("accidents.csv"))
        .read()
        .unwrap();
    let settings = Settings::load(&fixture_path("settings.json")).unwrap();
    let records = dataset.select(Granularity::City, "Brasilia", "Driver distraction");
    let request = HotspotRequest::new("Brasilia", "Driver distraction");
    let config = settings.city_config(Some(7)).unwrap();

    let dir = TempDir::new().unwrap();
    let mut artifacts = Vec::new();
    for name in ["first", "second"] {
        let report = config.fit(&request, &records).unwrap();
        let writer =
            ResultWriter::new(&dir.path().join(name), ExperimentName::new("run".into()).unwrap())
                .unwrap();
        let path = writer.write_hotspots(&report).unwrap();
        artifacts.push(fs::read_to_string(path).unwrap());
    }
    assert_eq!(artifacts[0], artifacts[1]);
}
