mod common;

use common::synthetic_image::{encode_png, radiograph};
use cxr_coach::config::analyze::load_config;
use cxr_coach::features::RadiologyFeatureExtractor;
use cxr_coach::image::io::write_json_file;
use cxr_coach::pipeline::{Analyzer, CaseRecord, InMemoryCaseStore, PrecomputedClassifier};
use cxr_coach::types::LabelScores;

fn record(id: &str, label: &str, embedding: Vec<f32>) -> CaseRecord {
    CaseRecord {
        id: id.to_string(),
        label: label.to_string(),
        confidence: 0.9,
        embedding,
        features: None,
    }
}

fn store() -> InMemoryCaseStore {
    InMemoryCaseStore::from_records(vec![
        record("p1", "Pneumonia", vec![1.0, 0.0, 0.0]),
        record("p2", "Pneumonia", vec![0.9, 0.1, 0.0]),
        record("n1", "Normal", vec![0.0, 1.0, 0.0]),
        record("n2", "Normal", vec![0.0, 0.0, 1.0]),
    ])
}

fn pneumonia_classifier() -> PrecomputedClassifier {
    let scores: LabelScores = [("Pneumonia", 0.8), ("Normal", 0.1)].into_iter().collect();
    PrecomputedClassifier::new(scores, vec![1.0, 0.0, 0.0])
}

#[test]
fn analyze_fuses_classifier_features_and_similar_cases() {
    common::init_logging();
    let bytes = encode_png(&radiograph(true));
    let analyzer = Analyzer::new(
        RadiologyFeatureExtractor::default(),
        Box::new(pneumonia_classifier()),
    )
    .with_store(Box::new(store()))
    .with_top_k(3);

    let report = analyzer.analyze(&bytes).expect("synthetic png decodes");
    assert!(!report.classifier_degraded);
    assert_eq!(report.result.diagnosis, "Pneumonia");
    assert_eq!(report.result.raw_dl_score, 0.8);
    assert!((0.0..=1.0).contains(&report.result.confidence));

    assert_eq!(report.similar_cases.len(), 3);
    assert_eq!(report.similar_cases[0].id, "p1");
    assert_eq!(report.similar_cases[1].id, "p2");
    assert!(report
        .result
        .adjustments
        .iter()
        .any(|a| a.starts_with("Vector DB: 3 similar cases found. Top Match: Pneumonia")));
    assert!(report
        .result
        .adjustments
        .iter()
        .any(|a| a.starts_with("Confidence Boosted by KNN")));

    assert!(report.features.get_or_zero("lung_area_ratio") > 0.1);
    for stage in ["features", "classify", "search", "fusion"] {
        assert!(report.timings.stage_ms(stage).is_some(), "missing timing {stage}");
    }
    let json = serde_json::to_value(&report).expect("report serializes");
    assert!(json.get("result").is_some());
    assert!(json.get("similarCases").is_some());
}

#[test]
fn analyze_without_store_skips_consensus() {
    let bytes = encode_png(&radiograph(true));
    let analyzer = Analyzer::new(
        RadiologyFeatureExtractor::default(),
        Box::new(pneumonia_classifier()),
    );
    let report = analyzer.analyze(&bytes).expect("decodes");
    assert!(report.similar_cases.is_empty());
    assert!(!report
        .result
        .adjustments
        .iter()
        .any(|a| a.starts_with("Vector DB")));
}

#[test]
fn analyzer_built_from_config_files() {
    let dir = tempfile::tempdir().expect("tempdir");
    let image_path = dir.path().join("cxr.png");
    std::fs::write(&image_path, encode_png(&radiograph(true))).expect("write png");

    let classification_path = dir.path().join("classification.json");
    write_json_file(
        &classification_path,
        &serde_json::json!({
            "scores": {"Pneumonia": 0.8, "Normal": 0.1},
            "embedding": [1.0, 0.0, 0.0]
        }),
    )
    .expect("write classification");

    let store_path = dir.path().join("cases.json");
    store().save_json(&store_path).expect("save store");

    let config_path = dir.path().join("analyze.json");
    write_json_file(
        &config_path,
        &serde_json::json!({
            "input": image_path,
            "classification": classification_path,
            "case_store": store_path,
            "top_k": 2
        }),
    )
    .expect("write config");

    let config = load_config(&config_path).expect("config parses");
    let analyzer = config.build_analyzer().expect("analyzer builds");
    let bytes = std::fs::read(&config.input).expect("read input");
    let report = analyzer.analyze(&bytes).expect("decodes");
    assert_eq!(report.similar_cases.len(), 2);
    assert_eq!(report.result.diagnosis, "Pneumonia");
}
