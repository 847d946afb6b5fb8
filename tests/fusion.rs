use cxr_coach::fusion::{fuse, FusionEngine, FusionParams};
use cxr_coach::types::{FeatureVector, LabelScores, SimilarCase};

fn scores(pairs: &[(&str, f64)]) -> LabelScores {
    pairs.iter().map(|&(k, v)| (k, v)).collect()
}

fn features(pairs: &[(&str, f64)]) -> FeatureVector {
    pairs.iter().map(|&(k, v)| (k, v)).collect()
}

fn case(id: &str, label: &str, similarity: f64) -> SimilarCase {
    SimilarCase {
        id: id.to_string(),
        label: label.to_string(),
        confidence: 0.9,
        similarity,
    }
}

#[test]
fn confident_call_on_symmetric_lungs_is_downgraded() {
    let result = fuse(
        &scores(&[("Pneumonia", 0.9)]),
        &features(&[("lung_area_ratio", 0.45), ("asym_Lower_opacity", 0.05)]),
        None,
    );
    assert_eq!(result.diagnosis, "Pneumonia");
    assert!((result.confidence - 0.72).abs() < 1e-9, "got {}", result.confidence);
    assert_eq!(result.raw_dl_score, 0.9);
    assert!(result
        .adjustments
        .iter()
        .any(|a| a.starts_with("Downgraded by 20%")));
    assert!(result
        .flags
        .iter()
        .any(|f| f.starts_with("Possible False Positive")));
    assert!(result.summary.starts_with("Flagged for Review. Pneumonia suspected (72.0%)"));
}

#[test]
fn asymmetry_confirms_pathology() {
    let result = fuse(
        &scores(&[("Pneumonia", 0.8)]),
        &features(&[("lung_area_ratio", 0.3), ("asym_Lower_opacity", 0.35)]),
        None,
    );
    assert!((result.confidence - 0.9).abs() < 1e-9, "got {}", result.confidence);
    assert!(result
        .adjustments
        .iter()
        .any(|a| a.starts_with("Confidence Boosted: Physiological asymmetry")));
    assert!(result.flags.is_empty());
    assert!(result.summary.starts_with("High Confidence Pneumonia"));
}

#[test]
fn normal_call_with_asymmetry_raises_alert() {
    let result = fuse(
        &scores(&[("Normal", 0.9)]),
        &features(&[("lung_area_ratio", 0.3), ("asym_Lower_opacity", 0.4)]),
        None,
    );
    assert_eq!(result.diagnosis, "Normal");
    assert!((result.confidence - 0.54).abs() < 1e-9, "got {}", result.confidence);
    assert!(result
        .adjustments
        .iter()
        .any(|a| a.starts_with("Normal confidence reduced")));
    assert!(!result.flags.is_empty());
}

#[test]
fn implausible_anatomy_caps_confidence() {
    let result = fuse(
        &scores(&[("Pneumonia", 0.9)]),
        &features(&[("lung_area_ratio", 0.05)]),
        None,
    );
    assert!(result.confidence <= 0.65 + 1e-12, "got {}", result.confidence);
    assert!(result.flags.iter().any(|f| f.starts_with("Anatomy Unclear")));
}

#[test]
fn failed_segmentation_is_flagged_without_cap() {
    let result = fuse(
        &scores(&[("Effusion", 0.7)]),
        &features(&[("lung_area_ratio", 0.0), ("asym_Lower_opacity", 0.3)]),
        None,
    );
    assert!(result
        .flags
        .iter()
        .any(|f| f.starts_with("Segmentation Warning")));
    // Confirmation boost still applies: 0.7 + 0.1.
    assert!((result.confidence - 0.8).abs() < 1e-9, "got {}", result.confidence);
}

#[test]
fn agreeing_neighbours_boost_by_share() {
    let cases = [
        case("a", "Pneumonia", 0.9),
        case("b", "Pneumonia", 0.8),
        case("c", "Normal", 0.3),
    ];
    let base = fuse(
        &scores(&[("Pneumonia", 0.7)]),
        &features(&[("lung_area_ratio", 0.3), ("asym_Lower_opacity", 0.15)]),
        None,
    );
    let with_cases = fuse(
        &scores(&[("Pneumonia", 0.7)]),
        &features(&[("lung_area_ratio", 0.3), ("asym_Lower_opacity", 0.15)]),
        Some(&cases[..]),
    );
    let share = 1.7 / 2.0;
    assert!((with_cases.confidence - (base.confidence + 0.05 * share)).abs() < 1e-9);
    assert!(with_cases
        .adjustments
        .iter()
        .any(|a| a == "Vector DB: 3 similar cases found. Top Match: Pneumonia (Consensus: 85%)"));
    assert!(with_cases
        .adjustments
        .iter()
        .any(|a| a.starts_with("Confidence Boosted by KNN")));
}

#[test]
fn dominant_disagreeing_neighbours_flag_mismatch() {
    let cases = [
        case("a", "Effusion", 0.9),
        case("b", "Effusion", 0.9),
        case("c", "Pneumonia", 0.2),
    ];
    let result = fuse(
        &scores(&[("Pneumonia", 0.7)]),
        &features(&[("lung_area_ratio", 0.3), ("asym_Lower_opacity", 0.15)]),
        Some(&cases[..]),
    );
    assert!((result.confidence - 0.63).abs() < 1e-9, "got {}", result.confidence);
    assert!(result
        .flags
        .iter()
        .any(|f| f == "Consensus Mismatch: Similar historical cases are mostly Effusion."));
}

#[test]
fn empty_neighbour_list_changes_nothing() {
    let s = scores(&[("Pneumonia", 0.7)]);
    let f = features(&[("lung_area_ratio", 0.3), ("asym_Lower_opacity", 0.15)]);
    assert_eq!(fuse(&s, &f, None), fuse(&s, &f, Some(&[][..])));
}

#[test]
fn fusion_is_deterministic() {
    let s = scores(&[("Pneumonia", 0.62), ("Normal", 0.3)]);
    let f = features(&[
        ("lung_area_ratio", 0.2),
        ("asym_Upper_opacity", 0.22),
        ("opacity_count", 4.0),
    ]);
    let cases = [case("a", "Pneumonia", 0.7)];
    let first = serde_json::to_string(&fuse(&s, &f, Some(&cases[..]))).expect("serialize");
    let second = serde_json::to_string(&fuse(&s, &f, Some(&cases[..]))).expect("serialize");
    assert_eq!(first, second);
}

#[test]
fn custom_params_move_thresholds() {
    let mut params = FusionParams::default();
    params.scenarios.symmetric_penalty = 0.5;
    let engine = FusionEngine::new(params);
    let result = engine.fuse(
        &scores(&[("Pneumonia", 0.9)]),
        &features(&[("lung_area_ratio", 0.45)]),
        None,
    );
    assert!((result.confidence - 0.45).abs() < 1e-9, "got {}", result.confidence);
}
