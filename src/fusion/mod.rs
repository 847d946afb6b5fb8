//! Rule-based fusion of classifier scores, handcrafted features and similar
//! cases into one calibrated confidence.
//!
//! The rules run as a fixed sequence of guarded adjustments:
//! 1. top classifier label and score,
//! 2. anatomy gate on the lung area ratio (sets a confidence cap),
//! 3. handcrafted fallback when the classifier score is negligible,
//! 4. agreement scenarios between the classifier and lung asymmetry,
//! 5. similar-case consensus,
//! 6. cap, clamp and summary.
//!
//! `fuse` is a pure function of its inputs; missing features read as `0.0`.
pub mod consensus;
pub mod params;

use crate::features::keys;
use crate::types::{FeatureVector, FusionResult, LabelScores, SimilarCase};
pub use consensus::{weighted_vote, Consensus};
pub use params::FusionParams;

/// Label used by the classifier for a normal study.
pub const NORMAL_LABEL: &str = "Normal";
const UNKNOWN_LABEL: &str = "Unknown";

/// Largest `asym_*_opacity` value and the key it came from.
fn max_opacity_asymmetry(features: &FeatureVector) -> (f64, Option<&str>) {
    let mut best = (0.0, None);
    for (key, value) in features.iter() {
        if keys::opacity_asymmetry_level(key).is_some() && value > best.0 {
            best = (value, Some(key));
        }
    }
    best
}

fn percent(score: f64) -> String {
    format!("{:.1}%", score * 100.0)
}

/// Running state of one fusion call.
struct Verdict {
    label: String,
    score: f64,
    cap: f64,
    adjustments: Vec<String>,
    flags: Vec<String>,
}

/// Stateless fusion engine holding its calibration parameters.
#[derive(Clone, Debug, Default)]
pub struct FusionEngine {
    params: FusionParams,
}

impl FusionEngine {
    pub fn new(params: FusionParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &FusionParams {
        &self.params
    }

    pub fn fuse(
        &self,
        scores: &LabelScores,
        features: &FeatureVector,
        similar_cases: Option<&[SimilarCase]>,
    ) -> FusionResult {
        let (dl_label, dl_score) = match scores.top() {
            Some((label, score)) => (label.to_string(), score),
            None => (UNKNOWN_LABEL.to_string(), 0.0),
        };
        let lung_ratio = features.get_or_zero(keys::LUNG_AREA_RATIO);
        let opacity_count = features.get_or_zero(keys::OPACITY_COUNT);
        let (asym_max, asym_key) = max_opacity_asymmetry(features);

        log::info!("fusion input: top call {dl_label} ({dl_score:.4})");
        for (label, score) in scores.ranked(5) {
            log::debug!("  {label}: {score:.4}");
        }
        log::info!(
            "fusion input: lung ratio {lung_ratio:.4}, max asymmetry {asym_max:.4} ({}), opacity count {opacity_count:.0}",
            asym_key.unwrap_or("none")
        );

        let mut v = Verdict {
            label: dl_label,
            score: dl_score,
            cap: 1.0,
            adjustments: Vec::new(),
            flags: Vec::new(),
        };
        self.anatomy_gate(&mut v, lung_ratio, dl_score);
        self.low_confidence_fallback(&mut v, dl_score, asym_max, opacity_count);
        self.scenarios(&mut v, dl_score, asym_max);
        if let Some(cases) = similar_cases {
            self.consensus(&mut v, cases);
        }

        let mut confidence = v.score.min(v.cap);
        if confidence < v.score {
            log::debug!("cap applied: {:.4} -> {:.4}", v.score, confidence);
        }
        confidence = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };

        let summary = self.summary(&v.label, confidence, &v.flags);
        log::info!(
            "fusion result: {} at {:.4} (raw {:.4}), {} adjustments, {} flags",
            v.label,
            confidence,
            dl_score,
            v.adjustments.len(),
            v.flags.len()
        );
        FusionResult {
            diagnosis: v.label,
            confidence,
            raw_dl_score: dl_score,
            adjustments: v.adjustments,
            flags: v.flags,
            summary,
        }
    }

    fn anatomy_gate(&self, v: &mut Verdict, lung_ratio: f64, dl_score: f64) {
        let p = &self.params.anatomy;
        if lung_ratio < p.segmentation_failure_ratio {
            log::warn!("lung ratio {lung_ratio:.4}: segmentation likely failed");
            v.flags.push(
                "Segmentation Warning: Could not detect lungs reliably. Anatomy check skipped."
                    .to_string(),
            );
        } else if lung_ratio < p.min_lung_ratio || lung_ratio > p.max_lung_ratio {
            if dl_score > p.trusted_dl_score {
                v.cap = p.trusted_cap;
                v.adjustments.push(format!(
                    "Confidence capped at {} due to abnormal lung area ratio ({lung_ratio:.2}).",
                    v.cap
                ));
            } else {
                v.cap = p.risk_cap;
                v.flags.push(
                    "Anatomy Unclear: Lung area ratio abnormal. Reliability reduced.".to_string(),
                );
                v.adjustments
                    .push(format!("Confidence capped at {} due to anatomy risk.", v.cap));
            }
            log::info!("abnormal lung ratio {lung_ratio:.4}: cap {}", v.cap);
        } else {
            log::debug!("lung anatomy plausible ({lung_ratio:.4})");
        }
    }

    fn low_confidence_fallback(
        &self,
        v: &mut Verdict,
        dl_score: f64,
        asym_max: f64,
        opacity_count: f64,
    ) {
        let p = &self.params.fallback;
        if dl_score >= p.low_dl_score {
            return;
        }
        log::warn!("classifier score {dl_score:.4} is negligible, using handcrafted features");
        v.flags.push(
            "DL Model Warning: Using handcrafted physiological analysis instead of the classifier."
                .to_string(),
        );
        let count = opacity_count.max(0.0).round() as u64;
        if asym_max > p.pneumonia_asymmetry || opacity_count > p.pneumonia_opacities {
            v.label = "Pneumonia".to_string();
            v.score = p.pneumonia_base + asym_max.min(p.pneumonia_max_bonus);
            v.adjustments.push(format!(
                "HANDCRAFTED MODE: High asymmetry ({asym_max:.2}) + {count} opacities → Pneumonia"
            ));
        } else if asym_max > p.infiltration_asymmetry || opacity_count > p.infiltration_opacities {
            v.label = "Infiltration".to_string();
            v.score = p.infiltration_base
                + (p.infiltration_weight * asym_max).min(p.infiltration_max_bonus);
            v.adjustments.push(format!(
                "HANDCRAFTED MODE: Moderate asymmetry ({asym_max:.2}) → Infiltration"
            ));
        } else {
            v.label = NORMAL_LABEL.to_string();
            v.score = p.normal_base
                + (p.normal_weight * (p.normal_reference_asymmetry - asym_max))
                    .min(p.normal_max_bonus);
            v.adjustments.push(format!(
                "HANDCRAFTED MODE: Low asymmetry ({asym_max:.2}) + {count} opacities → Normal"
            ));
        }
        log::info!("handcrafted diagnosis: {} ({:.4})", v.label, v.score);
    }

    /// Scenarios compare against the classifier's own score, even after a fallback.
    fn scenarios(&self, v: &mut Verdict, dl_score: f64, asym_max: f64) {
        let p = &self.params.scenarios;
        let is_normal = v.label == NORMAL_LABEL;

        if !is_normal && dl_score > p.min_dl_score && asym_max < p.symmetric_asymmetry {
            let prev = v.score;
            v.score *= 1.0 - p.symmetric_penalty;
            v.adjustments.push(format!(
                "Downgraded by {}%: High DL confidence but lungs appear symmetric.",
                p.symmetric_penalty * 100.0
            ));
            v.flags.push(
                "Possible False Positive: Lungs lack expected asymmetry for this condition."
                    .to_string(),
            );
            log::info!(
                "symmetric lungs for {}: {prev:.4} * (1 - {}) = {:.4}",
                v.label,
                p.symmetric_penalty,
                v.score
            );
        }

        if is_normal && asym_max > p.normal_alert_asymmetry {
            let prev = v.score;
            v.score *= 1.0 - p.normal_alert_penalty;
            v.adjustments.push(format!(
                "Normal confidence reduced: Significant opacity asymmetry ({asym_max:.2}) detected."
            ));
            v.flags.push(
                "Clinical Alert: AI predicts Normal, but significant asymmetry necessitates review."
                    .to_string(),
            );
            log::info!(
                "asymmetric lungs for Normal: {prev:.4} * (1 - {}) = {:.4}",
                p.normal_alert_penalty,
                v.score
            );
        }

        if !is_normal && dl_score > p.min_dl_score && asym_max > p.confirming_asymmetry {
            let prev = v.score;
            v.score = (v.score + p.confirming_boost).min(1.0);
            v.adjustments.push(
                "Confidence Boosted: Physiological asymmetry confirms visual pattern.".to_string(),
            );
            log::info!(
                "asymmetry confirms {}: min(1, {prev:.4} + {}) = {:.4}",
                v.label,
                p.confirming_boost,
                v.score
            );
        }
    }

    fn consensus(&self, v: &mut Verdict, cases: &[SimilarCase]) {
        let p = &self.params.consensus;
        let Some(c) = weighted_vote(cases) else {
            log::debug!("no similar-case consensus ({} cases)", cases.len());
            return;
        };
        v.adjustments.push(format!(
            "Vector DB: {} similar cases found. Top Match: {} (Consensus: {:.0}%)",
            c.case_count,
            c.label,
            c.share * 100.0
        ));
        if c.label == v.label {
            let prev = v.score;
            v.score = (v.score + p.boost * c.share).min(1.0);
            v.adjustments
                .push("Confidence Boosted by KNN: Similar cases confirm diagnosis.".to_string());
            log::info!(
                "similar cases agree: min(1, {prev:.4} + {:.4}) = {:.4}",
                p.boost * c.share,
                v.score
            );
        } else if c.share > p.mismatch_share {
            let prev = v.score;
            v.score *= p.mismatch_factor;
            v.flags.push(format!(
                "Consensus Mismatch: Similar historical cases are mostly {}.",
                c.label
            ));
            log::info!(
                "similar cases disagree ({} vs {}): {prev:.4} * {} = {:.4}",
                c.label,
                v.label,
                p.mismatch_factor,
                v.score
            );
        }
    }

    fn summary(&self, label: &str, confidence: f64, flags: &[String]) -> String {
        if !flags.is_empty() {
            format!(
                "Flagged for Review. {label} suspected ({}), but {} clinical warnings triggered.",
                percent(confidence),
                flags.len()
            )
        } else if confidence > self.params.high_confidence {
            format!(
                "High Confidence {label} ({}). Verified by physiological and historical data.",
                percent(confidence)
            )
        } else {
            format!("Moderate Confidence {label} ({}).", percent(confidence))
        }
    }
}

/// [`FusionEngine::fuse`] with default calibration.
pub fn fuse(
    scores: &LabelScores,
    features: &FeatureVector,
    similar_cases: Option<&[SimilarCase]>,
) -> FusionResult {
    FusionEngine::default().fuse(scores, features, similar_cases)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn features(pairs: &[(&str, f64)]) -> FeatureVector {
        pairs.iter().map(|&(k, v)| (k, v)).collect()
    }

    fn scores(pairs: &[(&str, f64)]) -> LabelScores {
        pairs.iter().map(|&(k, v)| (k, v)).collect()
    }

    #[test]
    fn max_asymmetry_ignores_texture_keys() {
        let f = features(&[
            ("asym_Upper_opacity", 0.1),
            ("asym_Lower_opacity", 0.3),
            ("asym_Middle_texture", 0.9),
        ]);
        assert_eq!(max_opacity_asymmetry(&f), (0.3, Some("asym_Lower_opacity")));
        assert_eq!(max_opacity_asymmetry(&FeatureVector::new()), (0.0, None));
    }

    #[test]
    fn empty_scores_fall_back_to_unknown_then_handcrafted() {
        let result = fuse(
            &LabelScores::new(),
            &features(&[("lung_area_ratio", 0.3)]),
            None,
        );
        assert_eq!(result.raw_dl_score, 0.0);
        // asymmetry 0 → Normal at 0.75 + min(0.075, 0.2)
        assert_eq!(result.diagnosis, "Normal");
        assert!((result.confidence - 0.825).abs() < 1e-12);
        assert!(result.flags[0].starts_with("DL Model Warning"));
    }

    #[test]
    fn normal_fallback_reference_is_independent_of_pneumonia_trigger() {
        let f = features(&[("lung_area_ratio", 0.3)]);
        let mut params = FusionParams::default();
        params.fallback.pneumonia_asymmetry = 0.5;
        let moved_trigger = FusionEngine::new(params.clone()).fuse(&LabelScores::new(), &f, None);
        assert_eq!(moved_trigger.diagnosis, "Normal");
        assert!((moved_trigger.confidence - 0.825).abs() < 1e-12);

        params.fallback.normal_reference_asymmetry = 0.35;
        let moved_reference = FusionEngine::new(params).fuse(&LabelScores::new(), &f, None);
        // 0.75 + min(0.5 · 0.35, 0.2)
        assert!((moved_reference.confidence - 0.925).abs() < 1e-12);
    }

    #[test]
    fn fallback_prefers_pneumonia_on_many_opacities() {
        let result = fuse(
            &scores(&[("Pneumonia", 0.05)]),
            &features(&[("lung_area_ratio", 0.3), ("opacity_count", 30.0)]),
            None,
        );
        assert_eq!(result.diagnosis, "Pneumonia");
        assert!((result.confidence - 0.60).abs() < 1e-12);
    }

    #[test]
    fn fallback_infiltration_band() {
        let result = fuse(
            &scores(&[("Mass", 0.02)]),
            &features(&[("lung_area_ratio", 0.3), ("asym_Middle_opacity", 0.1)]),
            None,
        );
        assert_eq!(result.diagnosis, "Infiltration");
        assert!((result.confidence - 0.58).abs() < 1e-12);
    }

    #[test]
    fn trusted_classifier_gets_mild_cap_without_flag() {
        let result = fuse(
            &scores(&[("Effusion", 0.95)]),
            &features(&[("lung_area_ratio", 0.8), ("asym_Lower_opacity", 0.15)]),
            None,
        );
        assert_eq!(result.confidence, 0.85);
        assert!(result.flags.is_empty());
        assert!(result.adjustments[0].contains("abnormal lung area ratio (0.80)"));
        assert!(result.summary.starts_with("Moderate Confidence Effusion (85.0%)"));
    }

    #[test]
    fn high_confidence_summary_without_flags() {
        let result = fuse(
            &scores(&[("Pneumonia", 0.8)]),
            &features(&[("lung_area_ratio", 0.3), ("asym_Upper_opacity", 0.3)]),
            None,
        );
        assert!(result.flags.is_empty());
        assert!(result.summary.starts_with("High Confidence Pneumonia (90.0%)"));
    }
}
