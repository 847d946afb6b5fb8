//! Calibration constants for the fusion rules.
//!
//! The values were chosen empirically and still need external clinical
//! validation. Every constant is also exposed through [`FusionParams`] so a
//! deployment can override it from JSON; the defaults equal the constants.
use serde::{Deserialize, Serialize};

/// Below this lung area ratio segmentation is treated as failed.
pub const SEGMENTATION_FAILURE_RATIO: f64 = 0.01;
pub const MIN_PLAUSIBLE_LUNG_RATIO: f64 = 0.10;
pub const MAX_PLAUSIBLE_LUNG_RATIO: f64 = 0.75;
/// DL score above which implausible anatomy only gets the mild cap.
pub const ANATOMY_TRUSTED_DL_SCORE: f64 = 0.9;
pub const ANATOMY_TRUSTED_CAP: f64 = 0.85;
pub const ANATOMY_RISK_CAP: f64 = 0.65;

/// DL scores below this switch to the handcrafted fallback.
pub const LOW_DL_SCORE: f64 = 0.10;
pub const FALLBACK_PNEUMONIA_ASYMMETRY: f64 = 0.15;
pub const FALLBACK_PNEUMONIA_OPACITIES: f64 = 25.0;
pub const FALLBACK_PNEUMONIA_BASE: f64 = 0.60;
pub const FALLBACK_PNEUMONIA_MAX_BONUS: f64 = 0.30;
pub const FALLBACK_INFILTRATION_ASYMMETRY: f64 = 0.08;
pub const FALLBACK_INFILTRATION_OPACITIES: f64 = 15.0;
pub const FALLBACK_INFILTRATION_BASE: f64 = 0.50;
pub const FALLBACK_INFILTRATION_WEIGHT: f64 = 0.8;
pub const FALLBACK_INFILTRATION_MAX_BONUS: f64 = 0.25;
pub const FALLBACK_NORMAL_BASE: f64 = 0.75;
pub const FALLBACK_NORMAL_WEIGHT: f64 = 0.5;
pub const FALLBACK_NORMAL_MAX_BONUS: f64 = 0.20;
/// Asymmetry at which the Normal fallback bonus reaches zero.
pub const FALLBACK_NORMAL_REFERENCE_ASYMMETRY: f64 = 0.15;

/// DL score a non-Normal call needs before scenarios A and C apply.
pub const SCENARIO_DL_SCORE: f64 = 0.6;
pub const SYMMETRIC_ASYMMETRY: f64 = 0.1;
pub const SYMMETRIC_PENALTY: f64 = 0.2;
pub const NORMAL_ALERT_ASYMMETRY: f64 = 0.25;
pub const NORMAL_ALERT_PENALTY: f64 = 0.4;
pub const CONFIRMING_ASYMMETRY: f64 = 0.2;
pub const CONFIRMING_BOOST: f64 = 0.1;

pub const CONSENSUS_BOOST: f64 = 0.05;
pub const CONSENSUS_MISMATCH_SHARE: f64 = 0.6;
pub const CONSENSUS_MISMATCH_FACTOR: f64 = 0.9;

/// Confidence above which an unflagged result is reported as high confidence.
pub const HIGH_CONFIDENCE: f64 = 0.85;

/// Plausibility gate on the lung area ratio.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnatomyGateParams {
    pub segmentation_failure_ratio: f64,
    pub min_lung_ratio: f64,
    pub max_lung_ratio: f64,
    pub trusted_dl_score: f64,
    pub trusted_cap: f64,
    pub risk_cap: f64,
}

impl Default for AnatomyGateParams {
    fn default() -> Self {
        Self {
            segmentation_failure_ratio: SEGMENTATION_FAILURE_RATIO,
            min_lung_ratio: MIN_PLAUSIBLE_LUNG_RATIO,
            max_lung_ratio: MAX_PLAUSIBLE_LUNG_RATIO,
            trusted_dl_score: ANATOMY_TRUSTED_DL_SCORE,
            trusted_cap: ANATOMY_TRUSTED_CAP,
            risk_cap: ANATOMY_RISK_CAP,
        }
    }
}

/// Handcrafted diagnosis used when the classifier is effectively silent.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FallbackParams {
    pub low_dl_score: f64,
    pub pneumonia_asymmetry: f64,
    pub pneumonia_opacities: f64,
    pub pneumonia_base: f64,
    pub pneumonia_max_bonus: f64,
    pub infiltration_asymmetry: f64,
    pub infiltration_opacities: f64,
    pub infiltration_base: f64,
    pub infiltration_weight: f64,
    pub infiltration_max_bonus: f64,
    pub normal_base: f64,
    pub normal_weight: f64,
    pub normal_max_bonus: f64,
    pub normal_reference_asymmetry: f64,
}

impl Default for FallbackParams {
    fn default() -> Self {
        Self {
            low_dl_score: LOW_DL_SCORE,
            pneumonia_asymmetry: FALLBACK_PNEUMONIA_ASYMMETRY,
            pneumonia_opacities: FALLBACK_PNEUMONIA_OPACITIES,
            pneumonia_base: FALLBACK_PNEUMONIA_BASE,
            pneumonia_max_bonus: FALLBACK_PNEUMONIA_MAX_BONUS,
            infiltration_asymmetry: FALLBACK_INFILTRATION_ASYMMETRY,
            infiltration_opacities: FALLBACK_INFILTRATION_OPACITIES,
            infiltration_base: FALLBACK_INFILTRATION_BASE,
            infiltration_weight: FALLBACK_INFILTRATION_WEIGHT,
            infiltration_max_bonus: FALLBACK_INFILTRATION_MAX_BONUS,
            normal_base: FALLBACK_NORMAL_BASE,
            normal_weight: FALLBACK_NORMAL_WEIGHT,
            normal_max_bonus: FALLBACK_NORMAL_MAX_BONUS,
            normal_reference_asymmetry: FALLBACK_NORMAL_REFERENCE_ASYMMETRY,
        }
    }
}

/// Agreement/disagreement rules between the classifier and asymmetry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    pub min_dl_score: f64,
    pub symmetric_asymmetry: f64,
    pub symmetric_penalty: f64,
    pub normal_alert_asymmetry: f64,
    pub normal_alert_penalty: f64,
    pub confirming_asymmetry: f64,
    pub confirming_boost: f64,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            min_dl_score: SCENARIO_DL_SCORE,
            symmetric_asymmetry: SYMMETRIC_ASYMMETRY,
            symmetric_penalty: SYMMETRIC_PENALTY,
            normal_alert_asymmetry: NORMAL_ALERT_ASYMMETRY,
            normal_alert_penalty: NORMAL_ALERT_PENALTY,
            confirming_asymmetry: CONFIRMING_ASYMMETRY,
            confirming_boost: CONFIRMING_BOOST,
        }
    }
}

/// Similar-case vote.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConsensusParams {
    pub boost: f64,
    pub mismatch_share: f64,
    pub mismatch_factor: f64,
}

impl Default for ConsensusParams {
    fn default() -> Self {
        Self {
            boost: CONSENSUS_BOOST,
            mismatch_share: CONSENSUS_MISMATCH_SHARE,
            mismatch_factor: CONSENSUS_MISMATCH_FACTOR,
        }
    }
}

/// All fusion thresholds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionParams {
    pub anatomy: AnatomyGateParams,
    pub fallback: FallbackParams,
    pub scenarios: ScenarioParams,
    pub consensus: ConsensusParams,
    pub high_confidence: f64,
}

impl Default for FusionParams {
    fn default() -> Self {
        Self {
            anatomy: AnatomyGateParams::default(),
            fallback: FallbackParams::default(),
            scenarios: ScenarioParams::default(),
            consensus: ConsensusParams::default(),
            high_confidence: HIGH_CONFIDENCE,
        }
    }
}
