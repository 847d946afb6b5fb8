//! Handcrafted radiology features computed from pixel data.
//!
//! Stages, in emission order:
//! - global anatomy: lung area ratio and mean lung intensity,
//! - zonal intensity and LBP texture for the six lung zones,
//! - bilateral asymmetry per level,
//! - morphology of bright opacities,
//! - Gabor frequency response.
//!
//! Each stage runs independently. A stage that fails is logged and its keys
//! are filled with `0.0`; only an undecodable image aborts extraction.
pub mod gabor;
pub mod keys;
pub mod opacity;
pub mod texture;

use crate::diagnostics::{SegmentationDiagnostics, Stopwatch, TimingBreakdown};
use crate::image::{decode_grayscale, BinaryMask, DecodeError, GrayImageU8};
use crate::segmentation::{LungSegmenter, SegmenterOptions, ZoneLayout, ZoneMasks};
use crate::types::{FeatureVector, Level, Side, Zone};
use keys::{AsymmetryKind, ZoneStat};
use serde::{Deserialize, Serialize};
use std::fmt;

pub use gabor::GaborOptions;
pub use opacity::OpacityStats;

/// Added to denominators of normalised intensities and asymmetries.
const EPS: f64 = 1e-6;

/// Failure of a single feature stage.
#[derive(Clone, Debug, PartialEq)]
pub enum StageError {
    /// Image and mask sizes disagree.
    DimensionMismatch {
        stage: &'static str,
        image: (usize, usize),
        mask: (usize, usize),
    },
    /// A configured parameter makes the stage impossible to run.
    InvalidParameter { stage: &'static str, detail: String },
}

impl StageError {
    pub fn stage(&self) -> &'static str {
        match self {
            StageError::DimensionMismatch { stage, .. } => stage,
            StageError::InvalidParameter { stage, .. } => stage,
        }
    }
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StageError::DimensionMismatch { stage, image, mask } => write!(
                f,
                "{stage}: image is {}x{} but mask is {}x{}",
                image.0, image.1, mask.0, mask.1
            ),
            StageError::InvalidParameter { stage, detail } => {
                write!(f, "{stage}: invalid parameter ({detail})")
            }
        }
    }
}

impl std::error::Error for StageError {}

/// Options for [`RadiologyFeatureExtractor`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExtractorOptions {
    pub segmenter: SegmenterOptions,
    pub gabor: GaborOptions,
}

/// Serializable side information from one extraction.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExtractionDiagnostics {
    pub segmentation: SegmentationDiagnostics,
    pub zone_layout: Option<ZoneLayout>,
    pub opacity: OpacityStats,
    /// Mean response per Gabor orientation (empty without lung pixels).
    pub gabor_responses: Vec<f64>,
    /// Stage failures that were replaced by zero defaults.
    pub stage_errors: Vec<String>,
    pub timings: TimingBreakdown,
}

/// Features plus the intermediate images they were computed from.
#[derive(Clone, Debug)]
pub struct DetailedExtraction {
    pub features: FeatureVector,
    pub preprocessed: GrayImageU8,
    pub lung_mask: BinaryMask,
    pub zones: ZoneMasks,
    pub diagnostics: ExtractionDiagnostics,
}

/// Computes the fixed feature set (see [`keys::all`]) from an encoded radiograph.
#[derive(Clone, Debug, Default)]
pub struct RadiologyFeatureExtractor {
    segmenter: LungSegmenter,
    gabor: GaborOptions,
}

impl RadiologyFeatureExtractor {
    pub fn new(options: ExtractorOptions) -> Self {
        Self {
            segmenter: LungSegmenter::new(options.segmenter),
            gabor: options.gabor,
        }
    }

    pub fn segmenter(&self) -> &LungSegmenter {
        &self.segmenter
    }

    /// Feature vector for `bytes`; empty when the image cannot be decoded.
    pub fn extract(&self, bytes: &[u8]) -> FeatureVector {
        match self.try_extract(bytes) {
            Ok(features) => features,
            Err(err) => {
                log::warn!("feature extraction skipped: {err}");
                FeatureVector::new()
            }
        }
    }

    pub fn try_extract(&self, bytes: &[u8]) -> Result<FeatureVector, DecodeError> {
        self.extract_detailed(bytes).map(|d| d.features)
    }

    pub fn extract_detailed(&self, bytes: &[u8]) -> Result<DetailedExtraction, DecodeError> {
        let mut sw = Stopwatch::start();
        let raw = decode_grayscale(bytes)?;
        sw.lap("decode");
        log::debug!("decoded {}x{} radiograph", raw.width(), raw.height());
        Ok(self.extract_image(&raw, sw))
    }

    /// Run every stage on an already decoded grayscale image.
    pub fn extract_from_image(&self, raw: &GrayImageU8) -> DetailedExtraction {
        self.extract_image(raw, Stopwatch::start())
    }

    fn extract_image(&self, raw: &GrayImageU8, mut sw: Stopwatch) -> DetailedExtraction {
        let img = self.segmenter.preprocess(raw);
        sw.lap("preprocess");
        let (lung_mask, seg_diag) = self.segmenter.segment_lungs_detailed(&img);
        let zones = self.segmenter.get_zonal_masks(&lung_mask);
        sw.lap("segmentation");

        let mut features = FeatureVector::new();
        let mut diag = ExtractionDiagnostics {
            zone_layout: Some(zones.layout()),
            segmentation: seg_diag,
            ..Default::default()
        };

        // 1. global anatomy
        let global_mean = mean_under_mask(&img, &lung_mask).unwrap_or(1.0);
        features.insert(keys::LUNG_AREA_RATIO, diag.segmentation.lung_area_ratio);
        features.insert(keys::GLOBAL_LUNG_MEAN, global_mean);
        log::info!(
            "lung area ratio {:.4}, global lung mean {:.2}",
            diag.segmentation.lung_area_ratio,
            global_mean
        );

        // 2. zonal intensity and texture
        let zone_keys: Vec<String> = Zone::ALL
            .iter()
            .flat_map(|&z| ZoneStat::ALL.map(|s| keys::zone_key(z, s)))
            .collect();
        let zonal = zonal_features(&img, &zones, global_mean);
        absorb(&mut features, &mut diag, &zone_keys, zonal);
        sw.lap("zonal");

        // 3. asymmetry, read back from the zonal values
        features.extend(asymmetry_features(&features));
        sw.lap("asymmetry");

        // 4. opacity morphology
        let opacity_keys = [
            keys::MAX_OPACITY_AREA,
            keys::MAX_OPACITY_COMPACTNESS,
            keys::OPACITY_COUNT,
        ]
        .map(String::from);
        let opacity = check_dims("opacity", &img, &lung_mask).map(|_| {
            let stats = opacity::analyze_opacities(&img, &lung_mask);
            diag.opacity = stats;
            opacity_features(&stats)
        });
        absorb(&mut features, &mut diag, &opacity_keys, opacity);
        sw.lap("opacity");

        // 5. frequency response
        let gabor = gabor::gabor_responses(&img, &lung_mask, &self.gabor).map(|means| {
            diag.gabor_responses = means.clone();
            let energy = if means.is_empty() {
                0.0
            } else {
                means.iter().sum::<f64>() / means.len() as f64
            };
            [(keys::GABOR_MEAN_ENERGY, energy)]
                .into_iter()
                .collect::<FeatureVector>()
        });
        absorb(
            &mut features,
            &mut diag,
            &[keys::GABOR_MEAN_ENERGY.to_string()],
            gabor,
        );
        sw.lap("gabor");

        diag.timings = sw.finish();
        log_summary(&features);
        DetailedExtraction {
            features,
            preprocessed: img,
            lung_mask,
            zones,
            diagnostics: diag,
        }
    }
}

/// Merge a stage result, or zero its keys and record the error.
fn absorb(
    features: &mut FeatureVector,
    diag: &mut ExtractionDiagnostics,
    stage_keys: &[String],
    result: Result<FeatureVector, StageError>,
) {
    match result {
        Ok(values) => features.extend(values),
        Err(err) => {
            log::warn!("feature stage '{}' failed, using defaults: {err}", err.stage());
            diag.stage_errors.push(err.to_string());
            for key in stage_keys {
                features.insert(key.as_str(), 0.0);
            }
        }
    }
}

fn check_dims(stage: &'static str, img: &GrayImageU8, mask: &BinaryMask) -> Result<(), StageError> {
    if (img.width(), img.height()) == (mask.width(), mask.height()) {
        Ok(())
    } else {
        Err(StageError::DimensionMismatch {
            stage,
            image: (img.width(), img.height()),
            mask: (mask.width(), mask.height()),
        })
    }
}

fn mean_under_mask(img: &GrayImageU8, mask: &BinaryMask) -> Option<f64> {
    let (n, sum) = mask
        .on_indices()
        .fold((0usize, 0.0f64), |(n, s), idx| (n + 1, s + img.data()[idx] as f64));
    (n > 0).then(|| sum / n as f64)
}

fn zonal_features(
    img: &GrayImageU8,
    zones: &ZoneMasks,
    global_mean: f64,
) -> Result<FeatureVector, StageError> {
    for (_, mask) in zones.iter() {
        check_dims("zonal", img, mask)?;
    }
    let codes = texture::uniform_lbp(img);
    let mut out = FeatureVector::new();
    for (zone, mask) in zones.iter() {
        let values: Vec<f64> = mask.on_indices().map(|i| img.data()[i] as f64).collect();
        let (mean, std, norm_mean, entropy) = if values.is_empty() {
            log::debug!("zone {zone}: no pixels");
            (0.0, 0.0, 0.0, 0.0)
        } else {
            let n = values.len() as f64;
            let mean = values.iter().sum::<f64>() / n;
            let var = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let entropy = texture::masked_entropy(&codes, mask);
            (mean, var.sqrt(), mean / (global_mean + EPS), entropy)
        };
        log::debug!(
            "zone {zone}: mean {mean:.2}, std {std:.2}, norm {norm_mean:.3}, entropy {entropy:.3}"
        );
        out.insert(keys::zone_key(zone, ZoneStat::Mean), mean);
        out.insert(keys::zone_key(zone, ZoneStat::NormMean), norm_mean);
        out.insert(keys::zone_key(zone, ZoneStat::Std), std);
        out.insert(keys::zone_key(zone, ZoneStat::Entropy), entropy);
    }
    Ok(out)
}

/// `|a − b| / (a + b + ε)`.
pub fn asymmetry(a: f64, b: f64) -> f64 {
    (a - b).abs() / (a + b + EPS)
}

fn asymmetry_features(zonal: &FeatureVector) -> FeatureVector {
    let mut out = FeatureVector::new();
    for level in Level::ALL {
        let left = Zone::new(Side::Left, level);
        let right = Zone::new(Side::Right, level);
        for (kind, stat) in [
            (AsymmetryKind::Opacity, ZoneStat::Mean),
            (AsymmetryKind::Texture, ZoneStat::Entropy),
        ] {
            let l = zonal.get_or_zero(&keys::zone_key(left, stat));
            let r = zonal.get_or_zero(&keys::zone_key(right, stat));
            let value = asymmetry(l, r);
            log::debug!("{} = {value:.4} (L={l:.3}, R={r:.3})", keys::asymmetry_key(level, kind));
            out.insert(keys::asymmetry_key(level, kind), value);
        }
    }
    out
}

fn opacity_features(stats: &OpacityStats) -> FeatureVector {
    [
        (keys::MAX_OPACITY_AREA, stats.max_area),
        (keys::MAX_OPACITY_COMPACTNESS, stats.max_compactness),
        (keys::OPACITY_COUNT, stats.count as f64),
    ]
    .into_iter()
    .collect()
}

fn log_summary(features: &FeatureVector) {
    let (level, asym) = Level::ALL
        .iter()
        .map(|&l| {
            let key = keys::asymmetry_key(l, AsymmetryKind::Opacity);
            (l.name(), features.get_or_zero(&key))
        })
        .fold(("none", 0.0), |best, cur| if cur.1 > best.1 { cur } else { best });
    log::info!(
        "extracted {} features; max opacity asymmetry {asym:.4} ({level}), opacity count {}",
        features.len(),
        features.get_or_zero(keys::OPACITY_COUNT)
    );
}
