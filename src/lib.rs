#![doc = include_str!("../README.md")]

// Core stages
pub mod features;
pub mod fusion;
pub mod segmentation;

// Orchestration and supporting modules
pub mod config;
pub mod diagnostics;
pub mod image;
pub mod pipeline;
pub mod types;

// --- High-level re-exports -------------------------------------------------

pub use crate::features::{RadiologyFeatureExtractor, StageError};
pub use crate::fusion::{fuse, FusionEngine, FusionParams};
pub use crate::pipeline::{AnalysisReport, Analyzer};
pub use crate::segmentation::{LungSegmenter, SegmenterOptions};
pub use crate::types::{FeatureVector, FusionResult, LabelScores, SimilarCase};

// --- Prelude ---------------------------------------------------------------

/// Small prelude for quick experiments.
///
/// ```no_run
/// use cxr_coach::prelude::*;
///
/// # fn main() {
/// let bytes = std::fs::read("chest.png").unwrap();
/// let features = RadiologyFeatureExtractor::default().extract(&bytes);
///
/// let mut scores = LabelScores::new();
/// scores.insert("Pneumonia", 0.82);
///
/// let result = FusionEngine::default().fuse(&scores, &features, None);
/// println!("{} {:.3}: {}", result.diagnosis, result.confidence, result.summary);
/// # }
/// ```
pub mod prelude {
    pub use crate::image::{BinaryMask, GrayImageU8, ImageU8};
    pub use crate::{
        Analyzer, FeatureVector, FusionEngine, FusionResult, LabelScores, LungSegmenter,
        RadiologyFeatureExtractor,
    };
}
