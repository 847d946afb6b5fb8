//! End-to-end analysis: features → classifier → similar cases → fusion.
//!
//! The classifier and the case store are ports ([`Classifier`], [`CaseStore`]).
//! A classifier failure never aborts the analysis; its scores are replaced by
//! zeros, which sends fusion down the handcrafted fallback.
pub mod case_store;
pub mod classifier;

pub use case_store::{cosine_similarity, CaseRecord, CaseStore, InMemoryCaseStore};
pub use classifier::{
    classifier_input, Classification, Classifier, ClassifierError, FallbackClassifier,
    PrecomputedClassification, PrecomputedClassifier, DEFAULT_LABELS,
};

use crate::diagnostics::{Stopwatch, TimingBreakdown};
use crate::features::{ExtractionDiagnostics, RadiologyFeatureExtractor};
use crate::fusion::FusionEngine;
use crate::image::DecodeError;
use crate::types::{FeatureVector, FusionResult, LabelScores, SimilarCase};
use serde::Serialize;

/// Number of similar cases requested by default.
pub const DEFAULT_TOP_K: usize = 5;

/// Everything produced for one radiograph.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalysisReport {
    pub result: FusionResult,
    pub scores: LabelScores,
    pub features: FeatureVector,
    pub similar_cases: Vec<SimilarCase>,
    /// True when the classifier failed and zero scores were substituted.
    pub classifier_degraded: bool,
    pub extraction: ExtractionDiagnostics,
    pub timings: TimingBreakdown,
}

/// Sequences the stages; holds no per-request state.
pub struct Analyzer {
    extractor: RadiologyFeatureExtractor,
    classifier: Box<dyn Classifier>,
    store: Option<Box<dyn CaseStore>>,
    fusion: FusionEngine,
    top_k: usize,
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new(
            RadiologyFeatureExtractor::default(),
            Box::new(FallbackClassifier::default()),
        )
    }
}

impl Analyzer {
    pub fn new(extractor: RadiologyFeatureExtractor, classifier: Box<dyn Classifier>) -> Self {
        Self {
            extractor,
            classifier,
            store: None,
            fusion: FusionEngine::default(),
            top_k: DEFAULT_TOP_K,
        }
    }

    pub fn with_store(mut self, store: Box<dyn CaseStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn with_fusion(mut self, fusion: FusionEngine) -> Self {
        self.fusion = fusion;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    pub fn analyze(&self, bytes: &[u8]) -> Result<AnalysisReport, DecodeError> {
        let mut sw = Stopwatch::start();
        let detailed = self.extractor.extract_detailed(bytes)?;
        sw.lap("features");

        let input = classifier_input(bytes)?;
        let (classification, classifier_degraded) = match self.classifier.classify(&input) {
            Ok(c) => (c, false),
            Err(err) => {
                log::warn!("{err}; continuing with zero scores");
                let labels = self.classifier.labels();
                (
                    Classification::degraded(labels.as_slice(), self.classifier.embedding_dim()),
                    true,
                )
            }
        };
        sw.lap("classify");

        let similar_cases = match &self.store {
            Some(store) => store.search(&classification.embedding, self.top_k),
            None => Vec::new(),
        };
        sw.lap("search");

        let cases = self.store.as_ref().map(|_| similar_cases.as_slice());
        let result = self
            .fusion
            .fuse(&classification.scores, &detailed.features, cases);
        sw.lap("fusion");

        let mut timings = sw.finish();
        timings.extend_prefixed("features", &detailed.diagnostics.timings);
        Ok(AnalysisReport {
            result,
            scores: classification.scores,
            features: detailed.features,
            similar_cases,
            classifier_degraded,
            extraction: detailed.diagnostics,
            timings,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::RgbImage;

    struct Broken;

    impl Classifier for Broken {
        fn labels(&self) -> Vec<String> {
            vec!["Pneumonia".to_string(), "Normal".to_string()]
        }

        fn embedding_dim(&self) -> usize {
            8
        }

        fn classify(&self, _input: &RgbImage) -> Result<Classification, ClassifierError> {
            Err(ClassifierError::Unavailable {
                reason: "model not loaded".to_string(),
            })
        }
    }

    #[test]
    fn undecodable_input_is_an_error() {
        let analyzer = Analyzer::default();
        assert_eq!(analyzer.analyze(&[]).err(), Some(DecodeError::Empty));
    }

    #[test]
    fn classifier_failure_degrades_to_zero_scores() {
        let img = image::GrayImage::from_fn(64, 64, |x, _| image::Luma([(x * 4) as u8]));
        let mut bytes = Vec::new();
        img.write_to(&mut std::io::Cursor::new(&mut bytes), image::ImageFormat::Png)
            .expect("encode png");
        let analyzer = Analyzer::new(RadiologyFeatureExtractor::default(), Box::new(Broken));
        let report = analyzer.analyze(&bytes).expect("decodable");
        assert!(report.classifier_degraded);
        assert_eq!(report.scores.len(), 2);
        assert_eq!(report.result.raw_dl_score, 0.0);
        assert!(report
            .result
            .flags
            .iter()
            .any(|f| f.starts_with("DL Model Warning")));
        assert!(report.similar_cases.is_empty());
    }
}
