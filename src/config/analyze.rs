use crate::features::{ExtractorOptions, RadiologyFeatureExtractor};
use crate::fusion::{FusionEngine, FusionParams};
use crate::image::io::read_json_file;
use crate::pipeline::{
    Analyzer, Classifier, FallbackClassifier, InMemoryCaseStore, PrecomputedClassification,
    PrecomputedClassifier, DEFAULT_TOP_K,
};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default)]
pub struct AnalyzeOutputConfig {
    /// Full `AnalysisReport` as JSON.
    pub report_json: Option<PathBuf>,
    /// Preprocessed image, lung mask and zone map as PNGs.
    pub debug_dir: Option<PathBuf>,
}

/// Runtime configuration of `analyze_xray`.
#[derive(Clone, Debug, Deserialize)]
pub struct AnalyzeConfig {
    pub input: PathBuf,
    /// Precomputed classifier output (`{"scores": {...}, "embedding": [...]}`).
    /// Without it the fallback classifier is used.
    #[serde(default)]
    pub classification: Option<PathBuf>,
    /// JSON array of stored cases for the similarity search.
    #[serde(default)]
    pub case_store: Option<PathBuf>,
    #[serde(default = "default_top_k")]
    pub top_k: usize,
    #[serde(default)]
    pub extractor: ExtractorOptions,
    #[serde(default)]
    pub fusion: FusionParams,
    #[serde(default)]
    pub output: AnalyzeOutputConfig,
}

fn default_top_k() -> usize {
    DEFAULT_TOP_K
}

pub fn load_config(path: &Path) -> Result<AnalyzeConfig, String> {
    let contents = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read config {}: {e}", path.display()))?;
    let config: AnalyzeConfig = serde_json::from_str(&contents)
        .map_err(|e| format!("Failed to parse config {}: {e}", path.display()))?;
    Ok(config)
}

impl AnalyzeConfig {
    /// Wire the analyzer described by this config, loading referenced files.
    pub fn build_analyzer(&self) -> Result<Analyzer, String> {
        let classifier: Box<dyn Classifier> = match &self.classification {
            Some(path) => {
                let parsed: PrecomputedClassification = read_json_file(path)?;
                Box::new(PrecomputedClassifier::from(parsed))
            }
            None => Box::new(FallbackClassifier::default()),
        };
        let extractor = RadiologyFeatureExtractor::new(self.extractor.clone());
        let mut analyzer = Analyzer::new(extractor, classifier)
            .with_fusion(FusionEngine::new(self.fusion.clone()))
            .with_top_k(self.top_k);
        if let Some(path) = &self.case_store {
            analyzer = analyzer.with_store(Box::new(InMemoryCaseStore::load_json(path)?));
        }
        Ok(analyzer)
    }
}
