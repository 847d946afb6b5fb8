//! Classifier port.
//!
//! The deep-learning model lives outside this crate. Implementations receive
//! the fixed-size RGB input and return per-label probabilities plus an
//! embedding for the similar-case search.
use crate::image::DecodeError;
use crate::types::LabelScores;
use image::imageops::FilterType;
use image::RgbImage;
use nalgebra::DVector;
use serde::Deserialize;
use std::fmt;

/// The 14 CheXNet findings.
pub const DEFAULT_LABELS: [&str; 14] = [
    "Atelectasis",
    "Cardiomegaly",
    "Consolidation",
    "Edema",
    "Effusion",
    "Emphysema",
    "Fibrosis",
    "Hernia",
    "Infiltration",
    "Mass",
    "Nodule",
    "Pleural_Thickening",
    "Pneumonia",
    "Pneumothorax",
];

/// Side length of the square classifier input.
pub const CLASSIFIER_INPUT_SIZE: u32 = 224;
/// Length of the embedding produced by the reference backbone.
pub const EMBEDDING_DIM: usize = 1024;

/// Scores and embedding for one image.
#[derive(Clone, Debug, PartialEq)]
pub struct Classification {
    pub scores: LabelScores,
    pub embedding: DVector<f32>,
}

impl Classification {
    /// Zero scores over `labels` and a zero embedding of length `dim`.
    pub fn degraded<S: AsRef<str>>(labels: &[S], dim: usize) -> Self {
        Self {
            scores: LabelScores::zeros(labels),
            embedding: DVector::zeros(dim),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ClassifierError {
    /// No model is loaded or reachable.
    Unavailable { reason: String },
    /// The input does not match what the model expects.
    InvalidInput { reason: String },
    /// The model ran but failed.
    Inference { reason: String },
}

impl fmt::Display for ClassifierError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClassifierError::Unavailable { reason } => write!(f, "classifier unavailable: {reason}"),
            ClassifierError::InvalidInput { reason } => write!(f, "invalid classifier input: {reason}"),
            ClassifierError::Inference { reason } => write!(f, "classifier inference failed: {reason}"),
        }
    }
}

impl std::error::Error for ClassifierError {}

pub trait Classifier: Send + Sync {
    /// Labels the classifier scores, used to build degraded output.
    fn labels(&self) -> Vec<String>;

    fn embedding_dim(&self) -> usize {
        EMBEDDING_DIM
    }

    fn classify(&self, input: &RgbImage) -> Result<Classification, ClassifierError>;
}

/// Stand-in used when no model is deployed: every label scores zero, which
/// routes fusion through the handcrafted fallback.
#[derive(Clone, Debug)]
pub struct FallbackClassifier {
    labels: Vec<String>,
    embedding_dim: usize,
}

impl Default for FallbackClassifier {
    fn default() -> Self {
        Self {
            labels: DEFAULT_LABELS.iter().map(|s| s.to_string()).collect(),
            embedding_dim: EMBEDDING_DIM,
        }
    }
}

impl FallbackClassifier {
    pub fn new(labels: Vec<String>, embedding_dim: usize) -> Self {
        Self {
            labels,
            embedding_dim,
        }
    }
}

impl Classifier for FallbackClassifier {
    fn labels(&self) -> Vec<String> {
        self.labels.clone()
    }

    fn embedding_dim(&self) -> usize {
        self.embedding_dim
    }

    fn classify(&self, _input: &RgbImage) -> Result<Classification, ClassifierError> {
        Ok(Classification::degraded(self.labels.as_slice(), self.embedding_dim))
    }
}

/// Scores produced elsewhere (e.g. by a separate inference service), as JSON.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct PrecomputedClassification {
    pub scores: LabelScores,
    #[serde(default)]
    pub embedding: Vec<f32>,
}

/// Returns the same precomputed classification for every input.
#[derive(Clone, Debug)]
pub struct PrecomputedClassifier {
    classification: Classification,
}

impl PrecomputedClassifier {
    pub fn new(scores: LabelScores, embedding: Vec<f32>) -> Self {
        Self {
            classification: Classification {
                scores,
                embedding: DVector::from_vec(embedding),
            },
        }
    }
}

impl From<PrecomputedClassification> for PrecomputedClassifier {
    fn from(p: PrecomputedClassification) -> Self {
        Self::new(p.scores, p.embedding)
    }
}

impl Classifier for PrecomputedClassifier {
    fn labels(&self) -> Vec<String> {
        self.classification
            .scores
            .iter()
            .map(|(l, _)| l.to_string())
            .collect()
    }

    fn embedding_dim(&self) -> usize {
        self.classification.embedding.len()
    }

    fn classify(&self, input: &RgbImage) -> Result<Classification, ClassifierError> {
        if input.width() == 0 || input.height() == 0 {
            return Err(ClassifierError::InvalidInput {
                reason: "empty image".to_string(),
            });
        }
        Ok(self.classification.clone())
    }
}

/// Decode `bytes` into the classifier's RGB input (Lanczos3 resize).
pub fn classifier_input(bytes: &[u8]) -> Result<RgbImage, DecodeError> {
    if bytes.is_empty() {
        return Err(DecodeError::Empty);
    }
    let img = image::load_from_memory(bytes).map_err(|e| DecodeError::Unreadable {
        reason: e.to_string(),
    })?;
    if img.width() == 0 || img.height() == 0 {
        return Err(DecodeError::ZeroSized);
    }
    Ok(image::imageops::resize(
        &img.to_rgb8(),
        CLASSIFIER_INPUT_SIZE,
        CLASSIFIER_INPUT_SIZE,
        FilterType::Lanczos3,
    ))
}
