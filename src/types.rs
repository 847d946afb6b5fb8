use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Anatomical side. Image-left is the patient's right lung.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    pub const ALL: [Side; 2] = [Side::Left, Side::Right];

    pub fn prefix(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }
}

/// Vertical third of the lung bounding box.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Level {
    Upper,
    Middle,
    Lower,
}

impl Level {
    pub const ALL: [Level; 3] = [Level::Upper, Level::Middle, Level::Lower];

    pub fn name(self) -> &'static str {
        match self {
            Level::Upper => "Upper",
            Level::Middle => "Middle",
            Level::Lower => "Lower",
        }
    }

    pub fn index(self) -> usize {
        match self {
            Level::Upper => 0,
            Level::Middle => 1,
            Level::Lower => 2,
        }
    }
}

/// One of the six lung zones (side × level).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Zone {
    pub side: Side,
    pub level: Level,
}

impl Zone {
    pub const fn new(side: Side, level: Level) -> Self {
        Self { side, level }
    }

    /// Zones in canonical order: `L_Upper, L_Middle, L_Lower, R_Upper, R_Middle, R_Lower`.
    pub const ALL: [Zone; 6] = [
        Zone::new(Side::Left, Level::Upper),
        Zone::new(Side::Left, Level::Middle),
        Zone::new(Side::Left, Level::Lower),
        Zone::new(Side::Right, Level::Upper),
        Zone::new(Side::Right, Level::Middle),
        Zone::new(Side::Right, Level::Lower),
    ];

    /// Position of the zone in [`Zone::ALL`].
    pub fn index(self) -> usize {
        let side = match self.side {
            Side::Left => 0,
            Side::Right => 3,
        };
        side + self.level.index()
    }

    /// Canonical name such as `L_Upper`.
    pub fn name(self) -> String {
        format!("{}_{}", self.side.prefix(), self.level.name())
    }
}

impl fmt::Display for Zone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}_{}", self.side.prefix(), self.level.name())
    }
}

/// Named scalar features. Keys come from [`crate::features::keys`].
///
/// Non-finite values are stored as `0.0` so downstream consumers never see NaN.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FeatureVector {
    values: BTreeMap<String, f64>,
}

impl FeatureVector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, key: impl Into<String>, value: f64) {
        let value = if value.is_finite() { value } else { 0.0 };
        self.values.insert(key.into(), value);
    }

    pub fn get(&self, key: &str) -> Option<f64> {
        self.values.get(key).copied()
    }

    /// Value for `key`, `0.0` when absent.
    pub fn get_or_zero(&self, key: &str) -> f64 {
        self.get(key).unwrap_or(0.0)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(k, &v)| (k.as_str(), v))
    }

    pub fn extend(&mut self, other: FeatureVector) {
        for (k, v) in other.values {
            self.insert(k, v);
        }
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for FeatureVector {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        let mut out = FeatureVector::new();
        for (k, v) in iter {
            out.insert(k, v);
        }
        out
    }
}

/// Classifier output: label → probability in `[0, 1]` (not required to sum to 1).
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LabelScores(BTreeMap<String, f64>);

impl LabelScores {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every label with a score of zero; the fallback when the classifier is unavailable.
    pub fn zeros<S: AsRef<str>>(labels: &[S]) -> Self {
        labels
            .iter()
            .map(|l| (l.as_ref().to_string(), 0.0))
            .collect()
    }

    pub fn insert(&mut self, label: impl Into<String>, score: f64) {
        self.0.insert(label.into(), score);
    }

    pub fn get(&self, label: &str) -> Option<f64> {
        self.0.get(label).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(k, &v)| (k.as_str(), v))
    }

    /// Highest-scoring label. Ties keep the lexicographically first label;
    /// non-finite scores are ignored.
    pub fn top(&self) -> Option<(&str, f64)> {
        let mut best: Option<(&str, f64)> = None;
        for (label, score) in self.iter() {
            if !score.is_finite() {
                continue;
            }
            match best {
                Some((_, s)) if score <= s => {}
                _ => best = Some((label, score)),
            }
        }
        best
    }

    /// Up to `n` entries sorted by descending score.
    pub fn ranked(&self, n: usize) -> Vec<(&str, f64)> {
        let mut all: Vec<(&str, f64)> = self.iter().collect();
        all.sort_by(|a, b| b.1.total_cmp(&a.1));
        all.truncate(n);
        all
    }
}

impl<K: Into<String>> FromIterator<(K, f64)> for LabelScores {
    fn from_iter<T: IntoIterator<Item = (K, f64)>>(iter: T) -> Self {
        LabelScores(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// A previously stored case returned by the similarity store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SimilarCase {
    pub id: String,
    pub label: String,
    pub confidence: f64,
    /// Cosine similarity in `[0, 1]`.
    pub similarity: f64,
}

/// Output of the fusion engine.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FusionResult {
    pub diagnosis: String,
    /// Calibrated confidence, always in `[0, 1]`.
    pub confidence: f64,
    /// Top classifier score before any adjustment.
    pub raw_dl_score: f64,
    pub adjustments: Vec<String>,
    pub flags: Vec<String>,
    pub summary: String,
}
