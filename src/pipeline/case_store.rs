//! Similar-case retrieval by embedding cosine similarity.
use crate::image::io::{read_json_file, write_json_file};
use crate::types::{FeatureVector, SimilarCase};
use nalgebra::DVector;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Guard added to the norm product.
const NORM_EPS: f64 = 1e-9;

/// A stored historical case.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CaseRecord {
    pub id: String,
    pub label: String,
    #[serde(default)]
    pub confidence: f64,
    pub embedding: Vec<f32>,
    /// Handcrafted features recorded with the case, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub features: Option<FeatureVector>,
}

pub trait CaseStore: Send + Sync {
    /// Up to `k` cases sorted by descending similarity, each in `[0, 1]`.
    fn search(&self, embedding: &DVector<f32>, k: usize) -> Vec<SimilarCase>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// `a·b / (|a|·|b| + 1e-9)`; `0.0` when the lengths differ.
pub fn cosine_similarity(a: &DVector<f32>, b: &DVector<f32>) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let dot: f64 = a.iter().zip(b.iter()).map(|(&x, &y)| x as f64 * y as f64).sum();
    let na = a.iter().map(|&x| (x as f64).powi(2)).sum::<f64>().sqrt();
    let nb = b.iter().map(|&x| (x as f64).powi(2)).sum::<f64>().sqrt();
    dot / (na * nb + NORM_EPS)
}

/// Linear-scan store, optionally persisted as a JSON array of [`CaseRecord`].
#[derive(Clone, Debug, Default)]
pub struct InMemoryCaseStore {
    records: Vec<CaseRecord>,
}

impl InMemoryCaseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_records(records: Vec<CaseRecord>) -> Self {
        Self { records }
    }

    pub fn add(&mut self, record: CaseRecord) {
        log::debug!("case store: added {} ({})", record.id, record.label);
        self.records.push(record);
    }

    pub fn records(&self) -> &[CaseRecord] {
        &self.records
    }

    pub fn load_json(path: &Path) -> Result<Self, String> {
        let records: Vec<CaseRecord> = read_json_file(path)?;
        log::info!("loaded {} cases from {}", records.len(), path.display());
        Ok(Self { records })
    }

    pub fn save_json(&self, path: &Path) -> Result<(), String> {
        write_json_file(path, &self.records)
    }
}

impl CaseStore for InMemoryCaseStore {
    fn search(&self, embedding: &DVector<f32>, k: usize) -> Vec<SimilarCase> {
        if self.records.is_empty() || k == 0 {
            return Vec::new();
        }
        let mut hits: Vec<SimilarCase> = self
            .records
            .iter()
            .filter_map(|r| {
                if r.embedding.len() != embedding.len() {
                    log::warn!(
                        "case {}: embedding length {} != query length {}, skipped",
                        r.id,
                        r.embedding.len(),
                        embedding.len()
                    );
                    return None;
                }
                let stored = DVector::from_column_slice(&r.embedding);
                Some(SimilarCase {
                    id: r.id.clone(),
                    label: r.label.clone(),
                    confidence: r.confidence,
                    similarity: cosine_similarity(embedding, &stored).clamp(0.0, 1.0),
                })
            })
            .collect();
        hits.sort_by(|a, b| b.similarity.total_cmp(&a.similarity));
        hits.truncate(k);
        for (i, hit) in hits.iter().enumerate() {
            log::debug!("  [{}] {} sim {:.4} label {}", i + 1, hit.id, hit.similarity, hit.label);
        }
        hits
    }

    fn len(&self) -> usize {
        self.records.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str, label: &str, embedding: Vec<f32>) -> CaseRecord {
        CaseRecord {
            id: id.to_string(),
            label: label.to_string(),
            confidence: 0.8,
            embedding,
            features: None,
        }
    }

    #[test]
    fn cosine_similarity_basics() {
        let a = DVector::from_vec(vec![1.0f32, 0.0]);
        let b = DVector::from_vec(vec![0.0f32, 2.0]);
        assert!(cosine_similarity(&a, &a) > 0.999_999);
        assert_eq!(cosine_similarity(&a, &b), 0.0);
        assert_eq!(cosine_similarity(&DVector::zeros(2), &a), 0.0);
    }

    #[test]
    fn opposite_embeddings_score_zero_not_negative() {
        let store = InMemoryCaseStore::from_records(vec![
            record("opposite", "Normal", vec![-1.0, 0.0]),
            record("same", "Pneumonia", vec![2.0, 0.0]),
        ]);
        let hits = store.search(&DVector::from_vec(vec![1.0, 0.0]), 2);
        assert_eq!(hits.len(), 2);
        for hit in &hits {
            assert!(
                (0.0..=1.0).contains(&hit.similarity),
                "{} similarity {}",
                hit.id,
                hit.similarity
            );
        }
        assert_eq!(hits[0].id, "same");
        assert_eq!(hits[1].similarity, 0.0);
    }

    #[test]
    fn search_sorts_descending_and_truncates() {
        let store = InMemoryCaseStore::from_records(vec![
            record("a", "Normal", vec![0.0, 1.0]),
            record("b", "Pneumonia", vec![1.0, 0.1]),
            record("c", "Pneumonia", vec![1.0, 1.0]),
            record("bad", "Mass", vec![1.0]),
        ]);
        let hits = store.search(&DVector::from_vec(vec![1.0, 0.0]), 2);
        let ids: Vec<&str> = hits.iter().map(|h| h.id.as_str()).collect();
        assert_eq!(ids, ["b", "c"]);
        assert!(hits[0].similarity > hits[1].similarity);
        assert!(store.search(&DVector::from_vec(vec![1.0, 0.0]), 0).is_empty());
    }

    #[test]
    fn json_round_trip_through_disk() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("cases.json");
        let mut store = InMemoryCaseStore::new();
        store.add(record("x", "Effusion", vec![0.5, 0.5]));
        store.save_json(&path).expect("save");
        let loaded = InMemoryCaseStore::load_json(&path).expect("load");
        assert_eq!(loaded.records(), store.records());
        assert!(InMemoryCaseStore::load_json(&dir.path().join("missing.json")).is_err());
    }
}
