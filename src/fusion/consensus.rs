//! Similarity-weighted vote over retrieved historical cases.
use crate::types::SimilarCase;

/// Winning label of the vote and its share of the total weight.
#[derive(Clone, Debug, PartialEq)]
pub struct Consensus {
    pub label: String,
    /// Winner's weight divided by the total weight, in `[0, 1]`.
    pub share: f64,
    pub case_count: usize,
}

/// Similarities are clamped to `[0, 1]`; non-finite values weigh nothing.
fn weight(case: &SimilarCase) -> f64 {
    if case.similarity.is_finite() {
        case.similarity.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

/// Weighted vote; `None` when there are no cases or the total weight is zero.
///
/// Ties go to the label seen first.
pub fn weighted_vote(cases: &[SimilarCase]) -> Option<Consensus> {
    let mut votes: Vec<(&str, f64)> = Vec::new();
    let mut total = 0.0;
    for case in cases {
        let w = weight(case);
        total += w;
        match votes.iter_mut().find(|(label, _)| *label == case.label) {
            Some((_, acc)) => *acc += w,
            None => votes.push((case.label.as_str(), w)),
        }
    }
    if total <= 0.0 {
        return None;
    }
    let mut best: Option<(&str, f64)> = None;
    for &(label, w) in &votes {
        if best.map_or(true, |(_, bw)| w > bw) {
            best = Some((label, w));
        }
    }
    best.map(|(label, w)| Consensus {
        label: label.to_string(),
        share: w / total,
        case_count: cases.len(),
    })
}
