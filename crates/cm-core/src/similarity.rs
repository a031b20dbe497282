//! Pairwise cosine similarity, for choosing `eps`.
//!
//! On unit vectors Euclidean distance and cosine similarity are linked by
//! `d = sqrt(2 - 2s)`, so a similarity threshold translates directly into a
//! DBSCAN radius.

use serde::Serialize;

use crate::normalize::magnitude;

#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct SimilarityPair {
    pub left: usize,
    pub right: usize,
    pub similarity: f64,
}

/// Cosine similarity, or `None` for mismatched lengths or a zero vector.
pub fn cosine_similarity(a: &[f64], b: &[f64]) -> Option<f64> {
    if a.is_empty() || a.len() != b.len() {
        return None;
    }
    let denom = magnitude(a) * magnitude(b);
    if denom == 0.0 {
        return None;
    }
    let dot: f64 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    Some(dot / denom)
}

/// Similarity of every comparable pair `left < right`, in index order.
pub fn pairwise(vectors: &[Vec<f64>]) -> Vec<SimilarityPair> {
    let mut pairs = Vec::new();
    for left in 0..vectors.len() {
        for right in (left + 1)..vectors.len() {
            if let Some(similarity) = cosine_similarity(&vectors[left], &vectors[right]) {
                pairs.push(SimilarityPair {
                    left,
                    right,
                    similarity,
                });
            }
        }
    }
    pairs
}

/// DBSCAN radius on unit vectors equivalent to a cosine similarity threshold.
pub fn eps_for_similarity(similarity: f64) -> f64 {
    (2.0 - 2.0 * similarity.clamp(-1.0, 1.0)).sqrt()
}
