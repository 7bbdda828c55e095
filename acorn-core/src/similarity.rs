//! Cosine-similarity scoring and top-K ranking over stored records.
//!
//! Brute-force O(n·d) over the candidate set, which is fine for a
//! single-user capture history (hundreds to low thousands of records).

use serde::Serialize;

use crate::models::VectorRecord;

/// A scored candidate from [`rank_top_k`].
#[derive(Debug, Clone, Serialize)]
pub struct SearchMatch {
    pub record: VectorRecord,
    pub similarity: f32,
}

/// Cosine similarity in [-1, 1].
///
/// A dimensionality mismatch (embedding model changed mid-lifetime) scores 0
/// instead of failing, so stale vectors degrade ranking rather than crash
/// search. Zero-magnitude vectors also score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        tracing::warn!(a_len = a.len(), b_len = b.len(), "Vector dimension mismatch");
        return 0.0;
    }

    let mut dot = 0.0f32;
    let mut norm_a = 0.0f32;
    let mut norm_b = 0.0f32;

    for (x, y) in a.iter().zip(b.iter()) {
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Score every candidate against `query`, sort descending by similarity and
/// truncate to `top_k`. Ties break by ascending record id so ranking is
/// reproducible across scans. `top_k == 0` yields an empty result.
pub fn rank_top_k(query: &[f32], records: Vec<VectorRecord>, top_k: usize) -> Vec<SearchMatch> {
    if top_k == 0 || records.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<SearchMatch> = records
        .into_iter()
        .map(|record| SearchMatch {
            similarity: cosine_similarity(query, &record.vector),
            record,
        })
        .collect();

    matches.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.record.id.cmp(&b.record.id))
    });
    matches.truncate(top_k);
    matches
}
