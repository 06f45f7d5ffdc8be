//! Cosine similarity scoring and relevance ranking.
//!
//! Pure functions: no input mutation, no IO. Ranking is deterministic --
//! the sort is stable, so candidates with equal scores keep their input
//! order and top-K truncation cannot flicker between runs.

/// Cosine similarity between two vectors, in [-1, 1].
///
/// Returns `0.0` when either vector has zero magnitude. That is a
/// deliberate degenerate-case policy, not a numerical accident: a
/// zero vector carries no direction to compare against.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot / (norm_a * norm_b)
}

/// Rank candidates by descending cosine similarity to the query.
///
/// Returns `(id, score)` pairs. The sort is stable: ties keep input
/// order.
pub fn rank_by_similarity<I: Copy>(
    query: &[f32],
    candidates: &[(I, Vec<f32>)],
) -> Vec<(I, f32)> {
    let mut scored: Vec<(I, f32)> = candidates
        .iter()
        .map(|(id, embedding)| (*id, cosine_similarity(query, embedding)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));

    scored
}
