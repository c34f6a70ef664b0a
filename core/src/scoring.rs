//! BM25 and min-max normalization shared by the ranker and the PageRank solver.

/// Term-frequency saturation.
pub const DEFAULT_K1: f64 = 1.5;
/// Length normalization strength, 0 disables it.
pub const DEFAULT_B: f64 = 0.75;

/// Value assigned to every entry when all inputs are equal.
pub const FLAT_SCORE: f64 = 0.5;

/// `ln((N - df + 0.5) / (df + 0.5) + 1)`, always positive.
#[inline]
pub fn bm25_idf(doc_freq: usize, total_docs: usize) -> f64 {
    let df = doc_freq as f64;
    let n = total_docs as f64;
    ((n - df + 0.5) / (df + 0.5) + 1.0).ln()
}

/// Contribution of one query term to one document.
#[inline]
pub fn bm25_term_score(tf: f64, idf: f64, doc_len: f64, avg_doc_len: f64, k1: f64, b: f64) -> f64 {
    let relative_len = if avg_doc_len > 0.0 { doc_len / avg_doc_len } else { 1.0 };
    let length_norm = 1.0 - b + b * relative_len;
    idf * (tf * (k1 + 1.0)) / (tf + k1 * length_norm)
}

/// Rescale to [0, 1]. When the range collapses every value becomes
/// [`FLAT_SCORE`]; a range within a few ulps of zero counts as collapsed so
/// that summation-order noise on symmetric inputs does not stretch to 0..1.
///
/// The cutoff is `4 * EPSILON * max(|max|, 1)`: relative to the largest value
/// above 1, and an absolute `4 * EPSILON` (about 8.9e-16) when every value
/// lies below 1, as PageRank mass does.
pub fn min_max_normalize(values: &[f64]) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let (min, max) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if range <= f64::EPSILON * max.abs().max(1.0) * 4.0 {
        return vec![FLAT_SCORE; values.len()];
    }
    values.iter().map(|v| (v - min) / range).collect()
}
