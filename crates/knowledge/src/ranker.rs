//! Okapi BM25 ranking with a lexical-overlap bonus and authority weighting.

use loreweave_core::{Bm25Index, Chunk, KbId, QueryFilters, ScoredResult, SourceLocator};
use std::collections::BTreeSet;

pub const K1: f64 = 1.5;
pub const B: f64 = 0.75;

/// Added per distinct query term the chunk contains.
pub const OVERLAP_BONUS: f64 = 0.1;

/// BM25 contribution of one query term to one chunk.
///
/// `n_docs`, `avg_len` and `doc_len` are floored at 1 so a degenerate index
/// never divides by zero. IDF is floored at 0.
pub fn term_score(tf: usize, df: usize, n_docs: usize, doc_len: usize, avg_len: f64) -> f64 {
    if tf == 0 {
        return 0.0;
    }
    let n = n_docs.max(1) as f64;
    let df = df as f64;
    let tf = tf as f64;
    let dl = doc_len.max(1) as f64;
    let avg = avg_len.max(1.0);

    let idf = ((n - df + 0.5) / (df + 0.5) + 1.0).ln().max(0.0);
    idf * (tf * (K1 + 1.0)) / (tf + K1 * (1.0 - B + B * dl / avg))
}

/// Score every admitted chunk against the query and return the best
/// `top_k`, highest first. Ties keep chunk order.
///
/// `authority` maps a chunk's source to its score multiplier; it should
/// return 1.0 for sources without an authority signal.
pub fn rank<F>(
    kb_id: KbId,
    query_tokens: &[String],
    index: &Bm25Index,
    chunks: &[Chunk],
    filters: &QueryFilters,
    authority: F,
    top_k: usize,
) -> Vec<ScoredResult>
where
    F: Fn(&SourceLocator) -> f64,
{
    let distinct: BTreeSet<&str> = query_tokens.iter().map(String::as_str).collect();

    let mut results: Vec<ScoredResult> = chunks
        .iter()
        .filter(|chunk| filters.admits(chunk))
        .map(|chunk| {
            let id = chunk.chunk_id.as_str();
            let doc_len = index.document_length(id);

            let bm25: f64 = query_tokens
                .iter()
                .map(|term| {
                    term_score(
                        index.term_frequency(term, id),
                        index.document_frequency(term),
                        index.n_docs,
                        doc_len,
                        index.avg_len,
                    )
                })
                .sum();
            let overlap = distinct
                .iter()
                .filter(|term| index.term_frequency(term, id) > 0)
                .count();

            let retrieval_score = bm25 + overlap as f64 * OVERLAP_BONUS;
            let score_multiplier = authority(&chunk.source);
            ScoredResult {
                kb_id,
                chunk_id: chunk.chunk_id.clone(),
                score: retrieval_score * score_multiplier,
                retrieval_score,
                score_multiplier,
                text: chunk.text.clone(),
                source: chunk.source.clone(),
                features: chunk.features.clone(),
            }
        })
        .collect();

    sort_descending(&mut results);
    results.truncate(top_k);
    results
}

/// Stable sort by score, highest first.
pub(crate) fn sort_descending(results: &mut [ScoredResult]) {
    results.sort_by(|a, b| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
}
