//! Weighted multi-source merge.
//!
//! Raw BM25 scores are not comparable across knowledge bases (different
//! vocabularies, document counts and lengths). Each source's results are
//! first normalised by that source's best score, then scaled by the
//! source weight.

use crate::ranker::sort_descending;
use loreweave_core::{KbId, ScoredResult};
use std::collections::HashMap;

/// Merge per-source result lists.
///
/// Each entry pairs a source weight with that source's ranked results.
/// Empty sources are skipped. Results are keyed by `(kb_id, chunk_id)`; on
/// collision the higher normalised score wins. Output is sorted by score,
/// highest first, and truncated to `top_k`.
pub fn merge(per_source: Vec<(f64, Vec<ScoredResult>)>, top_k: usize) -> Vec<ScoredResult> {
    let mut merged: Vec<ScoredResult> = Vec::new();
    let mut positions: HashMap<(KbId, String), usize> = HashMap::new();

    for (weight, results) in per_source {
        if results.is_empty() {
            continue;
        }
        let max = results.iter().map(|r| r.score).fold(f64::NEG_INFINITY, f64::max);
        let max = if max > 0.0 { max } else { 1.0 };

        for mut result in results {
            result.score = result.score / max * weight;
            let key = (result.kb_id, result.chunk_id.clone());
            match positions.get(&key) {
                Some(&i) => {
                    if result.score > merged[i].score {
                        merged[i] = result;
                    }
                }
                None => {
                    positions.insert(key, merged.len());
                    merged.push(result);
                }
            }
        }
    }

    sort_descending(&mut merged);
    merged.truncate(top_k);
    merged
}
