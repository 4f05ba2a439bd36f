//! BM25 index construction.

use crate::tokenizer::Tokenizer;
use loreweave_core::{Bm25Index, Chunk};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Digest of a chunk set: chunk ids and indexed text, in order.
///
/// An index whose `source_version` differs from this value was built from a
/// different chunk set and must be rebuilt.
pub fn source_version(chunks: &[Chunk]) -> String {
    let mut hasher = Sha256::new();
    for chunk in chunks {
        hasher.update(chunk.chunk_id.as_bytes());
        hasher.update(b"\x1f");
        hasher.update(chunk.indexed_text().as_bytes());
        hasher.update(b"\x1e");
    }
    hex::encode(hasher.finalize())
}

/// Build an index over `chunks`. Pure and deterministic: the same chunk set
/// always yields an identical index.
pub fn build_index(chunks: &[Chunk], tokenizer: &dyn Tokenizer) -> Bm25Index {
    let mut index = Bm25Index {
        source_version: source_version(chunks),
        ..Default::default()
    };

    for chunk in chunks {
        let tokens = tokenizer.tokenize(chunk.indexed_text());
        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for token in &tokens {
            *counts.entry(token.clone()).or_insert(0) += 1;
        }

        index.doc_len.insert(chunk.chunk_id.clone(), tokens.len());
        for (term, tf) in counts {
            *index.doc_freq.entry(term.clone()).or_insert(0) += 1;
            index
                .postings
                .entry(term)
                .or_default()
                .insert(chunk.chunk_id.clone(), tf);
        }
    }

    index.n_docs = index.doc_len.len();
    index.avg_len = if index.n_docs == 0 {
        0.0
    } else {
        index.doc_len.values().sum::<usize>() as f64 / index.n_docs as f64
    };
    index
}

/// Whether a stored index can serve queries for `chunks`.
pub fn is_current(index: &Bm25Index, chunks: &[Chunk]) -> bool {
    if index.is_empty() && !chunks.is_empty() {
        return false;
    }
    index.source_version == source_version(chunks)
}
