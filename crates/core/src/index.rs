//! The BM25 index value.
//!
//! An index is derived data: it is always reproducible from the chunk set it
//! was built from and is never patched incrementally. Ordered maps keep two
//! builds over the same chunk set byte-identical once serialized.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bm25Index {
    /// term → number of chunks containing it
    #[serde(default)]
    pub doc_freq: BTreeMap<String, usize>,

    /// term → (chunk_id → term frequency)
    #[serde(default)]
    pub postings: BTreeMap<String, BTreeMap<String, usize>>,

    /// chunk_id → token count
    #[serde(default)]
    pub doc_len: BTreeMap<String, usize>,

    #[serde(default)]
    pub avg_len: f64,

    #[serde(default)]
    pub n_docs: usize,

    /// Digest of the chunk set this index was built from.
    #[serde(default)]
    pub source_version: String,
}

impl Bm25Index {
    pub fn is_empty(&self) -> bool {
        self.n_docs == 0
    }

    pub fn term_frequency(&self, term: &str, chunk_id: &str) -> usize {
        self.postings
            .get(term)
            .and_then(|p| p.get(chunk_id))
            .copied()
            .unwrap_or(0)
    }

    pub fn document_frequency(&self, term: &str) -> usize {
        self.doc_freq.get(term).copied().unwrap_or(0)
    }

    pub fn document_length(&self, chunk_id: &str) -> usize {
        self.doc_len.get(chunk_id).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookups_default_to_zero() {
        let index = Bm25Index::default();
        assert!(index.is_empty());
        assert_eq!(index.term_frequency("港区", "c1"), 0);
        assert_eq!(index.document_frequency("港区"), 0);
        assert_eq!(index.document_length("c1"), 0);
    }

    #[test]
    fn legacy_placeholder_index_parses_as_empty() {
        let index: Bm25Index =
            serde_json::from_str(r#"{"vocab":{},"doc_freq":{},"doc_len":{},"avg_len":0}"#).unwrap();
        assert!(index.is_empty());
        assert!(index.source_version.is_empty());
    }
}
