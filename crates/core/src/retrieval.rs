//! Query-side value types: filters, scored results and weighted sources.

use crate::chunk::{Chunk, SourceLocator, TextFeatures};
use crate::kb::KbId;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Restricts which chunks may be scored. An empty set means "no filter".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryFilters {
    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub asset_ids: BTreeSet<String>,

    #[serde(default, skip_serializing_if = "BTreeSet::is_empty")]
    pub chapter_ids: BTreeSet<String>,
}

impl QueryFilters {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn with_asset_ids<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.asset_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    pub fn with_chapter_ids<I, T>(mut self, ids: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.chapter_ids.extend(ids.into_iter().map(Into::into));
        self
    }

    /// Whether the chunk passes every non-empty filter.
    pub fn admits(&self, chunk: &Chunk) -> bool {
        if !self.asset_ids.is_empty()
            && !chunk
                .source_asset_id()
                .is_some_and(|id| self.asset_ids.contains(id))
        {
            return false;
        }
        if !self.chapter_ids.is_empty()
            && !chunk
                .chapter_id()
                .is_some_and(|id| self.chapter_ids.contains(id))
        {
            return false;
        }
        true
    }
}

/// One ranked chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredResult {
    pub kb_id: KbId,
    pub chunk_id: String,

    /// Final score. After a multi-source merge this is the normalised,
    /// weighted score.
    pub score: f64,

    /// BM25 plus overlap bonus, before the authority multiplier.
    pub retrieval_score: f64,

    pub score_multiplier: f64,

    pub text: String,
    pub source: SourceLocator,

    #[serde(default)]
    pub features: TextFeatures,
}

/// A knowledge base and its weight in a multi-source query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct WeightedSource {
    pub kb_id: KbId,
    pub weight: f64,
}

impl WeightedSource {
    pub fn new(kb_id: KbId, weight: f64) -> Self {
        Self { kb_id, weight }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunk::SourceKind;

    fn chunk(asset: Option<&str>, chapter: Option<&str>) -> Chunk {
        let mut source = SourceLocator::new("drafts/chapter_001.md", SourceKind::Manuscript);
        source.asset_id = asset.map(String::from);
        source.chapter_id = chapter.map(String::from);
        Chunk {
            chunk_id: "c".into(),
            kb_id: KbId::Manuscript,
            asset_id: None,
            ordinal: 0,
            text: "港区".into(),
            cleaned_text: "港区".into(),
            features: TextFeatures::default(),
            source,
            created_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn empty_filters_admit_everything() {
        assert!(QueryFilters::none().admits(&chunk(None, None)));
    }

    #[test]
    fn chapter_filter_rejects_untagged_chunks() {
        let filters = QueryFilters::none().with_chapter_ids(["chapter_001"]);
        assert!(filters.admits(&chunk(None, Some("chapter_001"))));
        assert!(!filters.admits(&chunk(None, Some("chapter_002"))));
        assert!(!filters.admits(&chunk(None, None)));
    }

    #[test]
    fn both_filters_must_pass() {
        let filters = QueryFilters::none()
            .with_asset_ids(["doc_a"])
            .with_chapter_ids(["chapter_001"]);
        assert!(filters.admits(&chunk(Some("doc_a"), Some("chapter_001"))));
        assert!(!filters.admits(&chunk(Some("doc_b"), Some("chapter_001"))));
    }
}
