//! Chunks — bounded, citation-addressable units of indexed text.
//!
//! A chunk is immutable once written. Edits never patch a chunk in place:
//! the owning chapter or asset is re-chunked and its rows replaced.

use crate::kb::KbId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Where a chunk came from. Used for citations and authority lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    StyleSample,
    Doc,
    Manuscript,
    WorldCard,
    WorldFact,
    #[serde(other)]
    Other,
}

/// Source locator attached to every chunk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceLocator {
    /// Project-relative path of the source artifact.
    pub path: String,

    pub kind: SourceKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filename: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chapter_id: Option<String>,

    /// 1-based first line covered (manuscript chunks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_line: Option<usize>,

    /// 1-based last line covered (manuscript chunks).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_line: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paragraph_index: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fact_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field_path: Option<String>,
}

impl SourceLocator {
    pub fn new(path: impl Into<String>, kind: SourceKind) -> Self {
        Self {
            path: path.into(),
            kind,
            asset_id: None,
            filename: None,
            chapter_id: None,
            start_line: None,
            end_line: None,
            paragraph_index: None,
            card_id: None,
            fact_id: None,
            field_path: None,
        }
    }

    /// The path, if it names a structured entity card (`cards/*.yaml`).
    pub fn card_path(&self) -> Option<&str> {
        crate::card::is_card_path(&self.path).then_some(self.path.as_str())
    }
}

/// Per-character punctuation rates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PunctuationProfile {
    pub comma: f64,
    pub period: f64,
    pub exclamation: f64,
}

/// Stylistic features precomputed when a chunk is written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TextFeatures {
    pub avg_sentence_len: f64,
    pub dialogue_ratio: f64,
    pub punctuation_profile: PunctuationProfile,
    #[serde(default, alias = "top_ngrams")]
    pub top_terms: Vec<String>,
}

/// A stored chunk row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    /// Unique within its knowledge base: `{ref}_c{ordinal:04}`.
    pub chunk_id: String,

    pub kb_id: KbId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub asset_id: Option<String>,

    pub ordinal: usize,

    /// Raw text as written by the author.
    pub text: String,

    /// Sanitized text used for indexing.
    #[serde(default)]
    pub cleaned_text: String,

    #[serde(default)]
    pub features: TextFeatures,

    pub source: SourceLocator,

    #[serde(default = "Utc::now", alias = "ts")]
    pub created_at: DateTime<Utc>,
}

impl Chunk {
    /// Text fed to the tokenizer. Falls back to the raw text for rows
    /// written without a cleaned copy.
    pub fn indexed_text(&self) -> &str {
        if self.cleaned_text.is_empty() {
            &self.text
        } else {
            &self.cleaned_text
        }
    }

    pub fn chapter_id(&self) -> Option<&str> {
        self.source.chapter_id.as_deref()
    }

    pub fn source_asset_id(&self) -> Option<&str> {
        self.source.asset_id.as_deref().or(self.asset_id.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn card_path_requires_cards_prefix_and_yaml_suffix() {
        assert!(SourceLocator::new("cards/lore_001.yaml", SourceKind::WorldCard)
            .card_path()
            .is_some());
        assert!(SourceLocator::new("canon/facts.jsonl", SourceKind::WorldFact)
            .card_path()
            .is_none());
        assert!(SourceLocator::new("assets/cards/x.yaml", SourceKind::Doc)
            .card_path()
            .is_none());
    }

    #[test]
    fn chunk_row_tolerates_missing_optional_fields() {
        let row = r#"{"chunk_id":"doc_1_c0000","kb_id":"kb_docs","ordinal":0,"text":"港区","source":{"path":"assets/docs/doc_1.txt","kind":"doc"}}"#;
        let chunk: Chunk = serde_json::from_str(row).unwrap();
        assert_eq!(chunk.indexed_text(), "港区");
        assert!(chunk.features.top_terms.is_empty());
    }

    #[test]
    fn unknown_source_kind_maps_to_other() {
        let loc: SourceLocator =
            serde_json::from_str(r#"{"path":"meta/wiki/a.json","kind":"wiki_page"}"#).unwrap();
        assert_eq!(loc.kind, SourceKind::Other);
    }
}
