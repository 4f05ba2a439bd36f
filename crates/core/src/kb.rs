//! Knowledge base identifiers and upload kinds.

use crate::error::KnowledgeError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the fixed knowledge-base partitions of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum KbId {
    /// Style exemplars uploaded by the author.
    #[serde(rename = "kb_style")]
    Style,
    /// Reference documents.
    #[serde(rename = "kb_docs")]
    Docs,
    /// Chapter drafts, chunked by line ranges.
    #[serde(rename = "kb_manuscript")]
    Manuscript,
    /// World cards and world-scoped canon facts.
    #[serde(rename = "kb_world")]
    World,
}

impl KbId {
    /// Every knowledge base, in reindex order.
    pub const ALL: [KbId; 4] = [KbId::Style, KbId::Docs, KbId::Manuscript, KbId::World];

    pub fn as_str(&self) -> &'static str {
        match self {
            KbId::Style => "kb_style",
            KbId::Docs => "kb_docs",
            KbId::Manuscript => "kb_manuscript",
            KbId::World => "kb_world",
        }
    }
}

impl fmt::Display for KbId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KbId {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        KbId::ALL
            .into_iter()
            .find(|kb| kb.as_str() == s)
            .ok_or_else(|| KnowledgeError::UnknownKb(s.to_string()))
    }
}

/// What a reindex call should rebuild.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReindexTarget {
    All,
    Kb(KbId),
}

impl FromStr for ReindexTarget {
    type Err = KnowledgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "all" {
            return Ok(ReindexTarget::All);
        }
        s.parse::<KbId>()
            .map(ReindexTarget::Kb)
            .map_err(|_| KnowledgeError::UnknownReindexTarget(s.to_string()))
    }
}

/// The kind of a user upload. Anything that is not a style sample is
/// treated as a reference document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    StyleSample,
    Doc,
}

impl AssetKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetKind::StyleSample => "style_sample",
            AssetKind::Doc => "doc",
        }
    }

    /// The knowledge base uploads of this kind are indexed into.
    pub fn kb_id(&self) -> KbId {
        match self {
            AssetKind::StyleSample => KbId::Style,
            AssetKind::Doc => KbId::Docs,
        }
    }

    /// Project-relative directory holding the raw uploaded text.
    pub fn asset_dir(&self) -> &'static str {
        match self {
            AssetKind::StyleSample => "assets/style_samples",
            AssetKind::Doc => "assets/docs",
        }
    }

    pub fn asset_path(&self, asset_id: &str) -> String {
        format!("{}/{asset_id}.txt", self.asset_dir())
    }
}

impl FromStr for AssetKind {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(if s == "style_sample" {
            AssetKind::StyleSample
        } else {
            AssetKind::Doc
        })
    }
}
