//! The context manifest handed to the writing pipeline.
//!
//! Field names are a stable contract with the generator: the manifest is
//! serialised as JSON and injected into its prompt.

use crate::budget::BudgetReport;
use loreweave_core::{ScenePlan, ScoredResult, SourceLocator};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenBudgets {
    pub max_tokens: usize,
}

/// Blocks always injected in full. Degradation never touches these.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FixedBlocks {
    pub style_guide: Value,
    pub style_locks: Value,
    pub scene_plan: ScenePlan,
    pub outline_beats: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique_brief: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique_checklist: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CanonBundle {
    pub facts: Vec<Value>,
    pub issues: Vec<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EvidenceChunks {
    pub style_examples: Vec<ScoredResult>,
    pub draft_summaries: Vec<Value>,
}

/// A degradation step applied to fit the budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CompressionStep {
    /// Card payloads reduced to their core fields.
    TrimCardsFields,
    /// Manuscript evidence reduced and draft summaries replaced by a short
    /// chapter summary.
    PreferManuscriptSummary,
}

impl CompressionStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            CompressionStep::TrimCardsFields => "trim_cards_fields",
            CompressionStep::PreferManuscriptSummary => "prefer_manuscript_summary",
        }
    }
}

impl fmt::Display for CompressionStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextManifest {
    pub token_budgets: TokenBudgets,
    pub fixed_blocks: FixedBlocks,
    pub included_cards: Vec<Value>,
    pub included_canon: CanonBundle,
    pub included_evidence_chunks: EvidenceChunks,
    /// Writing-profile evidence.
    pub evidence: Vec<ScoredResult>,
    /// Critique-profile evidence.
    pub critic_evidence: Vec<ScoredResult>,
    pub world_facts: Vec<ScoredResult>,
    /// Chunk id → where the evidence came from.
    pub citation_map: BTreeMap<String, SourceLocator>,
    pub dropped_items: Vec<String>,
    pub compression_steps: Vec<CompressionStep>,
    pub budget: BudgetReport,
}

pub fn citation_map(evidence: &[ScoredResult]) -> BTreeMap<String, SourceLocator> {
    evidence
        .iter()
        .map(|e| (e.chunk_id.clone(), e.source.clone()))
        .collect()
}
