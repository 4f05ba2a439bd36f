//! Manifest assembly: gather fixed blocks, cards, canon and retrieved
//! evidence, measure every bucket and degrade deterministically until the
//! manifest fits.
//!
//! # Degradation
//!
//! Three independent checks run in a fixed order, each at most once:
//!
//! 1. cards over their limit → card payloads trimmed to core fields
//! 2. current draft + canon over their combined limit → evidence reduced to
//!    two manuscript and one docs entry, draft summaries replaced by a short
//!    chapter summary
//! 3. style examples over the summaries limit → style examples dropped
//!
//! Fixed blocks are never trimmed.

use crate::budget::BudgetManager;
use crate::manifest::{
    CanonBundle, CompressionStep, ContextManifest, EvidenceChunks, FixedBlocks, TokenBudgets,
    citation_map,
};
use crate::summary::make_summaries;
use crate::token::{estimate_json_tokens, estimate_tokens};
use loreweave_config::{BudgetConfig, EngineConfig, ManifestConfig, RetrievalConfig};
use loreweave_core::{
    Bucket, Card, ChapterMeta, Constraints, KbId, Project, QueryFilters, ReindexTarget, Result,
    ScenePlan, ScoredResult, Store, StoreError, read_record_as,
};
use loreweave_knowledge::KnowledgeBase;
use loreweave_knowledge::ingest::CANON_FACTS_PATH;
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

pub const PROJECT_PATH: &str = "project.yaml";
pub const CANON_ISSUES_PATH: &str = "canon/issues.jsonl";

/// Per-example limits read from the style card's `injection_policy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InjectionPolicy {
    max_examples: usize,
    max_chars_per_example: usize,
}

impl InjectionPolicy {
    fn from_card(card: &Card, default_examples: usize, default_chars: usize) -> Self {
        let policy = card.payload.get("injection_policy");
        let read = |key: &str| {
            policy
                .and_then(|p| p.get(key))
                .and_then(Value::as_f64)
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map(|n| n as usize)
        };
        Self {
            max_examples: read("max_examples").unwrap_or(default_examples),
            max_chars_per_example: read("max_chars_per_example").unwrap_or(default_chars),
        }
    }
}

fn payload_field(card: &Card, key: &str, default: Value) -> Value {
    card.payload.get(key).cloned().unwrap_or(default)
}

fn truncate_chars(s: &str, max: usize) -> String {
    s.chars().take(max).collect()
}

fn last_n(mut items: Vec<Value>, n: usize) -> Vec<Value> {
    let skip = items.len().saturating_sub(n);
    items.split_off(skip)
}

fn of_kb(results: &[ScoredResult], kb: KbId) -> impl Iterator<Item = &ScoredResult> {
    results.iter().filter(move |r| r.kb_id == kb)
}

/// Builds context manifests over one knowledge base service.
pub struct ManifestAssembler<S: Store + ?Sized> {
    kb: Arc<KnowledgeBase<S>>,
    budget: BudgetConfig,
    retrieval: RetrievalConfig,
    manifest: ManifestConfig,
}

impl<S: Store + ?Sized + 'static> ManifestAssembler<S> {
    pub fn new(kb: Arc<KnowledgeBase<S>>, config: &EngineConfig) -> Self {
        Self {
            kb,
            budget: config.budget.clone(),
            retrieval: config.retrieval.clone(),
            manifest: config.manifest.clone(),
        }
    }

    pub fn knowledge(&self) -> &Arc<KnowledgeBase<S>> {
        &self.kb
    }

    /// Assemble the manifest for one scene of a chapter.
    ///
    /// Missing or malformed project records are replaced by defaults; only
    /// storage failures are returned as errors.
    pub async fn build_manifest(
        &self,
        project_id: &str,
        chapter_id: &str,
        scene: &ScenePlan,
        constraints: &Constraints,
    ) -> Result<ContextManifest> {
        let store = self.kb.store().as_ref();

        let project = read_record_as::<Project, S>(store, project_id, PROJECT_PATH)
            .await?
            .unwrap_or_default();
        let bm = BudgetManager::from_project(&project, constraints.max_tokens, &self.budget);
        let max_items = bm.caps().max_items_per_bucket;

        // Fixed blocks
        let style = self
            .card(project_id, &self.manifest.style_card_id)
            .await?
            .unwrap_or_default();
        let outline = self
            .card(project_id, &self.manifest.outline_card_id)
            .await?
            .unwrap_or_default();
        let policy = InjectionPolicy::from_card(
            &style,
            bm.caps().max_examples_style,
            self.manifest.max_chars_per_example,
        );
        let fixed_blocks = FixedBlocks {
            style_guide: payload_field(&style, "style_guide", json!({})),
            style_locks: payload_field(&style, "locks", json!({})),
            scene_plan: scene.clone(),
            outline_beats: payload_field(&outline, "beats", json!([])),
            technique_brief: constraints.technique_brief.clone(),
            technique_checklist: constraints.technique_checklist.clone(),
        };

        // Cards, canon and chapter state
        let mut cards = Vec::new();
        for card_id in scene.cast.iter().filter(|id| !id.is_empty()) {
            if cards.len() >= max_items {
                break;
            }
            match self.card(project_id, card_id).await? {
                Some(card) => cards.push(card),
                None => debug!(project = project_id, card = %card_id, "Cast card missing, skipped"),
            }
        }
        let facts = last_n(store.read_records(project_id, CANON_FACTS_PATH).await?, max_items);
        let issues = last_n(store.read_records(project_id, CANON_ISSUES_PATH).await?, max_items);
        let meta = read_record_as::<ChapterMeta, S>(
            store,
            project_id,
            &format!("drafts/{chapter_id}.meta.json"),
        )
        .await?
        .unwrap_or_default();
        let draft = store
            .read_text(project_id, &format!("drafts/{chapter_id}.md"))
            .await?
            .unwrap_or_default();

        // Retrieval
        self.kb
            .reindex(project_id, ReindexTarget::Kb(KbId::World))
            .await?;
        if self.kb.chunk_count(project_id, KbId::Manuscript).await? == 0 {
            self.kb.reindex_manuscript(project_id).await?;
        }

        let query = scene.query_text();
        let filters = QueryFilters::none();
        let writer = self
            .kb
            .query_multi(project_id, &query, max_items, &self.retrieval.writer_profile, &filters)
            .await?;
        let critic_query = format!("{query}{}", self.retrieval.critic_query_suffix);
        let critic_evidence = self
            .kb
            .query_multi(project_id, &critic_query, max_items, &self.retrieval.critic_profile, &filters)
            .await?;

        let world_facts: Vec<ScoredResult> = of_kb(&writer, KbId::World)
            .take(self.manifest.max_world_facts)
            .cloned()
            .collect();
        let mut style_examples: Vec<ScoredResult> = of_kb(&writer, KbId::Style)
            .take(policy.max_examples)
            .cloned()
            .map(|mut example| {
                example.text = truncate_chars(&example.text, policy.max_chars_per_example);
                example
            })
            .collect();
        let mut evidence: Vec<ScoredResult> =
            writer.iter().take(self.manifest.max_evidence).cloned().collect();
        let mut citations = citation_map(&evidence);

        // Measure
        let mut included_cards = cards
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;
        let system_rules_used = estimate_json_tokens(&fixed_blocks);
        let mut cards_used = estimate_json_tokens(&included_cards);
        let canon_used = estimate_tokens(&format!(
            "{}{}",
            serde_json::to_string(&facts)?,
            serde_json::to_string(&issues)?
        ));
        let summaries_used = estimate_json_tokens(&meta.scene_summaries);
        let draft_used = estimate_tokens(&draft);
        let world_used = estimate_json_tokens(&world_facts);

        // Degrade
        let mut compression_steps = Vec::new();
        let mut dropped_items = Vec::new();
        let mut draft_summaries = meta.scene_summaries.clone();

        if cards_used > bm.limit(Bucket::Cards) {
            let fields: Vec<&str> = self
                .manifest
                .trimmed_card_fields
                .iter()
                .map(String::as_str)
                .collect();
            included_cards = cards.iter().map(|c| c.trimmed(&fields)).collect();
            cards_used = estimate_json_tokens(&included_cards);
            compression_steps.push(CompressionStep::TrimCardsFields);
        }

        if draft_used + canon_used > bm.limit(Bucket::CurrentDraft) + bm.limit(Bucket::Canon) {
            let mut reduced: Vec<ScoredResult> = of_kb(&evidence, KbId::Manuscript).take(2).cloned().collect();
            reduced.extend(of_kb(&evidence, KbId::Docs).take(1).cloned());
            evidence = reduced;
            citations = citation_map(&evidence);

            let summary = if meta.chapter_summary.is_empty() {
                make_summaries(&draft).chapter_summary
            } else {
                meta.chapter_summary.clone()
            };
            draft_summaries = vec![json!({
                "chapter_summary": truncate_chars(&summary, self.manifest.summary_fallback_chars)
            })];
            compression_steps.push(CompressionStep::PreferManuscriptSummary);
        }

        if estimate_json_tokens(&style_examples) > bm.limit(Bucket::Summaries) {
            style_examples.clear();
            dropped_items.push("style_examples".to_string());
        }

        let usage: BTreeMap<Bucket, usize> = [
            (Bucket::SystemRules, system_rules_used),
            (Bucket::Cards, cards_used),
            (Bucket::Canon, canon_used),
            (Bucket::Summaries, summaries_used),
            (Bucket::CurrentDraft, draft_used),
            (Bucket::World, world_used),
            (Bucket::OutputReserve, bm.limit(Bucket::OutputReserve)),
        ]
        .into_iter()
        .collect();
        let budget = bm.build_report(&usage, &dropped_items);

        if !budget.over_limit.is_empty() {
            warn!(
                project = project_id,
                chapter = chapter_id,
                buckets = ?budget.over_limit.keys().collect::<Vec<_>>(),
                "Manifest still over budget after degradation"
            );
        }
        info!(
            project = project_id,
            chapter = chapter_id,
            total = bm.total(),
            evidence = evidence.len(),
            critic_evidence = critic_evidence.len(),
            steps = ?compression_steps,
            "Manifest built"
        );

        Ok(ContextManifest {
            token_budgets: TokenBudgets {
                max_tokens: bm.total(),
            },
            fixed_blocks,
            included_cards,
            included_canon: CanonBundle { facts, issues },
            included_evidence_chunks: EvidenceChunks {
                style_examples,
                draft_summaries,
            },
            evidence,
            critic_evidence,
            world_facts,
            citation_map: citations,
            dropped_items,
            compression_steps,
            budget,
        })
    }

    /// `cards/{card_id}.yaml`. Ids that would escape the project are
    /// treated as missing.
    async fn card(&self, project_id: &str, card_id: &str) -> Result<Option<Card>> {
        let path = format!("cards/{card_id}.yaml");
        match read_record_as::<Card, S>(self.kb.store().as_ref(), project_id, &path).await {
            Ok(card) => Ok(card),
            Err(StoreError::PathTraversal(path)) => {
                warn!(project = project_id, path = %path, "Rejected card path");
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }
}
