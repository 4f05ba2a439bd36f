//! The knowledge base service — the query and maintenance surface over a
//! project's four knowledge bases.
//!
//! Every call reads a fresh snapshot of chunks and index from the store and
//! holds no ranking state between calls. Writers are last-writer-wins.

use crate::authority::StoreCardRepository;
use crate::index::{build_index, is_current};
use crate::ingest::{
    CANON_FACTS_PATH, WORLD_CARD_PREFIXES, rows_for_chapter, rows_for_upload, rows_for_world,
};
use crate::merge::merge;
use crate::ranker::rank;
use crate::sanitize::{SanitizeWarning, sanitize};
use crate::tokenizer::{CjkBigramTokenizer, Tokenizer};
use loreweave_config::{ChunkingConfig, EngineConfig};
use loreweave_core::{
    AssetKind, Bm25Index, Card, Chunk, EntityCardRepository, KbId, KnowledgeError, QueryFilters,
    ReindexTarget, ScoredResult, Store, WeightedSource, read_record_as,
};
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

type Result<T> = std::result::Result<T, KnowledgeError>;

/// Project id holding lore shared by every project.
pub const GLOBAL_PROJECT: &str = "_global";

/// Knowledge-base settings.
#[derive(Debug, Clone, PartialEq)]
pub struct KnowledgeConfig {
    pub chunking: ChunkingConfig,
    /// Per-source candidate floor for multi-source queries.
    pub min_candidates: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self::from(&EngineConfig::default())
    }
}

impl From<&EngineConfig> for KnowledgeConfig {
    fn from(config: &EngineConfig) -> Self {
        Self {
            chunking: config.chunking.clone(),
            min_candidates: config.retrieval.min_candidates,
        }
    }
}

/// Outcome of rebuilding one knowledge base.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReindexReport {
    pub kb_id: KbId,
    pub chunks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct UploadReceipt {
    pub asset_id: String,
    pub saved_path: String,
    pub kb_id: KbId,
    pub chunks: usize,
    pub warnings: Vec<SanitizeWarning>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AssetText {
    pub asset_id: String,
    pub kind: AssetKind,
    pub path: String,
    pub content: String,
}

pub struct KnowledgeBase<S: Store + ?Sized> {
    store: Arc<S>,
    cards: Arc<dyn EntityCardRepository>,
    tokenizer: Arc<dyn Tokenizer>,
    config: KnowledgeConfig,
}

impl<S: Store + ?Sized + 'static> KnowledgeBase<S> {
    /// A service reading authority from the store's own cards and
    /// tokenizing with [`CjkBigramTokenizer`].
    pub fn new(store: Arc<S>, config: KnowledgeConfig) -> Self {
        let cards: Arc<dyn EntityCardRepository> = Arc::new(StoreCardRepository::new(store.clone()));
        Self {
            store,
            cards,
            tokenizer: Arc::new(CjkBigramTokenizer),
            config,
        }
    }

    pub fn with_card_repository(mut self, cards: Arc<dyn EntityCardRepository>) -> Self {
        self.cards = cards;
        self
    }

    pub fn with_tokenizer(mut self, tokenizer: Arc<dyn Tokenizer>) -> Self {
        self.tokenizer = tokenizer;
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    pub fn config(&self) -> &KnowledgeConfig {
        &self.config
    }

    // --- Queries ---

    /// Rank one knowledge base against `text`.
    ///
    /// A missing or stale index is rebuilt from the current chunks and
    /// persisted before ranking.
    pub async fn query(
        &self,
        project_id: &str,
        kb: KbId,
        text: &str,
        top_k: usize,
        filters: &QueryFilters,
    ) -> Result<Vec<ScoredResult>> {
        let chunks = self.store.read_chunks(project_id, kb).await?;
        if chunks.is_empty() {
            debug!(project = project_id, kb = %kb, "Knowledge base is empty");
            return Ok(Vec::new());
        }
        let index = self.current_index(project_id, kb, &chunks).await?;
        let multipliers = self.authority_multipliers(project_id, &chunks, filters).await;
        let tokens = self.tokenizer.tokenize(text);

        let results = rank(
            kb,
            &tokens,
            &index,
            &chunks,
            filters,
            |source| {
                source
                    .card_path()
                    .and_then(|path| multipliers.get(path))
                    .copied()
                    .unwrap_or(1.0)
            },
            top_k,
        );
        debug!(
            project = project_id,
            kb = %kb,
            terms = tokens.len(),
            results = results.len(),
            "Query ranked"
        );
        Ok(results)
    }

    /// Query several knowledge bases and merge their normalised, weighted
    /// results.
    pub async fn query_multi(
        &self,
        project_id: &str,
        text: &str,
        top_k: usize,
        sources: &[WeightedSource],
        filters: &QueryFilters,
    ) -> Result<Vec<ScoredResult>> {
        let per_source_k = top_k.max(self.config.min_candidates);
        let mut per_source = Vec::with_capacity(sources.len());
        for source in sources {
            let results = self
                .query(project_id, source.kb_id, text, per_source_k, filters)
                .await?;
            per_source.push((source.weight, results));
        }
        Ok(merge(per_source, top_k))
    }

    /// World-lore lookup, optionally appending shared lore from the
    /// [`GLOBAL_PROJECT`].
    pub async fn world_facts(
        &self,
        project_id: &str,
        text: &str,
        top_k: usize,
        include_global: bool,
    ) -> Result<Vec<ScoredResult>> {
        let mut rows = self
            .query(project_id, KbId::World, text, top_k, &QueryFilters::none())
            .await?;
        if include_global && project_id != GLOBAL_PROJECT {
            rows.extend(
                self.query(GLOBAL_PROJECT, KbId::World, text, top_k, &QueryFilters::none())
                    .await?,
            );
            rows.truncate(top_k);
        }
        Ok(rows)
    }

    pub async fn chunk_count(&self, project_id: &str, kb: KbId) -> Result<usize> {
        Ok(self.store.read_chunks(project_id, kb).await?.len())
    }

    // --- Maintenance ---

    /// Rebuild indexes. Manuscript and world chunk sets are regenerated
    /// from their sources first.
    pub async fn reindex(&self, project_id: &str, target: ReindexTarget) -> Result<Vec<ReindexReport>> {
        match target {
            ReindexTarget::All => {
                self.rebuild_manuscript_chunks(project_id).await?;
                self.rebuild_world_chunks(project_id).await?;
                let mut reports = Vec::with_capacity(KbId::ALL.len());
                for kb in KbId::ALL {
                    reports.push(self.index_kb(project_id, kb).await?);
                }
                Ok(reports)
            }
            ReindexTarget::Kb(KbId::Manuscript) => Ok(vec![self.reindex_manuscript(project_id).await?]),
            ReindexTarget::Kb(KbId::World) => Ok(vec![self.reindex_world(project_id).await?]),
            ReindexTarget::Kb(kb) => Ok(vec![self.index_kb(project_id, kb).await?]),
        }
    }

    /// Regenerate manuscript chunks from every `drafts/chapter_*.md` and
    /// rebuild the index.
    pub async fn reindex_manuscript(&self, project_id: &str) -> Result<ReindexReport> {
        self.rebuild_manuscript_chunks(project_id).await?;
        self.index_kb(project_id, KbId::Manuscript).await
    }

    /// Regenerate world chunks from world cards and world-scoped canon facts
    /// and rebuild the index.
    pub async fn reindex_world(&self, project_id: &str) -> Result<ReindexReport> {
        self.rebuild_world_chunks(project_id).await?;
        self.index_kb(project_id, KbId::World).await
    }

    /// Re-chunk one edited chapter: its old chunks are removed, fresh ones
    /// appended, and the index rebuilt. Other chapters are untouched.
    pub async fn reindex_chapter(&self, project_id: &str, chapter_id: &str) -> Result<ReindexReport> {
        let text = self
            .store
            .read_text(project_id, &format!("drafts/{chapter_id}.md"))
            .await?
            .unwrap_or_default();

        let existing = self.store.read_chunks(project_id, KbId::Manuscript).await?;
        let before = existing.len();
        let mut chunks: Vec<Chunk> = existing
            .into_iter()
            .filter(|c| c.chapter_id() != Some(chapter_id))
            .collect();
        let removed = before - chunks.len();
        let fresh = rows_for_chapter(chapter_id, &text, self.config.chunking.manuscript_line_threshold);
        let added = fresh.len();
        chunks.extend(fresh);

        self.store
            .replace_chunks(project_id, KbId::Manuscript, &chunks)
            .await?;
        info!(project = project_id, chapter = chapter_id, removed, added, "Chapter reindexed");
        self.index_kb(project_id, KbId::Manuscript).await
    }

    /// Save an upload under a fresh asset id, index its sanitized text and
    /// rebuild the target knowledge base.
    pub async fn upload(
        &self,
        project_id: &str,
        kind: AssetKind,
        filename: &str,
        raw: &str,
    ) -> Result<UploadReceipt> {
        let suffix: String = uuid::Uuid::new_v4().simple().to_string().chars().take(10).collect();
        let asset_id = format!("{}_{suffix}", kind.as_str());
        self.ingest_asset(project_id, kind, &asset_id, filename, raw).await
    }

    /// Store and index an asset under a caller-chosen id. Chunks from an
    /// earlier ingest of the same id are replaced.
    pub async fn ingest_asset(
        &self,
        project_id: &str,
        kind: AssetKind,
        asset_id: &str,
        filename: &str,
        raw: &str,
    ) -> Result<UploadReceipt> {
        let saved_path = kind.asset_path(asset_id);
        self.store.write_text(project_id, &saved_path, raw).await?;

        let (cleaned, warnings) = sanitize(raw);
        let rows = rows_for_upload(
            kind,
            asset_id,
            filename,
            &cleaned,
            self.config.chunking.paragraph_max_chars,
        );
        let kb = kind.kb_id();
        let existing = self.store.read_chunks(project_id, kb).await?;
        if existing.iter().any(|c| c.source_asset_id() == Some(asset_id)) {
            let mut chunks: Vec<Chunk> = existing
                .into_iter()
                .filter(|c| c.source_asset_id() != Some(asset_id))
                .collect();
            chunks.extend(rows.iter().cloned());
            self.store.replace_chunks(project_id, kb, &chunks).await?;
        } else {
            self.store.append_chunks(project_id, kb, &rows).await?;
        }
        self.index_kb(project_id, kb).await?;

        info!(
            project = project_id,
            asset_id,
            kb = %kb,
            chunks = rows.len(),
            warnings = warnings.len(),
            "Asset ingested"
        );
        Ok(UploadReceipt {
            asset_id: asset_id.to_string(),
            saved_path,
            kb_id: kb,
            chunks: rows.len(),
            warnings,
        })
    }

    /// The raw text of an uploaded asset. A missing asset reads as empty.
    pub async fn asset_text(&self, project_id: &str, asset_id: &str, kind: AssetKind) -> Result<AssetText> {
        let path = kind.asset_path(asset_id);
        let content = self
            .store
            .read_text(project_id, &path)
            .await?
            .unwrap_or_default();
        Ok(AssetText {
            asset_id: asset_id.to_string(),
            kind,
            path,
            content,
        })
    }

    // --- Internals ---

    async fn index_kb(&self, project_id: &str, kb: KbId) -> Result<ReindexReport> {
        let chunks = self.store.read_chunks(project_id, kb).await?;
        let index = build_index(&chunks, self.tokenizer.as_ref());
        self.store.write_index(project_id, kb, &index).await?;
        info!(project = project_id, kb = %kb, chunks = chunks.len(), terms = index.doc_freq.len(), "Index rebuilt");
        Ok(ReindexReport {
            kb_id: kb,
            chunks: chunks.len(),
        })
    }

    async fn current_index(&self, project_id: &str, kb: KbId, chunks: &[Chunk]) -> Result<Bm25Index> {
        if let Some(index) = self.store.read_index(project_id, kb).await?
            && is_current(&index, chunks)
        {
            return Ok(index);
        }
        debug!(project = project_id, kb = %kb, "Index missing or stale, rebuilding");
        let index = build_index(chunks, self.tokenizer.as_ref());
        self.store.write_index(project_id, kb, &index).await?;
        Ok(index)
    }

    /// Authority multiplier per distinct card path among admitted chunks.
    async fn authority_multipliers(
        &self,
        project_id: &str,
        chunks: &[Chunk],
        filters: &QueryFilters,
    ) -> BTreeMap<String, f64> {
        let mut multipliers = BTreeMap::new();
        for chunk in chunks.iter().filter(|c| filters.admits(c)) {
            let Some(path) = chunk.source.card_path() else {
                continue;
            };
            if multipliers.contains_key(path) {
                continue;
            }
            let multiplier = self
                .cards
                .authority(project_id, path)
                .await
                .map(|a| a.multiplier())
                .unwrap_or(1.0);
            multipliers.insert(path.to_string(), multiplier);
        }
        multipliers
    }

    async fn rebuild_manuscript_chunks(&self, project_id: &str) -> Result<usize> {
        let threshold = self.config.chunking.manuscript_line_threshold;
        let mut chunks = Vec::new();
        for path in self
            .store
            .list_files(project_id, "drafts", "chapter_", ".md")
            .await?
        {
            let Some(chapter_id) = path
                .strip_prefix("drafts/")
                .and_then(|name| name.strip_suffix(".md"))
            else {
                continue;
            };
            let text = self.store.read_text(project_id, &path).await?.unwrap_or_default();
            chunks.extend(rows_for_chapter(chapter_id, &text, threshold));
        }
        self.store
            .replace_chunks(project_id, KbId::Manuscript, &chunks)
            .await?;
        debug!(project = project_id, chunks = chunks.len(), "Manuscript chunks regenerated");
        Ok(chunks.len())
    }

    async fn rebuild_world_chunks(&self, project_id: &str) -> Result<usize> {
        let mut cards = Vec::new();
        for prefix in WORLD_CARD_PREFIXES {
            for path in self
                .store
                .list_files(project_id, "cards", prefix, ".yaml")
                .await?
            {
                if let Some(card) = read_record_as::<Card, S>(self.store.as_ref(), project_id, &path).await? {
                    cards.push((path, card));
                }
            }
        }
        let facts = self.store.read_records(project_id, CANON_FACTS_PATH).await?;
        let chunks = rows_for_world(&cards, &facts);
        self.store.replace_chunks(project_id, KbId::World, &chunks).await?;
        debug!(project = project_id, cards = cards.len(), chunks = chunks.len(), "World chunks regenerated");
        Ok(chunks.len())
    }
}
