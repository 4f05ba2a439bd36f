//! End-to-end integration tests for the Loreweave context engine.
//!
//! These tests drive the full pipeline against an on-disk project tree:
//! ingest, chunking, indexing, ranking, multi-source merge and manifest
//! assembly.

use std::sync::Arc;

use loreweave_config::EngineConfig;
use loreweave_context::{CompressionStep, ManifestAssembler};
use loreweave_core::{AssetKind, Constraints, KbId, QueryFilters, ReindexTarget, ScenePlan, Store, WeightedSource};
use loreweave_knowledge::{KnowledgeBase, KnowledgeConfig};
use loreweave_store::demo::{DEMO_PROJECT_ID, DEMO_STYLE_ASSET_ID, DEMO_STYLE_SAMPLE, seed_demo_project};
use loreweave_store::FileStore;
use serde_json::json;
use tempfile::TempDir;

// ── Fixtures ────────────────────────────────────────────────────────────

struct Workspace {
    _dir: TempDir,
    config: EngineConfig,
    kb: Arc<KnowledgeBase<FileStore>>,
}

impl Workspace {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig {
            data_dir: dir.path().to_path_buf(),
            ..Default::default()
        };
        let store = Arc::new(FileStore::new(dir.path()));
        let kb = Arc::new(KnowledgeBase::new(store, KnowledgeConfig::from(&config)));
        Self { _dir: dir, config, kb }
    }

    /// The demo project, seeded and fully indexed.
    async fn demo() -> Self {
        let ws = Self::new();
        seed_demo_project(ws.store(), DEMO_PROJECT_ID).await.unwrap();
        ws.kb
            .ingest_asset(
                DEMO_PROJECT_ID,
                AssetKind::StyleSample,
                DEMO_STYLE_ASSET_ID,
                "style_sample_demo_001.txt",
                DEMO_STYLE_SAMPLE,
            )
            .await
            .unwrap();
        ws.kb.reindex(DEMO_PROJECT_ID, ReindexTarget::All).await.unwrap();
        ws
    }

    fn store(&self) -> &FileStore {
        self.kb.store().as_ref()
    }

    fn assembler(&self) -> ManifestAssembler<FileStore> {
        ManifestAssembler::new(self.kb.clone(), &self.config)
    }

    async fn blueprint_scene(&self) -> ScenePlan {
        let blueprint = self
            .store()
            .read_record(DEMO_PROJECT_ID, "cards/blueprint_001.json")
            .await
            .unwrap()
            .unwrap();
        serde_json::from_value(blueprint["scene_plan"][0].clone()).unwrap()
    }
}

// ── Retrieval ───────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_weighted_query_spans_docs_and_manuscript() {
    let ws = Workspace::new();
    ws.kb
        .upload("p1", AssetKind::Doc, "harbor.txt", "临港城有三层港区。\n\n雨季交通中断会影响补给。")
        .await
        .unwrap();
    ws.store()
        .write_text("p1", "drafts/chapter_001.md", "林秋在临港城的港区等待补给。")
        .await
        .unwrap();
    ws.kb
        .reindex("p1", ReindexTarget::Kb(KbId::Manuscript))
        .await
        .unwrap();

    let sources = [
        WeightedSource::new(KbId::Docs, 1.0),
        WeightedSource::new(KbId::Manuscript, 1.2),
    ];
    let results = ws
        .kb
        .query_multi("p1", "港区 补给", 8, &sources, &QueryFilters::none())
        .await
        .unwrap();

    assert!(results.iter().any(|r| r.kb_id == KbId::Docs));
    assert!(results.iter().any(|r| r.kb_id == KbId::Manuscript));

    let best_manuscript = results
        .iter()
        .filter(|r| r.kb_id == KbId::Manuscript)
        .map(|r| r.score)
        .fold(f64::NEG_INFINITY, f64::max);
    assert!(results
        .iter()
        .filter(|r| r.kb_id == KbId::Docs)
        .all(|r| best_manuscript >= r.score));
    assert!((results[0].score - 1.2).abs() < 1e-9);

    // Every result carries a locator back to its source file
    assert!(results.iter().all(|r| !r.source.path.is_empty()));
}

#[tokio::test]
async fn e2e_index_survives_a_fresh_engine() {
    let dir = tempfile::tempdir().unwrap();
    {
        let store = Arc::new(FileStore::new(dir.path()));
        let kb = KnowledgeBase::new(store, KnowledgeConfig::default());
        kb.upload("p1", AssetKind::Doc, "notes.txt", "黑潮同盟控制灰色航运。")
            .await
            .unwrap();
    }

    let store = Arc::new(FileStore::new(dir.path()));
    let kb = KnowledgeBase::new(store, KnowledgeConfig::default());
    let results = kb
        .query("p1", KbId::Docs, "黑潮 航运", 3, &QueryFilters::none())
        .await
        .unwrap();
    assert_eq!(results.len(), 1);
    assert!(results[0].score > 0.0);
    assert_eq!(kb.chunk_count("p1", KbId::Docs).await.unwrap(), 1);
}

#[tokio::test]
async fn e2e_chapter_edit_replaces_only_that_chapter() {
    let ws = Workspace::demo().await;
    ws.store()
        .write_text(DEMO_PROJECT_ID, "drafts/chapter_002.md", "第二章：黑潮同盟登场。")
        .await
        .unwrap();
    ws.kb.reindex_manuscript(DEMO_PROJECT_ID).await.unwrap();

    ws.store()
        .write_text(
            DEMO_PROJECT_ID,
            "drafts/chapter_001.md",
            "# Chapter 001\n\n林秋改道去了外港码头。",
        )
        .await
        .unwrap();
    ws.kb.reindex_chapter(DEMO_PROJECT_ID, "chapter_001").await.unwrap();

    let chunks = ws.store().read_chunks(DEMO_PROJECT_ID, KbId::Manuscript).await.unwrap();
    let chapter_one: Vec<_> = chunks
        .iter()
        .filter(|c| c.chapter_id() == Some("chapter_001"))
        .collect();
    assert!(!chapter_one.is_empty());
    assert!(chapter_one.iter().all(|c| !c.text.contains("匿名短信")));
    assert!(chapter_one.iter().any(|c| c.text.contains("外港码头")));
    assert!(chunks.iter().any(|c| c.chapter_id() == Some("chapter_002")));

    let only_two = QueryFilters::none().with_chapter_ids(["chapter_002"]);
    let results = ws
        .kb
        .query(DEMO_PROJECT_ID, KbId::Manuscript, "黑潮", 5, &only_two)
        .await
        .unwrap();
    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.source.chapter_id.as_deref() == Some("chapter_002")));
}

#[tokio::test]
async fn e2e_world_facts_favour_the_rule_card() {
    let ws = Workspace::demo().await;
    let results = ws
        .kb
        .world_facts(DEMO_PROJECT_ID, "临港城 外港 封锁", 5, true)
        .await
        .unwrap();

    assert!(!results.is_empty());
    assert!(results.iter().all(|r| r.kb_id == KbId::World));
    assert_eq!(results[0].source.path, "cards/world_rule_001.yaml");
    assert!(results[0].score_multiplier > 1.0);
    assert!(results
        .iter()
        .any(|r| r.source.path == "canon/facts.jsonl" || r.source.path.starts_with("cards/lore_")));
}

// ── Manifest ────────────────────────────────────────────────────────────

#[tokio::test]
async fn e2e_demo_manifest_fits_default_budget() {
    let ws = Workspace::demo().await;
    let scene = ws.blueprint_scene().await;
    assert_eq!(scene.cast, vec!["character_001"]);

    let manifest = ws
        .assembler()
        .build_manifest(DEMO_PROJECT_ID, "chapter_001", &scene, &Constraints::default())
        .await
        .unwrap();

    assert_eq!(manifest.token_budgets.max_tokens, ws.config.budget.total);
    assert!(manifest.compression_steps.is_empty());
    assert!(manifest.dropped_items.is_empty());
    assert_eq!(manifest.fixed_blocks.scene_plan, scene);
    assert_eq!(manifest.fixed_blocks.style_locks["pov"], json!(true));

    assert_eq!(manifest.included_cards.len(), 1);
    assert_eq!(manifest.included_cards[0]["title"], json!("林秋"));
    assert_eq!(manifest.included_canon.facts.len(), 1);

    for id in manifest.citation_map.keys() {
        assert!(manifest.evidence.iter().any(|e| &e.chunk_id == id));
    }
    assert!(manifest.world_facts.iter().all(|r| r.kb_id == KbId::World));
}

#[tokio::test]
async fn e2e_demo_manifest_degrades_under_tight_budget() {
    let ws = Workspace::demo().await;
    let scene = ws.blueprint_scene().await;
    let constraints = Constraints {
        max_tokens: Some(60),
        ..Default::default()
    };

    let manifest = ws
        .assembler()
        .build_manifest(DEMO_PROJECT_ID, "chapter_001", &scene, &constraints)
        .await
        .unwrap();

    assert_eq!(manifest.budget.total, 60);
    assert_eq!(manifest.compression_steps.first(), Some(&CompressionStep::TrimCardsFields));
    let payload = manifest.included_cards[0]["payload"].as_object().unwrap();
    assert!(payload.contains_key("identity"));
    assert!(!payload.contains_key("appearance"));

    // The manifest is still emitted, with over-budget buckets reported
    let serialized = serde_json::to_value(&manifest).unwrap();
    assert!(serialized.get("budget").is_some());
    assert!(serialized.get("citation_map").is_some());
}

#[tokio::test]
async fn e2e_style_profile_updates_demo_card() {
    let ws = Workspace::demo().await;
    let profile = ws
        .kb
        .style_profile(DEMO_PROJECT_ID, "style_001", &[DEMO_STYLE_ASSET_ID.to_string()], "fast")
        .await
        .unwrap();
    assert!(profile.stats.avg_sentence_len > 0.0);

    let card = ws
        .store()
        .read_record(DEMO_PROJECT_ID, "cards/style_001.yaml")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(card["payload"]["style_guide"]["sentence_length"], json!(profile.guide.sentence_length));
    assert_eq!(card["payload"]["active_style_sample_asset_ids"], json!([DEMO_STYLE_ASSET_ID]));
    // Existing locks are kept
    assert_eq!(card["payload"]["locks"]["taboo_words"], json!(true));
}
