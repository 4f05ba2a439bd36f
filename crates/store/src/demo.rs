//! A small demo project for trying the engine end to end.

use loreweave_core::{Store, StoreError};
use serde_json::json;
use tracing::info;

pub const DEMO_PROJECT_ID: &str = "demo_project_001";
pub const DEMO_STYLE_ASSET_ID: &str = "style_sample_demo_001";
pub const DEMO_STYLE_SAMPLE: &str =
    "雨落在码头的铁皮棚上，像一串冷硬的算珠。林秋把风衣领口立起，没说话。她只看见光，和光后面的人影。";

/// Write the demo cards, chapter, canon and style sample into `project_id`.
///
/// Only source records are written; indexing is left to the caller.
/// Existing records with the same paths are overwritten; seeding twice
/// does not duplicate the canon fact.
pub async fn seed_demo_project<S: Store + ?Sized>(store: &S, project_id: &str) -> Result<(), StoreError> {
    store
        .write_record(project_id, "project.yaml", &json!({"id": project_id, "title": "Demo Novel Project"}))
        .await?;

    let cards = [
        json!({
            "id": "character_001", "type": "character", "title": "林秋",
            "tags": ["protagonist"], "links": ["worldview_001", "outline_001"],
            "stars": 4, "importance": 5,
            "payload": {
                "name": "林秋", "identity": "调查记者", "appearance": "短发、灰色风衣",
                "core_motivation": "查明父亲死亡真相", "personality_traits": ["冷静", "执拗"],
                "voice": "克制冷峻", "boundaries": ["不伤及无辜"],
                "relationships": [{"target": "character_002", "type": "mentor"}]
            }
        }),
        json!({
            "id": "worldview_001", "type": "world", "title": "临港城",
            "payload": {"era": "近未来", "setting": "沿海巨型都市"}
        }),
        json!({
            "id": "style_001", "type": "style", "title": "冷峻现实",
            "payload": {
                "tone": "冷峻", "rules": ["短句为主"],
                "active_style_sample_asset_ids": [DEMO_STYLE_ASSET_ID],
                "style_guide": {"sentence_length": "短句优先", "dialogue_ratio": "中低", "punctuation": "少感叹号"},
                "injection_policy": {"max_examples": 4, "max_chars_per_example": 800},
                "locks": {"pov": true, "tense": true, "punctuation": true, "taboo_words": true}
            }
        }),
        json!({
            "id": "outline_001", "type": "outline", "title": "第一卷提纲", "links": ["character_001"],
            "payload": {"beats": [{"id": "beat_1", "summary": "匿名线索出现"}]}
        }),
        json!({
            "id": "world_rule_001", "type": "world_rule", "title": "潮汐封港法", "tags": ["rule"],
            "stars": 5, "importance": 4,
            "payload": {"rule": "风暴红色预警期间，临港城外港全面封锁。", "level": "hard"}
        }),
        json!({
            "id": "lore_001", "type": "lore", "title": "黑潮同盟", "tags": ["faction"],
            "payload": {"summary": "控制临港城灰色航运网络的地下同盟。"}
        }),
    ];
    for card in &cards {
        let id = card["id"].as_str().unwrap_or_default();
        store.write_record(project_id, &format!("cards/{id}.yaml"), card).await?;
    }

    store
        .write_record(
            project_id,
            "cards/blueprint_001.json",
            &json!({
                "id": "blueprint_001",
                "title": "第一章蓝图",
                "scene_plan": [{
                    "scene_id": "scene_1", "phase": "setup", "purpose": "引入线索",
                    "situation": "雨夜收到匿名短信", "choice_points": ["是否赴约"],
                    "cast": ["character_001"], "beats": ["beat_1"]
                }]
            }),
        )
        .await?;

    store
        .write_text(project_id, "drafts/chapter_001.md", "# Chapter 001\n\n林秋在雨夜收到匿名短信。")
        .await?;
    store
        .write_record(
            project_id,
            "drafts/chapter_001.meta.json",
            &json!({"chapter_id": "chapter_001", "title": "雨夜来信", "chapter_summary": "", "scene_summaries": []}),
        )
        .await?;

    let fact = json!({
        "id": "fact_world_state_001", "scope": "world_state", "key": "harbor_lockdown",
        "value": "港区进入三级封锁，货运延迟。", "confidence": 0.9,
        "evidence": {"chapter_id": "chapter_001", "quote": "雨夜封港"},
        "sources": [{"path": "cards/world_rule_001.yaml"}]
    });
    let facts = store.read_records(project_id, "canon/facts.jsonl").await?;
    if !facts.iter().any(|f| f["id"] == fact["id"]) {
        store.append_record(project_id, "canon/facts.jsonl", &fact).await?;
    }

    store
        .write_text(
            project_id,
            &format!("assets/style_samples/{DEMO_STYLE_ASSET_ID}.txt"),
            DEMO_STYLE_SAMPLE,
        )
        .await?;

    info!(project = project_id, cards = cards.len(), "Demo project seeded");
    Ok(())
}
