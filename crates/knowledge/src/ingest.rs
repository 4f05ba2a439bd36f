//! Turning source artifacts into chunk rows.
//!
//! Chunk ids are `{ref}_c{ordinal:04}` where `ref` is the asset id, chapter
//! id, card file stem or canon fact id.

use crate::chunker::{chunk_lines, chunk_text};
use crate::features::text_features;
use chrono::Utc;
use loreweave_core::{AssetKind, Card, Chunk, KbId, SourceKind, SourceLocator};
use serde_json::Value;
use std::collections::BTreeSet;
use tracing::warn;

/// Canon fact scopes that belong in the world knowledge base.
pub const WORLD_FACT_SCOPES: [&str; 3] = ["world_state", "world_event", "world_rule"];

/// Card file prefixes indexed into the world knowledge base, in order.
pub const WORLD_CARD_PREFIXES: [&str; 3] = ["world_rule_", "lore_", "worldview_"];

pub const CANON_FACTS_PATH: &str = "canon/facts.jsonl";

fn chunk_id(reference: &str, ordinal: usize) -> String {
    format!("{reference}_c{ordinal:04}")
}

fn build(kb_id: KbId, id: String, ordinal: usize, text: String, source: SourceLocator) -> Chunk {
    Chunk {
        chunk_id: id,
        kb_id,
        asset_id: source.asset_id.clone(),
        ordinal,
        features: text_features(&text),
        cleaned_text: text.clone(),
        text,
        source,
        created_at: Utc::now(),
    }
}

/// Rows for an uploaded asset. `cleaned` is the sanitized upload text.
pub fn rows_for_upload(
    kind: AssetKind,
    asset_id: &str,
    filename: &str,
    cleaned: &str,
    max_chars: usize,
) -> Vec<Chunk> {
    let source_kind = match kind {
        AssetKind::StyleSample => SourceKind::StyleSample,
        AssetKind::Doc => SourceKind::Doc,
    };
    chunk_text(cleaned, max_chars)
        .into_iter()
        .enumerate()
        .map(|(i, text)| {
            let mut source = SourceLocator::new(kind.asset_path(asset_id), source_kind);
            source.asset_id = Some(asset_id.to_string());
            source.filename = Some(filename.to_string());
            source.paragraph_index = Some(i);
            build(kind.kb_id(), chunk_id(asset_id, i), i, text, source)
        })
        .collect()
}

/// Rows for one chapter draft (`drafts/{chapter_id}.md`).
pub fn rows_for_chapter(chapter_id: &str, text: &str, threshold: usize) -> Vec<Chunk> {
    chunk_lines(text, threshold)
        .into_iter()
        .enumerate()
        .map(|(i, line_chunk)| {
            let mut source =
                SourceLocator::new(format!("drafts/{chapter_id}.md"), SourceKind::Manuscript);
            source.chapter_id = Some(chapter_id.to_string());
            source.start_line = Some(line_chunk.start_line);
            source.end_line = Some(line_chunk.end_line);
            source.paragraph_index = Some(i);
            build(KbId::Manuscript, chunk_id(chapter_id, i), i, line_chunk.text, source)
        })
        .collect()
}

/// `cards/lore_001.yaml` → `lore_001`
fn file_stem(path: &str) -> &str {
    let name = path.rsplit('/').next().unwrap_or(path);
    name.strip_suffix(".yaml").unwrap_or(name)
}

/// Text of a canon fact: `value`, falling back to `fact`. Empty values are
/// skipped over.
fn fact_text(fact: &Value) -> Option<String> {
    ["value", "fact"].iter().find_map(|key| match fact.get(*key) {
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        Some(Value::Null) | Some(Value::String(_)) | Some(Value::Bool(false)) | None => None,
        Some(Value::Array(a)) if a.is_empty() => None,
        Some(Value::Object(o)) if o.is_empty() => None,
        Some(other) => Some(other.to_string()),
    })
}

/// Rows for the world knowledge base.
///
/// `cards` pairs each card path with its parsed card; the whole payload is
/// indexed as one chunk. Canon facts are kept only when their scope is one
/// of [`WORLD_FACT_SCOPES`]. A fact whose id is already taken by an earlier
/// row is suffixed with its ordinal.
pub fn rows_for_world(cards: &[(String, Card)], facts: &[Value]) -> Vec<Chunk> {
    let mut rows = Vec::new();
    let mut taken: BTreeSet<String> = BTreeSet::new();

    for (path, card) in cards {
        let stem = file_stem(path);
        let text = card.payload.to_string();
        let mut source = SourceLocator::new(path.clone(), SourceKind::WorldCard);
        source.card_id = Some(if card.id.is_empty() {
            stem.to_string()
        } else {
            card.id.clone()
        });
        source.field_path = Some("payload".into());
        let id = chunk_id(stem, 0);
        taken.insert(id.clone());
        rows.push(build(KbId::World, id, 0, text, source));
    }

    for fact in facts {
        let scope = fact.get("scope").and_then(Value::as_str).unwrap_or_default();
        if !WORLD_FACT_SCOPES.contains(&scope) {
            continue;
        }
        let Some(text) = fact_text(fact) else {
            continue;
        };
        let ordinal = rows.len();
        let mut fact_id = fact
            .get("id")
            .and_then(Value::as_str)
            .filter(|id| !id.is_empty())
            .map(String::from)
            .unwrap_or_else(|| format!("worldfact_{ordinal:04}"));
        if taken.contains(&chunk_id(&fact_id, 0)) {
            let original = fact_id.clone();
            while taken.contains(&chunk_id(&fact_id, 0)) {
                fact_id = format!("{fact_id}_{ordinal}");
            }
            warn!(fact_id = %original, renamed = %fact_id, "Duplicate world fact id");
        }
        let id = chunk_id(&fact_id, 0);
        taken.insert(id.clone());

        let mut source = SourceLocator::new(CANON_FACTS_PATH, SourceKind::WorldFact);
        source.fact_id = Some(fact_id.clone());
        source.field_path = Some("value".into());
        rows.push(build(KbId::World, id, ordinal, text, source));
    }

    rows
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn upload_rows_carry_asset_locator() {
        let rows = rows_for_upload(
            AssetKind::Doc,
            "doc_0123456789",
            "harbor.txt",
            "临港城有三层港区。\n\n雨季交通中断会影响补给。",
            800,
        );
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[1].chunk_id, "doc_0123456789_c0001");
        assert_eq!(rows[1].kb_id, KbId::Docs);
        assert_eq!(rows[1].source.path, "assets/docs/doc_0123456789.txt");
        assert_eq!(rows[1].source.kind, SourceKind::Doc);
        assert_eq!(rows[1].source.filename.as_deref(), Some("harbor.txt"));
        assert_eq!(rows[1].source.paragraph_index, Some(1));
        assert_eq!(rows[1].asset_id.as_deref(), Some("doc_0123456789"));
    }

    #[test]
    fn style_uploads_go_to_style_kb() {
        let rows = rows_for_upload(AssetKind::StyleSample, "style_sample_x", "s.txt", "雨声很轻。", 800);
        assert_eq!(rows[0].kb_id, KbId::Style);
        assert_eq!(rows[0].source.path, "assets/style_samples/style_sample_x.txt");
    }

    #[test]
    fn chapter_rows_cite_line_ranges() {
        let rows = rows_for_chapter("chapter_001", "# Chapter 001\n\n林秋在雨夜收到匿名短信。", 500);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].chunk_id, "chapter_001_c0000");
        assert_eq!(rows[0].source.path, "drafts/chapter_001.md");
        assert_eq!(rows[0].chapter_id(), Some("chapter_001"));
        assert_eq!((rows[0].source.start_line, rows[0].source.end_line), (Some(1), Some(3)));
    }

    #[test]
    fn world_rows_from_cards_and_scoped_facts() {
        let card: Card = serde_json::from_value(json!({
            "id": "lore_001", "type": "lore", "payload": {"name": "潮汐税"}
        }))
        .unwrap();
        let facts = vec![
            json!({"id": "fact_001", "scope": "world_rule", "value": "港区夜间封锁"}),
            json!({"id": "fact_002", "scope": "character", "value": "林秋怕水"}),
            json!({"scope": "world_event", "value": "", "fact": "台风过境"}),
            json!({"id": "fact_004", "scope": "world_state"}),
        ];
        let rows = rows_for_world(&[("cards/lore_001.yaml".to_string(), card)], &facts);

        assert_eq!(rows.len(), 3);
        assert_eq!(rows[0].chunk_id, "lore_001_c0000");
        assert_eq!(rows[0].source.kind, SourceKind::WorldCard);
        assert_eq!(rows[0].source.card_path(), Some("cards/lore_001.yaml"));
        assert!(rows[0].text.contains("潮汐税"));

        assert_eq!(rows[1].chunk_id, "fact_001_c0000");
        assert_eq!(rows[1].source.fact_id.as_deref(), Some("fact_001"));
        assert_eq!(rows[1].ordinal, 1);

        assert_eq!(rows[2].text, "台风过境");
        assert_eq!(rows[2].chunk_id, "worldfact_0002_c0000");
    }

    #[test]
    fn shared_fact_ids_get_distinct_chunk_ids() {
        let facts = vec![
            json!({"id": "f1", "scope": "world_rule", "value": "港区夜间封锁"}),
            json!({"id": "f1", "scope": "world_rule", "value": "补给船每周一班"}),
            json!({"id": "f1_1", "scope": "world_state", "value": "潮位偏高"}),
        ];
        let rows = rows_for_world(&[], &facts);

        let ids: Vec<_> = rows.iter().map(|r| r.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["f1_c0000", "f1_1_c0000", "f1_1_2_c0000"]);
        assert_eq!(rows[1].source.fact_id.as_deref(), Some("f1_1"));
        assert_eq!(rows[1].text, "补给船每周一班");
    }

    #[test]
    fn fact_id_colliding_with_card_stem_is_renamed() {
        let card: Card = serde_json::from_value(json!({"id": "lore_001", "payload": {"name": "潮汐税"}})).unwrap();
        let facts = vec![json!({"id": "lore_001", "scope": "world_event", "value": "台风过境"})];
        let rows = rows_for_world(&[("cards/lore_001.yaml".to_string(), card)], &facts);
        assert_eq!(rows[0].chunk_id, "lore_001_c0000");
        assert_eq!(rows[1].chunk_id, "lore_001_1_c0000");
    }
}
