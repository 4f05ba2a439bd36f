//! In-memory store — useful for testing and ephemeral sessions.

use crate::path::{normalize_relative, validate_project_id};
use async_trait::async_trait;
use loreweave_core::{Bm25Index, Chunk, KbId, Store, StoreError};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

type Key = (String, String);

#[derive(Default)]
struct State {
    chunks: BTreeMap<(String, KbId), Vec<Chunk>>,
    indexes: BTreeMap<(String, KbId), Bm25Index>,
    records: BTreeMap<Key, Value>,
    logs: BTreeMap<Key, Vec<Value>>,
    texts: BTreeMap<Key, String>,
}

/// A store that keeps every project in process memory.
/// Useful for testing and sessions where persistence isn't needed.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    state: Arc<RwLock<State>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn key(project_id: &str, path: &str) -> Result<Key, StoreError> {
    Ok((
        validate_project_id(project_id)?.to_string(),
        normalize_relative(path)?,
    ))
}

fn kb_key(project_id: &str, kb: KbId) -> Result<(String, KbId), StoreError> {
    Ok((validate_project_id(project_id)?.to_string(), kb))
}

/// Whether `path` names a file directly under `dir` matching the pattern.
fn listed(path: &str, dir: &str, prefix: &str, suffix: &str) -> bool {
    let Some((parent, name)) = path.rsplit_once('/') else {
        return dir.is_empty() && path.starts_with(prefix) && path.ends_with(suffix);
    };
    parent == dir && name.starts_with(prefix) && name.ends_with(suffix)
}

#[async_trait]
impl Store for InMemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn read_chunks(&self, project_id: &str, kb: KbId) -> Result<Vec<Chunk>, StoreError> {
        let k = kb_key(project_id, kb)?;
        Ok(self.state.read().await.chunks.get(&k).cloned().unwrap_or_default())
    }

    async fn append_chunks(
        &self,
        project_id: &str,
        kb: KbId,
        chunks: &[Chunk],
    ) -> Result<(), StoreError> {
        let k = kb_key(project_id, kb)?;
        self.state
            .write()
            .await
            .chunks
            .entry(k)
            .or_default()
            .extend_from_slice(chunks);
        Ok(())
    }

    async fn replace_chunks(
        &self,
        project_id: &str,
        kb: KbId,
        chunks: &[Chunk],
    ) -> Result<(), StoreError> {
        let k = kb_key(project_id, kb)?;
        self.state.write().await.chunks.insert(k, chunks.to_vec());
        Ok(())
    }

    async fn read_index(&self, project_id: &str, kb: KbId) -> Result<Option<Bm25Index>, StoreError> {
        let k = kb_key(project_id, kb)?;
        Ok(self.state.read().await.indexes.get(&k).cloned())
    }

    async fn write_index(
        &self,
        project_id: &str,
        kb: KbId,
        index: &Bm25Index,
    ) -> Result<(), StoreError> {
        let k = kb_key(project_id, kb)?;
        self.state.write().await.indexes.insert(k, index.clone());
        Ok(())
    }

    async fn read_record(&self, project_id: &str, path: &str) -> Result<Option<Value>, StoreError> {
        let k = key(project_id, path)?;
        Ok(self.state.read().await.records.get(&k).cloned())
    }

    async fn write_record(
        &self,
        project_id: &str,
        path: &str,
        value: &Value,
    ) -> Result<(), StoreError> {
        let k = key(project_id, path)?;
        self.state.write().await.records.insert(k, value.clone());
        Ok(())
    }

    async fn read_records(&self, project_id: &str, path: &str) -> Result<Vec<Value>, StoreError> {
        let k = key(project_id, path)?;
        Ok(self.state.read().await.logs.get(&k).cloned().unwrap_or_default())
    }

    async fn append_record(
        &self,
        project_id: &str,
        path: &str,
        value: &Value,
    ) -> Result<(), StoreError> {
        let k = key(project_id, path)?;
        self.state
            .write()
            .await
            .logs
            .entry(k)
            .or_default()
            .push(value.clone());
        Ok(())
    }

    async fn read_text(&self, project_id: &str, path: &str) -> Result<Option<String>, StoreError> {
        let k = key(project_id, path)?;
        Ok(self.state.read().await.texts.get(&k).cloned())
    }

    async fn write_text(&self, project_id: &str, path: &str, text: &str) -> Result<(), StoreError> {
        let k = key(project_id, path)?;
        self.state.write().await.texts.insert(k, text.to_string());
        Ok(())
    }

    async fn list_files(
        &self,
        project_id: &str,
        dir: &str,
        prefix: &str,
        suffix: &str,
    ) -> Result<Vec<String>, StoreError> {
        let project = validate_project_id(project_id)?;
        let dir = if dir.trim_matches('/').is_empty() {
            String::new()
        } else {
            normalize_relative(dir)?
        };
        let state = self.state.read().await;

        let mut paths: Vec<String> = state
            .records
            .keys()
            .chain(state.logs.keys())
            .chain(state.texts.keys())
            .filter(|(p, path)| p == project && listed(path, &dir, prefix, suffix))
            .map(|(_, path)| path.clone())
            .collect();
        paths.sort();
        paths.dedup();
        Ok(paths)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use loreweave_core::{SourceKind, SourceLocator, TextFeatures};
    use serde_json::json;

    fn chunk(id: &str) -> Chunk {
        Chunk {
            chunk_id: id.into(),
            kb_id: KbId::Docs,
            asset_id: None,
            ordinal: 0,
            text: "临港城有三层港区。".into(),
            cleaned_text: "临港城有三层港区。".into(),
            features: TextFeatures::default(),
            source: SourceLocator::new("assets/docs/doc_1.txt", SourceKind::Doc),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn append_then_replace_chunks() {
        let store = InMemoryStore::new();
        store.append_chunks("demo", KbId::Docs, &[chunk("a"), chunk("b")]).await.unwrap();
        assert_eq!(store.read_chunks("demo", KbId::Docs).await.unwrap().len(), 2);

        store.replace_chunks("demo", KbId::Docs, &[chunk("c")]).await.unwrap();
        let chunks = store.read_chunks("demo", KbId::Docs).await.unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].chunk_id, "c");
    }

    #[tokio::test]
    async fn projects_are_isolated() {
        let store = InMemoryStore::new();
        store.append_chunks("one", KbId::Docs, &[chunk("a")]).await.unwrap();
        assert!(store.read_chunks("two", KbId::Docs).await.unwrap().is_empty());
        assert!(store.read_chunks("one", KbId::Style).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn list_files_matches_direct_children_only() {
        let store = InMemoryStore::new();
        store.write_record("demo", "cards/lore_001.yaml", &json!({})).await.unwrap();
        store.write_record("demo", "cards/lore_002.yaml", &json!({})).await.unwrap();
        store.write_record("demo", "cards/character_001.yaml", &json!({})).await.unwrap();
        store.write_record("demo", "cards/old/lore_009.yaml", &json!({})).await.unwrap();
        store.write_text("demo", "drafts/chapter_002.md", "b").await.unwrap();
        store.write_text("demo", "drafts/chapter_001.md", "a").await.unwrap();

        let lore = store.list_files("demo", "cards", "lore_", ".yaml").await.unwrap();
        assert_eq!(lore, vec!["cards/lore_001.yaml", "cards/lore_002.yaml"]);

        let drafts = store.list_files("demo", "drafts", "chapter_", ".md").await.unwrap();
        assert_eq!(drafts, vec!["drafts/chapter_001.md", "drafts/chapter_002.md"]);
    }

    #[tokio::test]
    async fn traversal_is_rejected() {
        let store = InMemoryStore::new();
        let result = store.read_text("demo", "../other/drafts/chapter_001.md").await;
        assert!(matches!(result, Err(StoreError::PathTraversal(_))));
    }

    #[tokio::test]
    async fn jsonl_logs_append_in_order() {
        let store = InMemoryStore::new();
        store.append_record("demo", "canon/facts.jsonl", &json!({"id": 1})).await.unwrap();
        store.append_record("demo", "canon/facts.jsonl", &json!({"id": 2})).await.unwrap();
        let facts = store.read_records("demo", "canon/facts.jsonl").await.unwrap();
        assert_eq!(facts, vec![json!({"id": 1}), json!({"id": 2})]);
        assert!(store.read_records("demo", "canon/issues.jsonl").await.unwrap().is_empty());
    }
}
