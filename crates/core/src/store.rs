//! Store trait — persistent storage primitives for a project tree.
//!
//! Every path is relative to the project root. Backends must reject paths
//! that escape it. Malformed stored data is never an error at this layer:
//! backends skip corrupted chunk rows and treat an unreadable index as
//! missing, logging a warning in both cases.

use crate::chunk::Chunk;
use crate::error::StoreError;
use crate::index::Bm25Index;
use crate::kb::KbId;
use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;

type StoreResult<T> = std::result::Result<T, StoreError>;

/// Implementations: in-memory (for testing), file tree.
#[async_trait]
pub trait Store: Send + Sync {
    /// The backend name (e.g., "memory", "file").
    fn name(&self) -> &str;

    // --- Chunk logs ---

    /// All chunks of a knowledge base, in insertion order.
    async fn read_chunks(&self, project_id: &str, kb: KbId) -> StoreResult<Vec<Chunk>>;

    async fn append_chunks(&self, project_id: &str, kb: KbId, chunks: &[Chunk]) -> StoreResult<()>;

    /// Replace the whole chunk log.
    async fn replace_chunks(&self, project_id: &str, kb: KbId, chunks: &[Chunk])
    -> StoreResult<()>;

    // --- Index ---

    async fn read_index(&self, project_id: &str, kb: KbId) -> StoreResult<Option<Bm25Index>>;

    async fn write_index(&self, project_id: &str, kb: KbId, index: &Bm25Index) -> StoreResult<()>;

    // --- JSON records ---

    async fn read_record(&self, project_id: &str, path: &str) -> StoreResult<Option<Value>>;

    async fn write_record(&self, project_id: &str, path: &str, value: &Value) -> StoreResult<()>;

    /// Every well-formed line of a JSONL log. Missing log → empty.
    async fn read_records(&self, project_id: &str, path: &str) -> StoreResult<Vec<Value>>;

    async fn append_record(&self, project_id: &str, path: &str, value: &Value) -> StoreResult<()>;

    // --- Text ---

    async fn read_text(&self, project_id: &str, path: &str) -> StoreResult<Option<String>>;

    async fn write_text(&self, project_id: &str, path: &str, text: &str) -> StoreResult<()>;

    /// Paths (relative to the project root, sorted) of the files directly
    /// under `dir` whose names start with `prefix` and end with `suffix`.
    async fn list_files(
        &self,
        project_id: &str,
        dir: &str,
        prefix: &str,
        suffix: &str,
    ) -> StoreResult<Vec<String>>;
}

/// Read a JSON record and decode it as `T`.
///
/// A record that exists but does not decode is logged and treated as
/// missing.
pub async fn read_record_as<T, S>(store: &S, project_id: &str, path: &str) -> StoreResult<Option<T>>
where
    T: DeserializeOwned,
    S: Store + ?Sized,
{
    let Some(value) = store.read_record(project_id, path).await? else {
        return Ok(None);
    };
    match serde_json::from_value(value) {
        Ok(decoded) => Ok(Some(decoded)),
        Err(e) => {
            tracing::warn!(project = project_id, path, error = %e, "Skipping malformed record");
            Ok(None)
        }
    }
}
