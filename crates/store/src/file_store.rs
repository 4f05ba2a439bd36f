//! File-tree store — one directory per project, JSON-lines chunk logs.
//!
//! Layout under the data root:
//!
//! ```text
//! <project>/meta/kb/<kb_id>/chunks.jsonl   one JSON chunk per line
//! <project>/meta/kb/<kb_id>/bm25.json      serialized index
//! <project>/cards/*.yaml                   card records (JSON content)
//! <project>/canon/*.jsonl                  append-only record logs
//! <project>/drafts/*.md, assets/**         plain text
//! ```
//!
//! Files are human-inspectable. Corrupted lines are skipped on read.

use crate::path::{normalize_relative, resolve, validate_project_id};
use async_trait::async_trait;
use loreweave_core::{Bm25Index, Chunk, KbId, Store, StoreError};
use serde::Serialize;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `root`. Directories are created lazily on
    /// first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        debug!(root = %root.display(), "File store opened");
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Project ids present under the root, sorted.
    pub async fn list_projects(&self) -> Result<Vec<String>, StoreError> {
        let mut projects = Vec::new();
        let mut entries = match tokio::fs::read_dir(&self.root).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(projects),
            Err(e) => return Err(io_error(&self.root, e)),
        };
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&self.root, e))? {
            let is_dir = entry
                .file_type()
                .await
                .map(|t| t.is_dir())
                .unwrap_or(false);
            if is_dir {
                projects.push(entry.file_name().to_string_lossy().into_owned());
            }
        }
        projects.sort();
        Ok(projects)
    }

    fn kb_file(&self, project_id: &str, kb: KbId, file: &str) -> Result<PathBuf, StoreError> {
        resolve(&self.root, project_id, &format!("meta/kb/{kb}/{file}"))
    }

    async fn read_optional(path: &Path) -> Result<Option<String>, StoreError> {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(path, e)),
        }
    }

    async fn ensure_parent(path: &Path) -> Result<(), StoreError> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }
        Ok(())
    }

    async fn write_file(path: &Path, content: &[u8]) -> Result<(), StoreError> {
        Self::ensure_parent(path).await?;
        tokio::fs::write(path, content)
            .await
            .map_err(|e| io_error(path, e))
    }

    async fn append_file(path: &Path, content: &[u8]) -> Result<(), StoreError> {
        Self::ensure_parent(path).await?;
        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .await
            .map_err(|e| io_error(path, e))?;
        file.write_all(content).await.map_err(|e| io_error(path, e))?;
        file.flush().await.map_err(|e| io_error(path, e))
    }

    /// Parse a JSONL document, skipping blank and corrupted lines.
    fn parse_lines<T: serde::de::DeserializeOwned>(path: &Path, content: &str) -> Vec<T> {
        content
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| match serde_json::from_str::<T>(line) {
                Ok(row) => Some(row),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping corrupted line");
                    None
                }
            })
            .collect()
    }
}

fn io_error(path: &Path, e: std::io::Error) -> StoreError {
    StoreError::Io {
        path: path.display().to_string(),
        reason: e.to_string(),
    }
}

fn to_jsonl<T: Serialize>(path: &Path, rows: &[T]) -> Result<String, StoreError> {
    let mut content = String::new();
    for row in rows {
        let line = serde_json::to_string(row).map_err(|e| StoreError::Serialization {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        content.push_str(&line);
        content.push('\n');
    }
    Ok(content)
}

fn to_pretty<T: Serialize>(path: &Path, value: &T) -> Result<String, StoreError> {
    serde_json::to_string_pretty(value).map_err(|e| StoreError::Serialization {
        path: path.display().to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
impl Store for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn read_chunks(&self, project_id: &str, kb: KbId) -> Result<Vec<Chunk>, StoreError> {
        let path = self.kb_file(project_id, kb, "chunks.jsonl")?;
        Ok(match Self::read_optional(&path).await? {
            Some(content) => Self::parse_lines(&path, &content),
            None => Vec::new(),
        })
    }

    async fn append_chunks(
        &self,
        project_id: &str,
        kb: KbId,
        chunks: &[Chunk],
    ) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }
        let path = self.kb_file(project_id, kb, "chunks.jsonl")?;
        let content = to_jsonl(&path, chunks)?;
        Self::append_file(&path, content.as_bytes()).await
    }

    async fn replace_chunks(
        &self,
        project_id: &str,
        kb: KbId,
        chunks: &[Chunk],
    ) -> Result<(), StoreError> {
        let path = self.kb_file(project_id, kb, "chunks.jsonl")?;
        let content = to_jsonl(&path, chunks)?;
        Self::write_file(&path, content.as_bytes()).await
    }

    async fn read_index(&self, project_id: &str, kb: KbId) -> Result<Option<Bm25Index>, StoreError> {
        let path = self.kb_file(project_id, kb, "bm25.json")?;
        let Some(content) = Self::read_optional(&path).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&content) {
            Ok(index) => Ok(Some(index)),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable index, treating as missing");
                Ok(None)
            }
        }
    }

    async fn write_index(
        &self,
        project_id: &str,
        kb: KbId,
        index: &Bm25Index,
    ) -> Result<(), StoreError> {
        let path = self.kb_file(project_id, kb, "bm25.json")?;
        let content = serde_json::to_string(index).map_err(|e| StoreError::Serialization {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::write_file(&path, content.as_bytes()).await
    }

    async fn read_record(&self, project_id: &str, path: &str) -> Result<Option<Value>, StoreError> {
        let full = resolve(&self.root, project_id, path)?;
        let Some(content) = Self::read_optional(&full).await? else {
            return Ok(None);
        };
        match serde_json::from_str(&content) {
            Ok(value) => Ok(Some(value)),
            Err(e) => {
                warn!(path = %full.display(), error = %e, "Skipping corrupted record");
                Ok(None)
            }
        }
    }

    async fn write_record(
        &self,
        project_id: &str,
        path: &str,
        value: &Value,
    ) -> Result<(), StoreError> {
        let full = resolve(&self.root, project_id, path)?;
        let content = to_pretty(&full, value)?;
        Self::write_file(&full, content.as_bytes()).await
    }

    async fn read_records(&self, project_id: &str, path: &str) -> Result<Vec<Value>, StoreError> {
        let full = resolve(&self.root, project_id, path)?;
        Ok(match Self::read_optional(&full).await? {
            Some(content) => Self::parse_lines(&full, &content),
            None => Vec::new(),
        })
    }

    async fn append_record(
        &self,
        project_id: &str,
        path: &str,
        value: &Value,
    ) -> Result<(), StoreError> {
        let full = resolve(&self.root, project_id, path)?;
        let content = to_jsonl(&full, std::slice::from_ref(value))?;
        Self::append_file(&full, content.as_bytes()).await
    }

    async fn read_text(&self, project_id: &str, path: &str) -> Result<Option<String>, StoreError> {
        let full = resolve(&self.root, project_id, path)?;
        Self::read_optional(&full).await
    }

    async fn write_text(&self, project_id: &str, path: &str, text: &str) -> Result<(), StoreError> {
        let full = resolve(&self.root, project_id, path)?;
        Self::write_file(&full, text.as_bytes()).await
    }

    async fn list_files(
        &self,
        project_id: &str,
        dir: &str,
        prefix: &str,
        suffix: &str,
    ) -> Result<Vec<String>, StoreError> {
        let project = validate_project_id(project_id)?;
        let relative_dir = if dir.trim_matches('/').is_empty() {
            String::new()
        } else {
            normalize_relative(dir)?
        };
        let full_dir = self.root.join(project).join(&relative_dir);

        let mut entries = match tokio::fs::read_dir(&full_dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(io_error(&full_dir, e)),
        };

        let mut paths = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| io_error(&full_dir, e))? {
            let is_file = entry
                .file_type()
                .await
                .map(|t| t.is_file())
                .unwrap_or(false);
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_file && name.starts_with(prefix) && name.ends_with(suffix) {
                paths.push(if relative_dir.is_empty() {
                    name
                } else {
                    format!("{relative_dir}/{name}")
                });
            }
        }
        paths.sort();
        Ok(paths)
    }
}
