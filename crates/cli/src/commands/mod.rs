//! Subcommand implementations.

pub mod config_cmd;
pub mod manifest;
pub mod query;
pub mod reindex;
pub mod seed;
pub mod status;
pub mod style;
pub mod upload;
pub mod world;

use loreweave_config::EngineConfig;
use loreweave_context::ManifestAssembler;
use loreweave_core::ScoredResult;
use loreweave_knowledge::{KnowledgeBase, KnowledgeConfig};
use loreweave_store::FileStore;
use std::path::PathBuf;
use std::sync::Arc;

/// Configuration plus the services every command works through.
pub struct Engine {
    pub config: EngineConfig,
    pub store: Arc<FileStore>,
    pub kb: Arc<KnowledgeBase<FileStore>>,
}

impl Engine {
    pub fn open(data_dir: Option<PathBuf>) -> Result<Self, Box<dyn std::error::Error>> {
        let mut config = EngineConfig::load().map_err(|e| format!("Failed to load config: {e}"))?;
        if let Some(dir) = data_dir {
            config.data_dir = dir;
        }
        let store = Arc::new(FileStore::new(config.data_dir.clone()));
        let kb = Arc::new(KnowledgeBase::new(store.clone(), KnowledgeConfig::from(&config)));
        Ok(Self { config, store, kb })
    }

    pub fn assembler(&self) -> ManifestAssembler<FileStore> {
        ManifestAssembler::new(self.kb.clone(), &self.config)
    }
}

fn snippet(text: &str, max: usize) -> String {
    let flat: String = text.chars().map(|c| if c == '\n' { ' ' } else { c }).collect();
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max).collect();
        format!("{cut}…")
    }
}

/// Print ranked results, either as JSON or as a numbered list.
pub fn print_results(results: &[ScoredResult], json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(results)?);
        return Ok(());
    }
    if results.is_empty() {
        println!("   No results.");
        return Ok(());
    }
    for (i, r) in results.iter().enumerate() {
        println!(
            "  {:>2}. [{}] score {:.3} (bm25 {:.3} × {:.2})  {}",
            i + 1,
            r.kb_id,
            r.score,
            r.retrieval_score,
            r.score_multiplier,
            r.chunk_id
        );
        println!("      {}", snippet(&r.text, 80));
        println!("      ↳ {}", r.source.path);
    }
    Ok(())
}
