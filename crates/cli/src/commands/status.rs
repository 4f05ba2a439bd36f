//! `loreweave status` — Show configuration and per-project chunk counts.

use super::Engine;
use loreweave_config::EngineConfig;
use loreweave_core::KbId;

pub async fn run(engine: &Engine) -> Result<(), Box<dyn std::error::Error>> {
    let config = &engine.config;

    println!("📚 Loreweave Status");
    println!("===================");
    println!("  Config dir:    {}", EngineConfig::config_dir().display());
    println!("  Data dir:      {}", config.data_dir.display());
    println!("  Token budget:  {}", config.budget.total);
    println!("  Chunk cap:     {} chars", config.chunking.paragraph_max_chars);
    println!("  Line group:    {} chars", config.chunking.manuscript_line_threshold);

    let config_path = EngineConfig::config_dir().join("config.toml");
    if config_path.exists() {
        println!("\n  ✅ Config file found");
    } else {
        println!("\n  ⚠️  No config file, using defaults (`loreweave config init` writes one)");
    }

    let projects = engine.store.list_projects().await?;
    println!();
    if projects.is_empty() {
        println!("  No projects yet. Run `loreweave seed-demo` to create one.");
        return Ok(());
    }
    println!("  {:<24} {:>8} {:>8} {:>8} {:>8}", "project", "style", "docs", "ms", "world");
    for project in &projects {
        let mut counts = Vec::with_capacity(KbId::ALL.len());
        for kb in KbId::ALL {
            counts.push(engine.kb.chunk_count(project, kb).await?);
        }
        println!(
            "  {:<24} {:>8} {:>8} {:>8} {:>8}",
            project, counts[0], counts[1], counts[2], counts[3]
        );
    }
    Ok(())
}
