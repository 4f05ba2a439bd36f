//! `loreweave seed-demo` — Create and index the demo project.

use super::Engine;
use loreweave_core::{AssetKind, ReindexTarget};
use loreweave_store::demo::{DEMO_STYLE_ASSET_ID, DEMO_STYLE_SAMPLE, seed_demo_project};

pub async fn run(engine: &Engine, project: &str) -> Result<(), Box<dyn std::error::Error>> {
    seed_demo_project(engine.store.as_ref(), project).await?;
    engine
        .kb
        .ingest_asset(
            project,
            AssetKind::StyleSample,
            DEMO_STYLE_ASSET_ID,
            &format!("{DEMO_STYLE_ASSET_ID}.txt"),
            DEMO_STYLE_SAMPLE,
        )
        .await?;
    let reports = engine.kb.reindex(project, ReindexTarget::All).await?;

    println!("🌱 Seeded demo project '{project}'");
    println!("   Data dir: {}", engine.store.root().join(project).display());
    for report in &reports {
        println!("   {:<14} {:>6} chunks", report.kb_id.as_str(), report.chunks);
    }
    println!("\n   Try: loreweave -p {project} manifest chapter_001");
    Ok(())
}
