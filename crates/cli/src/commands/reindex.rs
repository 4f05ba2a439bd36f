//! `loreweave reindex` — Rebuild indexes.

use super::Engine;
use loreweave_core::ReindexTarget;

pub async fn run(
    engine: &Engine,
    project: &str,
    target: &str,
    chapter: Option<&str>,
) -> Result<(), Box<dyn std::error::Error>> {
    let reports = match chapter {
        Some(chapter_id) => vec![engine.kb.reindex_chapter(project, chapter_id).await?],
        None => {
            let target: ReindexTarget = target.parse()?;
            engine.kb.reindex(project, target).await?
        }
    };

    println!("🔁 Reindexed {project}");
    for report in &reports {
        println!("   {:<14} {:>6} chunks", report.kb_id.as_str(), report.chunks);
    }
    Ok(())
}
