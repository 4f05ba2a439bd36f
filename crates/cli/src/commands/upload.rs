//! `loreweave upload` — Add a style sample or reference document.

use super::Engine;
use loreweave_core::AssetKind;
use std::path::Path;

pub async fn run(
    engine: &Engine,
    project: &str,
    file: &Path,
    kind: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let kind: AssetKind = kind.parse()?;
    let raw = tokio::fs::read_to_string(file)
        .await
        .map_err(|e| format!("Failed to read {}: {e}", file.display()))?;
    let filename = file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload.txt".to_string());

    let receipt = engine.kb.upload(project, kind, &filename, &raw).await?;

    println!("📥 Uploaded {filename}");
    println!("   Asset:   {}", receipt.asset_id);
    println!("   Saved:   {}", receipt.saved_path);
    println!("   Indexed: {} chunks into {}", receipt.chunks, receipt.kb_id);
    for warning in &receipt.warnings {
        println!("   ⚠️  {warning}");
    }
    Ok(())
}
