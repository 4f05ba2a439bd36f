//! `loreweave manifest` — Build the context manifest for a scene.

use super::Engine;
use loreweave_core::{Constraints, ScenePlan, Store};
use serde_json::Value;
use std::path::Path;

pub const BLUEPRINT_PATH: &str = "cards/blueprint_001.json";

/// The scene to build for: an explicit JSON file, else the first scene of
/// the project blueprint, else an empty scene.
async fn load_scene(
    engine: &Engine,
    project: &str,
    scene: Option<&Path>,
) -> Result<ScenePlan, Box<dyn std::error::Error>> {
    if let Some(path) = scene {
        let raw = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;
        return Ok(serde_json::from_str(&raw)?);
    }
    let first = engine
        .store
        .read_record(project, BLUEPRINT_PATH)
        .await?
        .and_then(|b| b.get("scene_plan").and_then(|p| p.get(0)).cloned());
    match first {
        Some(value) => Ok(serde_json::from_value(value)?),
        None => {
            tracing::warn!(project, "No scene given and no blueprint scene found");
            Ok(ScenePlan::default())
        }
    }
}

pub async fn run(
    engine: &Engine,
    project: &str,
    chapter: &str,
    scene: Option<&Path>,
    max_tokens: Option<usize>,
) -> Result<(), Box<dyn std::error::Error>> {
    let scene = load_scene(engine, project, scene).await?;
    let constraints = Constraints {
        max_tokens,
        ..Default::default()
    };
    let manifest = engine
        .assembler()
        .build_manifest(project, chapter, &scene, &constraints)
        .await?;
    let value: Value = serde_json::to_value(&manifest)?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
