//! `loreweave world-facts` — World-lore lookup.

use super::{Engine, print_results};

pub async fn run(
    engine: &Engine,
    project: &str,
    text: &str,
    top_k: usize,
    include_global: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let results = engine
        .kb
        .world_facts(project, text, top_k, include_global)
        .await?;
    if !json {
        println!("🌍 World facts for: \"{text}\"");
    }
    print_results(&results, json)
}
