//! `loreweave style-profile` — Derive a style guide from style samples.

use super::Engine;

pub async fn run(
    engine: &Engine,
    project: &str,
    card: Option<&str>,
    assets: &[String],
    mode: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let card = card.unwrap_or(&engine.config.manifest.style_card_id);
    let profile = engine.kb.style_profile(project, card, assets, mode).await?;

    println!("🎨 Style profile → cards/{card}.yaml");
    println!("   Avg sentence:   {:.2}", profile.stats.avg_sentence_len);
    println!("   Dialogue ratio: {:.4}", profile.stats.avg_dialogue_ratio);
    println!("   Exclamation:    {:.4}", profile.stats.avg_exclamation);
    println!();
    println!("   {}", profile.guide.sentence_length);
    println!("   {}", profile.guide.dialogue_ratio);
    println!("   {}", profile.guide.punctuation);
    println!("   {}", profile.guide.notes);
    Ok(())
}
