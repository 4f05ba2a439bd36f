//! `loreweave query` and `loreweave query-multi`.

use super::{Engine, print_results};
use loreweave_core::{KbId, QueryFilters, WeightedSource};

pub async fn single(
    engine: &Engine,
    project: &str,
    kb: &str,
    text: &str,
    top_k: usize,
    filters: &QueryFilters,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let kb: KbId = kb.parse()?;
    let results = engine.kb.query(project, kb, text, top_k, filters).await?;
    if !json {
        println!("🔍 {kb} for: \"{text}\"");
    }
    print_results(&results, json)
}

/// Parse `kb_id=weight`. A bare `kb_id` has weight 1.0.
pub fn parse_source(source: &str) -> Result<WeightedSource, Box<dyn std::error::Error>> {
    let (kb, weight) = match source.split_once('=') {
        Some((kb, weight)) => {
            let weight: f64 = weight
                .trim()
                .parse()
                .map_err(|_| format!("Invalid weight in source '{source}'"))?;
            (kb.trim(), weight)
        }
        None => (source.trim(), 1.0),
    };
    Ok(WeightedSource::new(kb.parse()?, weight))
}

pub async fn multi(
    engine: &Engine,
    project: &str,
    text: &str,
    top_k: usize,
    sources: &[String],
    critic: bool,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let sources = if !sources.is_empty() {
        sources
            .iter()
            .map(|s| parse_source(s))
            .collect::<Result<Vec<_>, _>>()?
    } else if critic {
        engine.config.retrieval.critic_profile.clone()
    } else {
        engine.config.retrieval.writer_profile.clone()
    };

    let results = engine
        .kb
        .query_multi(project, text, top_k, &sources, &QueryFilters::none())
        .await?;
    if !json {
        let weights: Vec<String> = sources
            .iter()
            .map(|s| format!("{}={}", s.kb_id, s.weight))
            .collect();
        println!("🔍 Merged query for: \"{text}\"  ({})", weights.join(", "));
    }
    print_results(&results, json)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_weighted_and_bare_sources() {
        let s = parse_source("kb_manuscript=1.2").unwrap();
        assert_eq!(s.kb_id, KbId::Manuscript);
        assert_eq!(s.weight, 1.2);

        let s = parse_source("kb_docs").unwrap();
        assert_eq!(s.weight, 1.0);
    }

    #[test]
    fn rejects_unknown_kb_and_bad_weight() {
        assert!(parse_source("kb_plot=1").is_err());
        assert!(parse_source("kb_docs=heavy").is_err());
    }
}
