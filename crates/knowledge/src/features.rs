//! Stylistic features computed once per chunk at write time.

use loreweave_core::{PunctuationProfile, TextFeatures};
use std::collections::HashMap;

const MAX_TOP_TERMS: usize = 8;

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// `[一-龥A-Za-z0-9]`
fn is_term_char(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c) || c.is_ascii_alphanumeric()
}

pub fn text_features(text: &str) -> TextFeatures {
    let len = text.chars().count();
    let denom = len.max(1) as f64;
    let count = |targets: &[char]| text.chars().filter(|c| targets.contains(c)).count() as f64;

    let sentences: Vec<&str> = text
        .split(['。', '！', '？', '!', '?'])
        .filter(|s| !s.trim().is_empty())
        .collect();
    let avg_sentence_len = if sentences.is_empty() {
        len as f64
    } else {
        sentences.iter().map(|s| s.chars().count()).sum::<usize>() as f64 / sentences.len() as f64
    };

    TextFeatures {
        avg_sentence_len: round_to(avg_sentence_len, 2),
        dialogue_ratio: round_to(count(&['“', '”', ':', '：']) / denom, 4),
        punctuation_profile: PunctuationProfile {
            comma: count(&['，']) / denom,
            period: count(&['。']) / denom,
            exclamation: count(&['!', '！']) / denom,
        },
        top_terms: top_terms(text),
    }
}

/// The most frequent lowercased runs of two or more term characters.
/// Ties keep first-occurrence order.
fn top_terms(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    let mut order: Vec<String> = Vec::new();
    let mut counts: HashMap<String, usize> = HashMap::new();

    let mut run = String::new();
    let mut flush = |run: &mut String| {
        if run.chars().count() >= 2 {
            let counter = counts.entry(run.clone()).or_insert(0);
            if *counter == 0 {
                order.push(run.clone());
            }
            *counter += 1;
        }
        run.clear();
    };
    for c in lowered.chars() {
        if is_term_char(c) {
            run.push(c);
        } else {
            flush(&mut run);
        }
    }
    flush(&mut run);

    // `sort_by` is stable, so equal counts stay in first-seen order.
    let mut ranked: Vec<(usize, String)> = order
        .into_iter()
        .map(|term| (counts[&term], term))
        .collect();
    ranked.sort_by(|a, b| b.0.cmp(&a.0));
    ranked
        .into_iter()
        .take(MAX_TOP_TERMS)
        .map(|(_, term)| term)
        .collect()
}
