//! Style profiling over uploaded style samples.

use crate::service::KnowledgeBase;
use loreweave_core::{KbId, KnowledgeError, QueryFilters, Store, TextFeatures};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::info;

pub const STYLE_PROFILE_PATH: &str = "meta/summaries/style_profile.json";

const DEFAULT_SENTENCE_LEN: f64 = 24.0;
const DEFAULT_DIALOGUE_RATIO: f64 = 0.03;
const DEFAULT_EXCLAMATION: f64 = 0.001;
const SAMPLE_LIMIT: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StyleStats {
    pub avg_sentence_len: f64,
    pub avg_dialogue_ratio: f64,
    pub avg_exclamation: f64,
}

/// Human-readable writing hints injected into the generator prompt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleGuide {
    pub sentence_length: String,
    pub dialogue_ratio: String,
    pub punctuation: String,
    pub notes: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StyleProfile {
    pub style_card_id: String,
    pub mode: String,
    pub assets: Vec<String>,
    pub stats: StyleStats,
    pub guide: StyleGuide,
}

/// Mean features over the sampled chunks. No samples gives the house
/// defaults.
pub fn style_stats<'a, I>(features: I) -> StyleStats
where
    I: IntoIterator<Item = &'a TextFeatures>,
{
    let mut n = 0usize;
    let (mut sentence, mut dialogue, mut exclamation) = (0.0, 0.0, 0.0);
    for f in features {
        n += 1;
        sentence += f.avg_sentence_len;
        dialogue += f.dialogue_ratio;
        exclamation += f.punctuation_profile.exclamation;
    }
    if n == 0 {
        return StyleStats {
            avg_sentence_len: DEFAULT_SENTENCE_LEN,
            avg_dialogue_ratio: DEFAULT_DIALOGUE_RATIO,
            avg_exclamation: DEFAULT_EXCLAMATION,
        };
    }
    let n = n as f64;
    StyleStats {
        avg_sentence_len: sentence / n,
        avg_dialogue_ratio: dialogue / n,
        avg_exclamation: exclamation / n,
    }
}

pub fn style_guide(stats: &StyleStats) -> StyleGuide {
    let sentence = stats.avg_sentence_len.clamp(12.0, 36.0) as u32;
    StyleGuide {
        sentence_length: format!("推荐句长约 {sentence} 字"),
        dialogue_ratio: if stats.avg_dialogue_ratio < 0.06 {
            "对白占比中低"
        } else {
            "对白占比中高"
        }
        .into(),
        punctuation: if stats.avg_exclamation < 0.003 {
            "尽量减少感叹号"
        } else {
            "允许少量感叹号"
        }
        .into(),
        notes: "保持冷静观察视角，优先动作与细节。".into(),
    }
}

/// Fold a freshly derived guide into a style card, keeping any injection
/// policy and locks the author already set.
fn apply_to_card(card: Value, card_id: &str, guide: &StyleGuide, asset_ids: &[String]) -> Value {
    let mut card = match card {
        Value::Object(map) => map,
        _ => {
            let mut map = Map::new();
            map.insert("id".into(), json!(card_id));
            map.insert("type".into(), json!("style"));
            map
        }
    };
    let mut payload = match card.remove("payload") {
        Some(Value::Object(p)) => p,
        _ => Map::new(),
    };
    payload.insert("style_guide".into(), json!(guide));
    payload.insert("active_style_sample_asset_ids".into(), json!(asset_ids));
    payload
        .entry("injection_policy")
        .or_insert_with(|| json!({"max_examples": 5, "max_chars_per_example": 800}));
    payload.entry("locks").or_insert_with(
        || json!({"pov": true, "tense": true, "punctuation": true, "taboo_words": true}),
    );
    card.insert("payload".into(), Value::Object(payload));
    Value::Object(card)
}

impl<S: Store + ?Sized + 'static> KnowledgeBase<S> {
    /// Profile the style samples in `asset_ids` (all samples when empty),
    /// write the derived guide into the style card and persist the profile
    /// under [`STYLE_PROFILE_PATH`].
    pub async fn style_profile(
        &self,
        project_id: &str,
        style_card_id: &str,
        asset_ids: &[String],
        mode: &str,
    ) -> Result<StyleProfile, KnowledgeError> {
        let (query, filters) = if asset_ids.is_empty() {
            ("风格 叙事".to_string(), QueryFilters::none())
        } else {
            (
                asset_ids.join(" "),
                QueryFilters::none().with_asset_ids(asset_ids.iter().cloned()),
            )
        };
        let mut samples = self
            .query(project_id, KbId::Style, &query, SAMPLE_LIMIT, &filters)
            .await?;
        if samples.is_empty() {
            samples = self
                .query(project_id, KbId::Style, "叙事 对白 节奏", SAMPLE_LIMIT, &QueryFilters::none())
                .await?;
        }

        let stats = style_stats(samples.iter().map(|r| &r.features));
        let guide = style_guide(&stats);

        let card_path = format!("cards/{style_card_id}.yaml");
        let card = self
            .store()
            .read_record(project_id, &card_path)
            .await?
            .unwrap_or(Value::Null);
        let card = apply_to_card(card, style_card_id, &guide, asset_ids);
        self.store().write_record(project_id, &card_path, &card).await?;

        let profile = StyleProfile {
            style_card_id: style_card_id.to_string(),
            mode: mode.to_string(),
            assets: asset_ids.to_vec(),
            stats,
            guide,
        };
        self.store()
            .write_record(project_id, STYLE_PROFILE_PATH, &json!(profile))
            .await?;
        info!(
            project = project_id,
            style_card = style_card_id,
            samples = samples.len(),
            "Style profile updated"
        );
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::KnowledgeConfig;
    use loreweave_core::{AssetKind, PunctuationProfile};
    use loreweave_store::InMemoryStore;
    use std::sync::Arc;

    fn features(len: f64, dialogue: f64, exclamation: f64) -> TextFeatures {
        TextFeatures {
            avg_sentence_len: len,
            dialogue_ratio: dialogue,
            punctuation_profile: PunctuationProfile {
                exclamation,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn no_samples_use_defaults() {
        let stats = style_stats(std::iter::empty());
        assert_eq!(stats.avg_sentence_len, 24.0);
        let guide = style_guide(&stats);
        assert_eq!(guide.sentence_length, "推荐句长约 24 字");
        assert_eq!(guide.dialogue_ratio, "对白占比中低");
        assert_eq!(guide.punctuation, "尽量减少感叹号");
    }

    #[test]
    fn guide_clamps_sentence_length() {
        let f = [features(80.0, 0.2, 0.01)];
        let guide = style_guide(&style_stats(&f));
        assert_eq!(guide.sentence_length, "推荐句长约 36 字");
        assert_eq!(guide.dialogue_ratio, "对白占比中高");
        assert_eq!(guide.punctuation, "允许少量感叹号");

        let f = [features(3.0, 0.0, 0.0)];
        assert_eq!(style_guide(&style_stats(&f)).sentence_length, "推荐句长约 12 字");
    }

    #[test]
    fn stats_are_means() {
        let f = [features(10.0, 0.1, 0.0), features(20.0, 0.3, 0.004)];
        let stats = style_stats(&f);
        assert!((stats.avg_sentence_len - 15.0).abs() < 1e-12);
        assert!((stats.avg_dialogue_ratio - 0.2).abs() < 1e-12);
        assert!((stats.avg_exclamation - 0.002).abs() < 1e-12);
    }

    #[test]
    fn card_keeps_author_policy() {
        let card = json!({
            "id": "style_001",
            "type": "style",
            "payload": {"locks": {"pov": false}, "voice": "冷"}
        });
        let guide = style_guide(&style_stats(std::iter::empty()));
        let updated = apply_to_card(card, "style_001", &guide, &["a".to_string()]);
        assert_eq!(updated["payload"]["locks"], json!({"pov": false}));
        assert_eq!(updated["payload"]["voice"], "冷");
        assert_eq!(updated["payload"]["injection_policy"]["max_examples"], 5);
        assert_eq!(updated["payload"]["active_style_sample_asset_ids"], json!(["a"]));
    }

    #[tokio::test]
    async fn profile_updates_card_and_writes_summary() {
        let store = Arc::new(InMemoryStore::new());
        let service = KnowledgeBase::new(store.clone(), KnowledgeConfig::default());
        let receipt = service
            .upload("demo", AssetKind::StyleSample, "voice.txt", "雨很轻。他没有回头。")
            .await
            .unwrap();

        let profile = service
            .style_profile("demo", "style_001", &[receipt.asset_id.clone()], "fast")
            .await
            .unwrap();
        assert_eq!(profile.assets, vec![receipt.asset_id.clone()]);
        assert!(profile.stats.avg_sentence_len < 24.0);

        let card = store.read_record("demo", "cards/style_001.yaml").await.unwrap().unwrap();
        assert_eq!(card["id"], "style_001");
        assert_eq!(card["payload"]["style_guide"]["notes"], "保持冷静观察视角，优先动作与细节。");
        assert_eq!(card["payload"]["locks"]["taboo_words"], true);

        let saved = store.read_record("demo", STYLE_PROFILE_PATH).await.unwrap().unwrap();
        assert_eq!(saved["style_card_id"], "style_001");
        assert_eq!(saved["mode"], "fast");
    }
}
