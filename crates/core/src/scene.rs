//! Scene requests, pipeline constraints and chapter metadata.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A planned scene, as produced by the blueprint stage.
///
/// Fields the engine does not interpret are preserved in `extra` so the
/// scene plan can be echoed back verbatim in the manifest's fixed blocks.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenePlan {
    #[serde(default)]
    pub scene_id: String,

    #[serde(default)]
    pub phase: String,

    #[serde(default)]
    pub purpose: String,

    #[serde(default)]
    pub situation: String,

    #[serde(default)]
    pub choice_points: Vec<String>,

    /// Card ids of the characters present.
    #[serde(default)]
    pub cast: Vec<String>,

    #[serde(default)]
    pub beats: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ScenePlan {
    /// Retrieval query: purpose, situation and every choice point, joined
    /// by spaces.
    pub fn query_text(&self) -> String {
        let mut parts = vec![self.purpose.as_str(), self.situation.as_str()];
        parts.extend(self.choice_points.iter().map(String::as_str));
        parts.join(" ")
    }
}

/// Per-request constraints handed over by the writing pipeline.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Constraints {
    /// Overrides the project's total token budget.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<usize>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique_brief: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technique_checklist: Option<Value>,
}

/// Sidecar metadata stored next to a chapter draft
/// (`drafts/{chapter_id}.meta.json`).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChapterMeta {
    #[serde(default)]
    pub chapter_summary: String,

    #[serde(default)]
    pub scene_summaries: Vec<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_text_joins_purpose_situation_and_choices() {
        let scene = ScenePlan {
            purpose: "推进调查".into(),
            situation: "雨夜港区".into(),
            choice_points: vec!["是否回复短信".into(), "是否报警".into()],
            ..Default::default()
        };
        assert_eq!(scene.query_text(), "推进调查 雨夜港区 是否回复短信 是否报警");
    }

    #[test]
    fn unknown_scene_fields_survive_round_trip() {
        let scene: ScenePlan =
            serde_json::from_str(r#"{"scene_id":"s1","cast":["character_001"],"mood":"tense"}"#)
                .unwrap();
        assert_eq!(scene.extra["mood"], "tense");
        let back = serde_json::to_value(&scene).unwrap();
        assert_eq!(back["mood"], "tense");
        assert_eq!(back["cast"][0], "character_001");
    }
}
