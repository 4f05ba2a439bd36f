//! Entity cards and the authority signal derived from them.
//!
//! Cards are curated, structured records (characters, world rules, lore,
//! style guides, outlines). Retrieval only reads two numbers from them:
//! `stars` and `importance`. Everything else lives in a free-form payload.

use async_trait::async_trait;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// A structured entity card.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Card {
    #[serde(default)]
    pub id: String,

    #[serde(default, rename = "type")]
    pub card_type: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub links: Vec<String>,

    /// 0–5, curated by the author.
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub stars: Option<f64>,

    /// 1–5, defaults to 3.
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub importance: Option<f64>,

    #[serde(default)]
    pub payload: Value,
}

impl Card {
    pub fn authority(&self) -> Authority {
        Authority::new(self.stars, self.importance)
    }

    /// Copy of the card reduced to `id`, `type` and the named payload fields.
    pub fn trimmed(&self, fields: &[&str]) -> Value {
        let mut payload = Map::new();
        if let Value::Object(map) = &self.payload {
            for field in fields {
                if let Some(v) = map.get(*field) {
                    payload.insert((*field).to_string(), v.clone());
                }
            }
        }
        serde_json::json!({
            "id": self.id,
            "type": self.card_type,
            "payload": payload,
        })
    }

    /// Look up a string-ish payload field.
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }
}

/// Whether a project-relative path names an entity card (`cards/*.yaml`).
pub fn is_card_path(path: &str) -> bool {
    path.starts_with("cards/") && path.ends_with(".yaml")
}

/// Accepts numbers, numeric strings and null. Anything else becomes `None`
/// so a hand-edited card never fails to load over a typo.
pub(crate) fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    })
}

/// Authority metadata, already clamped.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Authority {
    pub stars: f64,
    pub importance: f64,
}

impl Authority {
    /// Clamp raw card values: stars to [0, 5] (missing → 0), importance to
    /// [1, 5] (missing or zero → 3).
    pub fn new(stars: Option<f64>, importance: Option<f64>) -> Self {
        let stars = stars.filter(|s| s.is_finite()).unwrap_or(0.0).clamp(0.0, 5.0);
        let importance = match importance.filter(|i| i.is_finite()) {
            None => 3.0,
            Some(i) if i == 0.0 => 3.0,
            Some(i) => i.clamp(1.0, 5.0),
        };
        Self { stars, importance }
    }

    /// `(1 + 0.15·stars) · (1 + 0.10·(importance − 3))`
    pub fn multiplier(&self) -> f64 {
        (1.0 + 0.15 * self.stars) * (1.0 + 0.10 * (self.importance - 3.0))
    }
}

impl Default for Authority {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// Resolves source paths to authority metadata.
///
/// Returning `None` means "no authority signal" and yields a neutral
/// multiplier of 1.0. Implementations must never fail retrieval.
#[async_trait]
pub trait EntityCardRepository: Send + Sync {
    async fn authority(&self, project_id: &str, path: &str) -> Option<Authority>;
}
