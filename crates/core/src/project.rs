//! Projects and token-budget buckets.

use crate::card::lenient_number;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

/// A named share of the total token budget.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Bucket {
    SystemRules,
    Cards,
    Canon,
    Summaries,
    CurrentDraft,
    World,
    OutputReserve,
}

impl Bucket {
    pub const ALL: [Bucket; 7] = [
        Bucket::SystemRules,
        Bucket::Cards,
        Bucket::Canon,
        Bucket::Summaries,
        Bucket::CurrentDraft,
        Bucket::World,
        Bucket::OutputReserve,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Bucket::SystemRules => "system_rules",
            Bucket::Cards => "cards",
            Bucket::Canon => "canon",
            Bucket::Summaries => "summaries",
            Bucket::CurrentDraft => "current_draft",
            Bucket::World => "world",
            Bucket::OutputReserve => "output_reserve",
        }
    }

    /// Parse an allocation key. Both `cards` and `cards_pct` name the
    /// same bucket.
    pub fn from_key(key: &str) -> Option<Bucket> {
        let key = key.strip_suffix("_pct").unwrap_or(key);
        Bucket::ALL.into_iter().find(|b| b.as_str() == key)
    }
}

impl fmt::Display for Bucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-project caps override. Unset fields fall back to configured defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CapsOverride {
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_items_per_bucket: Option<f64>,

    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub max_examples_style: Option<f64>,
}

/// Partial budget settings stored with a project.
///
/// Values are kept loose here. The budget manager validates and clamps
/// them when resolving the effective budget.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BudgetOverride {
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub total: Option<f64>,

    /// Allocation key (`cards` or `cards_pct`) → fraction of the total.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub allocation: BTreeMap<String, Value>,

    #[serde(default)]
    pub caps: CapsOverride,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_budgets: Option<BudgetOverride>,
}

impl Project {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            token_budgets: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bucket_keys_accept_pct_suffix() {
        assert_eq!(Bucket::from_key("cards_pct"), Some(Bucket::Cards));
        assert_eq!(Bucket::from_key("output_reserve"), Some(Bucket::OutputReserve));
        assert_eq!(Bucket::from_key("plot_pct"), None);
    }

    #[test]
    fn project_with_partial_budget_parses() {
        let project: Project = serde_json::from_str(
            r#"{"id":"demo","title":"Demo","token_budgets":{"total":"4096","allocation":{"cards_pct":0.5}}}"#,
        )
        .unwrap();
        let budgets = project.token_budgets.unwrap();
        assert_eq!(budgets.total, Some(4096.0));
        assert_eq!(budgets.allocation["cards_pct"], 0.5);
        assert_eq!(budgets.caps, CapsOverride::default());
    }
}
