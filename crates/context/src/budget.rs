//! Token budget resolution and reporting.

use loreweave_config::{BudgetCaps, BudgetConfig};
use loreweave_core::{Bucket, Project};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::warn;

/// Effective budget for one manifest build.
#[derive(Debug, Clone, PartialEq)]
pub struct BudgetManager {
    total: usize,
    allocation: BTreeMap<Bucket, f64>,
    caps: BudgetCaps,
}

/// Budget outcome attached to every manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetReport {
    pub total: usize,
    pub limits: BTreeMap<Bucket, usize>,
    pub usage: BTreeMap<Bucket, usize>,
    pub caps: BudgetCaps,
    /// Bucket → `over_limit:{used}>{limit}`, only for buckets whose usage
    /// exceeds their limit.
    pub over_limit: BTreeMap<Bucket, String>,
    pub dropped_items: Vec<String>,
}

fn as_fraction(value: &Value) -> Option<f64> {
    match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

impl BudgetManager {
    /// The configured budget with no project override.
    pub fn new(defaults: &BudgetConfig) -> Self {
        Self {
            total: defaults.total.max(1),
            allocation: Bucket::ALL
                .into_iter()
                .map(|b| (b, defaults.fraction(b)))
                .collect(),
            caps: defaults.caps.clone(),
        }
    }

    /// Resolve the effective budget.
    ///
    /// Total: `override_total` when non-zero, else the project's
    /// `token_budgets.total`, else the configured default. Allocation and
    /// caps overlay the project's values on the defaults. Values that are
    /// negative, not finite or not numbers are replaced by the default and
    /// logged.
    pub fn from_project(project: &Project, override_total: Option<usize>, defaults: &BudgetConfig) -> Self {
        let mut manager = Self::new(defaults);
        let overrides = project.token_budgets.clone().unwrap_or_default();

        manager.total = match override_total.filter(|t| *t > 0) {
            Some(total) => total,
            None => match overrides.total {
                Some(t) if t.is_finite() && t >= 1.0 => t as usize,
                Some(t) => {
                    warn!(project = %project.id, value = t, "Invalid budget total, using default");
                    manager.total
                }
                None => manager.total,
            },
        };

        for (key, raw) in &overrides.allocation {
            let Some(bucket) = Bucket::from_key(key) else {
                warn!(project = %project.id, key = %key, "Ignoring unknown budget allocation key");
                continue;
            };
            match as_fraction(raw) {
                Some(f) if f.is_finite() && f >= 0.0 => {
                    manager.allocation.insert(bucket, f);
                }
                _ => warn!(project = %project.id, bucket = %bucket, value = %raw, "Invalid budget fraction, using default"),
            }
        }

        if let Some(n) = overrides.caps.max_items_per_bucket {
            if n.is_finite() && n >= 1.0 {
                manager.caps.max_items_per_bucket = n as usize;
            } else {
                warn!(project = %project.id, value = n, "Invalid max_items_per_bucket, using default");
            }
        }
        if let Some(n) = overrides.caps.max_examples_style {
            if n.is_finite() && n >= 0.0 {
                manager.caps.max_examples_style = n as usize;
            } else {
                warn!(project = %project.id, value = n, "Invalid max_examples_style, using default");
            }
        }

        manager
    }

    pub fn total(&self) -> usize {
        self.total
    }

    pub fn caps(&self) -> &BudgetCaps {
        &self.caps
    }

    pub fn fraction(&self, bucket: Bucket) -> f64 {
        self.allocation.get(&bucket).copied().unwrap_or(0.0)
    }

    /// `floor(total × fraction)`
    pub fn limit(&self, bucket: Bucket) -> usize {
        (self.total as f64 * self.fraction(bucket)).floor() as usize
    }

    pub fn bucket_limits(&self) -> BTreeMap<Bucket, usize> {
        Bucket::ALL.into_iter().map(|b| (b, self.limit(b))).collect()
    }

    pub fn build_report(&self, usage: &BTreeMap<Bucket, usize>, dropped: &[String]) -> BudgetReport {
        let limits = self.bucket_limits();
        let over_limit = usage
            .iter()
            .filter_map(|(bucket, used)| {
                let limit = limits.get(bucket).copied().unwrap_or(0);
                (*used > limit).then(|| (*bucket, format!("over_limit:{used}>{limit}")))
            })
            .collect();
        BudgetReport {
            total: self.total,
            limits,
            usage: usage.clone(),
            caps: self.caps.clone(),
            over_limit,
            dropped_items: dropped.to_vec(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn project(budgets: Value) -> Project {
        serde_json::from_value(json!({"id": "demo", "title": "Demo", "token_budgets": budgets})).unwrap()
    }

    #[test]
    fn defaults_without_override() {
        let bm = BudgetManager::from_project(&Project::new("demo", "Demo"), None, &BudgetConfig::default());
        assert_eq!(bm.total(), 131_072);
        let limits = bm.bucket_limits();
        assert_eq!(limits[&Bucket::SystemRules], 6553);
        assert_eq!(limits[&Bucket::CurrentDraft], 39321);
        assert_eq!(limits[&Bucket::OutputReserve], 26214);
        assert_eq!(bm.caps().max_items_per_bucket, 50);
    }

    #[test]
    fn constraint_override_wins_over_project_total() {
        let p = project(json!({"total": 4096}));
        let bm = BudgetManager::from_project(&p, Some(1000), &BudgetConfig::default());
        assert_eq!(bm.total(), 1000);
        assert_eq!(bm.limit(Bucket::Cards), 150);

        let bm = BudgetManager::from_project(&p, Some(0), &BudgetConfig::default());
        assert_eq!(bm.total(), 4096);
    }

    #[test]
    fn project_allocation_overlays_defaults() {
        let p = project(json!({"allocation": {"cards_pct": 0.5, "world": "0.25"}, "caps": {"max_items_per_bucket": 3}}));
        let bm = BudgetManager::from_project(&p, Some(1000), &BudgetConfig::default());
        assert_eq!(bm.limit(Bucket::Cards), 500);
        assert_eq!(bm.limit(Bucket::World), 250);
        assert_eq!(bm.limit(Bucket::Canon), 100);
        assert_eq!(bm.caps().max_items_per_bucket, 3);
    }

    #[test]
    fn invalid_values_are_clamped_to_defaults() {
        let p = project(json!({
            "total": -5,
            "allocation": {"cards_pct": -0.5, "canon": "lots", "plot_pct": 0.4},
            "caps": {"max_items_per_bucket": 0}
        }));
        let bm = BudgetManager::from_project(&p, None, &BudgetConfig::default());
        assert_eq!(bm.total(), 131_072);
        assert_eq!(bm.fraction(Bucket::Cards), 0.15);
        assert_eq!(bm.fraction(Bucket::Canon), 0.10);
        assert_eq!(bm.caps().max_items_per_bucket, 50);
    }

    #[test]
    fn report_flags_only_buckets_over_their_limit() {
        let bm = BudgetManager::from_project(&Project::default(), Some(100), &BudgetConfig::default());
        let usage: BTreeMap<Bucket, usize> = [
            (Bucket::Cards, 15),
            (Bucket::Canon, 11),
            (Bucket::World, 3),
        ]
        .into_iter()
        .collect();
        let report = bm.build_report(&usage, &["style_examples".to_string()]);

        assert_eq!(report.total, 100);
        assert_eq!(report.limits[&Bucket::Cards], 15);
        assert_eq!(report.over_limit.len(), 1);
        assert_eq!(report.over_limit[&Bucket::Canon], "over_limit:11>10");
        assert_eq!(report.dropped_items, vec!["style_examples"]);
    }

    #[test]
    fn report_serialises_bucket_names() {
        let bm = BudgetManager::from_project(&Project::default(), Some(100), &BudgetConfig::default());
        let usage: BTreeMap<Bucket, usize> = [(Bucket::CurrentDraft, 31)].into_iter().collect();
        let value = serde_json::to_value(bm.build_report(&usage, &[])).unwrap();
        assert_eq!(value["over_limit"]["current_draft"], "over_limit:31>30");
        assert_eq!(value["limits"]["output_reserve"], 20);
        assert_eq!(value["caps"]["max_examples_style"], 5);
    }
}
