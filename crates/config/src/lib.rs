//! Configuration loading, validation, and management for Loreweave.
//!
//! Loads configuration from `~/.loreweave/config.toml` with environment
//! variable overrides. Out-of-range settings are clamped to their defaults
//! with a warning rather than rejected.

use loreweave_core::{Bucket, KbId, WeightedSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// The root configuration structure.
///
/// Maps directly to `~/.loreweave/config.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Root directory holding one sub-directory per project
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    /// Default token budget for projects without their own
    #[serde(default)]
    pub budget: BudgetConfig,

    /// Chunk size limits
    #[serde(default)]
    pub chunking: ChunkingConfig,

    /// Retrieval weight profiles
    #[serde(default)]
    pub retrieval: RetrievalConfig,

    /// Manifest assembly settings
    #[serde(default)]
    pub manifest: ManifestConfig,
}

fn default_data_dir() -> PathBuf {
    EngineConfig::config_dir().join("projects")
}

// --- Budget ---

pub const DEFAULT_TOTAL_TOKENS: usize = 131_072;

/// Token budget: a total ceiling split into fractional buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_total")]
    pub total: usize,

    /// Bucket name → fraction of `total`. Keys may carry a `_pct` suffix.
    #[serde(default = "default_allocation")]
    pub allocation: BTreeMap<String, f64>,

    #[serde(default)]
    pub caps: BudgetCaps,
}

fn default_total() -> usize {
    DEFAULT_TOTAL_TOKENS
}

/// Default share of the total for a bucket.
pub fn default_fraction(bucket: Bucket) -> f64 {
    match bucket {
        Bucket::SystemRules => 0.05,
        Bucket::Cards => 0.15,
        Bucket::Canon => 0.10,
        Bucket::Summaries => 0.20,
        Bucket::CurrentDraft => 0.30,
        Bucket::World => 0.10,
        Bucket::OutputReserve => 0.20,
    }
}

fn default_allocation() -> BTreeMap<String, f64> {
    Bucket::ALL
        .into_iter()
        .map(|b| (b.as_str().to_string(), default_fraction(b)))
        .collect()
}

impl BudgetConfig {
    /// The configured fraction for a bucket, accepting either key form.
    pub fn fraction(&self, bucket: Bucket) -> f64 {
        self.allocation
            .iter()
            .find(|(k, _)| Bucket::from_key(k) == Some(bucket))
            .map(|(_, v)| *v)
            .unwrap_or_else(|| default_fraction(bucket))
    }

    /// Normalise keys to bare bucket names and clamp bad values.
    ///
    /// A zero total, or a fraction that is negative or not finite, falls
    /// back to the default. Unknown allocation keys are dropped.
    pub fn validate_and_clamp(&mut self) {
        if self.total == 0 {
            tracing::warn!(default = DEFAULT_TOTAL_TOKENS, "Budget total is zero, using default");
            self.total = DEFAULT_TOTAL_TOKENS;
        }

        let mut normalised = BTreeMap::new();
        for (key, value) in &self.allocation {
            match Bucket::from_key(key) {
                Some(bucket) => {
                    normalised.insert(bucket.as_str().to_string(), *value);
                }
                None => tracing::warn!(key = %key, "Ignoring unknown budget allocation key"),
            }
        }
        for bucket in Bucket::ALL {
            let entry = normalised
                .entry(bucket.as_str().to_string())
                .or_insert_with(|| default_fraction(bucket));
            if !entry.is_finite() || *entry < 0.0 {
                tracing::warn!(bucket = %bucket, value = *entry, "Invalid budget fraction, using default");
                *entry = default_fraction(bucket);
            }
        }
        self.allocation = normalised;

        let sum: f64 = self.allocation.values().sum();
        if (sum - 1.0).abs() > 0.05 {
            tracing::debug!(sum, "Budget allocation does not sum to 1.0");
        }
    }
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            total: default_total(),
            allocation: default_allocation(),
            caps: BudgetCaps::default(),
        }
    }
}

/// Item-count caps applied alongside the token budget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BudgetCaps {
    #[serde(default = "default_max_items_per_bucket")]
    pub max_items_per_bucket: usize,

    #[serde(default = "default_max_examples_style")]
    pub max_examples_style: usize,
}

fn default_max_items_per_bucket() -> usize {
    50
}
fn default_max_examples_style() -> usize {
    5
}

impl Default for BudgetCaps {
    fn default() -> Self {
        Self {
            max_items_per_bucket: default_max_items_per_bucket(),
            max_examples_style: default_max_examples_style(),
        }
    }
}

// --- Chunking ---

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkingConfig {
    /// Upper bound, in characters, of a paragraph chunk
    #[serde(default = "default_paragraph_max_chars")]
    pub paragraph_max_chars: usize,

    /// A manuscript chunk closes once its text reaches this many characters
    #[serde(default = "default_manuscript_line_threshold")]
    pub manuscript_line_threshold: usize,
}

fn default_paragraph_max_chars() -> usize {
    800
}
fn default_manuscript_line_threshold() -> usize {
    500
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            paragraph_max_chars: default_paragraph_max_chars(),
            manuscript_line_threshold: default_manuscript_line_threshold(),
        }
    }
}

// --- Retrieval ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Minimum per-source candidate count fetched by a multi-source query
    #[serde(default = "default_min_candidates")]
    pub min_candidates: usize,

    /// Sources and weights used to gather writing evidence
    #[serde(default = "default_writer_profile")]
    pub writer_profile: Vec<WeightedSource>,

    /// Sources and weights used to gather critique evidence
    #[serde(default = "default_critic_profile")]
    pub critic_profile: Vec<WeightedSource>,

    /// Appended to the scene query for the critique profile
    #[serde(default = "default_critic_query_suffix")]
    pub critic_query_suffix: String,
}

fn default_min_candidates() -> usize {
    20
}
fn default_writer_profile() -> Vec<WeightedSource> {
    vec![
        WeightedSource::new(KbId::Manuscript, 1.2),
        WeightedSource::new(KbId::Docs, 1.0),
        WeightedSource::new(KbId::Style, 0.7),
        WeightedSource::new(KbId::World, 1.1),
    ]
}
fn default_critic_profile() -> Vec<WeightedSource> {
    vec![
        WeightedSource::new(KbId::Manuscript, 1.4),
        WeightedSource::new(KbId::Docs, 1.0),
        WeightedSource::new(KbId::World, 1.2),
        WeightedSource::new(KbId::Style, 0.2),
    ]
}
fn default_critic_query_suffix() -> String {
    " 冲突 设定 矛盾".into()
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            min_candidates: default_min_candidates(),
            writer_profile: default_writer_profile(),
            critic_profile: default_critic_profile(),
            critic_query_suffix: default_critic_query_suffix(),
        }
    }
}

// --- Manifest ---

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ManifestConfig {
    #[serde(default = "default_style_card_id")]
    pub style_card_id: String,

    #[serde(default = "default_outline_card_id")]
    pub outline_card_id: String,

    #[serde(default = "default_max_evidence")]
    pub max_evidence: usize,

    #[serde(default = "default_max_world_facts")]
    pub max_world_facts: usize,

    /// Length of the chapter summary kept when the manifest prefers it
    /// over raw manuscript evidence
    #[serde(default = "default_summary_fallback_chars")]
    pub summary_fallback_chars: usize,

    /// Per-example truncation when the style card sets no policy
    #[serde(default = "default_max_chars_per_example")]
    pub max_chars_per_example: usize,

    /// Card payload fields kept when cards are trimmed
    #[serde(default = "default_trimmed_card_fields")]
    pub trimmed_card_fields: Vec<String>,
}

fn default_style_card_id() -> String {
    "style_001".into()
}
fn default_outline_card_id() -> String {
    "outline_001".into()
}
fn default_max_evidence() -> usize {
    12
}
fn default_max_world_facts() -> usize {
    8
}
fn default_summary_fallback_chars() -> usize {
    200
}
fn default_max_chars_per_example() -> usize {
    800
}
fn default_trimmed_card_fields() -> Vec<String> {
    vec!["identity".into(), "voice".into(), "boundaries".into()]
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            style_card_id: default_style_card_id(),
            outline_card_id: default_outline_card_id(),
            max_evidence: default_max_evidence(),
            max_world_facts: default_max_world_facts(),
            summary_fallback_chars: default_summary_fallback_chars(),
            max_chars_per_example: default_max_chars_per_example(),
            trimmed_card_fields: default_trimmed_card_fields(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from the default path (~/.loreweave/config.toml).
    ///
    /// Environment overrides:
    /// - `LOREWEAVE_DATA_DIR`
    /// - `LOREWEAVE_TOTAL_TOKENS`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides();
        config.validate_and_clamp();
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let mut config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate_and_clamp();
        Ok(config)
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".loreweave")
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(dir) = std::env::var("LOREWEAVE_DATA_DIR") {
            self.data_dir = PathBuf::from(dir);
        }

        if let Ok(total) = std::env::var("LOREWEAVE_TOTAL_TOKENS") {
            match total.trim().parse::<usize>() {
                Ok(total) => self.budget.total = total,
                Err(e) => tracing::warn!(value = %total, error = %e, "Ignoring LOREWEAVE_TOTAL_TOKENS"),
            }
        }
    }

    /// Clamp every out-of-range setting to its default, logging each fix.
    pub fn validate_and_clamp(&mut self) {
        self.budget.validate_and_clamp();

        if self.chunking.paragraph_max_chars == 0 {
            tracing::warn!("chunking.paragraph_max_chars must be > 0, using default");
            self.chunking.paragraph_max_chars = default_paragraph_max_chars();
        }
        if self.chunking.manuscript_line_threshold == 0 {
            tracing::warn!("chunking.manuscript_line_threshold must be > 0, using default");
            self.chunking.manuscript_line_threshold = default_manuscript_line_threshold();
        }

        for profile in [
            &mut self.retrieval.writer_profile,
            &mut self.retrieval.critic_profile,
        ] {
            for source in profile.iter_mut() {
                if !source.weight.is_finite() || source.weight < 0.0 {
                    tracing::warn!(kb = %source.kb_id, weight = source.weight, "Invalid source weight, using 1.0");
                    source.weight = 1.0;
                }
            }
        }
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            budget: BudgetConfig::default(),
            chunking: ChunkingConfig::default(),
            retrieval: RetrievalConfig::default(),
            manifest: ManifestConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },
}

impl From<ConfigError> for loreweave_core::Error {
    fn from(e: ConfigError) -> Self {
        loreweave_core::Error::Config {
            message: e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn default_config_matches_documented_values() {
        let config = EngineConfig::default();
        assert_eq!(config.budget.total, 131_072);
        assert_eq!(config.budget.caps.max_items_per_bucket, 50);
        assert_eq!(config.budget.caps.max_examples_style, 5);
        assert_eq!(config.chunking.paragraph_max_chars, 800);
        assert_eq!(config.retrieval.min_candidates, 20);
        assert_eq!(config.manifest.max_evidence, 12);
        assert!((config.budget.fraction(Bucket::CurrentDraft) - 0.30).abs() < 1e-12);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = EngineConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: EngineConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = EngineConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().budget.total, DEFAULT_TOTAL_TOKENS);
    }

    #[test]
    fn pct_suffixed_keys_are_normalised() {
        let toml_str = r#"
[budget]
total = 1000

[budget.allocation]
cards_pct = 0.5
"#;
        let mut config: EngineConfig = toml::from_str(toml_str).unwrap();
        config.validate_and_clamp();
        assert_eq!(config.budget.allocation["cards"], 0.5);
        assert!(!config.budget.allocation.contains_key("cards_pct"));
        // Buckets not named in the file fall back to defaults
        assert!((config.budget.fraction(Bucket::World) - 0.10).abs() < 1e-12);
    }

    #[test]
    fn invalid_budget_values_are_clamped() {
        let mut budget = BudgetConfig {
            total: 0,
            ..BudgetConfig::default()
        };
        budget.allocation.insert("canon".into(), -0.3);
        budget.allocation.insert("plot".into(), 0.4);
        budget.validate_and_clamp();
        assert_eq!(budget.total, DEFAULT_TOTAL_TOKENS);
        assert!((budget.fraction(Bucket::Canon) - 0.10).abs() < 1e-12);
        assert!(!budget.allocation.contains_key("plot"));
    }

    #[test]
    fn weight_profiles_parse_from_toml() {
        let toml_str = r#"
[retrieval]
writer_profile = [
    { kb_id = "kb_docs", weight = 2.0 },
    { kb_id = "kb_world", weight = -1.0 },
]
"#;
        let mut config: EngineConfig = toml::from_str(toml_str).unwrap();
        config.validate_and_clamp();
        assert_eq!(config.retrieval.writer_profile.len(), 2);
        assert_eq!(config.retrieval.writer_profile[0].kb_id, KbId::Docs);
        assert_eq!(config.retrieval.writer_profile[1].weight, 1.0);
        assert_eq!(config.retrieval.critic_profile.len(), 4);
    }

    #[test]
    fn load_from_reports_parse_errors() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[budget\ntotal = ").unwrap();
        let err = EngineConfig::load_from(file.path()).unwrap_err();
        assert!(matches!(err, ConfigError::ParseError { .. }));
    }

    #[test]
    fn load_from_reads_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[manifest]\nstyle_card_id = \"style_002\"").unwrap();
        let config = EngineConfig::load_from(file.path()).unwrap();
        assert_eq!(config.manifest.style_card_id, "style_002");
        assert_eq!(config.manifest.outline_card_id, "outline_001");
    }
}
