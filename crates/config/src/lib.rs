//! Configuration loading, validation, and management for Lexiscope.
//!
//! Loads configuration from `~/.lexiscope/config.toml` with environment
//! variable overrides. Validates all settings at startup. Every field has an
//! explicit default, so a partial (or absent) file is always usable.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// The root configuration structure.
///
/// Maps directly to `~/.lexiscope/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Cache sizing and expiry
    #[serde(default)]
    pub cache: CacheConfig,

    /// Fuzzy matching thresholds
    #[serde(default)]
    pub matching: MatchingConfig,

    /// Context composition limits and collaborator timeouts
    #[serde(default)]
    pub composer: ComposerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Memoized vector-search results
    #[serde(default = "default_search_policy")]
    pub search: CachePolicy,

    /// Curriculum content fetched on demand
    #[serde(default = "default_curriculum_policy")]
    pub curriculum: CachePolicy,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            search: default_search_policy(),
            curriculum: default_curriculum_policy(),
        }
    }
}

/// Capacity and time-to-live of one LRU+TTL cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CachePolicy {
    pub capacity: usize,
    pub ttl_secs: u64,
}

impl CachePolicy {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

fn default_search_policy() -> CachePolicy {
    CachePolicy {
        capacity: 100,
        ttl_secs: 300,
    }
}

fn default_curriculum_policy() -> CachePolicy {
    CachePolicy {
        capacity: 32,
        ttl_secs: 1800,
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
    /// Ratio needed for a fuzzy trigger hit in the response cache
    #[serde(default = "default_response_threshold")]
    pub response_threshold: f64,

    /// Ratio needed for the grammar rule-name fallback
    #[serde(default = "default_grammar_name_threshold")]
    pub grammar_name_threshold: f64,
}

fn default_response_threshold() -> f64 {
    0.75
}
fn default_grammar_name_threshold() -> f64 {
    0.6
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            response_threshold: default_response_threshold(),
            grammar_name_threshold: default_grammar_name_threshold(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComposerConfig {
    /// Upper bound on the whole composed context (chars)
    #[serde(default = "default_max_context_chars")]
    pub max_context_chars: usize,

    /// Upper bound on the curriculum portion (chars)
    #[serde(default = "default_curriculum_max_chars")]
    pub curriculum_max_chars: usize,

    /// Words shorter than this are not looked up as vocabulary
    #[serde(default = "default_min_vocab_word_len")]
    pub min_vocab_word_len: usize,

    #[serde(default = "default_curriculum_timeout_ms")]
    pub curriculum_timeout_ms: u64,

    #[serde(default = "default_search_timeout_ms")]
    pub search_timeout_ms: u64,

    #[serde(default = "default_search_limit")]
    pub search_limit: usize,

    #[serde(default = "default_search_min_score")]
    pub search_min_score: f32,
}

fn default_max_context_chars() -> usize {
    4000
}
fn default_curriculum_max_chars() -> usize {
    1500
}
fn default_min_vocab_word_len() -> usize {
    4
}
fn default_curriculum_timeout_ms() -> u64 {
    50
}
fn default_search_timeout_ms() -> u64 {
    300
}
fn default_search_limit() -> usize {
    3
}
fn default_search_min_score() -> f32 {
    0.7
}

impl ComposerConfig {
    pub fn curriculum_timeout(&self) -> Duration {
        Duration::from_millis(self.curriculum_timeout_ms)
    }

    pub fn search_timeout(&self) -> Duration {
        Duration::from_millis(self.search_timeout_ms)
    }
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            max_context_chars: default_max_context_chars(),
            curriculum_max_chars: default_curriculum_max_chars(),
            min_vocab_word_len: default_min_vocab_word_len(),
            curriculum_timeout_ms: default_curriculum_timeout_ms(),
            search_timeout_ms: default_search_timeout_ms(),
            search_limit: default_search_limit(),
            search_min_score: default_search_min_score(),
        }
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.lexiscope/config.toml).
    ///
    /// Environment overrides (highest priority):
    /// - `LEXISCOPE_MAX_CONTEXT_CHARS`
    /// - `LEXISCOPE_FUZZY_THRESHOLD`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides()?;
        config.validate()?;
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

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|name| std::env::var(name).ok())
    }

    /// Apply `LEXISCOPE_*` overrides read through `lookup`.
    fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(raw) = lookup("LEXISCOPE_MAX_CONTEXT_CHARS") {
            self.composer.max_context_chars = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "LEXISCOPE_MAX_CONTEXT_CHARS must be an integer, got '{raw}'"
                ))
            })?;
        }

        if let Some(raw) = lookup("LEXISCOPE_FUZZY_THRESHOLD") {
            self.matching.response_threshold = raw.trim().parse().map_err(|_| {
                ConfigError::ValidationError(format!(
                    "LEXISCOPE_FUZZY_THRESHOLD must be a number, got '{raw}'"
                ))
            })?;
        }

        Ok(())
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".lexiscope")
    }

    /// Validate the configuration.
    fn validate(&self) -> Result<(), ConfigError> {
        for (name, value) in [
            ("matching.response_threshold", self.matching.response_threshold),
            ("matching.grammar_name_threshold", self.matching.grammar_name_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::ValidationError(format!(
                    "{name} must be between 0.0 and 1.0"
                )));
            }
        }

        for (name, policy) in [
            ("cache.search", self.cache.search),
            ("cache.curriculum", self.cache.curriculum),
        ] {
            if policy.capacity == 0 {
                return Err(ConfigError::ValidationError(format!(
                    "{name}.capacity must be > 0"
                )));
            }
        }

        if self.composer.max_context_chars == 0 || self.composer.curriculum_max_chars == 0 {
            return Err(ConfigError::ValidationError(
                "composer character caps must be > 0".into(),
            ));
        }

        if !(0.0..=1.0).contains(&self.composer.search_min_score) {
            return Err(ConfigError::ValidationError(
                "composer.search_min_score must be between 0.0 and 1.0".into(),
            ));
        }

        Ok(())
    }

    /// Generate a default config TOML string.
    pub fn default_toml() -> String {
        let config = Self::default();
        toml::to_string_pretty(&config).unwrap_or_default()
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

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn vars(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: std::collections::HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn max_context_chars_override_applies() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(vars(&[("LEXISCOPE_MAX_CONTEXT_CHARS", "1200")]))
            .unwrap();
        assert_eq!(config.composer.max_context_chars, 1200);
        assert_eq!(config.matching.response_threshold, 0.75);
    }

    #[test]
    fn max_context_chars_override_rejects_non_integers() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(vars(&[("LEXISCOPE_MAX_CONTEXT_CHARS", "lots")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
        assert!(err.to_string().contains("'lots'"));
        assert_eq!(config.composer.max_context_chars, 4000);
    }

    #[test]
    fn fuzzy_threshold_override_applies() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(vars(&[("LEXISCOPE_FUZZY_THRESHOLD", "0.9")]))
            .unwrap();
        assert_eq!(config.matching.response_threshold, 0.9);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn fuzzy_threshold_override_rejects_non_numbers() {
        let mut config = AppConfig::default();
        let err = config
            .apply_overrides(vars(&[("LEXISCOPE_FUZZY_THRESHOLD", "high")]))
            .unwrap_err();
        assert!(err.to_string().contains("LEXISCOPE_FUZZY_THRESHOLD"));
    }

    #[test]
    fn out_of_range_threshold_override_fails_validation() {
        let mut config = AppConfig::default();
        config
            .apply_overrides(vars(&[("LEXISCOPE_FUZZY_THRESHOLD", "1.5")]))
            .unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn no_overrides_leaves_defaults() {
        let mut config = AppConfig::default();
        config.apply_overrides(vars(&[])).unwrap();
        assert_eq!(config.composer.max_context_chars, 4000);
        assert_eq!(config.matching.response_threshold, 0.75);
    }

    #[test]
    fn default_config_is_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.cache.search.capacity, 100);
        assert_eq!(config.cache.search.ttl(), Duration::from_secs(300));
        assert_eq!(config.matching.response_threshold, 0.75);
    }

    #[test]
    fn config_roundtrip_toml() {
        let config = AppConfig::default();
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: AppConfig = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed.cache.curriculum, config.cache.curriculum);
        assert_eq!(parsed.composer.max_context_chars, config.composer.max_context_chars);
    }

    #[test]
    fn partial_file_fills_defaults() {
        let toml_str = r#"
[cache.search]
capacity = 10
ttl_secs = 5

[composer]
max_context_chars = 800
"#;
        let config: AppConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.cache.search.capacity, 10);
        assert_eq!(config.cache.curriculum.capacity, 32);
        assert_eq!(config.composer.max_context_chars, 800);
        assert_eq!(config.composer.curriculum_timeout(), Duration::from_millis(50));
    }

    #[test]
    fn invalid_threshold_rejected() {
        let config = AppConfig {
            matching: MatchingConfig {
                response_threshold: 1.5,
                ..MatchingConfig::default()
            },
            ..AppConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_capacity_rejected() {
        let mut config = AppConfig::default();
        config.cache.curriculum.capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache.curriculum"));
    }

    #[test]
    fn missing_config_file_returns_defaults() {
        let result = AppConfig::load_from(Path::new("/nonexistent/config.toml"));
        assert!(result.is_ok());
        assert_eq!(result.unwrap().composer.search_limit, 3);
    }

    #[test]
    fn load_from_file_and_reject_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");

        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "[matching]\nresponse_threshold = 0.9").unwrap();
        let config = AppConfig::load_from(&path).unwrap();
        assert_eq!(config.matching.response_threshold, 0.9);

        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(matches!(
            AppConfig::load_from(&path),
            Err(ConfigError::ParseError { .. })
        ));
    }

    #[test]
    fn default_toml_generation() {
        let toml_str = AppConfig::default_toml();
        assert!(toml_str.contains("max_context_chars"));
        assert!(toml_str.contains("ttl_secs"));
    }
}
