//! Engine tuning
//!
//! Every field has a default, so an empty TOML document or `{}` from
//! JavaScript yields a working configuration.

use crate::error::A11yError;
use crate::locale::Locale;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Upper bound for every delay and window, one hour
pub const MAX_DELAY_MS: u64 = 3_600_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Quiet period after the last mutation before the annotation pass runs
    pub debounce_ms: u64,
    /// Delay before re-reading a new message, so late content is rendered
    pub settle_delay_ms: u64,
    /// A batch with at least this many message nodes is a history load
    pub bulk_threshold: usize,
    /// Announcements allowed per conversation within one window
    pub announce_limit: u32,
    pub announce_window_ms: u64,
    /// How long a conversation stays muted after exceeding the limit
    pub announce_block_ms: u64,
    /// Interface language; `None` lets the host pick (stored choice, then browser)
    pub locale: Option<Locale>,
    /// Verbose logging
    pub debug: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            debounce_ms: 200,
            settle_delay_ms: 300,
            bulk_threshold: 5,
            announce_limit: 10,
            announce_window_ms: 10_000,
            announce_block_ms: 5_000,
            locale: None,
            debug: false,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config = Self::from_toml_str(&content)
            .with_context(|| format!("Invalid config file: {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml_str(s: &str) -> Result<Self, A11yError> {
        let config: Self = toml::from_str(s).map_err(|e| A11yError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Parse the options object handed over from JavaScript
    pub fn from_json_str(s: &str) -> Result<Self, A11yError> {
        let config: Self = serde_json::from_str(s).map_err(|e| A11yError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), A11yError> {
        if self.bulk_threshold < 2 {
            return Err(A11yError::Config(
                "bulk_threshold must be at least 2".to_string(),
            ));
        }
        if self.announce_limit == 0 {
            return Err(A11yError::Config(
                "announce_limit must be greater than 0".to_string(),
            ));
        }
        if self.announce_window_ms == 0 {
            return Err(A11yError::Config(
                "announce_window_ms must be greater than 0".to_string(),
            ));
        }
        for (name, value) in [
            ("debounce_ms", self.debounce_ms),
            ("settle_delay_ms", self.settle_delay_ms),
            ("announce_window_ms", self.announce_window_ms),
            ("announce_block_ms", self.announce_block_ms),
        ] {
            if value > MAX_DELAY_MS {
                return Err(A11yError::Config(format!(
                    "{} must be at most {} ms",
                    name, MAX_DELAY_MS
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_documents_use_defaults() {
        assert_eq!(EngineConfig::from_toml_str("").unwrap(), EngineConfig::default());
        assert_eq!(EngineConfig::from_json_str("{}").unwrap(), EngineConfig::default());
    }

    #[test]
    fn test_toml_overrides() {
        let config = EngineConfig::from_toml_str(
            r#"
            debounce_ms = 350
            bulk_threshold = 8
            locale = "pt-br"
            debug = true
            "#,
        )
        .unwrap();

        assert_eq!(config.debounce_ms, 350);
        assert_eq!(config.bulk_threshold, 8);
        assert_eq!(config.locale, Some(Locale::PtBr));
        assert!(config.debug);
        assert_eq!(config.settle_delay_ms, 300);
    }

    #[test]
    fn test_json_overrides() {
        let config =
            EngineConfig::from_json_str(r#"{"settle_delay_ms": 50, "locale": "es-es"}"#).unwrap();
        assert_eq!(config.settle_delay_ms, 50);
        assert_eq!(config.locale, Some(Locale::EsEs));
    }

    #[test]
    fn test_validation() {
        assert!(matches!(
            EngineConfig::from_toml_str("bulk_threshold = 1"),
            Err(A11yError::Config(_))
        ));
        assert!(matches!(
            EngineConfig::from_json_str(r#"{"announce_limit": 0}"#),
            Err(A11yError::Config(_))
        ));
        assert!(EngineConfig::from_json_str("not json").is_err());
    }

    #[test]
    fn test_delays_are_bounded() {
        let err = EngineConfig::from_json_str(r#"{"settle_delay_ms": 18446744073709551615}"#)
            .unwrap_err();
        assert!(err.to_string().contains("settle_delay_ms"));
        assert!(EngineConfig::from_toml_str("announce_block_ms = 3600001").is_err());
        assert!(EngineConfig::from_json_str(r#"{"debounce_ms": 3600000}"#).is_ok());
    }

    #[test]
    fn test_locale_unset_by_default() {
        assert_eq!(EngineConfig::default().locale, None);
    }

    #[test]
    fn test_from_file_missing() {
        let err = EngineConfig::from_file("/nonexistent/chatlabel.toml").unwrap_err();
        assert!(err.to_string().contains("Failed to read config file"));
    }
}
