//! Runner configuration: the analysis config plus I/O limits.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

use confluence_core::config::{AnalysisConfig, ConfigError};

/// Serializable configuration for a runner.
///
/// `[analysis]` holds the full core configuration; the remaining keys bound
/// how the runner talks to its collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    pub analysis: AnalysisConfig,
    /// Per-call timeout for every enrichment request.
    pub enrichment_timeout_ms: u64,
    /// Timeout for the primary history fetch.
    pub history_timeout_ms: u64,
    /// Candles requested for the analyzed timeframe.
    pub history_limit: usize,
    /// Candles requested for the higher-timeframe bias.
    pub htf_history_limit: usize,
    pub order_book_depth: usize,
    /// Symbols analyzed at once by `analyze_symbols`.
    pub max_concurrency: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            enrichment_timeout_ms: 2_000,
            history_timeout_ms: 10_000,
            history_limit: 500,
            htf_history_limit: 200,
            order_book_depth: 20,
            max_concurrency: 8,
        }
    }
}

impl RunnerConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.analysis.validate()?;
        if self.enrichment_timeout_ms == 0 || self.history_timeout_ms == 0 {
            return Err(ConfigError::Invalid("timeouts must be > 0".into()));
        }
        if self.history_limit < self.analysis.min_candles {
            return Err(ConfigError::Invalid(format!(
                "history_limit {} is below analysis.min_candles {}",
                self.history_limit, self.analysis.min_candles
            )));
        }
        if self.max_concurrency == 0 {
            return Err(ConfigError::Invalid("max_concurrency must be > 0".into()));
        }
        Ok(())
    }

    pub fn enrichment_timeout(&self) -> Duration {
        Duration::from_millis(self.enrichment_timeout_ms)
    }

    pub fn history_timeout(&self) -> Duration {
        Duration::from_millis(self.history_timeout_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        assert!(RunnerConfig::default().validate().is_ok());
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config = RunnerConfig::from_toml(
            r#"
            enrichment_timeout_ms = 250

            [analysis.scoring]
            min_score = 45.0
            "#,
        )
        .unwrap();
        assert_eq!(config.enrichment_timeout(), Duration::from_millis(250));
        assert_eq!(config.analysis.scoring.min_score, 45.0);
        assert_eq!(config.history_limit, 500);
    }

    #[test]
    fn history_limit_must_cover_min_candles() {
        let err = RunnerConfig::from_toml("history_limit = 10").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn toml_roundtrip() {
        let config = RunnerConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(RunnerConfig::from_toml(&text).unwrap(), config);
    }
}
