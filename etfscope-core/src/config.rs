//! Dashboard configuration, stored as TOML.
//!
//! Every field has a default, so an empty file (or no file) is a valid
//! configuration. CLI flags override individual values after loading.

use crate::data::loader::LoadOptions;
use crate::data::provider::DatasetSource;
use crate::metrics::category::CategoryPolicy;
use crate::metrics::rank::DEFAULT_TOP_N;
use crate::quote::twelve_data::{DEFAULT_API_KEY_ENV, DEFAULT_BASE_URL, DEFAULT_HISTORY_DAYS};
use crate::views::category::DEFAULT_TOP_CATEGORIES;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Allowed range for cache freshness windows, in minutes.
pub const TTL_RANGE_MINUTES: std::ops::RangeInclusive<i64> = 1..=1440;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("read config {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("parse config TOML: {0}")]
    Parse(String),

    #[error("invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct DashboardConfig {
    pub sources: SourcesConfig,
    pub cache: CacheConfig,
    pub categories: CategoryPolicy,
    pub ranking: RankingConfig,
    pub quote: QuoteConfig,
}

/// Where the datasets live. Each entry is a URL or a file path.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub etfs: String,
    pub summary: Option<String>,
    /// Local per-ETF file tried when `etfs` can't be loaded.
    pub local_etfs: Option<PathBuf>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            etfs: "data/etfs.csv".into(),
            summary: None,
            local_etfs: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub dir: PathBuf,
    pub dataset_ttl_minutes: i64,
    pub quote_ttl_minutes: i64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from(".etfscope/cache"),
            dataset_ttl_minutes: 60,
            quote_ttl_minutes: 30,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RankingConfig {
    pub top_n: usize,
    pub top_categories: usize,
}

impl Default for RankingConfig {
    fn default() -> Self {
        Self {
            top_n: DEFAULT_TOP_N,
            top_categories: DEFAULT_TOP_CATEGORIES,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuoteConfig {
    /// Environment variable holding the API key. The key itself is never stored.
    pub api_key_env: String,
    pub base_url: String,
    pub history_days: u32,
}

impl Default for QuoteConfig {
    fn default() -> Self {
        Self {
            api_key_env: DEFAULT_API_KEY_ENV.into(),
            base_url: DEFAULT_BASE_URL.into(),
            history_days: DEFAULT_HISTORY_DAYS,
        }
    }
}

impl DashboardConfig {
    /// Load and validate a config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::from_toml(&content)
    }

    /// Load `path` if it exists, defaults otherwise.
    pub fn load_or_default(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            Self::from_file(path)
        } else {
            log::debug!("config.default path={}", path.display());
            Ok(Self::default())
        }
    }

    /// Parse and validate a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.sources.etfs.trim().is_empty() {
            return Err(ConfigError::Invalid("sources.etfs is empty".into()));
        }
        for (name, minutes) in [
            ("cache.dataset_ttl_minutes", self.cache.dataset_ttl_minutes),
            ("cache.quote_ttl_minutes", self.cache.quote_ttl_minutes),
        ] {
            if !TTL_RANGE_MINUTES.contains(&minutes) {
                return Err(ConfigError::Invalid(format!(
                    "{name} = {minutes} is outside {}..={}",
                    TTL_RANGE_MINUTES.start(),
                    TTL_RANGE_MINUTES.end()
                )));
            }
        }
        if self.categories.min_samples == 0 {
            return Err(ConfigError::Invalid("categories.min_samples must be at least 1".into()));
        }
        if self.ranking.top_n == 0 || self.ranking.top_categories == 0 {
            return Err(ConfigError::Invalid("ranking sizes must be at least 1".into()));
        }
        if self.quote.api_key_env.trim().is_empty() {
            return Err(ConfigError::Invalid("quote.api_key_env is empty".into()));
        }
        if self.quote.history_days == 0 {
            return Err(ConfigError::Invalid("quote.history_days must be at least 1".into()));
        }
        Ok(())
    }

    pub fn etfs_source(&self) -> DatasetSource {
        DatasetSource::parse(&self.sources.etfs)
    }

    pub fn summary_source(&self) -> Option<DatasetSource> {
        self.sources.summary.as_deref().map(DatasetSource::parse)
    }

    pub fn category_policy(&self) -> &CategoryPolicy {
        &self.categories
    }

    pub fn dataset_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache.dataset_ttl_minutes)
    }

    pub fn quote_ttl(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.cache.quote_ttl_minutes)
    }

    pub fn load_options(&self, use_cache: bool) -> LoadOptions {
        LoadOptions {
            ttl: self.dataset_ttl(),
            use_cache,
            local_fallback: self.sources.local_etfs.clone(),
        }
    }
}
