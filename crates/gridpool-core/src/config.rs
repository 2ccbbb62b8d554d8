//! Engine configuration.
//!
//! Configuration can be loaded from:
//! - Environment variables (prefixed with `GRIDPOOL_`)
//! - JSON documents
//! - Programmatic defaults via [`EngineConfig::builder`]
//!
//! ```rust,ignore
//! use gridpool_core::config::EngineConfig;
//!
//! let config = EngineConfig::builder()
//!     .min_redistribution(Cents::dollars(2))
//!     .featured_slots(3)
//!     .build()?;
//! ```

use crate::money::{Bps, Cents};
use crate::ranking::RankingConfig;
use crate::rules::RuleCatalog;
use crate::settlement::RedistributionPolicy;
use crate::{GridpoolError, Result};
use serde::{Deserialize, Serialize};

/// Complete engine configuration.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Per-class economic parameters.
    pub rules: RuleCatalog,

    /// Discovery feed weights and tier capacities.
    pub ranking: RankingConfig,

    /// Dead-square redistribution on community boards.
    pub redistribution: RedistributionConfig,

    pub logging: LoggingConfig,
}

impl EngineConfig {
    pub fn builder() -> EngineConfigBuilder {
        EngineConfigBuilder::default()
    }

    /// Load configuration from environment variables on top of the defaults.
    ///
    /// - `GRIDPOOL_MIN_REDISTRIBUTION_CENTS` - minimum per-winner redistribution share
    /// - `GRIDPOOL_FEATURED_SLOTS` / `GRIDPOOL_PROMOTED_SLOTS` / `GRIDPOOL_STANDARD_SLOTS`
    /// - `GRIDPOOL_LOG_LEVEL` - trace, debug, info, warn, error
    /// - `GRIDPOOL_LOG_JSON` - `true` / `false`
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut config = Self::default();

        if let Some(v) = lookup("GRIDPOOL_MIN_REDISTRIBUTION_CENTS") {
            config.redistribution.min_per_winner_cents = parse_var("GRIDPOOL_MIN_REDISTRIBUTION_CENTS", &v)?;
        }
        if let Some(v) = lookup("GRIDPOOL_FEATURED_SLOTS") {
            config.ranking.featured.max_slots = parse_var("GRIDPOOL_FEATURED_SLOTS", &v)?;
        }
        if let Some(v) = lookup("GRIDPOOL_PROMOTED_SLOTS") {
            config.ranking.promoted.max_slots = parse_var("GRIDPOOL_PROMOTED_SLOTS", &v)?;
        }
        if let Some(v) = lookup("GRIDPOOL_STANDARD_SLOTS") {
            config.ranking.standard_max_slots = parse_var("GRIDPOOL_STANDARD_SLOTS", &v)?;
        }
        if let Some(level) = lookup("GRIDPOOL_LOG_LEVEL") {
            config.logging.level = level;
        }
        if let Some(v) = lookup("GRIDPOOL_LOG_JSON") {
            config.logging.json_output = parse_var("GRIDPOOL_LOG_JSON", &v)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Parse and validate a JSON document. Missing sections take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| GridpoolError::Configuration(format!("invalid config JSON: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.rules.validate()?;
        self.ranking.validate()?;
        Bps::new(self.redistribution.platform_fee_bps)?;
        Bps::new(self.redistribution.organizer_fee_bps)?;
        self.redistribution.policy().validate()?;

        if self.ranking.standard_max_slots == 0 {
            return Err(GridpoolError::Configuration(
                "standard_max_slots must be greater than 0".into(),
            ));
        }

        match self.logging.level.to_ascii_lowercase().as_str() {
            "trace" | "debug" | "info" | "warn" | "error" => {}
            other => {
                return Err(GridpoolError::Configuration(format!(
                    "unknown log level: {other}"
                )))
            }
        }

        Ok(())
    }
}

fn parse_var<T: std::str::FromStr>(key: &str, value: &str) -> Result<T>
where
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| GridpoolError::Configuration(format!("Invalid {key}: {e}")))
}

/// Redistribution configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RedistributionConfig {
    /// Redistributions below this per-winner share carry forward instead.
    pub min_per_winner_cents: u64,

    pub platform_fee_bps: u16,

    pub organizer_fee_bps: u16,
}

impl Default for RedistributionConfig {
    fn default() -> Self {
        let p = RedistributionPolicy::default();
        Self {
            min_per_winner_cents: p.min_per_winner.get(),
            platform_fee_bps: p.platform_fee.get(),
            organizer_fee_bps: p.organizer_fee.get(),
        }
    }
}

impl RedistributionConfig {
    /// Out-of-range fees saturate to 100% here; `validate` rejects them first.
    pub fn policy(&self) -> RedistributionPolicy {
        RedistributionPolicy {
            min_per_winner: Cents::new(self.min_per_winner_cents),
            platform_fee: Bps::new(self.platform_fee_bps).unwrap_or(Bps::MAX),
            organizer_fee: Bps::new(self.organizer_fee_bps).unwrap_or(Bps::MAX),
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    pub level: String,

    pub include_timestamps: bool,

    /// JSON output format.
    pub json_output: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            include_timestamps: true,
            json_output: false,
        }
    }
}

/// Builder for EngineConfig.
#[derive(Default)]
pub struct EngineConfigBuilder {
    config: EngineConfig,
}

impl EngineConfigBuilder {
    /// Replace the rule catalog.
    pub fn rules(mut self, rules: RuleCatalog) -> Self {
        self.config.rules = rules;
        self
    }

    pub fn ranking(mut self, ranking: RankingConfig) -> Self {
        self.config.ranking = ranking;
        self
    }

    /// Set the minimum per-winner redistribution share.
    pub fn min_redistribution(mut self, min: Cents) -> Self {
        self.config.redistribution.min_per_winner_cents = min.get();
        self
    }

    pub fn featured_slots(mut self, slots: usize) -> Self {
        self.config.ranking.featured.max_slots = slots;
        self
    }

    pub fn promoted_slots(mut self, slots: usize) -> Self {
        self.config.ranking.promoted.max_slots = slots;
        self
    }

    pub fn standard_slots(mut self, slots: usize) -> Self {
        self.config.ranking.standard_max_slots = slots;
        self
    }

    /// Set log level.
    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    /// Enable JSON log output.
    pub fn json_logs(mut self, enabled: bool) -> Self {
        self.config.logging.json_output = enabled;
        self
    }

    /// Build and validate the configuration.
    pub fn build(self) -> Result<EngineConfig> {
        self.config.validate()?;
        Ok(self.config)
    }
}
