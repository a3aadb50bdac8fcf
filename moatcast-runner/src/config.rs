//! Serializable pipeline configuration.
//!
//! Loaded from TOML; every section has defaults so an empty file is a valid
//! configuration that reproduces the reference setup (lag 1, two-quarter
//! horizon, 80/20 baseline split with seed 42).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

use moatcast_core::data::{SchemaReconciliation, TolerancePolicy};
use moatcast_core::models::{BoostingParams, LinearRegression, RandomForestParams};

/// Unique identifier for a pipeline run (content-addressable hash).
pub type RunId = String;

/// Longest accepted Stage 1 horizon: 100 years of quarters.
pub const MAX_HORIZON: usize = 400;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("failed to serialize config: {0}")]
    Serialize(String),

    #[error("invalid config value for {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PipelineConfig {
    pub data: DataConfig,
    pub alignment: AlignmentConfig,
    pub features: FeatureConfig,
    pub forecast: ForecastConfig,
    pub baseline: BaselineConfig,
}

/// Column names of the input tables.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    pub price_field: String,
    pub volume_field: String,
    pub market_date_column: String,
    pub year_column: String,
    pub quarter_column: String,
    /// Fundamental indicators, in feature order.
    pub indicators: Vec<String>,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            price_field: "adjustedCloseStockPrice".into(),
            volume_field: "dailyTradingVolume".into(),
            market_date_column: "Report Date".into(),
            year_column: "Year".into(),
            quarter_column: "Quarter".into(),
            indicators: vec![
                "ROIC (%)".into(),
                "Gross Margin %".into(),
                "R&D as % of Revenue".into(),
                "Free Cash Flow".into(),
            ],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlignmentConfig {
    pub tolerance: TolerancePolicy,
    pub schema: SchemaReconciliation,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct FeatureConfig {
    pub lag: usize,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self { lag: 1 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ForecastConfig {
    /// Quarters projected by Stage 1.
    pub horizon: usize,
    pub boosting: BoostingParams,
}

impl Default for ForecastConfig {
    fn default() -> Self {
        Self {
            horizon: 2,
            boosting: BoostingParams::default(),
        }
    }
}

/// Single-stage comparison models and split.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BaselineConfig {
    pub enabled: bool,
    /// Fraction of feature rows held out for scoring.
    pub test_fraction: f64,
    pub seed: u64,
    /// Calendar months between the last aligned date and the reference
    /// forecast date.
    pub reference_months: u32,
    pub linear: LinearRegression,
    pub random_forest: RandomForestParams,
    pub boosting: BoostingParams,
}

impl Default for BaselineConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            test_fraction: 0.2,
            seed: 42,
            reference_months: 3,
            linear: LinearRegression::default(),
            random_forest: RandomForestParams::default(),
            boosting: BoostingParams::default(),
        }
    }
}

impl PipelineConfig {
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text)
    }

    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Serialize(e.to_string()))
    }

    /// Computes a deterministic hash ID for this configuration.
    pub fn run_id(&self) -> Result<RunId, ConfigError> {
        let json =
            serde_json::to_string(self).map_err(|e| ConfigError::Serialize(e.to_string()))?;
        Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |field: &'static str, reason: String| ConfigError::Invalid { field, reason };

        if self.data.price_field.trim().is_empty() {
            return Err(invalid("data.price_field", "must not be empty".into()));
        }
        if self.data.indicators.is_empty() {
            return Err(invalid("data.indicators", "list at least one indicator".into()));
        }
        if self.features.lag == 0 {
            return Err(invalid("features.lag", "must be at least 1".into()));
        }
        if self.forecast.horizon == 0 || self.forecast.horizon > MAX_HORIZON {
            return Err(invalid(
                "forecast.horizon",
                format!("must be between 1 and {MAX_HORIZON}, got {}", self.forecast.horizon),
            ));
        }
        if let TolerancePolicy::NearestWithin { max_days } = self.alignment.tolerance {
            if max_days < 0 {
                return Err(invalid(
                    "alignment.tolerance.max_days",
                    format!("must be non-negative, got {max_days}"),
                ));
            }
        }
        self.forecast
            .boosting
            .validate()
            .map_err(|e| invalid("forecast.boosting", e.to_string()))?;

        let b = &self.baseline;
        if !(b.test_fraction > 0.0 && b.test_fraction < 1.0) {
            return Err(invalid(
                "baseline.test_fraction",
                format!("must be in (0, 1), got {}", b.test_fraction),
            ));
        }
        if b.random_forest.n_trees == 0 {
            return Err(invalid("baseline.random_forest.n_trees", "must be at least 1".into()));
        }
        b.boosting
            .validate()
            .map_err(|e| invalid("baseline.boosting", e.to_string()))?;
        Ok(())
    }
}
