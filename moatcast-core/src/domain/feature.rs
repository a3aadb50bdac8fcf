//! FeatureRow: one supervised-learning example built from lagged values.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Whether a lagged feature comes from a fundamentals indicator or the price.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureRole {
    Indicator,
    Price,
}

/// A single lagged input value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LagFeature {
    /// Feature name, e.g. `lagged_ROIC (%)`.
    pub name: String,
    /// Source field in the aligned table.
    pub field: String,
    pub lag: usize,
    pub role: FeatureRole,
    pub value: f64,
}

/// A complete feature/target pair.
///
/// Only complete rows are ever constructed: every feature and the target are
/// present. `feature_source_index < target_source_index` always holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Date of the aligned row the example is anchored on.
    pub date: NaiveDate,
    pub features: Vec<LagFeature>,
    /// Next-period realized price.
    pub target: f64,
    /// Aligned-table row the features were read from.
    pub feature_source_index: usize,
    /// Aligned-table row the target was read from.
    pub target_source_index: usize,
}

impl FeatureRow {
    /// Feature values in feature order.
    pub fn values(&self) -> Vec<f64> {
        self.features.iter().map(|f| f.value).collect()
    }

    pub fn names(&self) -> Vec<&str> {
        self.features.iter().map(|f| f.name.as_str()).collect()
    }

    pub fn price_feature(&self) -> Option<&LagFeature> {
        self.features.iter().find(|f| f.role == FeatureRole::Price)
    }
}
