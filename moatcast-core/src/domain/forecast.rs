//! Forecast records produced by Stage 1 and Stage 2.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Flat Stage 1 record: one indicator at one horizon step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorForecast {
    pub date: NaiveDate,
    /// 1-based horizon step.
    pub step: usize,
    pub indicator_name: String,
    /// `None` when the indicator could not be fitted (fewer than two points).
    pub value: Option<f64>,
}

/// One horizon step in wide form: a date plus one value per indicator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastStep {
    pub step: usize,
    pub date: NaiveDate,
    /// Aligned with `IndicatorForecastTable::indicators`.
    pub values: Vec<Option<f64>>,
}

/// Wide-form Stage 1 output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorForecastTable {
    pub indicators: Vec<String>,
    pub steps: Vec<ForecastStep>,
    /// Indicators emitted as missing for every step.
    pub degraded: Vec<String>,
}

impl IndicatorForecastTable {
    pub fn first_step(&self) -> Option<&ForecastStep> {
        self.steps.first()
    }

    /// Value of `indicator` at the given 1-based step.
    pub fn value(&self, step: usize, indicator: &str) -> Option<f64> {
        let col = self.indicators.iter().position(|i| i == indicator)?;
        self.steps
            .iter()
            .find(|s| s.step == step)
            .and_then(|s| s.values.get(col).copied().flatten())
    }

    pub fn is_degraded(&self, indicator: &str) -> bool {
        self.degraded.iter().any(|d| d == indicator)
    }

    /// Flatten to one record per (step, indicator), ascending by step.
    pub fn records(&self) -> Vec<IndicatorForecast> {
        self.steps
            .iter()
            .flat_map(|s| {
                self.indicators
                    .iter()
                    .zip(&s.values)
                    .map(move |(name, value)| IndicatorForecast {
                        date: s.date,
                        step: s.step,
                        indicator_name: name.clone(),
                        value: *value,
                    })
            })
            .collect()
    }
}

/// Stage 2 output: a single predicted price.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceForecast {
    pub date: NaiveDate,
    pub predicted_price: f64,
}
