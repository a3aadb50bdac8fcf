//! Regressors fit from scratch on small tabular datasets.
//!
//! - [`linear`]: ridge-stabilized least squares and the single-variable line
//!   fit used by Stage 1
//! - [`tree`]: CART regression tree with L2 leaf regularization
//! - [`forest`]: bagged regression trees grown in parallel
//! - [`boosting`]: gradient-boosted trees on squared loss
//!
//! A [`Regressor`] holds hyperparameters only; fitting yields a separate
//! [`FittedModel`], so one configuration can be fit many times.

pub mod boosting;
pub mod forest;
pub mod linear;
pub mod tree;

pub use boosting::{BoostingInit, BoostingParams, GradientBoosting, GradientBoostingRegressor};
pub use forest::{RandomForest, RandomForestParams, RandomForestRegressor};
pub use linear::{fit_line, LineFit, LinearModel, LinearRegression};
pub use tree::{RegressionTree, TreeNode, TreeParams};

use crate::domain::FeatureRow;
use crate::error::ForecastError;
use crate::features::MIN_TRAINING_ROWS;

/// Untrained model configuration.
pub trait Regressor: Send + Sync {
    /// Name used in reports and logs.
    fn name(&self) -> &str;

    fn fit(&self, data: &Dataset) -> Result<Box<dyn FittedModel>, ForecastError>;
}

/// A trained model.
pub trait FittedModel: Send + Sync {
    /// Predict one row. Columns follow the training dataset's feature order.
    fn predict_row(&self, row: &[f64]) -> f64;

    fn predict(&self, rows: &[Vec<f64>]) -> Vec<f64> {
        rows.iter().map(|r| self.predict_row(r)).collect()
    }
}

/// Dense design matrix plus target.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    pub feature_names: Vec<String>,
    pub x: Vec<Vec<f64>>,
    pub y: Vec<f64>,
}

impl Dataset {
    /// Validate shape and finiteness. A non-finite cell is reported against
    /// its column name.
    pub fn new(
        feature_names: Vec<String>,
        x: Vec<Vec<f64>>,
        y: Vec<f64>,
    ) -> Result<Self, ForecastError> {
        if x.len() != y.len() {
            return Err(ForecastError::model_fit(format!(
                "{} feature rows but {} targets",
                x.len(),
                y.len()
            )));
        }
        for (i, row) in x.iter().enumerate() {
            if row.len() != feature_names.len() {
                return Err(ForecastError::model_fit(format!(
                    "row {i} has {} features, expected {}",
                    row.len(),
                    feature_names.len()
                )));
            }
            if let Some(j) = row.iter().position(|v| !v.is_finite()) {
                return Err(ForecastError::model_fit_on(
                    feature_names[j].clone(),
                    format!("non-finite value in row {i}"),
                ));
            }
        }
        if let Some(i) = y.iter().position(|v| !v.is_finite()) {
            return Err(ForecastError::model_fit_on(
                "target",
                format!("non-finite value in row {i}"),
            ));
        }
        Ok(Self {
            feature_names,
            x,
            y,
        })
    }

    /// Build from feature rows. Every row must carry the same feature names
    /// in the same order.
    pub fn from_feature_rows(rows: &[FeatureRow]) -> Result<Self, ForecastError> {
        let feature_names: Vec<String> = rows
            .first()
            .map(|r| r.features.iter().map(|f| f.name.clone()).collect())
            .unwrap_or_default();

        if let Some(bad) = rows.iter().find(|r| r.names() != feature_names) {
            return Err(ForecastError::model_fit(format!(
                "inconsistent feature schema at {}",
                bad.date
            )));
        }

        let x = rows.iter().map(FeatureRow::values).collect();
        let y = rows.iter().map(|r| r.target).collect();
        Self::new(feature_names, x, y)
    }

    pub fn len(&self) -> usize {
        self.y.len()
    }

    pub fn is_empty(&self) -> bool {
        self.y.is_empty()
    }

    pub fn n_features(&self) -> usize {
        self.feature_names.len()
    }

    /// Rows at `indices`, in that order.
    pub fn select(&self, indices: &[usize]) -> Dataset {
        Dataset {
            feature_names: self.feature_names.clone(),
            x: indices.iter().map(|&i| self.x[i].clone()).collect(),
            y: indices.iter().map(|&i| self.y[i]).collect(),
        }
    }

    pub(crate) fn ensure_trainable(&self) -> Result<(), ForecastError> {
        if self.len() < MIN_TRAINING_ROWS {
            return Err(ForecastError::model_fit(format!(
                "{} training rows, need at least {MIN_TRAINING_ROWS}",
                self.len()
            )));
        }
        Ok(())
    }
}

pub(crate) fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{FeatureRole, LagFeature};
    use chrono::NaiveDate;

    fn feature_row(names: &[&str], values: &[f64], target: f64) -> FeatureRow {
        FeatureRow {
            date: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            features: names
                .iter()
                .zip(values)
                .map(|(n, v)| LagFeature {
                    name: n.to_string(),
                    field: n.trim_start_matches("lagged_").to_string(),
                    lag: 1,
                    role: FeatureRole::Indicator,
                    value: *v,
                })
                .collect(),
            target,
            feature_source_index: 0,
            target_source_index: 2,
        }
    }

    #[test]
    fn dataset_from_feature_rows() {
        let rows = vec![
            feature_row(&["lagged_a", "lagged_price"], &[1.0, 10.0], 11.0),
            feature_row(&["lagged_a", "lagged_price"], &[2.0, 11.0], 12.0),
        ];
        let data = Dataset::from_feature_rows(&rows).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.n_features(), 2);
        assert_eq!(data.x[1], vec![2.0, 11.0]);
        assert_eq!(data.y, vec![11.0, 12.0]);
    }

    #[test]
    fn non_finite_feature_names_column() {
        let rows = vec![
            feature_row(&["lagged_a", "lagged_price"], &[1.0, 10.0], 11.0),
            feature_row(&["lagged_a", "lagged_price"], &[f64::NAN, 11.0], 12.0),
        ];
        let err = Dataset::from_feature_rows(&rows).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::ModelFit { field: Some(ref f), .. } if f == "lagged_a"
        ));
    }

    #[test]
    fn inconsistent_schema_is_rejected() {
        let rows = vec![
            feature_row(&["lagged_a"], &[1.0], 11.0),
            feature_row(&["lagged_b"], &[1.0], 11.0),
        ];
        assert!(Dataset::from_feature_rows(&rows).is_err());
    }

    #[test]
    fn select_keeps_order_and_duplicates() {
        let data = Dataset::new(
            vec!["a".into()],
            vec![vec![1.0], vec![2.0], vec![3.0]],
            vec![10.0, 20.0, 30.0],
        )
        .unwrap();
        let picked = data.select(&[2, 0, 2]);
        assert_eq!(picked.y, vec![30.0, 10.0, 30.0]);
    }

    #[test]
    fn single_row_is_not_trainable() {
        let data = Dataset::new(vec!["a".into()], vec![vec![1.0]], vec![1.0]).unwrap();
        assert!(matches!(
            data.ensure_trainable(),
            Err(ForecastError::ModelFit { field: None, .. })
        ));
    }
}
