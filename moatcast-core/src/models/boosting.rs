//! Gradient-boosted regression trees on squared loss.
//!
//! Each round fits an L2-regularized tree to the current residuals and adds
//! `learning_rate` times its output. The ensemble starts from an initial
//! estimate: the target mean, or a linear fit. Trees alone cannot predict
//! outside the range of the training targets; the linear start lets the
//! ensemble follow a trend past the last observation while the trees correct
//! its residuals.

use rand::seq::index::sample;
use serde::{Deserialize, Serialize};

use super::linear::{LinearModel, LinearRegression};
use super::tree::{RegressionTree, TreeParams};
use super::{mean, Dataset, FittedModel, Regressor};
use crate::error::ForecastError;
use crate::rng::RngHierarchy;

const STREAM: &str = "boosting_subsample";

/// Initial estimate the trees are boosted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoostingInit {
    Mean,
    #[default]
    Linear,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    pub n_estimators: usize,
    pub learning_rate: f64,
    pub max_depth: usize,
    pub min_samples_leaf: usize,
    /// L2 penalty on leaf values.
    pub l2: f64,
    /// Fraction of rows each round sees, drawn without replacement.
    pub subsample: f64,
    pub seed: u64,
    pub init: BoostingInit,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 100,
            learning_rate: 0.3,
            max_depth: 6,
            min_samples_leaf: 1,
            l2: 1.0,
            subsample: 1.0,
            seed: 42,
            init: BoostingInit::Linear,
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<(), ForecastError> {
        if self.n_estimators == 0 {
            return Err(ForecastError::InvalidParameter {
                name: "n_estimators",
                reason: "must be at least 1".into(),
            });
        }
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(ForecastError::InvalidParameter {
                name: "learning_rate",
                reason: format!("must be in (0, 1], got {}", self.learning_rate),
            });
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return Err(ForecastError::InvalidParameter {
                name: "subsample",
                reason: format!("must be in (0, 1], got {}", self.subsample),
            });
        }
        if !self.l2.is_finite() || self.l2 < 0.0 {
            return Err(ForecastError::InvalidParameter {
                name: "l2",
                reason: format!("must be a finite non-negative number, got {}", self.l2),
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct GradientBoostingRegressor {
    pub params: BoostingParams,
}

#[derive(Debug, Clone, PartialEq)]
enum InitialEstimate {
    Constant(f64),
    Linear(LinearModel),
}

impl InitialEstimate {
    fn predict(&self, row: &[f64]) -> f64 {
        match self {
            InitialEstimate::Constant(c) => *c,
            InitialEstimate::Linear(m) => m.predict_one(row),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct GradientBoosting {
    init: InitialEstimate,
    learning_rate: f64,
    trees: Vec<RegressionTree>,
}

impl GradientBoosting {
    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn predict_one(&self, row: &[f64]) -> f64 {
        self.init.predict(row)
            + self.learning_rate * self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>()
    }
}

impl FittedModel for GradientBoosting {
    fn predict_row(&self, row: &[f64]) -> f64 {
        self.predict_one(row)
    }
}

impl GradientBoostingRegressor {
    pub fn new(params: BoostingParams) -> Self {
        Self { params }
    }

    pub fn fit_model(&self, data: &Dataset) -> Result<GradientBoosting, ForecastError> {
        data.ensure_trainable()?;
        let p = &self.params;
        p.validate()?;

        let init = match p.init {
            BoostingInit::Mean => InitialEstimate::Constant(mean(&data.y)),
            BoostingInit::Linear => {
                InitialEstimate::Linear(LinearRegression::default().fit_model(data)?)
            }
        };

        let n = data.len();
        let mut current: Vec<f64> = data.x.iter().map(|r| init.predict(r)).collect();
        let tree_params = TreeParams {
            max_depth: Some(p.max_depth),
            min_samples_split: 2,
            min_samples_leaf: p.min_samples_leaf,
            l2: p.l2,
        };
        let hierarchy = RngHierarchy::new(p.seed);
        let per_round = ((p.subsample * n as f64).ceil() as usize).clamp(1, n);
        let all_rows: Vec<usize> = (0..n).collect();

        let mut trees = Vec::with_capacity(p.n_estimators);
        for round in 0..p.n_estimators {
            let residuals: Vec<f64> = data.y.iter().zip(&current).map(|(y, f)| y - f).collect();
            let rows = if per_round < n {
                let mut rng = hierarchy.rng_for(STREAM, round as u64);
                let mut picked = sample(&mut rng, n, per_round).into_vec();
                picked.sort_unstable();
                picked
            } else {
                all_rows.clone()
            };

            let tree = RegressionTree::fit(&data.x, &residuals, &rows, &tree_params);
            for (f, row) in current.iter_mut().zip(&data.x) {
                *f += p.learning_rate * tree.predict_row(row);
            }
            trees.push(tree);
        }

        if current.iter().any(|f| !f.is_finite()) {
            return Err(ForecastError::model_fit("boosting diverged to non-finite predictions"));
        }

        Ok(GradientBoosting {
            init,
            learning_rate: p.learning_rate,
            trees,
        })
    }
}

impl Regressor for GradientBoostingRegressor {
    fn name(&self) -> &str {
        "gradient_boosting"
    }

    fn fit(&self, data: &Dataset) -> Result<Box<dyn FittedModel>, ForecastError> {
        Ok(Box::new(self.fit_model(data)?))
    }
}
