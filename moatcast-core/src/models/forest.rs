//! Random forest: bootstrap-bagged regression trees.
//!
//! Trees are grown in parallel. Tree `t` draws its bootstrap sample from
//! `RngHierarchy::rng_for("random_forest", t)`, so the fitted forest does not
//! depend on thread count or scheduling.

use rand::Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use super::tree::{RegressionTree, TreeParams};
use super::{Dataset, FittedModel, Regressor};
use crate::error::ForecastError;
use crate::rng::RngHierarchy;

const STREAM: &str = "random_forest";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RandomForestParams {
    pub n_trees: usize,
    pub max_depth: Option<usize>,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
    pub seed: u64,
}

impl Default for RandomForestParams {
    fn default() -> Self {
        Self {
            n_trees: 100,
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
            seed: 42,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RandomForestRegressor {
    pub params: RandomForestParams,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RandomForest {
    trees: Vec<RegressionTree>,
}

impl RandomForest {
    pub fn trees(&self) -> &[RegressionTree] {
        &self.trees
    }

    pub fn predict_one(&self, row: &[f64]) -> f64 {
        if self.trees.is_empty() {
            return 0.0;
        }
        self.trees.iter().map(|t| t.predict_row(row)).sum::<f64>() / self.trees.len() as f64
    }
}

impl FittedModel for RandomForest {
    fn predict_row(&self, row: &[f64]) -> f64 {
        self.predict_one(row)
    }
}

impl RandomForestRegressor {
    pub fn new(params: RandomForestParams) -> Self {
        Self { params }
    }

    pub fn fit_model(&self, data: &Dataset) -> Result<RandomForest, ForecastError> {
        data.ensure_trainable()?;
        if self.params.n_trees == 0 {
            return Err(ForecastError::InvalidParameter {
                name: "n_trees",
                reason: "must be at least 1".into(),
            });
        }

        let n = data.len();
        let hierarchy = RngHierarchy::new(self.params.seed);
        let tree_params = TreeParams {
            max_depth: self.params.max_depth,
            min_samples_split: self.params.min_samples_split,
            min_samples_leaf: self.params.min_samples_leaf,
            l2: 0.0,
        };

        let trees = (0..self.params.n_trees)
            .into_par_iter()
            .map(|t| {
                let mut rng = hierarchy.rng_for(STREAM, t as u64);
                let sample: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
                RegressionTree::fit(&data.x, &data.y, &sample, &tree_params)
            })
            .collect();

        Ok(RandomForest { trees })
    }
}

impl Regressor for RandomForestRegressor {
    fn name(&self) -> &str {
        "random_forest"
    }

    fn fit(&self, data: &Dataset) -> Result<Box<dyn FittedModel>, ForecastError> {
        Ok(Box::new(self.fit_model(data)?))
    }
}
