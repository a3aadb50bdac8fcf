//! Single-stage baseline comparison.
//!
//! The feature rows are shuffled with a seeded RNG and split into train and
//! test sets. Linear regression, random forest and gradient boosting are fit
//! on the train set and scored on the test set. The scores are diagnostic
//! only: Stage 2 always deploys gradient boosting.
//!
//! A reference forecast is also produced: the boosting model refit on every
//! row predicts from the most recent feature row, dated a few calendar months
//! after it. It is reported next to the scores and never replaces Stage 2.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use moatcast_core::data::add_months;
use moatcast_core::domain::{FeatureRow, PriceForecast};
use moatcast_core::features::MIN_TRAINING_ROWS;
use moatcast_core::models::{
    Dataset, GradientBoostingRegressor, RandomForestRegressor, Regressor,
};
use moatcast_core::rng::RngHierarchy;
use moatcast_core::ForecastError;

use crate::config::BaselineConfig;
use crate::metrics::ModelScore;

const SPLIT_STREAM: &str = "baseline_split";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BaselineReport {
    pub train_rows: usize,
    pub test_rows: usize,
    pub seed: u64,
    pub scores: Vec<ModelScore>,
    pub reference_forecast: PriceForecast,
}

/// Row indices for the held-out split: `(train, test)`.
///
/// The test set has `ceil(test_fraction · n)` rows (at least one). Fails with
/// `InsufficientData` when fewer than two training rows would remain.
pub fn split_indices(
    n: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>), ForecastError> {
    if !(test_fraction > 0.0 && test_fraction < 1.0) {
        return Err(ForecastError::InvalidParameter {
            name: "test_fraction",
            reason: format!("must be in (0, 1), got {test_fraction}"),
        });
    }
    let n_test = ((test_fraction * n as f64).ceil() as usize).max(1);
    let n_train = n.saturating_sub(n_test);
    if n_train < MIN_TRAINING_ROWS {
        return Err(ForecastError::InsufficientData {
            stage: "baseline comparison",
            available: n,
            required: MIN_TRAINING_ROWS + n_test,
        });
    }

    let mut order: Vec<usize> = (0..n).collect();
    let mut rng = RngHierarchy::new(seed).rng_for(SPLIT_STREAM, 0);
    order.shuffle(&mut rng);

    let test = order[..n_test].to_vec();
    let train = order[n_test..].to_vec();
    Ok((train, test))
}

/// Fit and score the three comparison models, then build the reference
/// forecast.
pub fn run_baseline(
    rows: &[FeatureRow],
    config: &BaselineConfig,
) -> Result<BaselineReport, ForecastError> {
    let data = Dataset::from_feature_rows(rows)?;
    let (train_idx, test_idx) = split_indices(data.len(), config.test_fraction, config.seed)?;
    let train = data.select(&train_idx);
    let test = data.select(&test_idx);

    let boosting = GradientBoostingRegressor::new(config.boosting);
    let models: Vec<Box<dyn Regressor>> = vec![
        Box::new(config.linear),
        Box::new(RandomForestRegressor::new(config.random_forest)),
        Box::new(boosting),
    ];

    let mut scores = Vec::with_capacity(models.len());
    for model in &models {
        let fitted = model.fit(&train)?;
        let predicted = fitted.predict(&test.x);
        let score = ModelScore::compute(model.name(), &test.y, &predicted);
        tracing::info!(
            model = model.name(),
            mae = score.mean_absolute_error,
            r_squared = ?score.r_squared,
            "baseline model scored"
        );
        scores.push(score);
    }

    let reference_forecast = reference_forecast(rows, &data, &boosting, config.reference_months)?;

    Ok(BaselineReport {
        train_rows: train.len(),
        test_rows: test.len(),
        seed: config.seed,
        scores,
        reference_forecast,
    })
}

fn reference_forecast(
    rows: &[FeatureRow],
    data: &Dataset,
    boosting: &GradientBoostingRegressor,
    months: u32,
) -> Result<PriceForecast, ForecastError> {
    let (Some(last_row), Some(last_x)) = (rows.last(), data.x.last()) else {
        return Err(ForecastError::ModelFit {
            field: None,
            reason: "no feature rows to predict from".into(),
        });
    };
    let date = add_months(last_row.date, months).ok_or_else(|| ForecastError::InvalidParameter {
        name: "reference_months",
        reason: format!("{} + {months} months is out of range", last_row.date),
    })?;

    let model = boosting.fit_model(data)?;
    Ok(PriceForecast {
        date,
        predicted_price: model.predict_one(last_x),
    })
}
