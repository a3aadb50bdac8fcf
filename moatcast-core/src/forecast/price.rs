//! Stage 2: next-period price from forecast indicators.

use crate::domain::{FeatureRole, FeatureRow, IndicatorForecastTable, PriceForecast};
use crate::error::ForecastError;
use crate::features::MIN_TRAINING_ROWS;
use crate::models::{BoostingParams, Dataset, GradientBoostingRegressor};

/// Fit the booster on every historical feature row and predict one price.
///
/// The prediction row uses Stage 1's first-step value for each lagged
/// indicator and `last_realized_price` for the lagged price. The forecast is
/// dated at Stage 1's first step.
pub fn forecast_price(
    historical: &[FeatureRow],
    forecasts: &IndicatorForecastTable,
    last_realized_price: f64,
    params: &BoostingParams,
) -> Result<PriceForecast, ForecastError> {
    if historical.len() < MIN_TRAINING_ROWS {
        return Err(ForecastError::model_fit(format!(
            "{} historical feature rows, need at least {MIN_TRAINING_ROWS}",
            historical.len()
        )));
    }

    let first_step = forecasts
        .first_step()
        .ok_or_else(|| ForecastError::model_fit("indicator forecast has no steps"))?;
    let row = synthetic_row(&historical[0], forecasts, last_realized_price)?;

    let data = Dataset::from_feature_rows(historical)?;
    let model = GradientBoostingRegressor::new(*params).fit_model(&data)?;
    let predicted_price = model.predict_one(&row);

    if !predicted_price.is_finite() {
        return Err(ForecastError::model_fit("prediction is not finite"));
    }

    tracing::info!(
        training_rows = data.len(),
        features = data.n_features(),
        date = %first_step.date,
        predicted_price,
        "price forecast complete"
    );

    Ok(PriceForecast {
        date: first_step.date,
        predicted_price,
    })
}

/// Assemble the prediction row in the feature order of `template`.
///
/// Fails with `ModelFit` naming the feature when a step-1 indicator value is
/// missing or any value is not finite.
pub fn synthetic_row(
    template: &FeatureRow,
    forecasts: &IndicatorForecastTable,
    last_realized_price: f64,
) -> Result<Vec<f64>, ForecastError> {
    let step = forecasts
        .first_step()
        .map(|s| s.step)
        .ok_or_else(|| ForecastError::model_fit("indicator forecast has no steps"))?;

    template
        .features
        .iter()
        .map(|feature| {
            let value = match feature.role {
                FeatureRole::Price => last_realized_price,
                FeatureRole::Indicator => {
                    forecasts.value(step, &feature.field).ok_or_else(|| {
                        ForecastError::model_fit_on(
                            feature.name.clone(),
                            format!("no step-{step} forecast for '{}'", feature.field),
                        )
                    })?
                }
            };
            if !value.is_finite() {
                return Err(ForecastError::model_fit_on(
                    feature.name.clone(),
                    format!("non-finite value {value}"),
                ));
            }
            Ok(value)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ForecastStep, LagFeature};
    use chrono::NaiveDate;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    fn feature(field: &str, role: FeatureRole, value: f64) -> LagFeature {
        LagFeature {
            name: format!("lagged_{field}"),
            field: field.to_string(),
            lag: 1,
            role,
            value,
        }
    }

    fn history(n: usize) -> Vec<FeatureRow> {
        (0..n)
            .map(|i| FeatureRow {
                date: date("2022-03-31") + chrono::Duration::days(91 * i as i64),
                features: vec![
                    feature("roic", FeatureRole::Indicator, 10.0 + i as f64),
                    feature("price", FeatureRole::Price, 100.0 + 5.0 * i as f64),
                ],
                target: 110.0 + 5.0 * i as f64,
                feature_source_index: i,
                target_source_index: i + 2,
            })
            .collect()
    }

    fn forecasts(roic: Option<f64>) -> IndicatorForecastTable {
        IndicatorForecastTable {
            indicators: vec!["roic".into()],
            steps: vec![
                ForecastStep {
                    step: 1,
                    date: date("2024-06-29"),
                    values: vec![roic],
                },
                ForecastStep {
                    step: 2,
                    date: date("2024-09-27"),
                    values: vec![roic.map(|v| v + 1.0)],
                },
            ],
            degraded: if roic.is_none() {
                vec!["roic".into()]
            } else {
                vec![]
            },
        }
    }

    #[test]
    fn synthetic_row_follows_feature_order() {
        let rows = history(3);
        let row = synthetic_row(&rows[0], &forecasts(Some(18.0)), 145.0).unwrap();
        assert_eq!(row, vec![18.0, 145.0]);
    }

    #[test]
    fn missing_step_one_forecast_names_feature() {
        let rows = history(3);
        let err = synthetic_row(&rows[0], &forecasts(None), 145.0).unwrap_err();
        match err {
            ForecastError::ModelFit { field, .. } => {
                assert_eq!(field.as_deref(), Some("lagged_roic"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn non_finite_price_is_rejected() {
        let rows = history(3);
        let err = synthetic_row(&rows[0], &forecasts(Some(18.0)), f64::NAN).unwrap_err();
        assert!(matches!(
            err,
            ForecastError::ModelFit { field: Some(ref f), .. } if f == "lagged_price"
        ));
    }

    #[test]
    fn forecast_is_dated_at_first_step() {
        let rows = history(8);
        let out = forecast_price(
            &rows,
            &forecasts(Some(18.0)),
            rows[7].target,
            &BoostingParams::default(),
        )
        .unwrap();
        assert_eq!(out.date, date("2024-06-29"));
        assert!(out.predicted_price > rows[7].target);
    }

    #[test]
    fn one_row_is_model_fit_error() {
        let rows = history(1);
        let err = forecast_price(
            &rows,
            &forecasts(Some(18.0)),
            110.0,
            &BoostingParams::default(),
        )
        .unwrap_err();
        assert!(matches!(err, ForecastError::ModelFit { .. }));
    }

    #[test]
    fn repeated_runs_are_bit_identical() {
        let rows = history(8);
        let run = || {
            forecast_price(
                &rows,
                &forecasts(Some(18.0)),
                rows[7].target,
                &BoostingParams::default(),
            )
            .unwrap()
            .predicted_price
            .to_bits()
        };
        assert_eq!(run(), run());
    }
}
