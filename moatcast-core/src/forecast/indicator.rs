//! Stage 1: per-indicator linear trend projection.

use crate::data::quarter::forecast_date;
use crate::domain::{AlignedTable, ForecastStep, IndicatorForecastTable};
use crate::error::ForecastError;
use crate::models::linear::fit_line;

/// Minimum non-missing observations for an indicator to be projected.
pub const MIN_FIT_POINTS: usize = 2;

/// Project every indicator `horizon` steps past the last row of `table`.
///
/// Each indicator is regressed on the row index `0..n` using only its
/// non-missing values, then evaluated at `n..n + horizon`. Step `s` is dated
/// `last_date + 90·s` days. An indicator with too few points (or no spread
/// in time) is emitted as missing at every step and listed as degraded; the
/// others are unaffected.
pub fn forecast_indicators(
    table: &AlignedTable,
    indicator_fields: &[String],
    horizon: usize,
) -> Result<IndicatorForecastTable, ForecastError> {
    if horizon == 0 {
        return Err(ForecastError::InvalidParameter {
            name: "horizon",
            reason: "must be at least 1".into(),
        });
    }
    let Some(last_date) = table.last_date() else {
        return Err(ForecastError::InsufficientData {
            stage: "indicator forecaster",
            available: 0,
            required: 1,
        });
    };

    if forecast_date(last_date, horizon).is_none() {
        return Err(ForecastError::InvalidParameter {
            name: "horizon",
            reason: format!("{horizon} quarters past {last_date} is out of the calendar range"),
        });
    }

    let mut indicators: Vec<String> = Vec::new();
    for field in indicator_fields {
        if !indicators.contains(field) {
            indicators.push(field.clone());
        }
    }

    let n = table.len();
    let mut degraded = Vec::new();
    let lines: Vec<_> = indicators
        .iter()
        .map(|name| {
            let points: Vec<(f64, f64)> = table
                .column(name)
                .into_iter()
                .enumerate()
                .filter_map(|(t, v)| v.map(|v| (t as f64, v)))
                .collect();

            let line = if points.len() >= MIN_FIT_POINTS {
                fit_line(&points)
            } else {
                None
            };
            if line.is_none() {
                tracing::warn!(
                    indicator = %name,
                    points = points.len(),
                    required = MIN_FIT_POINTS,
                    "indicator cannot be fit; forecasting it as missing"
                );
                degraded.push(name.clone());
            }
            line
        })
        .collect();

    let mut steps = Vec::with_capacity(horizon);
    for step in 1..=horizon {
        let t = (n + step - 1) as f64;
        // Bounded by the last step, checked above.
        let Some(date) = forecast_date(last_date, step) else {
            break;
        };
        steps.push(ForecastStep {
            step,
            date,
            values: lines
                .iter()
                .map(|line| line.map(|l| l.at(t)).filter(|v| v.is_finite()))
                .collect(),
        });
    }

    tracing::info!(
        rows = n,
        indicators = indicators.len(),
        degraded = degraded.len(),
        horizon,
        "indicator forecast complete"
    );

    Ok(IndicatorForecastTable {
        indicators,
        steps,
        degraded,
    })
}
