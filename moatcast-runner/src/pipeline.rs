//! Pipeline orchestrator.
//!
//! Sequences canonicalize → align → build features → Stage 1 → Stage 2, then
//! the baseline comparison. Each stage completes before the next starts and
//! consumes the previous stage's output by reference. Any stage error aborts
//! the run; nothing is written by this module.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

use moatcast_core::data::{align_with, AnomalyReport, Canonicalizer, SchemaReconciliation};
use moatcast_core::domain::{
    AlignedTable, FeatureRow, IndicatorForecastTable, PriceForecast, Series,
};
use moatcast_core::features::build_features;
use moatcast_core::forecast::{forecast_indicators, forecast_price, MIN_FIT_POINTS};
use moatcast_core::ForecastError;

use crate::baseline::{run_baseline, BaselineReport};
use crate::config::{ConfigError, PipelineConfig, RunId};

/// Pipeline stage, for error context and logs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Align,
    Features,
    IndicatorForecast,
    PriceForecast,
    Baseline,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Align => "alignment",
            Stage::Features => "feature building",
            Stage::IndicatorForecast => "indicator forecast",
            Stage::PriceForecast => "price forecast",
            Stage::Baseline => "baseline comparison",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("{stage} failed: {source}")]
    Stage {
        stage: Stage,
        #[source]
        source: ForecastError,
    },
}

impl PipelineError {
    pub fn stage(&self) -> Option<Stage> {
        match self {
            PipelineError::Stage { stage, .. } => Some(*stage),
            PipelineError::Config(_) => None,
        }
    }

    pub fn forecast_error(&self) -> Option<&ForecastError> {
        match self {
            PipelineError::Stage { source, .. } => Some(source),
            PipelineError::Config(_) => None,
        }
    }
}

/// Row counts observed along the run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowCounts {
    pub fundamentals: usize,
    pub market: usize,
    pub fundamentals_duplicates: usize,
    pub market_duplicates: usize,
    pub aligned: usize,
    pub feature_rows: usize,
}

/// Everything a run produces.
#[derive(Debug, Clone)]
pub struct PipelineOutput {
    pub run_id: RunId,
    pub counts: RowCounts,
    pub anomalies: Vec<AnomalyReport>,
    pub aligned: AlignedTable,
    pub feature_rows: Vec<FeatureRow>,
    /// Fields carried by both input series; the schema picks which survives.
    pub shared_fields: Vec<String>,
    /// Indicators left out of the Stage 2 features for lack of data.
    pub excluded_indicators: Vec<String>,
    pub indicator_forecasts: IndicatorForecastTable,
    pub last_realized_price: f64,
    pub price_forecast: PriceForecast,
    /// `None` when disabled or when too few rows remain to split.
    pub baseline: Option<BaselineReport>,
}

/// Fields present in both series, logged with the side that wins each.
fn shared_fields(primary: &Series, secondary: &Series, schema: &SchemaReconciliation) -> Vec<String> {
    let fields = |s: &Series| -> Vec<String> {
        s.points()
            .iter()
            .flat_map(|p| p.values.keys().cloned())
            .collect()
    };
    let (primary, secondary) = (fields(primary), fields(secondary));
    let shared = SchemaReconciliation::conflicts(&primary, &secondary);
    for field in &shared {
        tracing::debug!(%field, winner = ?schema.winner(field), "field present in both series");
    }
    shared
}

fn stage_error(stage: Stage, rows: usize, source: ForecastError) -> PipelineError {
    tracing::error!(%stage, rows, error = %source, "stage failed");
    PipelineError::Stage { stage, source }
}

/// Run the full pipeline on raw (possibly unsorted) series.
pub fn run_pipeline(
    fundamentals: &Series,
    market: &Series,
    config: &PipelineConfig,
) -> Result<PipelineOutput, PipelineError> {
    config.validate()?;
    let run_id = config.run_id()?;
    let data = &config.data;
    tracing::info!(%run_id, "pipeline started");

    // ── Canonicalize ──
    let fundamentals = Canonicalizer::canonicalize(fundamentals);
    let market = Canonicalizer::canonicalize(market);
    for (name, c) in [("fundamentals", &fundamentals), ("market", &market)] {
        if c.duplicates_dropped > 0 || c.reordered {
            tracing::warn!(
                series = name,
                duplicates_dropped = c.duplicates_dropped,
                reordered = c.reordered,
                "series canonicalized"
            );
        }
    }

    let anomalies =
        Canonicalizer::detect_anomalies(&market.series, &data.price_field, &data.volume_field);
    for a in &anomalies {
        tracing::warn!(
            kind = ?a.anomaly_type,
            severity = ?a.severity,
            count = a.count,
            first = ?a.first_date,
            "market data anomaly"
        );
    }

    // ── Align ──
    let shared = shared_fields(&fundamentals.series, &market.series, &config.alignment.schema);
    let aligned = align_with(
        &fundamentals.series,
        &market.series,
        config.alignment.tolerance,
        &config.alignment.schema,
    )
    .map_err(|e| stage_error(Stage::Align, fundamentals.series.len(), e))?;
    tracing::info!(
        fundamentals = fundamentals.series.len(),
        market = market.series.len(),
        aligned = aligned.len(),
        "alignment complete"
    );

    // ── Features ──
    let (usable, excluded): (Vec<String>, Vec<String>) = data
        .indicators
        .iter()
        .cloned()
        .partition(|name| aligned.count_present(name) >= MIN_FIT_POINTS);
    if !excluded.is_empty() {
        tracing::warn!(
            ?excluded,
            "indicators with too few values are left out of the price model"
        );
    }

    let feature_rows = build_features(&aligned, &usable, &data.price_field, config.features.lag)
        .map_err(|e| stage_error(Stage::Features, aligned.len(), e))?;
    tracing::info!(
        aligned = aligned.len(),
        feature_rows = feature_rows.len(),
        "features built"
    );

    // ── Stage 1 ──
    let indicator_forecasts =
        forecast_indicators(&aligned, &data.indicators, config.forecast.horizon)
            .map_err(|e| stage_error(Stage::IndicatorForecast, aligned.len(), e))?;

    // ── Stage 2 ──
    // Most recent realized next-period price in the feature contract.
    let Some(last_realized_price) = feature_rows.last().map(|r| r.target) else {
        let source = ForecastError::InsufficientData {
            stage: "price forecaster",
            available: 0,
            required: 1,
        };
        return Err(stage_error(Stage::PriceForecast, 0, source));
    };
    let price_forecast = forecast_price(
        &feature_rows,
        &indicator_forecasts,
        last_realized_price,
        &config.forecast.boosting,
    )
    .map_err(|e| stage_error(Stage::PriceForecast, feature_rows.len(), e))?;

    // ── Baseline ──
    let baseline = if config.baseline.enabled {
        match run_baseline(&feature_rows, &config.baseline) {
            Ok(report) => Some(report),
            Err(ForecastError::InsufficientData {
                available,
                required,
                ..
            }) => {
                tracing::warn!(
                    available,
                    required,
                    "too few feature rows to split; baseline comparison skipped"
                );
                None
            }
            Err(e) => return Err(stage_error(Stage::Baseline, feature_rows.len(), e)),
        }
    } else {
        None
    };

    let counts = RowCounts {
        fundamentals: fundamentals.series.len(),
        market: market.series.len(),
        fundamentals_duplicates: fundamentals.duplicates_dropped,
        market_duplicates: market.duplicates_dropped,
        aligned: aligned.len(),
        feature_rows: feature_rows.len(),
    };
    tracing::info!(
        %run_id,
        date = %price_forecast.date,
        predicted_price = price_forecast.predicted_price,
        last_realized_price,
        "pipeline complete"
    );

    Ok(PipelineOutput {
        run_id,
        counts,
        anomalies,
        aligned,
        feature_rows,
        shared_fields: shared,
        excluded_indicators: excluded,
        indicator_forecasts,
        last_realized_price,
        price_forecast,
        baseline,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use moatcast_core::data::Side;
    use moatcast_core::domain::{Cell, SeriesRole, TimePoint};
    use std::collections::BTreeMap;

    fn series(role: SeriesRole, fields: &[&str]) -> Series {
        let date = chrono::NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        let values: BTreeMap<String, Cell> = fields
            .iter()
            .map(|f| (f.to_string(), Cell::from(Some(1.0))))
            .collect();
        Series::new(role, vec![TimePoint { date, values }])
    }

    #[test]
    fn shared_fields_lists_collisions_once() {
        let fundamentals = series(SeriesRole::Fundamentals, &["ROIC (%)", "close"]);
        let one_day = series(SeriesRole::Market, &["close", "volume"]);
        let mut points = one_day.points().to_vec();
        points.push(points[0].clone());
        let market = Series::new(SeriesRole::Market, points);

        let shared = shared_fields(&fundamentals, &market, &SchemaReconciliation::default());
        assert_eq!(shared, vec!["close".to_string()]);
        assert_eq!(SchemaReconciliation::default().winner("close"), Side::Primary);
    }

    #[test]
    fn disjoint_series_share_nothing() {
        let fundamentals = series(SeriesRole::Fundamentals, &["ROIC (%)"]);
        let market = series(SeriesRole::Market, &["close"]);
        assert!(shared_fields(&fundamentals, &market, &SchemaReconciliation::default()).is_empty());
    }

    #[test]
    fn stage_names_read_naturally() {
        assert_eq!(Stage::Features.to_string(), "feature building");
        assert_eq!(Stage::Align.to_string(), "alignment");
    }

    #[test]
    fn stage_error_carries_source() {
        let err = PipelineError::Stage {
            stage: Stage::Align,
            source: ForecastError::EmptySecondarySeries,
        };
        assert_eq!(err.stage(), Some(Stage::Align));
        assert_eq!(err.forecast_error(), Some(&ForecastError::EmptySecondarySeries));
        assert!(err.to_string().starts_with("alignment failed"));
    }
}
