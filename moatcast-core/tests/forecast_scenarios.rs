//! End-to-end scenarios through the core stages.
//!
//! Each test runs align → build_features → forecast_indicators →
//! forecast_price on synthetic quarterly fundamentals and daily prices.

use chrono::NaiveDate;
use moatcast_core::data::{align, quarter_end, Canonicalizer};
use moatcast_core::domain::{Series, SeriesRole, TimePoint};
use moatcast_core::features::build_features;
use moatcast_core::forecast::{forecast_indicators, forecast_price};
use moatcast_core::models::BoostingParams;
use moatcast_core::ForecastError;

const PRICE: &str = "adjustedCloseStockPrice";
const VOLUME: &str = "dailyTradingVolume";

// ── Helpers ──────────────────────────────────────────────────────────

fn indicators() -> Vec<String> {
    vec!["ROIC (%)".to_string(), "Gross Margin %".to_string()]
}

/// Eight quarters (2022 Q1 – 2023 Q4) with steadily rising indicators.
fn rising_fundamentals() -> Series {
    let points = (0..8)
        .map(|i| {
            let date = quarter_end(2022 + i / 4, (i % 4) as u32 + 1).unwrap();
            TimePoint::new(date)
                .with("ROIC (%)", format!("{:.1}%", 10.0 + i as f64).as_str())
                .with("Gross Margin %", 40.0 + 0.5 * i as f64)
        })
        .collect();
    Series::new(SeriesRole::Fundamentals, points)
}

/// Daily prices rising 0.1 per calendar day over 2022–2023 (weekdays only).
fn rising_market() -> Series {
    let start = NaiveDate::from_ymd_opt(2022, 1, 3).unwrap();
    let points = (0..740)
        .map(|d| start + chrono::Duration::days(d))
        .filter(|date| {
            use chrono::Datelike;
            date.weekday().number_from_monday() <= 5
        })
        .map(|date| {
            let day = (date - start).num_days() as f64;
            TimePoint::new(date)
                .with(PRICE, 100.0 + 0.1 * day)
                .with(VOLUME, 1_000_000.0)
        })
        .collect();
    Series::new(SeriesRole::Market, points)
}

fn run_price(fundamentals: &Series, market: &Series) -> Result<(f64, f64), ForecastError> {
    let table = align(fundamentals, market)?;
    let rows = build_features(&table, &indicators(), PRICE, 1)?;
    let forecasts = forecast_indicators(&table, &indicators(), 2)?;
    let last_realized = rows.last().map(|r| r.target).unwrap_or_default();
    let price = forecast_price(&rows, &forecasts, last_realized, &BoostingParams::default())?;
    Ok((price.predicted_price, last_realized))
}

// ── Scenarios ────────────────────────────────────────────────────────

#[test]
fn scenario_rising_trend_projects_higher() {
    let fundamentals = rising_fundamentals();
    let market = rising_market();

    let table = align(&fundamentals, &market).unwrap();
    assert_eq!(table.len(), 8);

    let forecasts = forecast_indicators(&table, &indicators(), 2).unwrap();
    let last_roic = table.rows()[7].number("ROIC (%)").unwrap();
    let step1 = forecasts.value(1, "ROIC (%)").unwrap();
    let step2 = forecasts.value(2, "ROIC (%)").unwrap();
    assert!(step1 > last_roic);
    assert!(step2 > step1);
    assert!(forecasts.value(2, "Gross Margin %").unwrap() > 43.5);

    let (predicted, last_realized) = run_price(&fundamentals, &market).unwrap();
    assert!(
        predicted > last_realized,
        "predicted {predicted} should exceed last realized {last_realized}"
    );
}

#[test]
fn stage_two_is_bit_identical_across_runs() {
    let fundamentals = rising_fundamentals();
    let market = rising_market();

    let (a, _) = run_price(&fundamentals, &market).unwrap();
    let (b, _) = run_price(&fundamentals, &market).unwrap();
    assert_eq!(a.to_bits(), b.to_bits());
}

#[test]
fn forecast_dates_step_ninety_days_past_last_quarter() {
    let table = align(&rising_fundamentals(), &rising_market()).unwrap();
    let forecasts = forecast_indicators(&table, &indicators(), 3).unwrap();
    let last = NaiveDate::from_ymd_opt(2023, 12, 31).unwrap();

    let dates: Vec<NaiveDate> = forecasts.steps.iter().map(|s| s.date).collect();
    assert_eq!(
        dates,
        vec![
            NaiveDate::from_ymd_opt(2024, 3, 30).unwrap(),
            NaiveDate::from_ymd_opt(2024, 6, 28).unwrap(),
            NaiveDate::from_ymd_opt(2024, 9, 26).unwrap(),
        ]
    );
    assert!(dates.iter().all(|d| *d > last));
}

#[test]
fn sparse_indicator_degrades_without_blocking_others() {
    let points = (0..10)
        .map(|i| {
            let date = quarter_end(2021 + i / 4, (i % 4) as u32 + 1).unwrap();
            let sparse = if i == 3 { "5.0" } else { "" };
            TimePoint::new(date)
                .with("A", sparse)
                .with("B", 100.0 + 10.0 * i as f64)
        })
        .collect();
    let fundamentals = Series::new(SeriesRole::Fundamentals, points);
    let table = align(&fundamentals, &rising_market()).unwrap();

    let names = vec!["A".to_string(), "B".to_string()];
    let forecasts = forecast_indicators(&table, &names, 2).unwrap();

    assert_eq!(forecasts.degraded, vec!["A".to_string()]);
    assert!(forecasts.steps.iter().all(|s| s.values[0].is_none()));
    assert!((forecasts.value(1, "B").unwrap() - 200.0).abs() < 1e-9);
    assert!((forecasts.value(2, "B").unwrap() - 210.0).abs() < 1e-9);
}

#[test]
fn single_fundamentals_row_is_insufficient() {
    let one = Series::new(
        SeriesRole::Fundamentals,
        rising_fundamentals().points()[..1].to_vec(),
    );
    let table = align(&one, &rising_market()).unwrap();
    let err = build_features(&table, &indicators(), PRICE, 1).unwrap_err();
    assert!(matches!(
        err,
        ForecastError::InsufficientData {
            stage: "feature builder",
            ..
        }
    ));
}

#[test]
fn unsorted_input_must_be_canonicalized_first() {
    let mut points = rising_fundamentals().into_points();
    points.swap(2, 5);
    let shuffled = Series::new(SeriesRole::Fundamentals, points);

    assert!(matches!(
        align(&shuffled, &rising_market()),
        Err(ForecastError::UnsortedInput { .. })
    ));

    let fixed = Canonicalizer::canonicalize(&shuffled);
    assert!(fixed.reordered);
    assert_eq!(align(&fixed.series, &rising_market()).unwrap().len(), 8);
}
