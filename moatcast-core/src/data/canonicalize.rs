//! Canonicalization: stable sort by date, keep the first row per date, and
//! flag data-quality anomalies in the market series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::{Series, TimePoint};

/// Canonicalizer for raw series
pub struct Canonicalizer;

/// Result of canonicalizing a series.
#[derive(Debug, Clone)]
pub struct Canonicalized {
    pub series: Series,
    /// Rows removed because an earlier row carried the same date.
    pub duplicates_dropped: usize,
    /// True when the input was not already in date order.
    pub reordered: bool,
}

impl Canonicalizer {
    /// Sort ascending by date (stable) and drop duplicate dates, keeping the
    /// first occurrence in input order.
    pub fn canonicalize(series: &Series) -> Canonicalized {
        let reordered = series.ensure_sorted().is_err();

        let mut points: Vec<TimePoint> = series.points().to_vec();
        points.sort_by_key(|p| p.date);

        let before = points.len();
        points.dedup_by_key(|p| p.date);
        let duplicates_dropped = before - points.len();

        Canonicalized {
            series: Series::new(series.role, points),
            duplicates_dropped,
            reordered,
        }
    }

    /// Detect anomalies in a market series (zero volume, non-positive or
    /// missing prices). Anomalies are reported, never repaired.
    pub fn detect_anomalies(
        series: &Series,
        price_field: &str,
        volume_field: &str,
    ) -> Vec<AnomalyReport> {
        let mut anomalies = Vec::new();

        let zero_volume: Vec<NaiveDate> = series
            .points()
            .iter()
            .filter(|p| p.number(volume_field) == Some(0.0))
            .map(|p| p.date)
            .collect();
        if !zero_volume.is_empty() {
            anomalies.push(AnomalyReport::new(
                AnomalyType::ZeroVolume,
                Severity::Warning,
                &zero_volume,
            ));
        }

        let bad_price: Vec<NaiveDate> = series
            .points()
            .iter()
            .filter(|p| matches!(p.number(price_field), Some(v) if v <= 0.0))
            .map(|p| p.date)
            .collect();
        if !bad_price.is_empty() {
            anomalies.push(AnomalyReport::new(
                AnomalyType::NonPositivePrice,
                Severity::Error,
                &bad_price,
            ));
        }

        let missing_price: Vec<NaiveDate> = series
            .points()
            .iter()
            .filter(|p| p.number(price_field).is_none())
            .map(|p| p.date)
            .collect();
        if !missing_price.is_empty() {
            anomalies.push(AnomalyReport::new(
                AnomalyType::MissingPrice,
                Severity::Warning,
                &missing_price,
            ));
        }

        anomalies
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub anomaly_type: AnomalyType,
    pub count: usize,
    pub severity: Severity,
    pub first_date: Option<NaiveDate>,
}

impl AnomalyReport {
    fn new(anomaly_type: AnomalyType, severity: Severity, dates: &[NaiveDate]) -> Self {
        Self {
            anomaly_type,
            count: dates.len(),
            severity,
            first_date: dates.first().copied(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnomalyType {
    ZeroVolume,
    NonPositivePrice,
    MissingPrice,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    Warning,
    Error,
}
