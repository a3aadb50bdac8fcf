//! TimePoint: a single dated observation.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::data::normalize::parse_numeric;

/// One cell of a raw table.
///
/// Tables arrive column-typed but indicator columns may still carry a
/// percentage suffix (`"12.5%"`), so text is kept until a stage asks for the
/// numeric value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Cell {
    Number(f64),
    Text(String),
    Missing,
}

impl Cell {
    /// Numeric value of the cell, or `None` when missing or malformed.
    ///
    /// Text goes through [`parse_numeric`], so `"12.5%"` is `12.5` and `""` is
    /// missing. Non-finite numbers are missing, never zero.
    pub fn number(&self) -> Option<f64> {
        match self {
            Cell::Number(v) if v.is_finite() => Some(*v),
            Cell::Number(_) => None,
            Cell::Text(raw) => parse_numeric(raw),
            Cell::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        self.number().is_none()
    }
}

impl From<f64> for Cell {
    fn from(v: f64) -> Self {
        Cell::Number(v)
    }
}

impl From<&str> for Cell {
    fn from(v: &str) -> Self {
        Cell::Text(v.to_string())
    }
}

impl From<Option<f64>> for Cell {
    fn from(v: Option<f64>) -> Self {
        v.map(Cell::Number).unwrap_or(Cell::Missing)
    }
}

/// A dated observation: `date` plus named cells.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimePoint {
    pub date: NaiveDate,
    pub values: BTreeMap<String, Cell>,
}

impl TimePoint {
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            values: BTreeMap::new(),
        }
    }

    /// Builder-style insert, used heavily by tests and the frame ingestor.
    pub fn with(mut self, field: impl Into<String>, cell: impl Into<Cell>) -> Self {
        self.values.insert(field.into(), cell.into());
        self
    }

    pub fn get(&self, field: &str) -> Option<&Cell> {
        self.values.get(field)
    }

    /// Numeric value of `field`; absent fields are missing.
    pub fn number(&self, field: &str) -> Option<f64> {
        self.values.get(field).and_then(Cell::number)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn percent_text_is_numeric() {
        let p = TimePoint::new(date("2024-03-31")).with("ROIC (%)", "12.5%");
        assert_eq!(p.number("ROIC (%)"), Some(12.5));
    }

    #[test]
    fn absent_field_is_missing() {
        let p = TimePoint::new(date("2024-03-31"));
        assert_eq!(p.number("Free Cash Flow"), None);
    }

    #[test]
    fn nan_number_is_missing_not_zero() {
        assert_eq!(Cell::Number(f64::NAN).number(), None);
        assert!(Cell::Number(f64::INFINITY).is_missing());
    }

    #[test]
    fn optional_converts_to_missing() {
        assert_eq!(Cell::from(None::<f64>), Cell::Missing);
        assert_eq!(Cell::from(Some(3.0)), Cell::Number(3.0));
    }
}
