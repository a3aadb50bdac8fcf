//! Series: an ordered sequence of TimePoints from one origin schema.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use super::point::TimePoint;
use crate::error::ForecastError;

/// Which origin table a series came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeriesRole {
    /// Sparse, quarterly financial fundamentals.
    Fundamentals,
    /// Dense, daily price and volume.
    Market,
}

impl fmt::Display for SeriesRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeriesRole::Fundamentals => write!(f, "fundamentals"),
            SeriesRole::Market => write!(f, "market"),
        }
    }
}

/// Sequence of observations.
///
/// A `Series` may be built from raw, unsorted rows; `Canonicalizer` produces
/// the sorted, date-unique form the aligner requires. The aligner checks the
/// ordering itself rather than trusting the constructor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Series {
    pub role: SeriesRole,
    points: Vec<TimePoint>,
}

impl Series {
    pub fn new(role: SeriesRole, points: Vec<TimePoint>) -> Self {
        Self { role, points }
    }

    pub fn empty(role: SeriesRole) -> Self {
        Self::new(role, Vec::new())
    }

    pub fn points(&self) -> &[TimePoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<TimePoint> {
        self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.points.first().map(|p| p.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.points.last().map(|p| p.date)
    }

    /// Fail with `UnsortedInput` at the first date decrease.
    pub fn ensure_sorted(&self) -> Result<(), ForecastError> {
        for (i, pair) in self.points.windows(2).enumerate() {
            if pair[1].date < pair[0].date {
                return Err(ForecastError::UnsortedInput {
                    role: self.role,
                    index: i + 1,
                    date: pair[1].date,
                    previous_index: i,
                    previous: pair[0].date,
                });
            }
        }
        Ok(())
    }

    /// Number of rows where `field` has a usable numeric value.
    pub fn count_present(&self, field: &str) -> usize {
        self.points
            .iter()
            .filter(|p| p.number(field).is_some())
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(date: &str) -> TimePoint {
        TimePoint::new(NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap())
    }

    #[test]
    fn sorted_series_passes() {
        let s = Series::new(
            SeriesRole::Market,
            vec![point("2024-01-02"), point("2024-01-02"), point("2024-01-03")],
        );
        assert!(s.ensure_sorted().is_ok());
    }

    #[test]
    fn decrease_is_reported_with_position() {
        let s = Series::new(
            SeriesRole::Fundamentals,
            vec![point("2024-03-31"), point("2024-06-30"), point("2023-12-31")],
        );
        match s.ensure_sorted() {
            Err(ForecastError::UnsortedInput {
                role,
                index,
                previous_index,
                ..
            }) => {
                assert_eq!(role, SeriesRole::Fundamentals);
                assert_eq!(index, 2);
                assert_eq!(previous_index, 1);
            }
            other => panic!("expected UnsortedInput, got {other:?}"),
        }
    }

    #[test]
    fn empty_series_is_sorted() {
        assert!(Series::empty(SeriesRole::Market).ensure_sorted().is_ok());
    }
}
