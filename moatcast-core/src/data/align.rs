//! Nearest-date alignment of two differently sampled series.
//!
//! Every primary row is matched to the secondary row with the smallest
//! absolute day distance, before or after. Ties resolve to the earlier
//! secondary date. A match may therefore lie after the primary date; that
//! mild look-ahead is accepted behavior and kept as is.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::schema::SchemaReconciliation;
use crate::domain::{AlignedRow, AlignedTable, Series, TimePoint};
use crate::error::ForecastError;

/// How far a match may be from the primary date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TolerancePolicy {
    /// Always take the nearest secondary row.
    #[default]
    Nearest,
    /// Take the nearest row only if it is within `max_days`; otherwise keep
    /// the primary row with every secondary field missing.
    NearestWithin { max_days: i64 },
}

/// Align with the default policy and schema reconciliation.
pub fn align(primary: &Series, secondary: &Series) -> Result<AlignedTable, ForecastError> {
    align_with(
        primary,
        secondary,
        TolerancePolicy::Nearest,
        &SchemaReconciliation::default(),
    )
}

/// Align `primary` against `secondary`.
///
/// Both series must already be sorted ascending; a decrease anywhere fails
/// with `UnsortedInput`. An empty secondary fails with `EmptySecondarySeries`.
/// The output has exactly one row per primary row, in primary order.
pub fn align_with(
    primary: &Series,
    secondary: &Series,
    policy: TolerancePolicy,
    schema: &SchemaReconciliation,
) -> Result<AlignedTable, ForecastError> {
    primary.ensure_sorted()?;
    secondary.ensure_sorted()?;
    if secondary.is_empty() {
        return Err(ForecastError::EmptySecondarySeries);
    }

    let lookup = secondary.points();
    let rows = primary
        .points()
        .iter()
        .map(|p| {
            let matched = nearest(lookup, p.date)
                .filter(|m| within(policy, distance_days(p.date, m.date)));
            AlignedRow {
                date: p.date,
                matched_date: matched.map(|m| m.date),
                values: schema.merge(&p.values, matched.map(|m| &m.values)),
            }
        })
        .collect();

    Ok(AlignedTable::new(rows))
}

/// Nearest point to `date` in a sorted, non-empty slice.
///
/// Ties (equal distance before and after) go to the earlier date; among
/// repeated dates the first occurrence wins.
fn nearest(sorted: &[TimePoint], date: NaiveDate) -> Option<&TimePoint> {
    let after = sorted.partition_point(|s| s.date < date);

    let before_candidate = after.checked_sub(1).map(|i| {
        let d = sorted[i].date;
        &sorted[sorted.partition_point(|s| s.date < d)]
    });
    let after_candidate = sorted.get(after);

    match (before_candidate, after_candidate) {
        (Some(b), Some(a)) => {
            if distance_days(date, b.date) <= distance_days(date, a.date) {
                Some(b)
            } else {
                Some(a)
            }
        }
        (Some(b), None) => Some(b),
        (None, Some(a)) => Some(a),
        (None, None) => None,
    }
}

fn distance_days(a: NaiveDate, b: NaiveDate) -> i64 {
    (a - b).num_days().abs()
}

fn within(policy: TolerancePolicy, distance: i64) -> bool {
    match policy {
        TolerancePolicy::Nearest => true,
        TolerancePolicy::NearestWithin { max_days } => distance <= max_days,
    }
}
