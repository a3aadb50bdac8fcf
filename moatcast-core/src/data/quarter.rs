//! Fiscal quarter handling for the fundamentals table.

use chrono::{Months, NaiveDate};

use super::normalize::parse_numeric;

/// Spacing between forecast steps, matching the quarterly reporting cadence.
pub const QUARTER_STEP_DAYS: i64 = 90;

/// Quarter-end date: 1→Mar 31, 2→Jun 30, 3→Sep 30, 4→Dec 31.
pub fn quarter_end(year: i32, quarter: u32) -> Option<NaiveDate> {
    let (month, day) = match quarter {
        1 => (3, 31),
        2 => (6, 30),
        3 => (9, 30),
        4 => (12, 31),
        _ => return None,
    };
    NaiveDate::from_ymd_opt(year, month, day)
}

/// Parse a quarter cell. Accepts `3`, `3.0`, `Qtr 3` and `Q3`.
pub fn parse_quarter(raw: &str) -> Option<u32> {
    let trimmed = raw.trim();
    let body = trimmed
        .strip_prefix("Qtr")
        .or_else(|| trimmed.strip_prefix('Q'))
        .unwrap_or(trimmed);
    let value = parse_numeric(body)?;
    if value.fract() != 0.0 || !(1.0..=4.0).contains(&value) {
        return None;
    }
    Some(value as u32)
}

/// Parse a year cell. Accepts `2024` and `2024.0`.
pub fn parse_year(raw: &str) -> Option<i32> {
    let value = parse_numeric(raw)?;
    if value.fract() != 0.0 || !(1.0..=9999.0).contains(&value) {
        return None;
    }
    Some(value as i32)
}

/// Date `step` forecast periods after `last`, or `None` past the calendar range.
pub fn forecast_date(last: NaiveDate, step: usize) -> Option<NaiveDate> {
    let days = QUARTER_STEP_DAYS.checked_mul(i64::try_from(step).ok()?)?;
    last.checked_add_signed(chrono::Duration::try_days(days)?)
}

/// Calendar-month offset with end-of-month clamping (Mar 31 + 3 → Jun 30).
pub fn add_months(date: NaiveDate, months: u32) -> Option<NaiveDate> {
    date.checked_add_months(Months::new(months))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn quarter_end_mapping() {
        assert_eq!(quarter_end(2024, 1), Some(date("2024-03-31")));
        assert_eq!(quarter_end(2024, 2), Some(date("2024-06-30")));
        assert_eq!(quarter_end(2024, 3), Some(date("2024-09-30")));
        assert_eq!(quarter_end(2024, 4), Some(date("2024-12-31")));
        assert_eq!(quarter_end(2024, 5), None);
        assert_eq!(quarter_end(2024, 0), None);
    }

    #[test]
    fn quarter_labels() {
        assert_eq!(parse_quarter("Qtr 3"), Some(3));
        assert_eq!(parse_quarter("Q2"), Some(2));
        assert_eq!(parse_quarter("4"), Some(4));
        assert_eq!(parse_quarter("1.0"), Some(1));
        assert_eq!(parse_quarter("Qtr 5"), None);
        assert_eq!(parse_quarter("2.5"), None);
        assert_eq!(parse_quarter(""), None);
    }

    #[test]
    fn year_cells() {
        assert_eq!(parse_year("2023"), Some(2023));
        assert_eq!(parse_year("2023.0"), Some(2023));
        assert_eq!(parse_year("FY23"), None);
    }

    #[test]
    fn forecast_dates_step_by_ninety_days() {
        let last = date("2024-12-31");
        assert_eq!(forecast_date(last, 1), Some(date("2025-03-31")));
        assert_eq!(forecast_date(last, 2), Some(date("2025-06-29")));
    }

    #[test]
    fn forecast_date_out_of_range_is_none() {
        let last = date("2024-12-31");
        assert_eq!(forecast_date(last, 3_000_000), None);
        assert_eq!(forecast_date(last, usize::MAX), None);
    }

    #[test]
    fn month_offset_clamps_to_month_end() {
        assert_eq!(add_months(date("2024-03-31"), 3), Some(date("2024-06-30")));
        assert_eq!(add_months(date("2024-12-31"), 3), Some(date("2025-03-31")));
    }
}
