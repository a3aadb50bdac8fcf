//! Conversion of raw polars frames into `Series`.
//!
//! Frames arrive with every column as text. Values are carried over as raw
//! cells; numeric coercion happens later through `normalize::parse_numeric`.
//! Rows whose key columns cannot be turned into a date are dropped and
//! counted, never guessed.

use chrono::NaiveDate;
use polars::prelude::{DataFrame, DataType, PolarsError};
use std::collections::BTreeMap;

use super::quarter::{parse_quarter, parse_year, quarter_end};
use crate::domain::{Cell, Series, SeriesRole, TimePoint};

/// Date format of the market table.
pub const MARKET_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, thiserror::Error)]
pub enum FrameError {
    #[error("missing column '{column}' in {role} table (found: {found:?})")]
    MissingColumn {
        role: SeriesRole,
        column: String,
        found: Vec<String>,
    },

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),
}

/// A series plus the number of rows that could not be keyed by date.
#[derive(Debug, Clone)]
pub struct FrameIngest {
    pub series: Series,
    pub dropped_rows: usize,
}

/// Column layout of the fundamentals table.
#[derive(Debug, Clone)]
pub struct FundamentalsLayout {
    pub year_column: String,
    pub quarter_column: String,
}

impl Default for FundamentalsLayout {
    fn default() -> Self {
        Self {
            year_column: "Year".into(),
            quarter_column: "Quarter".into(),
        }
    }
}

/// Build the fundamentals series. Each row is dated at its quarter end.
pub fn fundamentals_from_frame(
    df: &DataFrame,
    layout: &FundamentalsLayout,
) -> Result<FrameIngest, FrameError> {
    let columns = text_columns(df)?;
    let year = find(&columns, &layout.year_column, SeriesRole::Fundamentals)?;
    let quarter = find(&columns, &layout.quarter_column, SeriesRole::Fundamentals)?;

    let keyed = (0..df.height()).map(|row| {
        let y = columns[year].1[row].as_deref().and_then(parse_year);
        let q = columns[quarter].1[row].as_deref().and_then(parse_quarter);
        match (y, q) {
            (Some(y), Some(q)) => quarter_end(y, q),
            _ => None,
        }
    });

    Ok(collect_points(
        SeriesRole::Fundamentals,
        &columns,
        &[year, quarter],
        keyed,
    ))
}

/// Build the market series from a date-keyed frame.
pub fn market_from_frame(df: &DataFrame, date_column: &str) -> Result<FrameIngest, FrameError> {
    let columns = text_columns(df)?;
    let date = find(&columns, date_column, SeriesRole::Market)?;

    let keyed = (0..df.height()).map(|row| columns[date].1[row].as_deref().and_then(parse_date));

    Ok(collect_points(SeriesRole::Market, &columns, &[date], keyed))
}

/// Parse a market date, tolerating a trailing time component.
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let trimmed = raw.trim();
    let day = trimmed
        .split(|c: char| c == ' ' || c == 'T')
        .next()
        .unwrap_or(trimmed);
    NaiveDate::parse_from_str(day, MARKET_DATE_FORMAT).ok()
}

// ─── Helpers ─────────────────────────────────────────────────────────

type TextColumn = (String, Vec<Option<String>>);

fn text_columns(df: &DataFrame) -> Result<Vec<TextColumn>, FrameError> {
    df.get_columns()
        .iter()
        .map(|col| {
            let series = col.as_materialized_series().cast(&DataType::String)?;
            let values = series
                .str()?
                .into_iter()
                .map(|v| v.map(str::to_string))
                .collect();
            Ok((col.name().trim().to_string(), values))
        })
        .collect()
}

fn find(columns: &[TextColumn], name: &str, role: SeriesRole) -> Result<usize, FrameError> {
    columns
        .iter()
        .position(|(n, _)| n == name)
        .ok_or_else(|| FrameError::MissingColumn {
            role,
            column: name.to_string(),
            found: columns.iter().map(|(n, _)| n.clone()).collect(),
        })
}

fn collect_points(
    role: SeriesRole,
    columns: &[TextColumn],
    key_columns: &[usize],
    keys: impl Iterator<Item = Option<NaiveDate>>,
) -> FrameIngest {
    let mut points = Vec::new();
    let mut dropped_rows = 0;

    for (row, key) in keys.enumerate() {
        let Some(date) = key else {
            dropped_rows += 1;
            continue;
        };
        let values: BTreeMap<String, Cell> = columns
            .iter()
            .enumerate()
            .filter(|(i, _)| !key_columns.contains(i))
            .map(|(_, (name, cells))| (name.clone(), to_cell(cells[row].as_deref())))
            .collect();
        points.push(TimePoint { date, values });
    }

    if dropped_rows > 0 {
        tracing::warn!(%role, dropped_rows, "rows without a usable date were dropped");
    }

    FrameIngest {
        series: Series::new(role, points),
        dropped_rows,
    }
}

fn to_cell(raw: Option<&str>) -> Cell {
    match raw.map(str::trim) {
        None | Some("") => Cell::Missing,
        Some(text) => Cell::Text(text.to_string()),
    }
}
