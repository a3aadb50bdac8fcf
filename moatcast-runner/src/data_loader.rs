//! CSV table loading for the runner.
//!
//! Both tables are read with every column as text; the core frame ingestion
//! keys rows by date and leaves numeric coercion to the normalization layer.
//! Rows without a usable date are dropped and counted.

use polars::prelude::*;
use std::path::{Path, PathBuf};
use thiserror::Error;

use moatcast_core::data::{
    fundamentals_from_frame, market_from_frame, FrameError, FundamentalsLayout,
};
use moatcast_core::domain::Series;

use crate::config::DataConfig;

/// Errors from the data loading layer.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read {path}: {source}")]
    Csv {
        path: PathBuf,
        source: PolarsError,
    },

    #[error("{path}: {source}")]
    Frame {
        path: PathBuf,
        source: FrameError,
    },
}

/// Raw series for one run, before canonicalization.
#[derive(Debug, Clone)]
pub struct LoadedTables {
    pub fundamentals: Series,
    pub market: Series,
    /// Fundamentals rows dropped for a missing or invalid year/quarter.
    pub fundamentals_dropped: usize,
    /// Market rows dropped for an unparsable date.
    pub market_dropped: usize,
}

/// Load the fundamentals and market CSV tables.
pub fn load_tables(
    fundamentals_path: &Path,
    market_path: &Path,
    data: &DataConfig,
) -> Result<LoadedTables, LoadError> {
    let layout = FundamentalsLayout {
        year_column: data.year_column.clone(),
        quarter_column: data.quarter_column.clone(),
    };

    let df = read_text_csv(fundamentals_path)?;
    let fundamentals = fundamentals_from_frame(&df, &layout).map_err(|source| LoadError::Frame {
        path: fundamentals_path.to_path_buf(),
        source,
    })?;

    let df = read_text_csv(market_path)?;
    let market =
        market_from_frame(&df, &data.market_date_column).map_err(|source| LoadError::Frame {
            path: market_path.to_path_buf(),
            source,
        })?;

    tracing::info!(
        fundamentals_rows = fundamentals.series.len(),
        fundamentals_dropped = fundamentals.dropped_rows,
        market_rows = market.series.len(),
        market_dropped = market.dropped_rows,
        "tables loaded"
    );

    Ok(LoadedTables {
        fundamentals: fundamentals.series,
        market: market.series,
        fundamentals_dropped: fundamentals.dropped_rows,
        market_dropped: market.dropped_rows,
    })
}

/// Read a CSV with a header row, every column as a string.
pub fn read_text_csv(path: &Path) -> Result<DataFrame, LoadError> {
    let csv_error = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .map_err(csv_error)?
        .finish()
        .map_err(csv_error)
}
