//! MoatCast Core: two-stage time-aligned forecasting engine.
//!
//! This crate contains everything between raw tables and a price forecast:
//! - Domain types (time points, series, aligned tables, feature rows, forecasts)
//! - Data preparation (numeric normalization, quarter dates, canonicalization,
//!   schema reconciliation, nearest-date alignment, polars frame ingestion)
//! - Lag feature builder with strict temporal causality
//! - Regressors written from scratch (linear, CART, random forest, boosting)
//! - Stage 1 indicator projection and Stage 2 price forecast
//! - Deterministic RNG hierarchy
//!
//! Every stage takes references and returns a new value; nothing here reads
//! or writes files.

pub mod data;
pub mod domain;
pub mod error;
pub mod features;
pub mod forecast;
pub mod models;
pub mod rng;

pub use error::ForecastError;
