//! The two forecasting stages.
//!
//! Stage 1 projects each fundamental indicator forward with its own line fit.
//! Stage 2 fits a boosted ensemble on historical lag features and predicts
//! the next price from a row assembled out of Stage 1's first step.

pub mod indicator;
pub mod price;

pub use indicator::{forecast_indicators, MIN_FIT_POINTS};
pub use price::{forecast_price, synthetic_row};
