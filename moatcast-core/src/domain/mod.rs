//! Domain types for the forecasting engine.
//!
//! Every type here is an immutable value record: stages consume references
//! and produce new tables, never mutating their inputs.

pub mod aligned;
pub mod feature;
pub mod forecast;
pub mod point;
pub mod series;

pub use aligned::{AlignedRow, AlignedTable};
pub use feature::{FeatureRole, FeatureRow, LagFeature};
pub use forecast::{ForecastStep, IndicatorForecast, IndicatorForecastTable, PriceForecast};
pub use point::{Cell, TimePoint};
pub use series::{Series, SeriesRole};

/// Field name type alias
pub type FieldName = String;
