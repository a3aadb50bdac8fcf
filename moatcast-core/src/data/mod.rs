//! Data preparation: normalization, quarter dates, canonicalization, schema
//! reconciliation, alignment and frame ingestion.

pub mod align;
pub mod canonicalize;
pub mod frame;
pub mod normalize;
pub mod quarter;
pub mod schema;

pub use align::{align, align_with, TolerancePolicy};
pub use canonicalize::{AnomalyReport, AnomalyType, Canonicalized, Canonicalizer, Severity};
pub use frame::{fundamentals_from_frame, market_from_frame, FrameError, FrameIngest, FundamentalsLayout};
pub use normalize::parse_numeric;
pub use quarter::{add_months, forecast_date, quarter_end, QUARTER_STEP_DAYS};
pub use schema::{SchemaReconciliation, Side};
