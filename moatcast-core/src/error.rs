//! Error taxonomy for the forecasting engine.
//!
//! Every stage returns `ForecastError`. The orchestrator decides what is fatal;
//! the only sanctioned partial result (Stage 1 per-indicator degradation) never
//! surfaces as an error.

use chrono::NaiveDate;
use thiserror::Error;

use crate::domain::SeriesRole;

/// Errors raised by the alignment, feature and forecasting stages.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ForecastError {
    #[error("{role} series is not sorted: row {index} ({date}) precedes row {previous_index} ({previous})")]
    UnsortedInput {
        role: SeriesRole,
        index: usize,
        date: NaiveDate,
        previous_index: usize,
        previous: NaiveDate,
    },

    #[error("secondary series is empty: no rows to align against")]
    EmptySecondarySeries,

    #[error("insufficient data in {stage}: {available} usable rows, need at least {required}")]
    InsufficientData {
        stage: &'static str,
        available: usize,
        required: usize,
    },

    #[error("model fit failed{}: {reason}", field_suffix(.field))]
    ModelFit {
        field: Option<String>,
        reason: String,
    },

    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: &'static str, reason: String },
}

fn field_suffix(field: &Option<String>) -> String {
    field
        .as_deref()
        .map(|f| format!(" on '{f}'"))
        .unwrap_or_default()
}

impl ForecastError {
    pub(crate) fn model_fit(reason: impl Into<String>) -> Self {
        Self::ModelFit {
            field: None,
            reason: reason.into(),
        }
    }

    pub(crate) fn model_fit_on(field: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ModelFit {
            field: Some(field.into()),
            reason: reason.into(),
        }
    }
}
