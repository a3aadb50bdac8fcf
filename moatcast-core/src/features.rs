//! Lag feature builder.
//!
//! For aligned row `i` the features are read from row `i - lag` and the label
//! is the price at row `i + 1`. Any row with a missing feature or label is
//! dropped; nothing is imputed.

use crate::domain::{AlignedTable, FeatureRole, FeatureRow, LagFeature};
use crate::error::ForecastError;

/// Minimum number of complete feature rows a model can be fit on.
pub const MIN_TRAINING_ROWS: usize = 2;

/// Column name of a lagged field.
pub fn lagged_name(field: &str) -> String {
    format!("lagged_{field}")
}

/// Build supervised feature/target rows from an aligned table.
///
/// Feature order is `indicator_fields` (deduplicated, first occurrence wins,
/// the price field skipped) followed by the price field.
pub fn build_features(
    table: &AlignedTable,
    indicator_fields: &[String],
    price_field: &str,
    lag: usize,
) -> Result<Vec<FeatureRow>, ForecastError> {
    if lag == 0 {
        return Err(ForecastError::InvalidParameter {
            name: "lag",
            reason: "must be at least 1".into(),
        });
    }

    let contract = feature_contract(indicator_fields, price_field);
    let rows = table.rows();
    let mut out = Vec::new();

    for i in lag..rows.len().saturating_sub(1) {
        let source = &rows[i - lag];
        let Some(target) = rows[i + 1].number(price_field) else {
            continue;
        };

        let features: Option<Vec<LagFeature>> = contract
            .iter()
            .map(|(field, role)| {
                source.number(field).map(|value| LagFeature {
                    name: lagged_name(field),
                    field: field.to_string(),
                    lag,
                    role: *role,
                    value,
                })
            })
            .collect();

        if let Some(features) = features {
            out.push(FeatureRow {
                date: rows[i].date,
                features,
                target,
                feature_source_index: i - lag,
                target_source_index: i + 1,
            });
        }
    }

    tracing::debug!(
        aligned_rows = rows.len(),
        feature_rows = out.len(),
        lag,
        "built lag features"
    );

    if out.len() < MIN_TRAINING_ROWS {
        return Err(ForecastError::InsufficientData {
            stage: "feature builder",
            available: out.len(),
            required: MIN_TRAINING_ROWS,
        });
    }
    Ok(out)
}

fn feature_contract<'a>(
    indicator_fields: &'a [String],
    price_field: &'a str,
) -> Vec<(&'a str, FeatureRole)> {
    let mut contract: Vec<(&str, FeatureRole)> = Vec::new();
    for field in indicator_fields {
        if field != price_field && !contract.iter().any(|(f, _)| *f == field.as_str()) {
            contract.push((field.as_str(), FeatureRole::Indicator));
        }
    }
    contract.push((price_field, FeatureRole::Price));
    contract
}
