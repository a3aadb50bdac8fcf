//! Regression metrics: pure functions over paired truth/prediction slices.
//!
//! No dependencies on the runner, data pipeline, or models.

use serde::{Deserialize, Serialize};

/// Accuracy of one model on the held-out split.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelScore {
    pub model_name: String,
    pub mean_absolute_error: f64,
    /// `None` when fewer than two test points make R² meaningless.
    pub r_squared: Option<f64>,
    pub test_rows: usize,
}

impl ModelScore {
    pub fn compute(model_name: &str, y_true: &[f64], y_pred: &[f64]) -> Self {
        Self {
            model_name: model_name.to_string(),
            mean_absolute_error: mean_absolute_error(y_true, y_pred),
            r_squared: r_squared(y_true, y_pred),
            test_rows: y_true.len().min(y_pred.len()),
        }
    }
}

/// Mean absolute error. Empty input yields 0.
pub fn mean_absolute_error(y_true: &[f64], y_pred: &[f64]) -> f64 {
    let n = y_true.len().min(y_pred.len());
    if n == 0 {
        return 0.0;
    }
    y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).abs())
        .sum::<f64>()
        / n as f64
}

/// Coefficient of determination `1 - SS_res / SS_tot`.
///
/// Undefined (`None`) for fewer than two points. With a constant truth the
/// score is 1 for a perfect prediction and 0 otherwise.
pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> Option<f64> {
    let n = y_true.len().min(y_pred.len());
    if n < 2 {
        return None;
    }
    let y_true = &y_true[..n];
    let mean = y_true.iter().sum::<f64>() / n as f64;
    let ss_tot: f64 = y_true.iter().map(|t| (t - mean).powi(2)).sum();
    let ss_res: f64 = y_true
        .iter()
        .zip(y_pred)
        .map(|(t, p)| (t - p).powi(2))
        .sum();

    if ss_tot == 0.0 {
        return Some(if ss_res == 0.0 { 1.0 } else { 0.0 });
    }
    Some(1.0 - ss_res / ss_tot)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mae() {
        assert_eq!(mean_absolute_error(&[1.0, 2.0, 3.0], &[2.0, 2.0, 1.0]), 1.0);
        assert_eq!(mean_absolute_error(&[], &[]), 0.0);
    }

    #[test]
    fn test_r_squared_perfect_and_mean() {
        let y = [1.0, 2.0, 3.0, 4.0];
        assert_eq!(r_squared(&y, &y), Some(1.0));
        assert_eq!(r_squared(&y, &[2.5; 4]), Some(0.0));
    }

    #[test]
    fn test_r_squared_can_be_negative() {
        let r2 = r_squared(&[1.0, 2.0, 3.0], &[3.0, 2.0, 1.0]).unwrap();
        assert!((r2 + 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_undefined_for_single_point() {
        assert_eq!(r_squared(&[1.0], &[1.0]), None);
    }

    #[test]
    fn test_r_squared_constant_truth() {
        assert_eq!(r_squared(&[5.0, 5.0], &[5.0, 5.0]), Some(1.0));
        assert_eq!(r_squared(&[5.0, 5.0], &[4.0, 5.0]), Some(0.0));
    }

    #[test]
    fn test_model_score_compute() {
        let score = ModelScore::compute("linear_regression", &[1.0, 3.0], &[2.0, 3.0]);
        assert_eq!(score.model_name, "linear_regression");
        assert_eq!(score.mean_absolute_error, 0.5);
        assert_eq!(score.test_rows, 2);
        assert_eq!(score.r_squared, Some(0.5));
    }
}
