//! Linear least squares.
//!
//! Columns are standardized before solving and a small ridge penalty is
//! applied in standardized space, which keeps coefficients bounded when
//! trending features are nearly collinear. Constant columns get a zero
//! coefficient.

use serde::{Deserialize, Serialize};

use super::{mean, Dataset, FittedModel, Regressor};
use crate::error::ForecastError;

/// Default ridge strength per training row, in standardized units.
pub const DEFAULT_RIDGE: f64 = 1e-3;

/// Standard deviation below which a column counts as constant.
const CONSTANT_COLUMN_EPS: f64 = 1e-12;

/// Linear regression configuration.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    #[serde(default = "default_ridge")]
    pub ridge: f64,
}

fn default_ridge() -> f64 {
    DEFAULT_RIDGE
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self {
            ridge: DEFAULT_RIDGE,
        }
    }
}

/// Fitted linear model: `intercept + Σ coefficients[j] · x[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct LinearModel {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
}

impl LinearModel {
    pub fn predict_one(&self, row: &[f64]) -> f64 {
        self.intercept
            + self
                .coefficients
                .iter()
                .zip(row)
                .map(|(c, x)| c * x)
                .sum::<f64>()
    }
}

impl FittedModel for LinearModel {
    fn predict_row(&self, row: &[f64]) -> f64 {
        self.predict_one(row)
    }
}

impl LinearRegression {
    pub fn fit_model(&self, data: &Dataset) -> Result<LinearModel, ForecastError> {
        data.ensure_trainable()?;
        if !self.ridge.is_finite() || self.ridge < 0.0 {
            return Err(ForecastError::InvalidParameter {
                name: "ridge",
                reason: format!("must be a finite non-negative number, got {}", self.ridge),
            });
        }

        let n = data.len();
        let p = data.n_features();
        let y_mean = mean(&data.y);

        // Column statistics; constant columns are left out of the solve.
        let mut means = vec![0.0; p];
        let mut sds = vec![0.0; p];
        for j in 0..p {
            let col: Vec<f64> = data.x.iter().map(|r| r[j]).collect();
            means[j] = mean(&col);
            let var = col.iter().map(|v| (v - means[j]).powi(2)).sum::<f64>() / n as f64;
            sds[j] = var.sqrt();
        }
        let active: Vec<usize> = (0..p).filter(|&j| sds[j] > CONSTANT_COLUMN_EPS).collect();

        let mut coefficients = vec![0.0; p];
        if !active.is_empty() {
            let k = active.len();
            let z = |i: usize, a: usize| {
                let j = active[a];
                (data.x[i][j] - means[j]) / sds[j]
            };

            let lambda = self.ridge * n as f64;
            let mut gram = vec![vec![0.0; k]; k];
            let mut rhs = vec![0.0; k];
            for i in 0..n {
                let yc = data.y[i] - y_mean;
                for a in 0..k {
                    let za = z(i, a);
                    rhs[a] += za * yc;
                    for b in 0..=a {
                        gram[a][b] += za * z(i, b);
                    }
                }
            }
            for a in 0..k {
                gram[a][a] += lambda;
                for b in 0..a {
                    gram[b][a] = gram[a][b];
                }
            }

            let beta = cholesky_solve(gram, rhs)?;
            for (a, &j) in active.iter().enumerate() {
                coefficients[j] = beta[a] / sds[j];
            }
        }

        let intercept = y_mean
            - coefficients
                .iter()
                .zip(&means)
                .map(|(c, m)| c * m)
                .sum::<f64>();

        if !intercept.is_finite() || coefficients.iter().any(|c| !c.is_finite()) {
            return Err(ForecastError::model_fit("linear solve produced non-finite coefficients"));
        }

        Ok(LinearModel {
            intercept,
            coefficients,
        })
    }
}

impl Regressor for LinearRegression {
    fn name(&self) -> &str {
        "linear_regression"
    }

    fn fit(&self, data: &Dataset) -> Result<Box<dyn FittedModel>, ForecastError> {
        Ok(Box::new(self.fit_model(data)?))
    }
}

/// Solve `A x = b` for symmetric positive definite `A`.
fn cholesky_solve(a: Vec<Vec<f64>>, b: Vec<f64>) -> Result<Vec<f64>, ForecastError> {
    let k = b.len();
    let mut l = vec![vec![0.0; k]; k];

    for i in 0..k {
        for j in 0..=i {
            let s: f64 = (0..j).map(|m| l[i][m] * l[j][m]).sum();
            if i == j {
                let d = a[i][i] - s;
                if d <= 0.0 || !d.is_finite() {
                    return Err(ForecastError::model_fit("design matrix is singular"));
                }
                l[i][j] = d.sqrt();
            } else {
                l[i][j] = (a[i][j] - s) / l[j][j];
            }
        }
    }

    // Forward: L y = b
    let mut y = vec![0.0; k];
    for i in 0..k {
        let s: f64 = (0..i).map(|m| l[i][m] * y[m]).sum();
        y[i] = (b[i] - s) / l[i][i];
    }
    // Backward: Lᵀ x = y
    let mut x = vec![0.0; k];
    for i in (0..k).rev() {
        let s: f64 = (i + 1..k).map(|m| l[m][i] * x[m]).sum();
        x[i] = (y[i] - s) / l[i][i];
    }
    Ok(x)
}

// ─── Single-variable line ────────────────────────────────────────────

/// Ordinary least-squares line `y = intercept + slope · x`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    pub fn at(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit a line through `(x, y)` points.
///
/// Returns `None` for fewer than two points or when every x is the same.
pub fn fit_line(points: &[(f64, f64)]) -> Option<LineFit> {
    if points.len() < 2 {
        return None;
    }
    let n = points.len() as f64;
    let x_mean = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let y_mean = points.iter().map(|(_, y)| y).sum::<f64>() / n;

    let sxx: f64 = points.iter().map(|(x, _)| (x - x_mean).powi(2)).sum();
    if sxx <= 0.0 {
        return None;
    }
    let sxy: f64 = points
        .iter()
        .map(|(x, y)| (x - x_mean) * (y - y_mean))
        .sum();

    let slope = sxy / sxx;
    Some(LineFit {
        slope,
        intercept: y_mean - slope * x_mean,
    })
}
