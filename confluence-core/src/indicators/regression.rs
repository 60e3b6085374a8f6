//! Ordinary least-squares regression of a series against its index.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
    /// Coefficient of determination; 0.0 when the series has no variance.
    pub r_squared: f64,
    pub mean: f64,
}

impl Regression {
    /// Slope as a percentage of the series mean per step (0.0 if the mean is 0).
    pub fn slope_pct(&self) -> f64 {
        if self.mean == 0.0 || !self.mean.is_finite() {
            return 0.0;
        }
        self.slope / self.mean * 100.0
    }
}

/// Fit `y = intercept + slope * x` with x = 0..n.
///
/// Returns all-zero coefficients for fewer than two points or any non-finite input.
pub fn linear_regression(values: &[f64]) -> Regression {
    let n = values.len();
    if n < 2 || values.iter().any(|v| !v.is_finite()) {
        return Regression::default();
    }

    let nf = n as f64;
    let x_mean = (nf - 1.0) / 2.0;
    let y_mean = values.iter().sum::<f64>() / nf;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (i, &y) in values.iter().enumerate() {
        let dx = i as f64 - x_mean;
        let dy = y - y_mean;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    let slope = if sxx == 0.0 { 0.0 } else { sxy / sxx };
    let r_squared = if sxx == 0.0 || syy <= f64::EPSILON * y_mean.abs().max(1.0) {
        0.0
    } else {
        ((sxy * sxy) / (sxx * syy)).clamp(0.0, 1.0)
    };

    Regression {
        slope,
        intercept: y_mean - slope * x_mean,
        r_squared,
        mean: y_mean,
    }
}
