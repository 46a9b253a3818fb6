//! Straight-line least squares.
//!
//! Every fit in this project is a line: concentration vs time in the rate
//! estimator, and `ln k` vs `1/T` in the Arrhenius aggregator.
//!
//! Implementation choices:
//! - We build the `[1, x]` design matrix and solve with SVD. For a 2-column
//!   system this is overkill numerically but it stays well-behaved when the
//!   x values are nearly constant (e.g. a run whose clock barely advances),
//!   where the closed-form normal equations lose precision.
//! - R² is computed separately so the robust path can report it over an
//!   inlier subset only.

use nalgebra::{DMatrix, DVector};

/// Slope and intercept of a fitted line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LineFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.intercept + self.slope * x
    }
}

/// Fit `y = intercept + slope * x` by ordinary least squares.
///
/// Returns `None` if the inputs are degenerate (fewer than 2 points, length
/// mismatch, non-finite values, or an ill-conditioned system).
pub fn fit_line(x: &[f64], y: &[f64]) -> Option<LineFit> {
    if x.len() != y.len() || x.len() < 2 {
        return None;
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let n = x.len();
    let mut design = DMatrix::<f64>::zeros(n, 2);
    for (i, &xi) in x.iter().enumerate() {
        design[(i, 0)] = 1.0;
        design[(i, 1)] = xi;
    }
    let rhs = DVector::from_column_slice(y);

    // Try progressively looser tolerances if the strict solve fails.
    let svd = design.svd(true, true);
    for &tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(beta) = svd.solve(&rhs, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(LineFit {
                    intercept: beta[0],
                    slope: beta[1],
                });
            }
        }
    }

    None
}

/// Coefficient of determination of a fitted line over `(x, y)`.
///
/// A constant-y input has zero total variance; we report 1.0 when the fit
/// reproduces it exactly and 0.0 otherwise, so callers always get a value
/// in [0, 1].
pub fn r_squared(x: &[f64], y: &[f64], fit: &LineFit) -> f64 {
    if x.is_empty() || x.len() != y.len() {
        return 0.0;
    }

    let mean_y = y.iter().sum::<f64>() / y.len() as f64;
    let mut ss_res = 0.0;
    let mut ss_tot = 0.0;
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        let r = yi - fit.predict(xi);
        ss_res += r * r;
        let d = yi - mean_y;
        ss_tot += d * d;
    }

    if ss_tot <= f64::EPSILON {
        return if ss_res <= f64::EPSILON { 1.0 } else { 0.0 };
    }

    (1.0 - ss_res / ss_tot).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_line_recovers_exact_line() {
        // y = 2 + 3x
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [2.0, 5.0, 8.0, 11.0];
        let fit = fit_line(&x, &y).unwrap();
        assert!((fit.intercept - 2.0).abs() < 1e-10);
        assert!((fit.slope - 3.0).abs() < 1e-10);
        assert!((r_squared(&x, &y, &fit) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn fit_line_rejects_degenerate_input() {
        assert!(fit_line(&[1.0], &[2.0]).is_none());
        assert!(fit_line(&[1.0, 2.0], &[2.0]).is_none());
        assert!(fit_line(&[1.0, f64::NAN], &[2.0, 3.0]).is_none());
    }

    #[test]
    fn r_squared_is_low_for_poor_fit() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.0, 5.0, -3.0, 7.0, 1.0];
        let fit = fit_line(&x, &y).unwrap();
        let r2 = r_squared(&x, &y, &fit);
        assert!((0.0..1.0).contains(&r2));
        assert!(r2 < 0.5);
    }

    #[test]
    fn r_squared_handles_constant_y() {
        let x = [0.0, 1.0, 2.0];
        let y = [4.0, 4.0, 4.0];
        let fit = LineFit {
            slope: 0.0,
            intercept: 4.0,
        };
        assert!((r_squared(&x, &y, &fit) - 1.0).abs() < 1e-12);
    }
}
