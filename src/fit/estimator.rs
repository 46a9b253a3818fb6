//! Rate estimation for a single run.
//!
//! Given a normalized (time, absorbance) series:
//!
//! 1. convert absorbance to concentration via Beer's Law
//! 2. fit concentration vs time by ordinary least squares
//! 3. if the fit quality is below the configured threshold, ask the robust
//!    capability for a consensus re-fit
//! 4. report `rate = -slope` plus the fit diagnostics and outlier mask
//!
//! The run's sample data is never mutated; derived values are returned on
//! [`RateEstimate`].

use log::debug;

use crate::domain::{AnalysisConfig, FitMethod, KineticRun, RateEstimate, RegressionResult};
use crate::error::AppError;
use crate::fit::robust::RobustFitter;
use crate::math::{fit_line, r_squared};

/// Estimate the reaction rate for one run.
///
/// Errors:
/// - [`AppError::InvalidParameter`] if `extinction_coefficient * path_length`
///   is not a positive finite number
/// - [`AppError::InsufficientData`] if fewer than 2 samples are present or
///   the samples do not determine a line
pub fn estimate(
    run: &KineticRun,
    config: &AnalysisConfig,
    robust: &dyn RobustFitter,
) -> Result<RateEstimate, AppError> {
    let beer_factor = config.extinction_coefficient * config.path_length_cm;
    if !beer_factor.is_finite() || beer_factor <= 0.0 {
        return Err(AppError::invalid_parameter(format!(
            "extinction_coefficient * path_length must be positive, got {} * {}",
            config.extinction_coefficient, config.path_length_cm
        )));
    }

    let n = run.samples.len();
    if n < 2 {
        return Err(AppError::insufficient_data(format!(
            "'{}': {n} sample(s); at least 2 are required to fit a line",
            run.filename
        )));
    }

    let time: Vec<f64> = run.samples.iter().map(|s| s.time_s).collect();
    let concentration: Vec<f64> = run
        .samples
        .iter()
        .map(|s| s.absorbance / beer_factor)
        .collect();

    let ordinary = fit_line(&time, &concentration).ok_or_else(|| {
        AppError::insufficient_data(format!(
            "'{}': samples do not determine a line (degenerate time axis?)",
            run.filename
        ))
    })?;
    let ordinary_r2 = r_squared(&time, &concentration, &ordinary);

    let regression = if ordinary_r2 < config.r2_threshold {
        match robust.refit(&time, &concentration) {
            Some(consensus) => RegressionResult {
                slope: consensus.fit.slope,
                intercept: consensus.fit.intercept,
                r_squared: consensus.r_squared,
                method: FitMethod::Robust,
                outlier_mask: consensus.inlier_mask.iter().map(|&inl| !inl).collect(),
            },
            None => {
                // Degraded-but-valid: keep the ordinary fit.
                debug!(
                    "'{}': R²={ordinary_r2:.4} below threshold but robust refit unavailable/declined",
                    run.filename
                );
                ordinary_result(ordinary.slope, ordinary.intercept, ordinary_r2, n)
            }
        }
    } else {
        ordinary_result(ordinary.slope, ordinary.intercept, ordinary_r2, n)
    };

    Ok(RateEstimate {
        regression,
        concentration,
    })
}

fn ordinary_result(slope: f64, intercept: f64, r_squared: f64, n: usize) -> RegressionResult {
    RegressionResult {
        slope,
        intercept,
        r_squared,
        method: FitMethod::Ordinary,
        outlier_mask: vec![false; n],
    }
}
