//! Arrhenius aggregation over a batch of runs.
//!
//! Each run contributes one `(temperature_k, k_intrinsic)` pair. The
//! log-linearized Arrhenius relationship
//!
//! ```text
//! ln k = ln A - (Ea / R) * (1 / T)
//! ```
//!
//! is fitted by ordinary least squares over `(1/T, ln k)`, giving the
//! activation energy from the slope and the pre-exponential factor from the
//! intercept. The fit is permutation-invariant over its input set.

use log::warn;

use crate::domain::{ArrheniusFit, GAS_CONSTANT};
use crate::error::AppError;
use crate::math::{fit_line, r_squared};

/// Fit Arrhenius parameters from `(temperature_k, k_intrinsic)` pairs.
///
/// Errors:
/// - [`AppError::InvalidInput`] for any non-positive (or non-finite)
///   temperature or rate, checked before the log/reciprocal transform
/// - [`AppError::InsufficientData`] for fewer than 2 distinct temperatures
///
/// Policy note: the mathematical minimum of 2 distinct temperatures is
/// enforced here, uniformly for all callers. With exactly 2 points the
/// linearity metric is degenerate (R² is identically 1) and a warning is
/// logged; callers wanting a meaningful linearity signal should supply 3+.
pub fn aggregate(pairs: &[(f64, f64)]) -> Result<ArrheniusFit, AppError> {
    for &(temperature_k, k_intrinsic) in pairs {
        if !temperature_k.is_finite() || temperature_k <= 0.0 {
            return Err(AppError::invalid_input(format!(
                "temperature must be positive (K), got {temperature_k}"
            )));
        }
        if !k_intrinsic.is_finite() || k_intrinsic <= 0.0 {
            return Err(AppError::invalid_input(format!(
                "rate constant must be positive for ln(k), got {k_intrinsic}"
            )));
        }
    }

    let mut distinct: Vec<f64> = pairs.iter().map(|&(t, _)| t).collect();
    distinct.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    distinct.dedup();
    if distinct.len() < 2 {
        return Err(AppError::insufficient_data(format!(
            "Arrhenius fit needs at least 2 distinct temperatures, got {}",
            distinct.len()
        )));
    }
    if pairs.len() == 2 {
        warn!("Arrhenius fit over exactly 2 points: R² is degenerate (always 1)");
    }

    let inv_t: Vec<f64> = pairs.iter().map(|&(t, _)| 1.0 / t).collect();
    let ln_k: Vec<f64> = pairs.iter().map(|&(_, k)| k.ln()).collect();

    let fit = fit_line(&inv_t, &ln_k).ok_or_else(|| {
        AppError::insufficient_data("Arrhenius points do not determine a line")
    })?;
    let r2 = r_squared(&inv_t, &ln_k, &fit);

    Ok(ArrheniusFit {
        activation_energy_j_per_mol: -fit.slope * GAS_CONSTANT,
        pre_exponential_factor: fit.intercept.exp(),
        r_squared: r2,
        n_points: pairs.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn synthetic_pairs(ea: f64, a: f64, temps: &[f64]) -> Vec<(f64, f64)> {
        temps
            .iter()
            .map(|&t| (t, a * (-ea / (GAS_CONSTANT * t)).exp()))
            .collect()
    }

    #[test]
    fn round_trips_known_parameters() {
        let ea = 75_000.0;
        let a = 2.8e6;
        let pairs = synthetic_pairs(ea, a, &[288.0, 298.0, 308.0, 318.0, 328.0]);

        let fit = aggregate(&pairs).unwrap();
        assert!((fit.activation_energy_j_per_mol - ea).abs() / ea < 1e-9);
        assert!((fit.pre_exponential_factor - a).abs() / a < 1e-6);
        assert!(fit.r_squared > 1.0 - 1e-12);
        assert_eq!(fit.n_points, 5);
    }

    #[test]
    fn order_independent() {
        let pairs = synthetic_pairs(60_000.0, 1.0e5, &[290.0, 300.0, 310.0, 320.0]);
        let mut reversed = pairs.clone();
        reversed.reverse();

        let a = aggregate(&pairs).unwrap();
        let b = aggregate(&reversed).unwrap();
        let ea_a = a.activation_energy_j_per_mol;
        let ea_b = b.activation_energy_j_per_mol;
        assert!((ea_a - ea_b).abs() / ea_a.abs() < 1e-9);
    }

    #[test]
    fn non_positive_rate_is_invalid_input() {
        let err = aggregate(&[(298.0, 1.0e-6), (308.0, 0.0)]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));

        let err = aggregate(&[(298.0, 1.0e-6), (308.0, -2.0e-6)]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn non_positive_temperature_is_invalid_input() {
        let err = aggregate(&[(0.0, 1.0e-6), (308.0, 2.0e-6)]).unwrap_err();
        assert!(matches!(err, AppError::InvalidInput(_)));
    }

    #[test]
    fn single_distinct_temperature_is_insufficient() {
        let err = aggregate(&[(298.0, 1.0e-6), (298.0, 1.1e-6), (298.0, 0.9e-6)]).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
    }

    #[test]
    fn two_distinct_temperatures_suffice() {
        let pairs = synthetic_pairs(50_000.0, 3.0e4, &[298.0, 318.0]);
        let fit = aggregate(&pairs).unwrap();
        assert!((fit.activation_energy_j_per_mol - 50_000.0).abs() < 1.0);
    }
}
