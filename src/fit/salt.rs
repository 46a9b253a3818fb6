//! Ionic-strength (salt) correction of an observed rate constant.
//!
//! The observed rate carries a multiplicative Hofmeister-series effect keyed
//! by the anion accompanying the acid catalyst. Dividing by the per-anion
//! factor recovers the intrinsic rate used in the Arrhenius aggregation.

use std::collections::HashMap;

use log::debug;

use crate::domain::CorrectedRate;
use crate::error::AppError;

/// Rescale an observed rate to an intrinsic rate.
///
/// An anion absent from the table gets a factor of 1.0 (unknown anion,
/// assume no salt effect) rather than failing. An explicitly supplied
/// non-positive factor is rejected, since dividing by it would be
/// meaningless; that path is unreachable via the default lookup.
pub fn correct(
    k_observed: f64,
    anion: &str,
    factors: &HashMap<String, f64>,
) -> Result<CorrectedRate, AppError> {
    let factor = match factors.get(anion) {
        Some(&f) => f,
        None => {
            debug!("anion '{anion}' not in salt-factor table; assuming factor 1.0");
            1.0
        }
    };

    if !factor.is_finite() || factor <= 0.0 {
        return Err(AppError::invalid_parameter(format!(
            "salt factor for anion '{anion}' must be positive, got {factor}"
        )));
    }

    Ok(CorrectedRate {
        k_observed,
        k_intrinsic: k_observed / factor,
        anion: anion.to_string(),
        salt_factor: factor,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table(pairs: &[(&str, f64)]) -> HashMap<String, f64> {
        pairs.iter().map(|(a, f)| (a.to_string(), *f)).collect()
    }

    #[test]
    fn known_anion_divides_by_factor() {
        let factors = table(&[("SO4--", 1.4), ("ClO4-", 0.9)]);
        let corrected = correct(2.8e-6, "SO4--", &factors).unwrap();
        assert!((corrected.k_intrinsic - 2.8e-6 / 1.4).abs() < 1e-18);
        assert!((corrected.salt_factor - 1.4).abs() < 1e-12);
        assert_eq!(corrected.anion, "SO4--");
    }

    #[test]
    fn unknown_anion_defaults_to_identity() {
        let factors = table(&[("Cl-", 1.0)]);
        let corrected = correct(5.0e-7, "Br-", &factors).unwrap();
        assert!((corrected.k_intrinsic - 5.0e-7).abs() < 1e-18);
        assert!((corrected.salt_factor - 1.0).abs() < 1e-12);
    }

    #[test]
    fn zero_factor_is_rejected() {
        let factors = table(&[("Cl-", 0.0)]);
        let err = correct(1.0e-6, "Cl-", &factors).unwrap_err();
        assert!(matches!(err, AppError::InvalidParameter(_)));
    }

    #[test]
    fn negative_factor_is_rejected() {
        let factors = table(&[("Cl-", -1.2)]);
        assert!(correct(1.0e-6, "Cl-", &factors).is_err());
    }
}
