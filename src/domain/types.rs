//! Shared domain types.
//!
//! These types are intentionally kept lightweight and serializable so they can be:
//!
//! - used in-memory during estimation
//! - exported to JSON/CSV
//! - consumed by downstream plotting/reporting tools without re-running fits

use std::collections::HashMap;
use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Gas constant in J/(mol·K), used by the Arrhenius fit.
pub const GAS_CONSTANT: f64 = 8.314;

/// One absorbance reading at a point in time.
///
/// Insertion order is measurement order. Time is expected to be monotonically
/// non-decreasing for the regression to be physically meaningful, but the
/// engine does not enforce it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub time_s: f64,
    pub absorbance: f64,
}

/// One experimental measurement series, as ingested.
///
/// Immutable after construction; derived quantities (concentration, outlier
/// flags) live on [`RateEstimate`] / [`RegressionResult`] instead of being
/// written back into the run.
#[derive(Debug, Clone)]
pub struct KineticRun {
    /// Source file name (used in reports and exports).
    pub filename: String,
    /// Temperature parsed from the file name; absent if unparseable.
    pub temperature_k: Option<f64>,
    pub samples: Vec<Sample>,
}

/// Which fitting path produced a regression result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FitMethod {
    Ordinary,
    Robust,
}

impl FitMethod {
    pub fn display_name(self) -> &'static str {
        match self {
            FitMethod::Ordinary => "ordinary",
            FitMethod::Robust => "robust",
        }
    }
}

/// Output of a linear fit of concentration vs time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionResult {
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    pub method: FitMethod,
    /// One flag per sample; all false unless the robust path ran.
    pub outlier_mask: Vec<bool>,
}

impl RegressionResult {
    /// Reaction rate in M/s. Concentration decreases as the reaction
    /// proceeds, so the rate is the negated slope. A negative value signals
    /// a backward/invalid fit and is surfaced as-is.
    pub fn rate(&self) -> f64 {
        -self.slope
    }

    pub fn n_outliers(&self) -> usize {
        self.outlier_mask.iter().filter(|&&o| o).count()
    }
}

/// Full output of the rate estimator for one run.
#[derive(Debug, Clone)]
pub struct RateEstimate {
    pub regression: RegressionResult,
    /// Concentration series derived from absorbance via Beer's Law, aligned
    /// with the run's samples. Enough, together with the regression, to
    /// redraw the fit and residuals without re-running it.
    pub concentration: Vec<f64>,
}

/// An observed rate rescaled to an intrinsic rate via the salt-effect factor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectedRate {
    pub k_observed: f64,
    pub k_intrinsic: f64,
    pub anion: String,
    pub salt_factor: f64,
}

/// Arrhenius parameters aggregated over a batch of runs.
///
/// Recomputed fresh from a batch, never mutated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArrheniusFit {
    pub activation_energy_j_per_mol: f64,
    pub pre_exponential_factor: f64,
    pub r_squared: f64,
    /// Number of (T, k) pairs the fit was computed from.
    pub n_points: usize,
}

/// Per-run row handed to the reporting collaborator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunRecord {
    pub filename: String,
    pub temperature_k: Option<f64>,
    pub k_observed: f64,
    pub k_intrinsic: f64,
    pub r_squared: f64,
    pub method: FitMethod,
    pub n_outliers: usize,
}

/// Robust-regression capability selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum RobustMode {
    /// Consensus-sampling (RANSAC-style) refit when the ordinary fit is poor.
    Ransac,
    /// No robust capability; the ordinary fit is always kept.
    Off,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults). All calibration and
/// reagent parameters are carried explicitly; the core keeps no global state.
#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    /// Directory scanned for `*.csv` runs.
    pub data_dir: PathBuf,

    /// Cuvette path length in cm (Beer's Law `b`).
    pub path_length_cm: f64,
    /// Molar extinction coefficient in M⁻¹cm⁻¹ (Beer's Law `ε`).
    pub extinction_coefficient: f64,

    /// Anion accompanying the acid catalyst (salt-effect lookup key).
    pub acid_anion: String,
    /// Per-anion salt factors; anions absent from the table default to 1.0.
    pub salt_factors: HashMap<String, f64>,

    /// Ordinary-fit R² below this triggers the robust refit.
    pub r2_threshold: f64,
    /// Robust capability selection.
    pub robust: RobustMode,
    /// Consensus-sampling iterations for the robust refit.
    pub ransac_iterations: usize,
    /// Base seed for the robust estimator's sampling.
    pub seed: u64,

    pub report_path: Option<PathBuf>,
    pub export_results: Option<PathBuf>,
    pub export_json: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rate_is_negated_slope() {
        let reg = RegressionResult {
            slope: -2.0e-6,
            intercept: 1.0e-3,
            r_squared: 0.999,
            method: FitMethod::Ordinary,
            outlier_mask: vec![false; 3],
        };
        assert!((reg.rate() - 2.0e-6).abs() < 1e-18);
        assert_eq!(reg.n_outliers(), 0);
    }

    #[test]
    fn negative_rate_is_surfaced_not_clamped() {
        let reg = RegressionResult {
            slope: 1.5e-6,
            intercept: 0.0,
            r_squared: 0.5,
            method: FitMethod::Ordinary,
            outlier_mask: vec![],
        };
        assert!(reg.rate() < 0.0);
    }
}
