//! Seeded synthetic kinetic datasets.
//!
//! Generates absorbance-vs-time series from a known zero-order decay, with
//! the defects real instrument exports exhibit:
//!
//! - Gaussian noise on the absorbance signal
//! - spike outliers (bubbles passing through the light path)
//! - a mixing-delay plateau at the start of the trace
//!
//! Used by the `kin gen` subcommand to produce demo/stress data and by the
//! estimator tests as a ground-truth fixture. Everything is driven by a
//! `StdRng` seed, so identical inputs yield identical files.

use std::fs::{File, create_dir_all};
use std::io::Write;
use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::{Distribution, Normal};

use crate::domain::{GAS_CONSTANT, Sample};
use crate::error::AppError;

/// Knobs for one generated dataset.
#[derive(Debug, Clone)]
pub struct GenParams {
    pub duration_s: f64,
    pub points: usize,
    /// True zero-order rate in M/s.
    pub rate: f64,
    /// Gaussian noise sigma in absorbance units.
    pub noise_std: f64,
    /// Fraction of points replaced by spike outliers.
    pub outlier_frac: f64,
    /// Mixing delay: absorbance stays at its initial value for this long.
    pub delay_s: f64,
    pub initial_absorbance: f64,
    pub path_length_cm: f64,
    pub extinction_coefficient: f64,
}

impl Default for GenParams {
    fn default() -> Self {
        Self {
            duration_s: 600.0,
            points: 30,
            rate: 2.0e-6,
            noise_std: 0.02,
            outlier_frac: 0.05,
            delay_s: 0.0,
            initial_absorbance: 2.0,
            path_length_cm: 1.0,
            extinction_coefficient: 900.0,
        }
    }
}

/// A generated dataset plus its ground truth (for tests and diagnostics).
#[derive(Debug, Clone)]
pub struct GeneratedRun {
    pub samples: Vec<Sample>,
    /// Indices where spikes were injected, ascending.
    pub outlier_indices: Vec<usize>,
    pub true_rate: f64,
}

/// Generate one synthetic run.
pub fn generate_run(params: &GenParams, seed: u64) -> Result<GeneratedRun, AppError> {
    let mut rng = StdRng::seed_from_u64(seed);
    let noise = Normal::new(0.0, params.noise_std)
        .map_err(|e| AppError::invalid_parameter(format!("noise distribution: {e}")))?;

    let beer_factor = params.extinction_coefficient * params.path_length_cm;
    let c0 = params.initial_absorbance / beer_factor;
    let n = params.points.max(2);

    let mut samples = Vec::with_capacity(n);
    for i in 0..n {
        let t = params.duration_s * i as f64 / (n as f64 - 1.0);

        // Before the mixing delay the reaction has not started; afterwards the
        // decay clock runs from the end of the delay.
        let concentration = if t < params.delay_s {
            c0
        } else {
            (c0 - params.rate * (t - params.delay_s)).max(0.0)
        };

        let absorbance = concentration * beer_factor + noise.sample(&mut rng);
        samples.push(Sample {
            time_s: t,
            absorbance,
        });
    }

    // Spikes in either direction, large relative to the noise floor.
    let n_outliers = (n as f64 * params.outlier_frac).floor() as usize;
    let mut outlier_indices: Vec<usize> =
        rand::seq::index::sample(&mut rng, n, n_outliers.min(n)).into_vec();
    outlier_indices.sort_unstable();
    for &idx in &outlier_indices {
        let sign = if rng.gen_bool(0.5) { 1.0 } else { -1.0 };
        let magnitude = rng.gen_range(0.2..0.5);
        samples[idx].absorbance += sign * magnitude;
    }

    Ok(GeneratedRun {
        samples,
        outlier_indices,
        true_rate: params.rate,
    })
}

/// Write a generated series as a run CSV.
pub fn write_run_csv(path: &Path, samples: &[Sample]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", path.display())))?;
    writeln!(file, "Time (s),Absorbance")
        .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", path.display())))?;
    for s in samples {
        writeln!(file, "{:.4},{:.6}", s.time_s, s.absorbance)
            .map_err(|e| AppError::io(format!("Failed to write '{}': {e}", path.display())))?;
    }
    Ok(())
}

/// Generate the stress suite: baseline, high noise, outliers, mixing delay,
/// and everything at once.
pub fn generate_stress_suite(dir: &Path, base: &GenParams, seed: u64) -> Result<Vec<PathBuf>, AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", dir.display())))?;

    let cases: [(&str, f64, f64, f64); 5] = [
        ("stress_baseline.csv", 0.01, 0.0, 0.0),
        ("stress_high_noise.csv", 0.10, 0.0, 0.0),
        ("stress_outliers.csv", 0.01, 0.1, 0.0),
        ("stress_delay.csv", 0.01, 0.0, 60.0),
        ("stress_chaos.csv", 0.05, 0.1, 40.0),
    ];

    let mut paths = Vec::with_capacity(cases.len());
    for (i, (name, noise_std, outlier_frac, delay_s)) in cases.iter().enumerate() {
        let params = GenParams {
            noise_std: *noise_std,
            outlier_frac: *outlier_frac,
            delay_s: *delay_s,
            ..base.clone()
        };
        let generated = generate_run(&params, seed.wrapping_add(i as u64))?;
        let path = dir.join(name);
        write_run_csv(&path, &generated.samples)?;
        paths.push(path);
    }

    Ok(paths)
}

/// Generate a temperature series from chosen Arrhenius parameters:
/// `k(T) = A * exp(-Ea / RT)` at each ladder temperature.
pub fn generate_arrhenius_series(
    dir: &Path,
    base: &GenParams,
    activation_energy_j_per_mol: f64,
    pre_exponential_factor: f64,
    temperatures_k: &[f64],
    seed: u64,
) -> Result<Vec<PathBuf>, AppError> {
    create_dir_all(dir)
        .map_err(|e| AppError::io(format!("Failed to create '{}': {e}", dir.display())))?;

    let mut paths = Vec::with_capacity(temperatures_k.len());
    for (i, &t) in temperatures_k.iter().enumerate() {
        if !t.is_finite() || t <= 0.0 {
            return Err(AppError::invalid_input(format!(
                "ladder temperature must be positive (K), got {t}"
            )));
        }
        let k = pre_exponential_factor * (-activation_energy_j_per_mol / (GAS_CONSTANT * t)).exp();
        let params = GenParams {
            rate: k,
            noise_std: 0.005,
            outlier_frac: 0.0,
            delay_s: 0.0,
            ..base.clone()
        };
        let generated = generate_run(&params, seed.wrapping_add(i as u64))?;
        let path = dir.join(format!("run_{}K.csv", t.round() as i64));
        write_run_csv(&path, &generated.samples)?;
        paths.push(path);
    }

    Ok(paths)
}
