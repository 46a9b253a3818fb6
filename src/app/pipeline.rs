//! Batch analysis over a directory of run CSVs.
//!
//! Each file is ingested and fitted independently (in parallel); a bad file
//! is recorded as a failure and never aborts the batch. Runs that carry a
//! temperature feed the Arrhenius aggregation at the end.

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use rayon::prelude::*;

use crate::domain::{
    AnalysisConfig, ArrheniusFit, CorrectedRate, KineticRun, RateEstimate, RobustMode, RunRecord,
};
use crate::error::AppError;
use crate::fit::robust::{NoRobust, RansacFitter, RobustFitter};
use crate::fit::{arrhenius, estimator, salt};
use crate::io::ingest;

/// Everything the pipeline knows about one successfully analyzed run.
#[derive(Debug, Clone)]
pub struct RunAnalysis {
    pub run: KineticRun,
    pub estimate: RateEstimate,
    pub corrected: CorrectedRate,
    pub warnings: Vec<String>,
}

impl RunAnalysis {
    pub fn record(&self) -> RunRecord {
        RunRecord {
            filename: self.run.filename.clone(),
            temperature_k: self.run.temperature_k,
            k_observed: self.corrected.k_observed,
            k_intrinsic: self.corrected.k_intrinsic,
            r_squared: self.estimate.regression.r_squared,
            method: self.estimate.regression.method,
            n_outliers: self.estimate.regression.n_outliers(),
        }
    }
}

/// The outcome of a batch: per-run results, per-file failures, and the
/// Arrhenius aggregation (which can fail independently of the runs).
#[derive(Debug)]
pub struct BatchOutput {
    pub runs: Vec<RunAnalysis>,
    pub failures: Vec<(String, AppError)>,
    pub arrhenius: Result<ArrheniusFit, AppError>,
}

/// Build the robust capability selected by the configuration.
pub fn robust_fitter(config: &AnalysisConfig) -> Box<dyn RobustFitter> {
    match config.robust {
        RobustMode::Ransac => Box::new(RansacFitter::new(config.ransac_iterations, config.seed)),
        RobustMode::Off => Box::new(NoRobust),
    }
}

/// List the CSV files under `dir`, sorted by name for stable output order.
pub fn scan_csv_files(dir: &Path) -> Result<Vec<PathBuf>, AppError> {
    let entries = fs::read_dir(dir)
        .map_err(|e| AppError::io(format!("Failed to read '{}': {e}", dir.display())))?;

    let mut files: Vec<PathBuf> = Vec::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| AppError::io(format!("Failed to read '{}': {e}", dir.display())))?;
        let path = entry.path();
        let is_csv = path
            .extension()
            .map(|ext| ext.eq_ignore_ascii_case("csv"))
            .unwrap_or(false);
        if path.is_file() && is_csv {
            files.push(path);
        }
    }
    files.sort();

    if files.is_empty() {
        return Err(AppError::insufficient_data(format!(
            "No CSV files found in '{}'",
            dir.display()
        )));
    }
    Ok(files)
}

/// Ingest, fit, and salt-correct one file.
pub fn analyze_file(
    path: &Path,
    config: &AnalysisConfig,
    robust: &dyn RobustFitter,
) -> Result<RunAnalysis, AppError> {
    let ingested = ingest::load_run(path)?;
    let estimate = estimator::estimate(&ingested.run, config, robust)?;
    let corrected = salt::correct(
        estimate.regression.rate(),
        &config.acid_anion,
        &config.salt_factors,
    )?;

    debug!(
        "'{}': k_obs={:.3e} k_int={:.3e} R²={:.4} ({})",
        ingested.run.filename,
        corrected.k_observed,
        corrected.k_intrinsic,
        estimate.regression.r_squared,
        estimate.regression.method.display_name(),
    );

    Ok(RunAnalysis {
        run: ingested.run,
        estimate,
        corrected,
        warnings: ingested.warnings,
    })
}

/// Analyze every CSV in the configured data directory.
pub fn run_batch(config: &AnalysisConfig) -> Result<BatchOutput, AppError> {
    let files = scan_csv_files(&config.data_dir)?;
    let robust = robust_fitter(config);

    let outcomes: Vec<(String, Result<RunAnalysis, AppError>)> = files
        .par_iter()
        .map(|path| {
            let name = path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_else(|| path.display().to_string());
            (name, analyze_file(path, config, robust.as_ref()))
        })
        .collect();

    let mut runs = Vec::new();
    let mut failures = Vec::new();
    for (name, outcome) in outcomes {
        match outcome {
            Ok(analysis) => runs.push(analysis),
            Err(e) => {
                warn!("'{name}': skipped: {e}");
                failures.push((name, e));
            }
        }
    }

    let pairs: Vec<(f64, f64)> = runs
        .iter()
        .filter_map(|a| {
            a.run
                .temperature_k
                .map(|t| (t, a.corrected.k_intrinsic))
        })
        .collect();
    let arrhenius = arrhenius::aggregate(&pairs);

    Ok(BatchOutput {
        runs,
        failures,
        arrhenius,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::io::Write;

    use crate::data::sample::{GenParams, generate_arrhenius_series};
    use crate::domain::GAS_CONSTANT;

    fn test_config(dir: PathBuf) -> AnalysisConfig {
        AnalysisConfig {
            data_dir: dir,
            path_length_cm: 1.0,
            extinction_coefficient: 900.0,
            acid_anion: "Cl-".to_string(),
            salt_factors: HashMap::from([("Cl-".to_string(), 1.0)]),
            r2_threshold: 0.98,
            robust: RobustMode::Ransac,
            ransac_iterations: 200,
            seed: 42,
            report_path: None,
            export_results: None,
            export_json: None,
        }
    }

    fn temp_dir(tag: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("kin-pipeline-{tag}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn batch_recovers_arrhenius_parameters() {
        let dir = temp_dir("arrhenius");
        let ea = 75_000.0;
        let a = 2.8e6;
        let temps = [288.0, 298.0, 308.0, 318.0, 328.0];
        generate_arrhenius_series(&dir, &GenParams::default(), ea, a, &temps, 42).unwrap();

        let out = run_batch(&test_config(dir.clone())).unwrap();
        assert_eq!(out.runs.len(), 5);
        assert!(out.failures.is_empty());

        let fit = out.arrhenius.unwrap();
        assert_eq!(fit.n_points, 5);
        let ea_err = (fit.activation_energy_j_per_mol - ea).abs() / ea;
        assert!(ea_err < 0.05, "Ea {:.1} vs {ea}", fit.activation_energy_j_per_mol);
        assert!(fit.r_squared > 0.99);

        // Fitted k at the middle temperature should match the model.
        let k_true = a * (-ea / (GAS_CONSTANT * 308.0)).exp();
        let mid = out
            .runs
            .iter()
            .find(|r| r.run.temperature_k == Some(308.0))
            .unwrap();
        let k_err = (mid.corrected.k_intrinsic - k_true).abs() / k_true;
        assert!(k_err < 0.10);

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn bad_file_does_not_abort_batch() {
        let dir = temp_dir("badfile");
        let temps = [288.0, 298.0, 308.0];
        generate_arrhenius_series(&dir, &GenParams::default(), 75_000.0, 2.8e6, &temps, 7)
            .unwrap();
        let mut f = std::fs::File::create(dir.join("broken.csv")).unwrap();
        writeln!(f, "only_one_column").unwrap();
        writeln!(f, "1.0").unwrap();

        let out = run_batch(&test_config(dir.clone())).unwrap();
        assert_eq!(out.runs.len(), 3);
        assert_eq!(out.failures.len(), 1);
        assert_eq!(out.failures[0].0, "broken.csv");
        assert!(out.arrhenius.is_ok());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn empty_directory_is_insufficient() {
        let dir = temp_dir("empty");
        let err = run_batch(&test_config(dir.clone())).unwrap_err();
        assert!(matches!(err, AppError::InsufficientData(_)));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn single_temperature_yields_no_arrhenius_but_keeps_runs() {
        let dir = temp_dir("single-temp");
        generate_arrhenius_series(&dir, &GenParams::default(), 75_000.0, 2.8e6, &[298.0], 3)
            .unwrap();

        let out = run_batch(&test_config(dir.clone())).unwrap();
        assert_eq!(out.runs.len(), 1);
        assert!(matches!(out.arrhenius, Err(AppError::InsufficientData(_))));

        std::fs::remove_dir_all(&dir).unwrap();
    }
}
