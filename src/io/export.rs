//! Result exports for downstream tools.
//!
//! Three artifacts, all derived from the pipeline output without re-running
//! any regression:
//!
//! - per-run results CSV (spreadsheet-friendly summary rows)
//! - per-sample trace CSV (enough to redraw a run's fit and residuals)
//! - results JSON (run rows + the Arrhenius fit, schema-stable via serde)

use std::fs::File;
use std::io::Write;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::domain::{ArrheniusFit, KineticRun, RateEstimate, RunRecord};
use crate::error::AppError;

/// Write per-run summary rows to a CSV file.
pub fn write_results_csv(path: &Path, records: &[RunRecord]) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create results CSV '{}': {e}", path.display())))?;

    writeln!(
        file,
        "filename,temperature_k,k_observed,k_intrinsic,r_squared,method,n_outliers"
    )
    .map_err(|e| AppError::io(format!("Failed to write results CSV header: {e}")))?;

    for r in records {
        writeln!(
            file,
            "{},{},{:.6e},{:.6e},{:.6},{},{}",
            r.filename,
            r.temperature_k.map(|t| format!("{t}")).unwrap_or_default(),
            r.k_observed,
            r.k_intrinsic,
            r.r_squared,
            r.method.display_name(),
            r.n_outliers,
        )
        .map_err(|e| AppError::io(format!("Failed to write results CSV row: {e}")))?;
    }

    Ok(())
}

/// Write one run's per-sample trace: raw signal, derived concentration,
/// fitted value, residual, and the outlier flag.
pub fn write_trace_csv(path: &Path, run: &KineticRun, estimate: &RateEstimate) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create trace CSV '{}': {e}", path.display())))?;

    writeln!(
        file,
        "time_s,absorbance,concentration,fit_concentration,residual,is_outlier"
    )
    .map_err(|e| AppError::io(format!("Failed to write trace CSV header: {e}")))?;

    let reg = &estimate.regression;
    for (i, sample) in run.samples.iter().enumerate() {
        let c = estimate.concentration[i];
        let fitted = reg.intercept + reg.slope * sample.time_s;
        let outlier = reg.outlier_mask.get(i).copied().unwrap_or(false);
        writeln!(
            file,
            "{},{},{:.10e},{:.10e},{:.10e},{}",
            sample.time_s,
            sample.absorbance,
            c,
            fitted,
            c - fitted,
            outlier,
        )
        .map_err(|e| AppError::io(format!("Failed to write trace CSV row: {e}")))?;
    }

    Ok(())
}

/// The portable JSON representation of a batch analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResultsFile {
    pub tool: String,
    pub runs: Vec<RunRecord>,
    /// Absent when too few temperature points survived for an Arrhenius fit.
    pub arrhenius: Option<ArrheniusFit>,
}

/// Write the results JSON file.
pub fn write_results_json(
    path: &Path,
    records: &[RunRecord],
    arrhenius: Option<&ArrheniusFit>,
) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create results JSON '{}': {e}", path.display())))?;

    let results = ResultsFile {
        tool: "kin".to_string(),
        runs: records.to_vec(),
        arrhenius: arrhenius.cloned(),
    };

    serde_json::to_writer_pretty(file, &results)
        .map_err(|e| AppError::io(format!("Failed to write results JSON: {e}")))?;

    Ok(())
}

/// Read a results JSON file back (used by downstream tooling and tests).
pub fn read_results_json(path: &Path) -> Result<ResultsFile, AppError> {
    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open results JSON '{}': {e}", path.display())))?;
    serde_json::from_reader(file)
        .map_err(|e| AppError::io(format!("Invalid results JSON '{}': {e}", path.display())))
}
