//! Formatted output over the pipeline's numeric results.
//!
//! We keep formatting code in one place so:
//! - the math/fitting code stays clean and testable
//! - output changes are localized
//!
//! Unit conventions: the core reports activation energy in J/mol; the
//! kJ/mol conversion happens here, in the formatting layer only.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::Local;

use crate::domain::{AnalysisConfig, ArrheniusFit, RateEstimate, RunRecord};
use crate::error::AppError;

/// Format the per-run results table for the terminal.
pub fn format_run_table(records: &[RunRecord]) -> String {
    let mut out = String::new();

    out.push_str(&format!(
        "{:<28} {:>8} {:>12} {:>12} {:>8} {:>9} {:>9}\n",
        "file", "T (K)", "k_obs (M/s)", "k_int (M/s)", "R²", "method", "outliers"
    ));
    out.push_str(&format!(
        "{:-<28} {:-<8} {:-<12} {:-<12} {:-<8} {:-<9} {:-<9}\n",
        "", "", "", "", "", "", ""
    ));

    for r in records {
        out.push_str(&format!(
            "{:<28} {:>8} {:>12.3e} {:>12.3e} {:>8.4} {:>9} {:>9}\n",
            truncate(&r.filename, 28),
            r.temperature_k
                .map(|t| format!("{t:.0}"))
                .unwrap_or_else(|| "-".to_string()),
            r.k_observed,
            r.k_intrinsic,
            r.r_squared,
            r.method.display_name(),
            r.n_outliers,
        ));
    }

    out
}

/// Format the Arrhenius summary (or the reason there is none).
pub fn format_arrhenius_summary(arrhenius: &Result<ArrheniusFit, AppError>) -> String {
    match arrhenius {
        Ok(fit) => format!(
            "Arrhenius fit over {} runs:\n- Ea = {:.2} kJ/mol\n- A  = {:.3e} s⁻¹\n- R² = {:.4}\n",
            fit.n_points,
            fit.activation_energy_j_per_mol / 1000.0,
            fit.pre_exponential_factor,
            fit.r_squared,
        ),
        Err(e) => format!("No Arrhenius fit: {e}\n"),
    }
}

/// Format a single-run estimate (the `kin rate` subcommand).
pub fn format_single_run(filename: &str, estimate: &RateEstimate) -> String {
    let reg = &estimate.regression;
    let mut out = String::new();
    out.push_str(&format!("=== {} ===\n", filename));
    out.push_str(&format!("rate      : {:.4e} M/s\n", reg.rate()));
    out.push_str(&format!("slope     : {:.4e} M/s\n", reg.slope));
    out.push_str(&format!("intercept : {:.4e} M\n", reg.intercept));
    out.push_str(&format!("R²        : {:.4}\n", reg.r_squared));
    out.push_str(&format!("method    : {}\n", reg.method.display_name()));
    out.push_str(&format!("outliers  : {}\n", reg.n_outliers()));
    out
}

/// Render the final markdown report.
pub fn render_markdown_report(
    records: &[RunRecord],
    arrhenius: &Result<ArrheniusFit, AppError>,
    config: &AnalysisConfig,
) -> String {
    let mut md = String::new();
    md.push_str("# Kinetic Analysis Report\n\n");
    md.push_str(&format!(
        "**Date**: {}\n",
        Local::now().format("%Y-%m-%d %H:%M")
    ));
    let factor = config
        .salt_factors
        .get(&config.acid_anion)
        .copied()
        .unwrap_or(1.0);
    md.push_str(&format!(
        "**Anion Configuration**: {} (Salt Factor: {})\n\n",
        config.acid_anion, factor
    ));

    md.push_str("## 1. Thermodynamic Parameters\n");
    match arrhenius {
        Ok(fit) => {
            md.push_str(&format!(
                "- **Activation Energy ($E_a$)**: {:.2} kJ/mol\n",
                fit.activation_energy_j_per_mol / 1000.0
            ));
            md.push_str(&format!(
                "- **Pre-exponential Factor ($A$)**: {:.2e} s⁻¹\n",
                fit.pre_exponential_factor
            ));
            md.push_str(&format!(
                "- **Arrhenius Linearity ($R^2$)**: {:.4}\n\n",
                fit.r_squared
            ));
        }
        Err(e) => {
            md.push_str(&format!("- **Not available**: {e}\n\n"));
        }
    }

    md.push_str("## 2. Experimental Data Summary\n");
    md.push_str("| File | Temp (K) | $k_{obs}$ (M/s) | $k_{intrinsic}$ (M/s) | Linearity ($R^2$) | Method |\n");
    md.push_str("| :--- | :--- | :--- | :--- | :--- | :--- |\n");
    for r in records {
        md.push_str(&format!(
            "| {} | {} | {:.2e} | {:.2e} | {:.4} | {} |\n",
            r.filename,
            r.temperature_k
                .map(|t| format!("{t:.0}"))
                .unwrap_or_else(|| "-".to_string()),
            r.k_observed,
            r.k_intrinsic,
            r.r_squared,
            r.method.display_name(),
        ));
    }

    md
}

/// Write the markdown report to disk.
pub fn write_markdown_report(path: &Path, content: &str) -> Result<(), AppError> {
    let mut file = File::create(path)
        .map_err(|e| AppError::io(format!("Failed to create report '{}': {e}", path.display())))?;
    file.write_all(content.as_bytes())
        .map_err(|e| AppError::io(format!("Failed to write report '{}': {e}", path.display())))?;
    Ok(())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out = String::new();
    for (i, ch) in s.chars().enumerate() {
        if i + 1 >= max {
            break;
        }
        out.push(ch);
    }
    out.push('.');
    out
}
