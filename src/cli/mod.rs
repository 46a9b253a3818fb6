//! Command-line parsing for the kinetics engine.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the fitting/math code.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::domain::RobustMode;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "kin", version, about = "Chemical kinetics analysis (absorbance → rates → Arrhenius)")]
pub struct Cli {
    /// Increase log verbosity (-v debug, -vv trace).
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Analyze every run CSV in a directory and aggregate an Arrhenius fit.
    Analyze(AnalyzeArgs),
    /// Fit a single run CSV and print per-point diagnostics.
    Rate(RateArgs),
    /// Generate synthetic run CSVs (temperature ladder and stress suite).
    Gen(GenArgs),
}

/// Common fitting options shared by `analyze` and `rate`.
#[derive(Debug, Parser, Clone)]
pub struct FitOptions {
    /// Cuvette path length in cm (Beer's Law `b`).
    #[arg(short = 'b', long, default_value_t = 1.0)]
    pub path_length: f64,

    /// Molar extinction coefficient in L/(mol·cm) (Beer's Law `ε`).
    #[arg(short = 'e', long, default_value_t = 900.0)]
    pub epsilon: f64,

    /// R² below which the robust consensus re-fit engages.
    #[arg(long, default_value_t = 0.98)]
    pub r2_threshold: f64,

    /// Robust re-fit strategy for low-quality ordinary fits.
    #[arg(long, value_enum, default_value_t = RobustMode::Ransac)]
    pub robust: RobustMode,

    /// Disable the robust re-fit entirely (same as `--robust off`).
    #[arg(long)]
    pub no_robust: bool,

    /// Consensus iterations for the robust re-fit.
    #[arg(long, default_value_t = 200)]
    pub ransac_iterations: usize,

    /// Base seed for the robust re-fit (combined with the data for reproducibility).
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Options for the batch `analyze` subcommand.
#[derive(Debug, Parser)]
pub struct AnalyzeArgs {
    /// Directory containing run CSVs (filenames like `run_298K.csv`).
    #[arg(default_value = "data")]
    pub data_dir: PathBuf,

    #[command(flatten)]
    pub fit: FitOptions,

    /// Anion of the acid used (selects the salt correction factor).
    #[arg(short = 'a', long, default_value = "Cl-")]
    pub anion: String,

    /// Override or add a salt factor, e.g. `--salt-factor "NO3-=1.1"`.
    #[arg(long = "salt-factor", value_name = "ANION=FACTOR", value_parser = parse_salt_factor)]
    pub salt_factors: Vec<(String, f64)>,

    /// Write a markdown report to this path.
    #[arg(long, value_name = "MD")]
    pub report: Option<PathBuf>,

    /// Export per-run results to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export full results (runs + Arrhenius fit) to JSON.
    #[arg(long = "export-json", value_name = "JSON")]
    pub export_json: Option<PathBuf>,
}

/// Options for the single-file `rate` subcommand.
#[derive(Debug, Parser)]
pub struct RateArgs {
    /// Run CSV to fit.
    pub file: PathBuf,

    #[command(flatten)]
    pub fit: FitOptions,

    /// Export the per-point trace (fit, residual, outlier flag) to CSV.
    #[arg(long, value_name = "CSV")]
    pub trace: Option<PathBuf>,
}

/// Options for the `gen` subcommand.
#[derive(Debug, Parser)]
pub struct GenArgs {
    /// Output directory for the generated CSVs.
    #[arg(default_value = "data")]
    pub out_dir: PathBuf,

    /// Activation energy in J/mol for the temperature ladder.
    #[arg(long, default_value_t = 75_000.0)]
    pub ea: f64,

    /// Pre-exponential factor in 1/s for the temperature ladder.
    #[arg(long = "pre-exp", default_value_t = 2.8e6)]
    pub pre_exponential: f64,

    /// Ladder temperatures in K.
    #[arg(long = "temp", value_name = "K", num_args = 1.., default_values_t = [288.0, 298.0, 308.0, 318.0, 328.0])]
    pub temperatures: Vec<f64>,

    /// Samples per run.
    #[arg(long, default_value_t = 30)]
    pub points: usize,

    /// Run duration in seconds.
    #[arg(long, default_value_t = 600.0)]
    pub duration: f64,

    /// Also generate the stress suite (noise, spikes, mixing delay).
    #[arg(long)]
    pub stress: bool,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Parse `ANION=FACTOR` pairs for `--salt-factor`.
fn parse_salt_factor(s: &str) -> Result<(String, f64), String> {
    let (anion, factor) = s
        .split_once('=')
        .ok_or_else(|| format!("expected ANION=FACTOR, got '{s}'"))?;
    let anion = anion.trim();
    if anion.is_empty() {
        return Err(format!("empty anion in '{s}'"));
    }
    let factor: f64 = factor
        .trim()
        .parse()
        .map_err(|e| format!("bad factor in '{s}': {e}"))?;
    Ok((anion.to_string(), factor))
}
