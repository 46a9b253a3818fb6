//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - runs ingestion + fitting over the requested data
//! - prints reports/summaries
//! - writes optional exports

use std::collections::HashMap;
use std::path::PathBuf;

use clap::Parser;
use log::LevelFilter;
use simplelog::{ColorChoice, Config, TermLogger, TerminalMode};

use crate::cli::{AnalyzeArgs, Command, FitOptions, GenArgs, RateArgs};
use crate::data::sample::{GenParams, generate_arrhenius_series, generate_stress_suite};
use crate::domain::{AnalysisConfig, RobustMode};
use crate::error::AppError;
use crate::fit::estimator;
use crate::io::export;
use crate::io::ingest;

pub mod pipeline;

/// Entry point for the `kin` binary.
pub fn run() -> Result<(), AppError> {
    // We want `kin` and `kin -e 1200` to behave like `kin analyze ...`.
    //
    // Clap requires a subcommand name, so we do a small, explicit rewrite of the
    // argv list before parsing. This preserves a clean clap structure while
    // retaining the requested UX.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    init_logging(cli.verbose);

    match cli.command {
        Command::Analyze(args) => handle_analyze(args),
        Command::Rate(args) => handle_rate(args),
        Command::Gen(args) => handle_gen(args),
    }
}

fn init_logging(verbose: u8) {
    let level = match verbose {
        0 => LevelFilter::Info,
        1 => LevelFilter::Debug,
        _ => LevelFilter::Trace,
    };
    let _ = TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Stderr,
        ColorChoice::Auto,
    );
}

fn handle_analyze(args: AnalyzeArgs) -> Result<(), AppError> {
    let config = analysis_config_from_args(&args);
    let batch = pipeline::run_batch(&config)?;

    let records: Vec<_> = batch.runs.iter().map(|a| a.record()).collect();
    println!("{}", crate::report::format_run_table(&records));
    println!("{}", crate::report::format_arrhenius_summary(&batch.arrhenius));

    if !batch.failures.is_empty() {
        println!("Skipped files:");
        for (name, err) in &batch.failures {
            println!("- {name}: {err}");
        }
        println!();
    }

    // Optional outputs.
    if let Some(path) = &config.report_path {
        let md = crate::report::render_markdown_report(&records, &batch.arrhenius, &config);
        crate::report::write_markdown_report(path, &md)?;
        println!("Report written to '{}'", path.display());
    }
    if let Some(path) = &config.export_results {
        export::write_results_csv(path, &records)?;
        println!("Results exported to '{}'", path.display());
    }
    if let Some(path) = &config.export_json {
        export::write_results_json(path, &records, batch.arrhenius.as_ref().ok())?;
        println!("Results exported to '{}'", path.display());
    }

    Ok(())
}

fn handle_rate(args: RateArgs) -> Result<(), AppError> {
    let data_dir = args
        .file
        .parent()
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("."));
    let config = base_config(data_dir, &args.fit);
    let robust = pipeline::robust_fitter(&config);

    let ingested = ingest::load_run(&args.file)?;
    let estimate = estimator::estimate(&ingested.run, &config, robust.as_ref())?;

    println!(
        "{}",
        crate::report::format_single_run(&ingested.run.filename, &estimate)
    );
    for warning in &ingested.warnings {
        println!("warning: {warning}");
    }

    if let Some(path) = &args.trace {
        export::write_trace_csv(path, &ingested.run, &estimate)?;
        println!("Trace written to '{}'", path.display());
    }

    Ok(())
}

fn handle_gen(args: GenArgs) -> Result<(), AppError> {
    let base = GenParams {
        duration_s: args.duration,
        points: args.points,
        ..GenParams::default()
    };

    let mut paths = generate_arrhenius_series(
        &args.out_dir,
        &base,
        args.ea,
        args.pre_exponential,
        &args.temperatures,
        args.seed,
    )?;
    if args.stress {
        paths.extend(generate_stress_suite(&args.out_dir, &base, args.seed)?);
    }

    println!("Generated {} file(s) in '{}':", paths.len(), args.out_dir.display());
    for path in &paths {
        println!("- {}", path.display());
    }
    Ok(())
}

/// Built-in salt correction factors; `--salt-factor` entries override these.
fn default_salt_factors() -> HashMap<String, f64> {
    HashMap::from([
        ("Cl-".to_string(), 1.0),
        ("SO4--".to_string(), 1.4),
        ("ClO4-".to_string(), 0.9),
    ])
}

fn base_config(data_dir: PathBuf, fit: &FitOptions) -> AnalysisConfig {
    let robust = if fit.no_robust {
        RobustMode::Off
    } else {
        fit.robust
    };
    AnalysisConfig {
        data_dir,
        path_length_cm: fit.path_length,
        extinction_coefficient: fit.epsilon,
        acid_anion: "Cl-".to_string(),
        salt_factors: default_salt_factors(),
        r2_threshold: fit.r2_threshold,
        robust,
        ransac_iterations: fit.ransac_iterations,
        seed: fit.seed,
        report_path: None,
        export_results: None,
        export_json: None,
    }
}

pub fn analysis_config_from_args(args: &AnalyzeArgs) -> AnalysisConfig {
    let mut config = base_config(args.data_dir.clone(), &args.fit);
    config.acid_anion = args.anion.clone();
    for (anion, factor) in &args.salt_factors {
        config.salt_factors.insert(anion.clone(), *factor);
    }
    config.report_path = args.report.clone();
    config.export_results = args.export.clone();
    config.export_json = args.export_json.clone();
    config
}

/// Rewrite argv so `kin` defaults to `kin analyze`.
///
/// Rules:
/// - `kin`                     -> `kin analyze`
/// - `kin -e 1200 ...`         -> `kin analyze -e 1200 ...`
/// - `kin --help/--version/-h` -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("analyze".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "analyze" | "rate" | "gen");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "analyze flags".
    if arg1.starts_with('-') {
        argv.insert(1, "analyze".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_analyze() {
        assert_eq!(rewrite_args(argv(&["kin"])), argv(&["kin", "analyze"]));
        assert_eq!(
            rewrite_args(argv(&["kin", "-e", "1200"])),
            argv(&["kin", "analyze", "-e", "1200"])
        );
    }

    #[test]
    fn subcommands_and_help_pass_through() {
        assert_eq!(
            rewrite_args(argv(&["kin", "rate", "run_298K.csv"])),
            argv(&["kin", "rate", "run_298K.csv"])
        );
        assert_eq!(rewrite_args(argv(&["kin", "--help"])), argv(&["kin", "--help"]));
    }

    #[test]
    fn salt_factor_overrides_apply() {
        let cli = crate::cli::Cli::try_parse_from([
            "kin",
            "analyze",
            "--anion",
            "SO4--",
            "--salt-factor",
            "SO4--=1.5",
        ])
        .unwrap();
        let Command::Analyze(args) = cli.command else {
            panic!("expected analyze");
        };
        let config = analysis_config_from_args(&args);
        assert_eq!(config.salt_factors.get("SO4--"), Some(&1.5));
        assert_eq!(config.salt_factors.get("Cl-"), Some(&1.0));
        assert_eq!(config.acid_anion, "SO4--");
    }
}
