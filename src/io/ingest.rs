//! CSV ingest and schema normalization.
//!
//! This module turns a heterogeneous two-column kinetics CSV into a clean
//! [`KineticRun`] that is safe to fit.
//!
//! Design goals:
//! - **Tolerant schema**: column names vary across instruments ("Time (s)",
//!   "time_s", "Abs@410nm", ...); match by substring, fall back by position
//! - **Row-level validation**: skip bad rows, but report what happened
//! - **Deterministic behavior** (no hidden randomness)
//! - **Separation of concerns**: no fitting logic here

use std::fs::File;
use std::path::Path;
use std::sync::LazyLock;

use csv::StringRecord;
use log::warn;
use regex::Regex;

use crate::domain::{KineticRun, Sample};
use crate::error::AppError;

/// Resolved mapping of input columns to the canonical (time, absorbance) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnMap {
    pub time_idx: usize,
    pub absorbance_idx: usize,
    /// True when the mapping came from positional fallback rather than names.
    pub positional: bool,
}

/// Ingest output: the normalized run plus row-level diagnostics.
#[derive(Debug, Clone)]
pub struct IngestedRun {
    pub run: KineticRun,
    pub warnings: Vec<String>,
    pub rows_read: usize,
    pub rows_used: usize,
}

/// Load and normalize a single run CSV.
pub fn load_run(path: &Path) -> Result<IngestedRun, AppError> {
    let filename = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());

    let file = File::open(path)
        .map_err(|e| AppError::io(format!("Failed to open CSV '{}': {e}", path.display())))?;

    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(file);

    let headers = reader
        .headers()
        .map_err(|e| AppError::io(format!("Failed to read CSV headers in '{filename}': {e}")))?
        .clone();

    let mut warnings = Vec::new();
    let columns = map_columns(&headers, &filename)?;
    if columns.positional {
        let note = format!(
            "'{filename}': could not identify columns by name; assuming column 1 is time, column 2 is absorbance"
        );
        warn!("{note}");
        warnings.push(note);
    }

    let mut samples = Vec::new();
    let mut rows_read = 0usize;

    for (idx, result) in reader.records().enumerate() {
        // +2: records() starts after the header row and CSV lines are 1-based.
        let line = idx + 2;
        rows_read += 1;

        let record = match result {
            Ok(r) => r,
            Err(e) => {
                warnings.push(format!("'{filename}' line {line}: CSV parse error: {e}"));
                continue;
            }
        };

        match parse_sample(&record, columns) {
            Ok(sample) => samples.push(sample),
            Err(e) => warnings.push(format!("'{filename}' line {line}: {e}")),
        }
    }

    let rows_used = samples.len();
    Ok(IngestedRun {
        run: KineticRun {
            temperature_k: parse_temperature(&filename),
            filename,
            samples,
        },
        warnings,
        rows_read,
        rows_used,
    })
}

/// Map input headers to the canonical (time, absorbance) columns.
///
/// Any column whose name contains "time" (case-insensitive) is the time
/// column; any containing "abs" is absorbance; first match wins. If no time
/// column is found and the table has at least 2 columns, positions 0/1 are
/// used instead (the caller emits the warning).
pub fn map_columns(headers: &StringRecord, filename: &str) -> Result<ColumnMap, AppError> {
    if headers.len() < 2 {
        return Err(AppError::schema(format!(
            "'{filename}': need at least 2 columns (time, absorbance), found {}",
            headers.len()
        )));
    }

    let mut time_idx = None;
    let mut absorbance_idx = None;
    for (idx, name) in headers.iter().enumerate() {
        let name = normalize_header_name(name);
        if time_idx.is_none() && name.contains("time") {
            time_idx = Some(idx);
        } else if absorbance_idx.is_none() && name.contains("abs") {
            absorbance_idx = Some(idx);
        }
    }

    match (time_idx, absorbance_idx) {
        (Some(t), Some(a)) => Ok(ColumnMap {
            time_idx: t,
            absorbance_idx: a,
            positional: false,
        }),
        (None, _) => Ok(ColumnMap {
            time_idx: 0,
            absorbance_idx: 1,
            positional: true,
        }),
        (Some(_), None) => Err(AppError::schema(format!(
            "'{filename}': found a time column but no absorbance column (expected a name containing 'abs')"
        ))),
    }
}

fn normalize_header_name(name: &str) -> String {
    // Excel and friends sometimes emit UTF-8 CSVs with a BOM prefix on the
    // first header. Strip it so name matching works.
    let name = name.trim().trim_start_matches('\u{feff}');
    name.to_ascii_lowercase()
}

fn parse_sample(record: &StringRecord, columns: ColumnMap) -> Result<Sample, String> {
    let time_s = parse_cell(record, columns.time_idx, "time")?;
    let absorbance = parse_cell(record, columns.absorbance_idx, "absorbance")?;
    Ok(Sample { time_s, absorbance })
}

fn parse_cell(record: &StringRecord, idx: usize, what: &str) -> Result<f64, String> {
    let raw = record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| format!("missing {what} value"))?;
    let v: f64 = raw
        .parse()
        .map_err(|_| format!("invalid {what} value '{raw}'"))?;
    if !v.is_finite() {
        return Err(format!("non-finite {what} value '{raw}'"));
    }
    Ok(v)
}

static TEMP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)K").expect("literal regex"));

/// Parse a temperature in Kelvin from a run file name (e.g. `run_298K.csv`).
pub fn parse_temperature(filename: &str) -> Option<f64> {
    let caps = TEMP_RE.captures(filename)?;
    caps.get(1)?.as_str().parse::<f64>().ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn headers(names: &[&str]) -> StringRecord {
        StringRecord::from(names.to_vec())
    }

    #[test]
    fn maps_columns_by_name_substring() {
        let map = map_columns(&headers(&["Absorbance", "Time (s)"]), "x.csv").unwrap();
        assert_eq!(map.time_idx, 1);
        assert_eq!(map.absorbance_idx, 0);
        assert!(!map.positional);
    }

    #[test]
    fn matching_is_case_insensitive() {
        let map = map_columns(&headers(&["TIME_S", "ABS@410nm"]), "x.csv").unwrap();
        assert_eq!(map.time_idx, 0);
        assert_eq!(map.absorbance_idx, 1);
    }

    #[test]
    fn falls_back_to_positions_when_time_missing() {
        let map = map_columns(&headers(&["t", "signal"]), "x.csv").unwrap();
        assert!(map.positional);
        assert_eq!(map.time_idx, 0);
        assert_eq!(map.absorbance_idx, 1);
    }

    #[test]
    fn single_column_is_a_schema_error() {
        let err = map_columns(&headers(&["Time_s"]), "x.csv").unwrap_err();
        assert!(matches!(err, AppError::Schema(_)));
    }

    #[test]
    fn time_without_absorbance_is_a_schema_error() {
        let err = map_columns(&headers(&["Time_s", "signal"]), "x.csv").unwrap_err();
        assert!(matches!(err, AppError::Schema(_)));
    }

    #[test]
    fn parses_temperature_from_filename() {
        assert_eq!(parse_temperature("run_298K.csv"), Some(298.0));
        assert_eq!(parse_temperature("328K_trial2.csv"), Some(328.0));
        assert_eq!(parse_temperature("stress_chaos.csv"), None);
    }

    #[test]
    fn loads_run_and_skips_bad_rows() {
        let dir = std::env::temp_dir().join("kinetics-engine-ingest-test");
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("run_308K.csv");
        let mut f = std::fs::File::create(&path).unwrap();
        writeln!(f, "Time (s),Absorbance").unwrap();
        writeln!(f, "0,0.850").unwrap();
        writeln!(f, "10,oops").unwrap();
        writeln!(f, "20,0.842").unwrap();
        drop(f);

        let ingested = load_run(&path).unwrap();
        assert_eq!(ingested.run.temperature_k, Some(308.0));
        assert_eq!(ingested.rows_read, 3);
        assert_eq!(ingested.rows_used, 2);
        assert_eq!(ingested.warnings.len(), 1);
        assert!((ingested.run.samples[1].time_s - 20.0).abs() < 1e-12);
    }
}
