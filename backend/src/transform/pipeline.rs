//! High-level pipeline API.
//!
//! Combines intake, derivation, aggregation and export:
//!
//! ```text
//! raw records ─▶ RecordSet::from_raw ─▶ derive_metrics ─▶ describe
//!                                                      ├─▶ group_by_country
//!                                                      └─▶ correlation
//! ```
//!
//! # Example
//!
//! ```rust,ignore
//! use envfin::{run_analysis, export_report, sample_records, AnalysisOptions};
//! use std::path::Path;
//!
//! let options = AnalysisOptions::default();
//! let report = run_analysis(sample_records(), &options)?;
//! println!("{}", report.summary);
//! export_report(&report, Path::new("out"), &options)?;
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use super::aggregate::{
    correlation, describe, group_by_country, CorrelationMatrix, CountryTotals, SummaryTable,
};
use super::derive::{derive_metrics, ZeroFinancingPolicy};
use crate::error::{PipelineError, PipelineResult};
use crate::export::{export_country_summary, export_derived, DERIVED_FILE_NAME, SUMMARY_FILE_NAME};
use crate::logs::{log_info, log_info_indent, log_success};
use crate::models::{DerivedRecord, RawRecord, RecordSet};
use crate::parser::{load_file, LoadedTable};

/// Options for an analysis run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisOptions {
    /// Handling of rows with a zero financed amount
    pub zero_financing: ZeroFinancingPolicy,

    /// File name of the derived table export
    pub derived_file_name: String,

    /// File name of the country summary export
    pub summary_file_name: String,

    /// Field delimiter of the exported tables
    pub delimiter: char,
}

impl Default for AnalysisOptions {
    fn default() -> Self {
        Self {
            zero_financing: ZeroFinancingPolicy::Fail,
            derived_file_name: DERIVED_FILE_NAME.to_string(),
            summary_file_name: SUMMARY_FILE_NAME.to_string(),
            delimiter: ',',
        }
    }
}

impl AnalysisOptions {
    /// Load options from a JSON file; missing keys keep their defaults.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> PipelineResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| PipelineError::Options(format!("{}: {}", path.display(), e)))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> PipelineResult<Self> {
        let options: Self =
            serde_json::from_str(content).map_err(|e| PipelineError::Options(e.to_string()))?;
        options.delimiter_byte()?;
        Ok(options)
    }

    /// Delimiter as a single byte, as the CSV writer expects.
    pub fn delimiter_byte(&self) -> PipelineResult<u8> {
        u8::try_from(self.delimiter)
            .ok()
            .filter(|b| b.is_ascii() && !matches!(*b, b'"' | b'\n' | b'\r'))
            .ok_or_else(|| {
                PipelineError::Options(format!("unsupported delimiter '{}'", self.delimiter))
            })
    }
}

/// Everything computed by one analysis run
#[derive(Debug, Clone, Serialize)]
pub struct AnalysisReport {
    /// Derived table, in input order
    pub derived: Vec<DerivedRecord>,

    /// Whole-table descriptive statistics
    pub summary: SummaryTable,

    /// Per-country sums, ascending by country
    pub countries: Vec<CountryTotals>,

    /// Pearson correlation between numeric columns
    pub correlation: CorrelationMatrix,

    /// Rows whose intensities were set to NaN
    pub sentinel_rows: Vec<usize>,
}

/// Paths written by [`export_report`]
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ExportPaths {
    pub derived: PathBuf,
    pub summary: PathBuf,
}

/// Run the full analysis on raw records.
///
/// Stops at the first schema, derivation or computation error; nothing is
/// returned for a partially valid input.
pub fn run_analysis(
    raw: Vec<RawRecord>,
    options: &AnalysisOptions,
) -> PipelineResult<AnalysisReport> {
    log_info(format!("📋 Validating {} records...", raw.len()));
    let records = RecordSet::from_raw(raw)?;
    log_success(format!("{} records accepted", records.len()));

    run_on_records(&records, options)
}

/// Run derivation and aggregation on an already validated record set.
pub fn run_on_records(
    records: &RecordSet,
    options: &AnalysisOptions,
) -> PipelineResult<AnalysisReport> {
    log_info("⚙️  Deriving intensity metrics and total risk...");
    let derived = derive_metrics(records, options.zero_financing)?;
    let sentinel_rows: Vec<usize> = derived
        .iter()
        .enumerate()
        .filter(|(_, row)| row.co2_per_k.is_nan())
        .map(|(idx, _)| idx)
        .collect();
    log_success(format!("Derived metrics for {} rows", derived.len()));

    log_info("📊 Computing descriptive statistics...");
    let summary = describe(&derived)?;

    log_info("📦 Grouping by country...");
    let countries = group_by_country(&derived)?;
    for totals in &countries {
        log_info_indent(
            format!(
                "{}: financed {:.0}, CO2 {:.0} t",
                totals.country, totals.financed_amount, totals.co2_tons
            ),
            1,
        );
    }
    log_success(format!("{} countries", countries.len()));

    let correlation = correlation(&derived)?;

    Ok(AnalysisReport {
        derived,
        summary,
        countries,
        correlation,
        sentinel_rows,
    })
}

/// Load a CSV or JSON file and run the analysis on it.
pub fn analyze_file<P: AsRef<Path>>(
    path: P,
    options: &AnalysisOptions,
) -> PipelineResult<(LoadedTable, AnalysisReport)> {
    let path = path.as_ref();
    log_info(format!("📖 Reading {}...", path.display()));
    let mut table = load_file(path)?;
    log_success(format!("Encoding: {}", table.encoding));
    if let Some(d) = table.delimiter {
        log_success(format!("Delimiter: '{}'", format_delimiter(d)));
    }
    log_success(format!("Read {} rows", table.records.len()));

    let raw = std::mem::take(&mut table.records);
    let report = run_analysis(raw, options)?;
    Ok((table, report))
}

/// Write the derived table and the country summary into `out_dir`.
///
/// `out_dir` must exist.
pub fn export_report(
    report: &AnalysisReport,
    out_dir: &Path,
    options: &AnalysisOptions,
) -> PipelineResult<ExportPaths> {
    let delimiter = options.delimiter_byte()?;
    let paths = ExportPaths {
        derived: out_dir.join(&options.derived_file_name),
        summary: out_dir.join(&options.summary_file_name),
    };

    export_derived(&paths.derived, &report.derived, delimiter)?;
    log_success(format!("Derived table written to {}", paths.derived.display()));

    export_country_summary(&paths.summary, &report.countries, delimiter)?;
    log_success(format!("Country summary written to {}", paths.summary.display()));

    Ok(paths)
}

/// Format delimiter for display
fn format_delimiter(d: char) -> String {
    match d {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    }
}
