//! # Envfin - environmental finance portfolio analysis
//!
//! Envfin turns a table of per-client environmental and financial records
//! into intensity metrics, a composite risk score, summary statistics and
//! country-level aggregates.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV / JSON │────▶│  RecordSet  │────▶│   Derive    │────▶│  Aggregate  │
//! │  (loader)   │     │  (intake)   │     │ (per-row)   │     │ (describe,  │
//! └─────────────┘     └─────────────┘     └─────────────┘     │  group-by)  │
//!                                                              └──────┬──────┘
//!                                              CSV export ◀───────────┤
//!                                              Chart sink ◀───────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use envfin::{run_analysis, sample_records, AnalysisOptions};
//!
//! let report = run_analysis(sample_records(), &AnalysisOptions::default()).unwrap();
//! for country in &report.countries {
//!     println!("{}: {}", country.country, country.financed_amount);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Error types per layer
//! - [`models`] - Records, record set, schema descriptors
//! - [`parser`] - CSV/JSON loading with auto-detection
//! - [`validation`] - JSON schema and report period checks
//! - [`transform`] - Derivation, aggregation and pipeline
//! - [`export`] - CSV export of derived and aggregate tables
//! - [`charts`] - Chart catalog and sink hand-off
//! - [`logs`] - Pipeline log stream

// Core modules
pub mod error;
pub mod logs;
pub mod models;

// Intake
pub mod parser;
pub mod validation;

// Transformation
pub mod transform;

// Outputs
pub mod charts;
pub mod export;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{
    ChartError, ComputationError, DerivationError, ExportError, LoadError, PipelineError,
    SchemaError,
};

// =============================================================================
// Re-exports - Models
// =============================================================================

pub use models::{
    sample_records, CategoricalField, DerivedRecord, NumericField, RawRecord, Record, RecordSet,
};

// =============================================================================
// Re-exports - Loading
// =============================================================================

pub use parser::{
    decode_content, detect_delimiter, detect_encoding, load_csv_bytes, load_csv_file,
    load_csv_str, load_file, load_json_file, load_json_str, LoadedTable,
};

// =============================================================================
// Re-exports - Transformation
// =============================================================================

pub use transform::{
    analyze_file, correlation, derive_metrics, describe, export_report, group_by_country,
    run_analysis, run_on_records, AnalysisOptions, AnalysisReport, CorrelationMatrix,
    CountryTotals, ExportPaths, SummaryTable, ZeroFinancingPolicy,
};

// =============================================================================
// Re-exports - Outputs
// =============================================================================

pub use charts::{chart_catalog, render_all, ChartSeries, ChartSink, ChartSpec, CollectingSink};
pub use export::{
    read_country_summary_csv, read_derived_csv, write_country_summary_csv, write_derived_csv,
};
