//! Error types for the environmental finance pipeline.
//!
//! One error type per layer:
//!
//! - [`SchemaError`] - Record intake validation errors
//! - [`DerivationError`] - Metric derivation errors (zero financing)
//! - [`ComputationError`] - Aggregation over unusable input
//! - [`LoadError`] - CSV/JSON loading errors
//! - [`ExportError`] - CSV export errors
//! - [`ChartError`] - Chart series resolution errors
//! - [`PipelineError`] - Top-level orchestration errors
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Intake Errors
// =============================================================================

/// Errors raised while building a [`crate::models::RecordSet`].
///
/// Row indices are zero-based positions in the input sequence.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SchemaError {
    /// A required field is absent.
    #[error("Row {row}: missing required field '{field}'")]
    MissingField { row: usize, field: String },

    /// A field is present but unusable.
    #[error("Row {row}: invalid value for field '{field}': {message}")]
    InvalidField {
        row: usize,
        field: String,
        message: String,
    },

    /// Two rows share a client identifier.
    #[error("Duplicate client_id {client_id} in rows {first_row} and {second_row}")]
    DuplicateId {
        client_id: i64,
        first_row: usize,
        second_row: usize,
    },
}

impl SchemaError {
    /// Row index of the offending record (the later row for duplicates).
    pub fn row(&self) -> usize {
        match self {
            Self::MissingField { row, .. } | Self::InvalidField { row, .. } => *row,
            Self::DuplicateId { second_row, .. } => *second_row,
        }
    }
}

// =============================================================================
// Derivation Errors
// =============================================================================

/// Errors during intensity and risk derivation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DerivationError {
    /// Intensity ratios are undefined for a zero (or vanishing) financed amount.
    #[error("Row {row} (client {client_id}): financed_amount is zero or too small, intensities are undefined")]
    ZeroFinancing { row: usize, client_id: i64 },
}

// =============================================================================
// Aggregation Errors
// =============================================================================

/// Errors during descriptive statistics and grouping.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ComputationError {
    /// The derived table has no rows.
    #[error("Cannot compute {operation}: no data")]
    EmptyInput { operation: &'static str },
}

// =============================================================================
// Loading Errors
// =============================================================================

/// Errors while reading records from CSV or JSON.
#[derive(Debug, Error)]
pub enum LoadError {
    /// Failed to read file.
    #[error("Failed to read file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to decode the input bytes.
    #[error("Failed to decode content: {0}")]
    EncodingError(String),

    /// Invalid CSV format.
    #[error("Invalid CSV format: {0}")]
    CsvError(#[from] csv::Error),

    /// Invalid JSON document.
    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// A record does not match the embedded schema.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Empty file.
    #[error("Input is empty")]
    EmptyFile,
}

// =============================================================================
// Export Errors
// =============================================================================

/// Errors while writing or re-reading exported tables.
#[derive(Debug, Error)]
pub enum ExportError {
    /// IO error.
    #[error("Export IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// CSV serialization error.
    #[error("Export CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

// =============================================================================
// Chart Errors
// =============================================================================

/// Errors while resolving chart series for a sink.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ChartError {
    /// The chart references a field outside the derived schema.
    #[error("Chart '{chart}' references unknown field '{field}'")]
    UnknownField { chart: String, field: String },

    /// Nothing to plot.
    #[error("Chart '{0}' has no data")]
    EmptyData(String),

    /// The sink failed to produce an artifact.
    #[error("Chart sink failed: {0}")]
    Sink(String),
}

// =============================================================================
// Pipeline Errors (top-level)
// =============================================================================

/// Top-level pipeline orchestration errors.
///
/// This is the error type returned by [`crate::transform::pipeline::run_analysis`].
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Intake validation error.
    #[error("Schema error: {0}")]
    Schema(#[from] SchemaError),

    /// Derivation error.
    #[error("Derivation error: {0}")]
    Derivation(#[from] DerivationError),

    /// Aggregation error.
    #[error("Computation error: {0}")]
    Computation(#[from] ComputationError),

    /// Loading error.
    #[error("Load error: {0}")]
    Load(#[from] LoadError),

    /// Export error.
    #[error("Export error: {0}")]
    Export(#[from] ExportError),

    /// Chart error.
    #[error("Chart error: {0}")]
    Chart(#[from] ChartError),

    /// Invalid options file.
    #[error("Invalid options: {0}")]
    Options(String),
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for intake operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Result type for derivation operations.
pub type DerivationResult<T> = Result<T, DerivationError>;

/// Result type for aggregation operations.
pub type ComputationResult<T> = Result<T, ComputationError>;

/// Result type for loading operations.
pub type LoadResult<T> = Result<T, LoadError>;

/// Result type for export operations.
pub type ExportResult<T> = Result<T, ExportError>;

/// Result type for chart operations.
pub type ChartResult<T> = Result<T, ChartError>;

/// Result type for pipeline operations.
pub type PipelineResult<T> = Result<T, PipelineError>;
