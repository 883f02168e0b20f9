//! Transformation module.
//!
//! - Derive: per-row intensity metrics and composite risk
//! - Aggregate: descriptive statistics, country sums, correlation
//! - Pipeline: intake → derive → aggregate → export

pub mod aggregate;
pub mod derive;
pub mod pipeline;

pub use aggregate::{
    correlation, correlation_of, describe, describe_categorical, describe_numeric, group_by_country,
    CategoricalSummary, CorrelationMatrix, CountryTotals, NumericSummary, SummaryTable,
};
pub use derive::{composite_risk, derive_metrics, derive_record, ZeroFinancingPolicy};
pub use pipeline::*;
