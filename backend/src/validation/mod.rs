//! Validation helpers for incoming client records.
//!
//! Two layers:
//!
//! - JSON Schema (Draft 7) type checks for records read from JSON documents,
//!   using the schema embedded from `schemas/client-record.json`
//! - Report period checks (`MM/YYYY`, month 01-12) used by record intake
//!
//! # Example
//!
//! ```rust,ignore
//! use serde_json::json;
//! use envfin::validation::{validate_client_record, validate_report_period};
//!
//! let row = json!({ "client_id": 101, "country": "Lithuania", "report_date": "03/2023" });
//! assert!(validate_client_record(&row).is_ok());
//! assert!(validate_report_period("3/2023").is_err());
//! ```

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

static CLIENT_RECORD_SCHEMA: Lazy<Value> = Lazy::new(|| {
    serde_json::from_str(include_str!("../../schemas/client-record.json"))
        .expect("Invalid embedded schema")
});

static REPORT_PERIOD: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(\d{2})/(\d{4})$").expect("Invalid report period pattern"));

/// Validate a JSON value against a JSON schema.
///
/// # Returns
/// * `Ok(())` if valid
/// * `Err(Vec<String>)` with every error message otherwise
pub fn validate(schema: &Value, data: &Value) -> Result<(), Vec<String>> {
    let validator = jsonschema::draft7::new(schema)
        .map_err(|e| vec![format!("Invalid schema: {}", e)])?;

    let errors: Vec<String> = validator
        .iter_errors(data)
        .map(|e| e.to_string())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Quick check: true if the data matches the schema.
pub fn is_valid(schema: &Value, data: &Value) -> bool {
    jsonschema::draft7::is_valid(schema, data)
}

/// Validate one JSON row against the embedded client record schema.
pub fn validate_client_record(data: &Value) -> Result<(), Vec<String>> {
    validate(&CLIENT_RECORD_SCHEMA, data)
}

/// Quick check against the client record schema.
pub fn is_valid_client_record(data: &Value) -> bool {
    is_valid(&CLIENT_RECORD_SCHEMA, data)
}

/// Check a report period token of the form `MM/YYYY`.
pub fn validate_report_period(period: &str) -> Result<(), String> {
    let caps = REPORT_PERIOD
        .captures(period)
        .ok_or_else(|| format!("expected MM/YYYY, got '{}'", period))?;

    let month: u32 = caps[1]
        .parse()
        .map_err(|_| format!("invalid month in '{}'", period))?;
    let year: i32 = caps[2]
        .parse()
        .map_err(|_| format!("invalid year in '{}'", period))?;

    NaiveDate::from_ymd_opt(year, month, 1)
        .map(|_| ())
        .ok_or_else(|| format!("month out of range in '{}'", period))
}
