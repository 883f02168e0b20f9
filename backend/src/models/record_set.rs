//! Record intake: raw record-shaped inputs to a validated [`RecordSet`].
//!
//! Validation stops at the first offending row; no partial set is returned.
//! Accepted values are stored exactly as supplied.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::Record;
use crate::error::{SchemaError, SchemaResult};
use crate::validation::validate_report_period;

/// A record as supplied by a loader, every field optional.
///
/// Field aliases accept the column titles of the legacy spreadsheet export
/// (`"Financed Amount"`, `"CO2 (tons)"`, ...).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct RawRecord {
    #[serde(default, alias = "ClientID")]
    pub client_id: Option<i64>,
    #[serde(default, alias = "Segment")]
    pub segment: Option<String>,
    #[serde(default, alias = "Industry")]
    pub industry: Option<String>,
    #[serde(default, alias = "Country")]
    pub country: Option<String>,
    #[serde(default, alias = "Financed Amount")]
    pub financed_amount: Option<f64>,
    #[serde(default, alias = "CO2 (tons)")]
    pub co2_tons: Option<f64>,
    #[serde(default, alias = "Energy Consumption (MWh)")]
    pub energy_mwh: Option<f64>,
    #[serde(default, alias = "Water Usage (thousand m3)")]
    pub water_thousand_m3: Option<f64>,
    #[serde(default, alias = "Water Stress")]
    pub water_stress: Option<f64>,
    #[serde(default, alias = "Flood Risk")]
    pub flood_risk: Option<f64>,
    #[serde(default, alias = "Drought Risk")]
    pub drought_risk: Option<f64>,
    #[serde(default, alias = "Report_Date")]
    pub report_date: Option<String>,
}

/// Ordered, validated collection of records.
///
/// Client identifiers are unique; every numeric field is finite.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordSet {
    records: Vec<Record>,
}

impl RecordSet {
    /// Validate raw inputs and build a record set preserving input order.
    pub fn from_raw(raw: Vec<RawRecord>) -> SchemaResult<Self> {
        let mut seen: HashMap<i64, usize> = HashMap::with_capacity(raw.len());
        let mut records = Vec::with_capacity(raw.len());

        for (row, input) in raw.into_iter().enumerate() {
            let record = RowValidator { row }.validate(input)?;

            if let Some(&first_row) = seen.get(&record.client_id) {
                return Err(SchemaError::DuplicateId {
                    client_id: record.client_id,
                    first_row,
                    second_row: row,
                });
            }
            seen.insert(record.client_id, row);
            records.push(record);
        }

        Ok(Self { records })
    }

    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Record> {
        self.records.iter()
    }
}

impl<'a> IntoIterator for &'a RecordSet {
    type Item = &'a Record;
    type IntoIter = std::slice::Iter<'a, Record>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Per-row field checks, carrying the row index into every error.
struct RowValidator {
    row: usize,
}

impl RowValidator {
    fn validate(&self, raw: RawRecord) -> SchemaResult<Record> {
        let client_id = self.required(raw.client_id, "client_id")?;
        let segment = self.text(raw.segment, "segment")?;
        let industry = self.text(raw.industry, "industry")?;
        let country = self.text(raw.country, "country")?;
        let financed_amount = self.number(raw.financed_amount, "financed_amount")?;
        let co2_tons = self.number(raw.co2_tons, "co2_tons")?;
        let energy_mwh = self.number(raw.energy_mwh, "energy_mwh")?;
        let water_thousand_m3 = self.number(raw.water_thousand_m3, "water_thousand_m3")?;
        let water_stress = self.number(raw.water_stress, "water_stress")?;
        let flood_risk = self.number(raw.flood_risk, "flood_risk")?;
        let drought_risk = self.number(raw.drought_risk, "drought_risk")?;
        let report_date = self.text(raw.report_date, "report_date")?;

        validate_report_period(&report_date).map_err(|message| SchemaError::InvalidField {
            row: self.row,
            field: "report_date".into(),
            message,
        })?;

        Ok(Record {
            client_id,
            segment,
            industry,
            country,
            financed_amount,
            co2_tons,
            energy_mwh,
            water_thousand_m3,
            water_stress,
            flood_risk,
            drought_risk,
            report_date,
        })
    }

    fn required<T>(&self, value: Option<T>, field: &str) -> SchemaResult<T> {
        value.ok_or_else(|| SchemaError::MissingField {
            row: self.row,
            field: field.to_string(),
        })
    }

    /// Blank strings count as missing; anything else is kept verbatim.
    fn text(&self, value: Option<String>, field: &str) -> SchemaResult<String> {
        let value = self.required(value, field)?;
        if value.trim().is_empty() {
            return Err(SchemaError::MissingField {
                row: self.row,
                field: field.to_string(),
            });
        }
        Ok(value)
    }

    fn number(&self, value: Option<f64>, field: &str) -> SchemaResult<f64> {
        let value = self.required(value, field)?;
        if !value.is_finite() {
            return Err(SchemaError::InvalidField {
                row: self.row,
                field: field.to_string(),
                message: format!("expected a finite number, got {}", value),
            });
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_records;

    #[test]
    fn test_sample_is_valid() {
        let set = RecordSet::from_raw(sample_records()).unwrap();
        assert_eq!(set.len(), 6);
        let ids: Vec<i64> = set.iter().map(|r| r.client_id).collect();
        assert_eq!(ids, vec![101, 102, 103, 104, 105, 106]);
    }

    #[test]
    fn test_duplicate_id_references_both_rows() {
        let mut rows = sample_records();
        rows[4].client_id = Some(102);

        let err = RecordSet::from_raw(rows).unwrap_err();
        assert_eq!(
            err,
            SchemaError::DuplicateId {
                client_id: 102,
                first_row: 1,
                second_row: 4,
            }
        );
    }

    #[test]
    fn test_missing_field_names_row_and_field() {
        let mut rows = sample_records();
        rows[2].energy_mwh = None;

        let err = RecordSet::from_raw(rows).unwrap_err();
        assert_eq!(
            err,
            SchemaError::MissingField {
                row: 2,
                field: "energy_mwh".into(),
            }
        );
    }

    #[test]
    fn test_blank_categorical_is_missing() {
        let mut rows = sample_records();
        rows[0].country = Some("   ".into());

        let err = RecordSet::from_raw(rows).unwrap_err();
        assert!(matches!(err, SchemaError::MissingField { row: 0, ref field } if field == "country"));
    }

    #[test]
    fn test_categorical_values_kept_verbatim() {
        let mut rows = sample_records();
        rows[0].segment = Some(" Medium Corporate ".into());

        let set = RecordSet::from_raw(rows).unwrap();
        assert_eq!(set.records()[0].segment, " Medium Corporate ");
    }

    #[test]
    fn test_non_finite_risk_rejected() {
        let mut rows = sample_records();
        rows[3].flood_risk = Some(f64::NAN);

        let err = RecordSet::from_raw(rows).unwrap_err();
        match err {
            SchemaError::InvalidField { row, field, .. } => {
                assert_eq!(row, 3);
                assert_eq!(field, "flood_risk");
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_infinite_amount_rejected() {
        let mut rows = sample_records();
        rows[1].financed_amount = Some(f64::INFINITY);

        let err = RecordSet::from_raw(rows).unwrap_err();
        assert_eq!(err.row(), 1);
    }

    #[test]
    fn test_bad_report_period_rejected() {
        let mut rows = sample_records();
        rows[5].report_date = Some("13/2023".into());

        let err = RecordSet::from_raw(rows).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidField { row: 5, ref field, .. } if field == "report_date"));
    }

    #[test]
    fn test_out_of_range_risk_accepted() {
        let mut rows = sample_records();
        rows[0].drought_risk = Some(1.4);

        let set = RecordSet::from_raw(rows).unwrap();
        assert_eq!(set.records()[0].drought_risk, 1.4);
    }

    #[test]
    fn test_empty_input_is_valid() {
        let set = RecordSet::from_raw(Vec::new()).unwrap();
        assert!(set.is_empty());
    }
}
