//! Delimited-text export of the derived table and the country summary.
//!
//! Header names are part of the output contract:
//!
//! ```text
//! client_id,segment,industry,country,financed_amount,co2_tons,energy_mwh,
//! water_thousand_m3,water_stress,flood_risk,drought_risk,report_date,
//! co2_per_k,energy_per_k,water_per_k,total_risk
//!
//! country,financed_amount,co2_tons,water_thousand_m3,energy_mwh
//! ```
//!
//! Floats are written in shortest round-trip form; NaN sentinels are written
//! as `NaN` and read back as NaN.

use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use crate::error::ExportResult;
use crate::models::{DerivedRecord, Record};
use crate::transform::aggregate::CountryTotals;

/// Default file name of the derived table export.
pub const DERIVED_FILE_NAME: &str = "cleaned_environmental_finance_data.csv";

/// Default file name of the country summary export.
pub const SUMMARY_FILE_NAME: &str = "country_summary.csv";

/// Flat row layout of the derived table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DerivedRow {
    pub client_id: i64,
    pub segment: String,
    pub industry: String,
    pub country: String,
    pub financed_amount: f64,
    pub co2_tons: f64,
    pub energy_mwh: f64,
    pub water_thousand_m3: f64,
    pub water_stress: f64,
    pub flood_risk: f64,
    pub drought_risk: f64,
    pub report_date: String,
    pub co2_per_k: f64,
    pub energy_per_k: f64,
    pub water_per_k: f64,
    pub total_risk: f64,
}

impl From<&DerivedRecord> for DerivedRow {
    fn from(row: &DerivedRecord) -> Self {
        let r = &row.record;
        Self {
            client_id: r.client_id,
            segment: r.segment.clone(),
            industry: r.industry.clone(),
            country: r.country.clone(),
            financed_amount: r.financed_amount,
            co2_tons: r.co2_tons,
            energy_mwh: r.energy_mwh,
            water_thousand_m3: r.water_thousand_m3,
            water_stress: r.water_stress,
            flood_risk: r.flood_risk,
            drought_risk: r.drought_risk,
            report_date: r.report_date.clone(),
            co2_per_k: row.co2_per_k,
            energy_per_k: row.energy_per_k,
            water_per_k: row.water_per_k,
            total_risk: row.total_risk,
        }
    }
}

impl From<DerivedRow> for DerivedRecord {
    fn from(row: DerivedRow) -> Self {
        Self {
            record: Record {
                client_id: row.client_id,
                segment: row.segment,
                industry: row.industry,
                country: row.country,
                financed_amount: row.financed_amount,
                co2_tons: row.co2_tons,
                energy_mwh: row.energy_mwh,
                water_thousand_m3: row.water_thousand_m3,
                water_stress: row.water_stress,
                flood_risk: row.flood_risk,
                drought_risk: row.drought_risk,
                report_date: row.report_date,
            },
            co2_per_k: row.co2_per_k,
            energy_per_k: row.energy_per_k,
            water_per_k: row.water_per_k,
            total_risk: row.total_risk,
        }
    }
}

/// Write the derived table, header first, in row order.
pub fn write_derived_csv<W: Write>(
    writer: W,
    rows: &[DerivedRecord],
    delimiter: u8,
) -> ExportResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    if rows.is_empty() {
        wtr.write_record(DERIVED_HEADERS)?;
    }
    for row in rows {
        wtr.serialize(DerivedRow::from(row))?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the country summary, one row per country in the given order.
pub fn write_country_summary_csv<W: Write>(
    writer: W,
    totals: &[CountryTotals],
    delimiter: u8,
) -> ExportResult<()> {
    let mut wtr = csv::WriterBuilder::new()
        .delimiter(delimiter)
        .from_writer(writer);
    if totals.is_empty() {
        wtr.write_record(SUMMARY_HEADERS)?;
    }
    for row in totals {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

/// Write the derived table to a file, replacing any existing file.
pub fn export_derived<P: AsRef<Path>>(
    path: P,
    rows: &[DerivedRecord],
    delimiter: u8,
) -> ExportResult<()> {
    write_derived_csv(File::create(path.as_ref())?, rows, delimiter)
}

/// Write the country summary to a file, replacing any existing file.
pub fn export_country_summary<P: AsRef<Path>>(
    path: P,
    totals: &[CountryTotals],
    delimiter: u8,
) -> ExportResult<()> {
    write_country_summary_csv(File::create(path.as_ref())?, totals, delimiter)
}

/// Re-parse an exported derived table.
pub fn read_derived_csv<R: Read>(reader: R, delimiter: u8) -> ExportResult<Vec<DerivedRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(reader);
    let mut rows = Vec::new();
    for row in rdr.deserialize::<DerivedRow>() {
        rows.push(row?.into());
    }
    Ok(rows)
}

/// Re-parse an exported country summary.
pub fn read_country_summary_csv<R: Read>(
    reader: R,
    delimiter: u8,
) -> ExportResult<Vec<CountryTotals>> {
    let mut rdr = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_reader(reader);
    let mut rows = Vec::new();
    for row in rdr.deserialize::<CountryTotals>() {
        rows.push(row?);
    }
    Ok(rows)
}

const DERIVED_HEADERS: [&str; 16] = [
    "client_id",
    "segment",
    "industry",
    "country",
    "financed_amount",
    "co2_tons",
    "energy_mwh",
    "water_thousand_m3",
    "water_stress",
    "flood_risk",
    "drought_risk",
    "report_date",
    "co2_per_k",
    "energy_per_k",
    "water_per_k",
    "total_risk",
];

const SUMMARY_HEADERS: [&str; 5] = [
    "country",
    "financed_amount",
    "co2_tons",
    "water_thousand_m3",
    "energy_mwh",
];

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_records, RecordSet};
    use crate::transform::aggregate::group_by_country;
    use crate::transform::derive::{derive_metrics, ZeroFinancingPolicy};

    fn sample_table() -> Vec<DerivedRecord> {
        let set = RecordSet::from_raw(sample_records()).unwrap();
        derive_metrics(&set, ZeroFinancingPolicy::Fail).unwrap()
    }

    fn to_string(rows: &[DerivedRecord]) -> String {
        let mut buf = Vec::new();
        write_derived_csv(&mut buf, rows, b',').unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_derived_header_contract() {
        let text = to_string(&sample_table());
        let header = text.lines().next().unwrap();
        assert_eq!(header, DERIVED_HEADERS.join(","));
        assert_eq!(text.lines().count(), 7);
    }

    #[test]
    fn test_empty_table_still_has_header() {
        let text = to_string(&[]);
        assert_eq!(text.trim_end(), DERIVED_HEADERS.join(","));
    }

    #[test]
    fn test_derived_roundtrip() {
        let table = sample_table();
        let text = to_string(&table);
        let parsed = read_derived_csv(text.as_bytes(), b',').unwrap();

        // Shortest round-trip float formatting makes every column exact
        assert_eq!(parsed, table);
    }

    #[test]
    fn test_nan_sentinel_roundtrip() {
        let mut table = sample_table();
        table[1].co2_per_k = f64::NAN;
        table[1].energy_per_k = f64::NAN;
        table[1].water_per_k = f64::NAN;

        let parsed = read_derived_csv(to_string(&table).as_bytes(), b',').unwrap();
        assert!(parsed[1].co2_per_k.is_nan());
        assert!(parsed[1].energy_per_k.is_nan());
        assert!(parsed[1].water_per_k.is_nan());
        assert_eq!(parsed[1].record, table[1].record);
        assert_eq!(parsed[1].total_risk, table[1].total_risk);
        assert_eq!(parsed[0], table[0]);
    }

    #[test]
    fn test_country_summary_export() {
        let totals = group_by_country(&sample_table()).unwrap();
        let mut buf = Vec::new();
        write_country_summary_csv(&mut buf, &totals, b',').unwrap();
        let text = String::from_utf8(buf).unwrap();

        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], SUMMARY_HEADERS.join(","));
        assert_eq!(lines.len(), 4);
        assert!(lines[1].starts_with("Estonia,"));
        assert!(lines[3].starts_with("Lithuania,816040"));

        let parsed = read_country_summary_csv(text.as_bytes(), b',').unwrap();
        assert_eq!(parsed, totals);
    }

    #[test]
    fn test_export_to_files_with_semicolon() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(DERIVED_FILE_NAME);
        let table = sample_table();

        export_derived(&path, &table, b';').unwrap();
        let parsed = read_derived_csv(File::open(&path).unwrap(), b';').unwrap();

        // "Agriculture, Forestry and Fishing" survives unquoted with ';'
        assert_eq!(parsed[4].record.industry, "Agriculture, Forestry and Fishing");
        assert_eq!(parsed.len(), 6);
    }
}
