//! Per-row metric derivation.
//!
//! ```text
//! co2_per_k    = co2_tons          / (financed_amount / 1000)
//! energy_per_k = energy_mwh        / (financed_amount / 1000)
//! water_per_k  = water_thousand_m3 / (financed_amount / 1000)
//! total_risk   = (water_stress + flood_risk + drought_risk) / 3
//! ```
//!
//! Rows are independent; output order equals input order.

use serde::{Deserialize, Serialize};

use crate::error::{DerivationError, DerivationResult};
use crate::logs::{log_warning, log_warning_indent};
use crate::models::{DerivedRecord, Record, RecordSet};

/// What to do with a row whose financed amount is zero, or so close to zero
/// that an intensity overflows.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ZeroFinancingPolicy {
    /// Abort the run with [`DerivationError::ZeroFinancing`].
    #[default]
    Fail,
    /// Emit NaN for all three intensities of the row and log a warning.
    NanSentinel,
}

/// Derive intensities and composite risk for every record.
///
/// The input set is not modified. Risk values outside `[0, 1]` are kept as
/// given and reported as warnings.
pub fn derive_metrics(
    records: &RecordSet,
    policy: ZeroFinancingPolicy,
) -> DerivationResult<Vec<DerivedRecord>> {
    records
        .iter()
        .enumerate()
        .map(|(row, record)| derive_record(row, record, policy))
        .collect()
}

/// Derive the metrics of a single record at position `row`.
pub fn derive_record(
    row: usize,
    record: &Record,
    policy: ZeroFinancingPolicy,
) -> DerivationResult<DerivedRecord> {
    report_out_of_range_risks(row, record);

    let thousands = record.financed_amount / 1000.0;
    let intensities = (
        record.co2_tons / thousands,
        record.energy_mwh / thousands,
        record.water_thousand_m3 / thousands,
    );

    // A subnormal amount is not zero but still overflows the ratios
    let defined = record.financed_amount != 0.0
        && intensities.0.is_finite()
        && intensities.1.is_finite()
        && intensities.2.is_finite();

    let (co2_per_k, energy_per_k, water_per_k) = if defined {
        intensities
    } else {
        match policy {
            ZeroFinancingPolicy::Fail => {
                return Err(DerivationError::ZeroFinancing {
                    row,
                    client_id: record.client_id,
                });
            }
            ZeroFinancingPolicy::NanSentinel => {
                log_warning(format!(
                    "Row {} (client {}): financed_amount {} leaves intensities undefined, set to NaN",
                    row, record.client_id, record.financed_amount
                ));
                (f64::NAN, f64::NAN, f64::NAN)
            }
        }
    };

    Ok(DerivedRecord {
        record: record.clone(),
        co2_per_k,
        energy_per_k,
        water_per_k,
        total_risk: composite_risk(record.water_stress, record.flood_risk, record.drought_risk),
    })
}

/// Unweighted mean of the three risk indicators.
pub fn composite_risk(water_stress: f64, flood_risk: f64, drought_risk: f64) -> f64 {
    (water_stress + flood_risk + drought_risk) / 3.0
}

fn report_out_of_range_risks(row: usize, record: &Record) {
    let risks = [
        ("water_stress", record.water_stress),
        ("flood_risk", record.flood_risk),
        ("drought_risk", record.drought_risk),
    ];

    for (field, value) in risks {
        if !(0.0..=1.0).contains(&value) {
            log_warning_indent(
                format!(
                    "Row {} (client {}): {} = {} is outside [0, 1], kept as given",
                    row, record.client_id, field, value
                ),
                1,
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::sample_records;

    fn sample_set() -> RecordSet {
        RecordSet::from_raw(sample_records()).unwrap()
    }

    fn set_with_zero_financing() -> RecordSet {
        let mut rows = sample_records();
        rows[2].financed_amount = Some(0.0);
        RecordSet::from_raw(rows).unwrap()
    }

    #[test]
    fn test_intensity_formulas() {
        let set = sample_set();
        let derived = derive_metrics(&set, ZeroFinancingPolicy::Fail).unwrap();

        for (record, row) in set.iter().zip(&derived) {
            let k = record.financed_amount / 1000.0;
            assert!((row.co2_per_k - record.co2_tons / k).abs() < 1e-9);
            assert!((row.energy_per_k - record.energy_mwh / k).abs() < 1e-9);
            assert!((row.water_per_k - record.water_thousand_m3 / k).abs() < 1e-9);
        }

        // 3184 / 405.639
        assert!((derived[0].co2_per_k - 7.849344).abs() < 1e-6);
    }

    #[test]
    fn test_total_risk_first_client() {
        let derived = derive_metrics(&sample_set(), ZeroFinancingPolicy::Fail).unwrap();
        assert_eq!(format!("{:.6}", derived[0].total_risk), "0.626667");
        assert!((composite_risk(0.76, 0.47, 0.65) - 0.6266666666).abs() < 1e-6);
    }

    #[test]
    fn test_row_order_preserved() {
        let set = sample_set();
        let derived = derive_metrics(&set, ZeroFinancingPolicy::Fail).unwrap();

        assert_eq!(derived.len(), set.len());
        for (record, row) in set.iter().zip(&derived) {
            assert_eq!(&row.record, record);
        }
    }

    #[test]
    fn test_input_not_mutated() {
        let set = sample_set();
        let before = set.clone();
        let _ = derive_metrics(&set, ZeroFinancingPolicy::Fail).unwrap();
        assert_eq!(set, before);
    }

    #[test]
    fn test_zero_financing_fails_row() {
        let err = derive_metrics(&set_with_zero_financing(), ZeroFinancingPolicy::Fail).unwrap_err();
        assert_eq!(err, DerivationError::ZeroFinancing { row: 2, client_id: 103 });
    }

    #[test]
    fn test_zero_financing_sentinel_is_uniform() {
        let derived =
            derive_metrics(&set_with_zero_financing(), ZeroFinancingPolicy::NanSentinel).unwrap();
        let row = &derived[2];

        assert!(row.co2_per_k.is_nan());
        assert!(row.energy_per_k.is_nan());
        assert!(row.water_per_k.is_nan());
        assert!(row.total_risk.is_finite());

        // Other rows unaffected
        assert!(derived[1].co2_per_k.is_finite());
    }

    #[test]
    fn test_subnormal_financing_follows_policy() {
        let mut rows = sample_records();
        rows[0].financed_amount = Some(1e-310);
        let set = RecordSet::from_raw(rows).unwrap();

        let err = derive_metrics(&set, ZeroFinancingPolicy::Fail).unwrap_err();
        assert_eq!(err, DerivationError::ZeroFinancing { row: 0, client_id: 101 });

        let derived = derive_metrics(&set, ZeroFinancingPolicy::NanSentinel).unwrap();
        assert!(derived[0].co2_per_k.is_nan());
        assert!(derived[0].energy_per_k.is_nan());
        assert!(derived[0].water_per_k.is_nan());
        assert!(derived.iter().all(|r| !r.co2_per_k.is_infinite()));
    }

    #[test]
    fn test_out_of_range_risk_passes_through() {
        let mut rows = sample_records();
        rows[0].water_stress = Some(1.5);
        rows[0].flood_risk = Some(-0.3);
        let set = RecordSet::from_raw(rows).unwrap();

        let derived = derive_metrics(&set, ZeroFinancingPolicy::Fail).unwrap();
        assert_eq!(derived[0].record.water_stress, 1.5);
        assert!((derived[0].total_risk - (1.5 - 0.3 + 0.65) / 3.0).abs() < 1e-12);
    }

    #[test]
    fn test_negative_financing_is_not_zero() {
        let mut rows = sample_records();
        rows[0].financed_amount = Some(-2000.0);
        let set = RecordSet::from_raw(rows).unwrap();

        let derived = derive_metrics(&set, ZeroFinancingPolicy::Fail).unwrap();
        assert_eq!(derived[0].co2_per_k, -1592.0);
    }

    #[test]
    fn test_policy_serde_names() {
        let policy: ZeroFinancingPolicy = serde_json::from_str("\"nan_sentinel\"").unwrap();
        assert_eq!(policy, ZeroFinancingPolicy::NanSentinel);
        assert_eq!(ZeroFinancingPolicy::default(), ZeroFinancingPolicy::Fail);
    }
}
