//! Domain models for the environmental finance pipeline.
//!
//! This module contains the core data structures used throughout the pipeline:
//!
//! - [`Record`] - One client report (categorical, financial and risk fields)
//! - [`DerivedRecord`] - A record extended with intensity and risk metrics
//! - [`RecordSet`] - Validated, ordered collection of records
//! - [`NumericField`] / [`CategoricalField`] - Static schema descriptors
//!   used to select columns for statistics and charts

mod record_set;

pub use record_set::{RawRecord, RecordSet};

use serde::{Deserialize, Serialize};

// =============================================================================
// Records
// =============================================================================

/// A single client report.
///
/// Risk attributes are expected in `[0, 1]` but are not clamped.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Record {
    pub client_id: i64,
    pub segment: String,
    pub industry: String,
    pub country: String,
    /// Financed amount in EUR.
    pub financed_amount: f64,
    pub co2_tons: f64,
    pub energy_mwh: f64,
    pub water_thousand_m3: f64,
    pub water_stress: f64,
    pub flood_risk: f64,
    pub drought_risk: f64,
    /// Report period, `MM/YYYY`.
    pub report_date: String,
}

/// A record extended with per-€1,000 intensities and the composite risk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DerivedRecord {
    pub record: Record,
    /// CO2 tons per €1,000 financed.
    pub co2_per_k: f64,
    /// Energy MWh per €1,000 financed.
    pub energy_per_k: f64,
    /// Water (thousand m3) per €1,000 financed.
    pub water_per_k: f64,
    /// Mean of water stress, flood risk and drought risk.
    pub total_risk: f64,
}

// =============================================================================
// Schema Descriptors
// =============================================================================

/// Numeric columns of the derived table, in export order.
///
/// `client_id` is an identifier, not a measure, and has no entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NumericField {
    FinancedAmount,
    Co2Tons,
    EnergyMwh,
    WaterThousandM3,
    WaterStress,
    FloodRisk,
    DroughtRisk,
    Co2PerK,
    EnergyPerK,
    WaterPerK,
    TotalRisk,
}

impl NumericField {
    pub const ALL: [NumericField; 11] = [
        Self::FinancedAmount,
        Self::Co2Tons,
        Self::EnergyMwh,
        Self::WaterThousandM3,
        Self::WaterStress,
        Self::FloodRisk,
        Self::DroughtRisk,
        Self::Co2PerK,
        Self::EnergyPerK,
        Self::WaterPerK,
        Self::TotalRisk,
    ];

    /// Column name used in exports and chart specifications.
    pub fn name(&self) -> &'static str {
        match self {
            Self::FinancedAmount => "financed_amount",
            Self::Co2Tons => "co2_tons",
            Self::EnergyMwh => "energy_mwh",
            Self::WaterThousandM3 => "water_thousand_m3",
            Self::WaterStress => "water_stress",
            Self::FloodRisk => "flood_risk",
            Self::DroughtRisk => "drought_risk",
            Self::Co2PerK => "co2_per_k",
            Self::EnergyPerK => "energy_per_k",
            Self::WaterPerK => "water_per_k",
            Self::TotalRisk => "total_risk",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn value(&self, row: &DerivedRecord) -> f64 {
        let r = &row.record;
        match self {
            Self::FinancedAmount => r.financed_amount,
            Self::Co2Tons => r.co2_tons,
            Self::EnergyMwh => r.energy_mwh,
            Self::WaterThousandM3 => r.water_thousand_m3,
            Self::WaterStress => r.water_stress,
            Self::FloodRisk => r.flood_risk,
            Self::DroughtRisk => r.drought_risk,
            Self::Co2PerK => row.co2_per_k,
            Self::EnergyPerK => row.energy_per_k,
            Self::WaterPerK => row.water_per_k,
            Self::TotalRisk => row.total_risk,
        }
    }
}

/// Categorical columns of the derived table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoricalField {
    Segment,
    Industry,
    Country,
    ReportDate,
}

impl CategoricalField {
    pub const ALL: [CategoricalField; 4] = [
        Self::Segment,
        Self::Industry,
        Self::Country,
        Self::ReportDate,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Segment => "segment",
            Self::Industry => "industry",
            Self::Country => "country",
            Self::ReportDate => "report_date",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|f| f.name() == name)
    }

    pub fn value<'a>(&self, row: &'a DerivedRecord) -> &'a str {
        let r = &row.record;
        match self {
            Self::Segment => &r.segment,
            Self::Industry => &r.industry,
            Self::Country => &r.country,
            Self::ReportDate => &r.report_date,
        }
    }
}

// =============================================================================
// Sample Data
// =============================================================================

/// The six-client reference portfolio (report period 03/2023).
pub fn sample_records() -> Vec<RawRecord> {
    const ROWS: [(i64, &str, &str, &str, f64, f64, f64, f64, f64, f64, f64); 6] = [
        (101, "Medium Corporate", "Transportation and Storage", "Lithuania", 405639.0, 3184.0, 4323.0, 3691.0, 0.76, 0.47, 0.65),
        (102, "Small Corporate", "Transportation and Storage", "Estonia", 19642.0, 562.0, 1922.0, 1348.0, 0.48, 0.66, 0.20),
        (103, "Small Corporate", "Manufacturing", "Lithuania", 167375.0, 987.0, 2832.0, 6692.0, 0.47, 0.43, 0.67),
        (104, "Medium Corporate", "Construction", "Lithuania", 239927.0, 1922.0, 4177.0, 10446.0, 0.76, 0.45, 0.62),
        (105, "Medium Corporate", "Agriculture, Forestry and Fishing", "Latvia", 221043.0, 998.0, 4738.0, 13471.0, 0.38, 0.56, 0.59),
        (106, "Small Corporate", "Transportation and Storage", "Lithuania", 3099.0, 944.0, 1375.0, 979.0, 0.79, 0.39, 0.62),
    ];

    ROWS.iter()
        .map(|&(id, segment, industry, country, financed, co2, energy, water, ws, fr, dr)| RawRecord {
            client_id: Some(id),
            segment: Some(segment.to_string()),
            industry: Some(industry.to_string()),
            country: Some(country.to_string()),
            financed_amount: Some(financed),
            co2_tons: Some(co2),
            energy_mwh: Some(energy),
            water_thousand_m3: Some(water),
            water_stress: Some(ws),
            flood_risk: Some(fr),
            drought_risk: Some(dr),
            report_date: Some("03/2023".to_string()),
        })
        .collect()
}
