//! Whole-table statistics and grouped sums over the derived table.
//!
//! All operations are pure functions of a `&[DerivedRecord]` and refuse an
//! empty table with [`ComputationError::EmptyInput`].

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::error::{ComputationError, ComputationResult};
use crate::models::{CategoricalField, DerivedRecord, NumericField};

// =============================================================================
// Descriptive Statistics
// =============================================================================

/// Statistics of one numeric column.
///
/// NaN cells are skipped and not counted. A column with no usable cell has
/// NaN statistics; `std` needs at least two values.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NumericSummary {
    pub field: NumericField,
    pub count: usize,
    pub mean: f64,
    /// Sample standard deviation (N-1).
    pub std: Option<f64>,
    pub min: f64,
    #[serde(rename = "25%")]
    pub q25: f64,
    #[serde(rename = "50%")]
    pub median: f64,
    #[serde(rename = "75%")]
    pub q75: f64,
    pub max: f64,
}

/// Statistics of one categorical column.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CategoricalSummary {
    pub field: CategoricalField,
    pub count: usize,
    pub unique: usize,
    /// Most frequent value; ties go to the value seen first.
    pub top: String,
    pub freq: usize,
}

/// Descriptive statistics of the whole derived table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SummaryTable {
    pub rows: usize,
    pub numeric: Vec<NumericSummary>,
    pub categorical: Vec<CategoricalSummary>,
}

impl SummaryTable {
    pub fn numeric(&self, field: NumericField) -> Option<&NumericSummary> {
        self.numeric.iter().find(|s| s.field == field)
    }

    pub fn categorical(&self, field: CategoricalField) -> Option<&CategoricalSummary> {
        self.categorical.iter().find(|s| s.field == field)
    }
}

impl fmt::Display for SummaryTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{:<18} {:>5} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14} {:>14}",
            "column", "count", "mean", "std", "min", "25%", "50%", "75%", "max"
        )?;
        for s in &self.numeric {
            let std = s.std.map_or_else(|| "NaN".to_string(), |v| format!("{:.4}", v));
            writeln!(
                f,
                "{:<18} {:>5} {:>14.4} {:>14} {:>14.4} {:>14.4} {:>14.4} {:>14.4} {:>14.4}",
                s.field.name(),
                s.count,
                s.mean,
                std,
                s.min,
                s.q25,
                s.median,
                s.q75,
                s.max
            )?;
        }
        writeln!(f)?;
        writeln!(f, "{:<18} {:>5} {:>6} {:>5}  top", "column", "count", "unique", "freq")?;
        for s in &self.categorical {
            writeln!(
                f,
                "{:<18} {:>5} {:>6} {:>5}  {}",
                s.field.name(),
                s.count,
                s.unique,
                s.freq,
                s.top
            )?;
        }
        Ok(())
    }
}

/// Describe every numeric and categorical column of the schema.
pub fn describe(rows: &[DerivedRecord]) -> ComputationResult<SummaryTable> {
    Ok(SummaryTable {
        rows: rows.len(),
        numeric: describe_numeric(rows, &NumericField::ALL)?,
        categorical: describe_categorical(rows, &CategoricalField::ALL)?,
    })
}

/// Count, mean, sample std, min, quartiles and max per numeric column.
pub fn describe_numeric(
    rows: &[DerivedRecord],
    fields: &[NumericField],
) -> ComputationResult<Vec<NumericSummary>> {
    ensure_not_empty(rows, "numeric statistics")?;

    Ok(fields
        .iter()
        .map(|&field| {
            let mut values: Vec<f64> = rows
                .iter()
                .map(|row| field.value(row))
                .filter(|v| !v.is_nan())
                .collect();
            values.sort_by(f64::total_cmp);
            summarize_sorted(field, &values)
        })
        .collect())
}

/// Count, distinct count, most frequent value and its frequency per column.
pub fn describe_categorical(
    rows: &[DerivedRecord],
    fields: &[CategoricalField],
) -> ComputationResult<Vec<CategoricalSummary>> {
    ensure_not_empty(rows, "categorical statistics")?;

    Ok(fields
        .iter()
        .map(|&field| {
            // value -> (frequency, first row index)
            let mut counts: HashMap<&str, (usize, usize)> = HashMap::new();
            for (idx, row) in rows.iter().enumerate() {
                counts.entry(field.value(row)).or_insert((0, idx)).0 += 1;
            }

            let (top, (freq, _)) = counts
                .iter()
                .max_by(|(_, (fa, ia)), (_, (fb, ib))| fa.cmp(fb).then(ib.cmp(ia)))
                .map(|(value, stats)| (value.to_string(), *stats))
                .unwrap_or_default();

            CategoricalSummary {
                field,
                count: rows.len(),
                unique: counts.len(),
                top,
                freq,
            }
        })
        .collect())
}

fn summarize_sorted(field: NumericField, sorted: &[f64]) -> NumericSummary {
    let count = sorted.len();
    if count == 0 {
        return NumericSummary {
            field,
            count,
            mean: f64::NAN,
            std: None,
            min: f64::NAN,
            q25: f64::NAN,
            median: f64::NAN,
            q75: f64::NAN,
            max: f64::NAN,
        };
    }

    let n = count as f64;
    let mean = sorted.iter().sum::<f64>() / n;
    let std = (count > 1).then(|| {
        let ss: f64 = sorted.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1.0)).sqrt()
    });

    NumericSummary {
        field,
        count,
        mean,
        std,
        min: sorted[0],
        q25: quantile(sorted, 0.25),
        median: quantile(sorted, 0.50),
        q75: quantile(sorted, 0.75),
        max: sorted[count - 1],
    }
}

/// Quantile of sorted, non-empty data with linear interpolation between
/// closest ranks.
pub fn quantile(sorted: &[f64], p: f64) -> f64 {
    let idx = p * (sorted.len() - 1) as f64;
    let lo = idx.floor() as usize;
    let hi = idx.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        let frac = idx - lo as f64;
        sorted[lo] * (1.0 - frac) + sorted[hi] * frac
    }
}

// =============================================================================
// Grouped Sums
// =============================================================================

/// Summed amounts of one country.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CountryTotals {
    pub country: String,
    pub financed_amount: f64,
    pub co2_tons: f64,
    pub water_thousand_m3: f64,
    pub energy_mwh: f64,
}

impl CountryTotals {
    fn new(country: &str) -> Self {
        Self {
            country: country.to_string(),
            financed_amount: 0.0,
            co2_tons: 0.0,
            water_thousand_m3: 0.0,
            energy_mwh: 0.0,
        }
    }

    fn add(&mut self, row: &DerivedRecord) {
        let r = &row.record;
        self.financed_amount += r.financed_amount;
        self.co2_tons += r.co2_tons;
        self.water_thousand_m3 += r.water_thousand_m3;
        self.energy_mwh += r.energy_mwh;
    }
}

/// Sum financed amount, CO2, water and energy per country.
///
/// Only countries present in the input appear; rows are sorted by
/// ascending country name.
pub fn group_by_country(rows: &[DerivedRecord]) -> ComputationResult<Vec<CountryTotals>> {
    ensure_not_empty(rows, "country summary")?;

    let mut groups: BTreeMap<&str, CountryTotals> = BTreeMap::new();
    for row in rows {
        let country = row.record.country.as_str();
        groups
            .entry(country)
            .or_insert_with(|| CountryTotals::new(country))
            .add(row);
    }

    Ok(groups.into_values().collect())
}

// =============================================================================
// Correlation
// =============================================================================

/// Pearson correlation between numeric columns.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CorrelationMatrix {
    pub fields: Vec<NumericField>,
    /// Row-major, `values[i][j]` correlates `fields[i]` with `fields[j]`.
    pub values: Vec<Vec<f64>>,
}

impl CorrelationMatrix {
    pub fn get(&self, a: NumericField, b: NumericField) -> Option<f64> {
        let i = self.fields.iter().position(|f| *f == a)?;
        let j = self.fields.iter().position(|f| *f == b)?;
        Some(self.values[i][j])
    }
}

/// Pairwise Pearson coefficients over all numeric columns.
pub fn correlation(rows: &[DerivedRecord]) -> ComputationResult<CorrelationMatrix> {
    correlation_of(rows, &NumericField::ALL)
}

/// Pairwise Pearson coefficients over `fields`, in the given order.
///
/// Pairs with a NaN on either side are skipped. A coefficient is NaN when
/// fewer than two pairs remain or either side has zero variance.
pub fn correlation_of(
    rows: &[DerivedRecord],
    fields: &[NumericField],
) -> ComputationResult<CorrelationMatrix> {
    ensure_not_empty(rows, "correlation")?;

    let fields = fields.to_vec();
    let columns: Vec<Vec<f64>> = fields
        .iter()
        .map(|f| rows.iter().map(|row| f.value(row)).collect())
        .collect();

    let k = fields.len();
    let mut values = vec![vec![f64::NAN; k]; k];
    for i in 0..k {
        for j in i..k {
            let r = pearson(&columns[i], &columns[j]);
            let r = if i == j && !r.is_nan() { 1.0 } else { r };
            values[i][j] = r;
            values[j][i] = r;
        }
    }

    Ok(CorrelationMatrix { fields, values })
}

fn pearson(xs: &[f64], ys: &[f64]) -> f64 {
    let pairs: Vec<(f64, f64)> = xs
        .iter()
        .zip(ys)
        .filter(|(x, y)| !x.is_nan() && !y.is_nan())
        .map(|(x, y)| (*x, *y))
        .collect();

    if pairs.len() < 2 {
        return f64::NAN;
    }

    let n = pairs.len() as f64;
    let mean_x = pairs.iter().map(|p| p.0).sum::<f64>() / n;
    let mean_y = pairs.iter().map(|p| p.1).sum::<f64>() / n;

    let (mut sxy, mut sxx, mut syy) = (0.0, 0.0, 0.0);
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        sxy += dx * dy;
        sxx += dx * dx;
        syy += dy * dy;
    }

    if sxx == 0.0 || syy == 0.0 {
        return f64::NAN;
    }
    (sxy / (sxx.sqrt() * syy.sqrt())).clamp(-1.0, 1.0)
}

fn ensure_not_empty(rows: &[DerivedRecord], operation: &'static str) -> ComputationResult<()> {
    if rows.is_empty() {
        Err(ComputationError::EmptyInput { operation })
    } else {
        Ok(())
    }
}
