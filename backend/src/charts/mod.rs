//! Chart specifications and the hand-off to a rendering sink.
//!
//! Rendering itself is not done here. A [`ChartSink`] receives each
//! [`ChartSpec`] of the catalog together with its resolved [`ChartSeries`]
//! (points already grouped and aggregated from the derived table).
//!
//! ```text
//! derived table ──┐
//!                 ├──▶ ChartSpec::resolve ──▶ ChartSeries ──▶ ChartSink::render
//! chart_catalog ──┘
//! ```

use serde::{Deserialize, Serialize};

use crate::error::{ChartError, ChartResult};
use crate::models::{CategoricalField, DerivedRecord, NumericField};
use crate::transform::aggregate::{correlation_of, CorrelationMatrix};

/// Kind of chart a sink should draw.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChartKind {
    Bar,
    Box,
    Scatter,
    Heatmap,
    Radar,
    Pair,
    Histogram,
}

/// How y values sharing an x value (and group) are combined.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    Sum,
    Mean,
    /// One point per row.
    None,
}

/// Declarative description of one chart.
///
/// `variables` lists the columns of multi-variable charts (radar axes,
/// pair plot variables, heatmap columns) and is empty otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartSpec {
    /// Artifact name, e.g. `financed_by_country`.
    pub name: String,
    pub title: String,
    pub kind: ChartKind,
    pub x_field: Option<String>,
    pub y_field: Option<String>,
    pub grouping_field: Option<String>,
    pub aggregation: Aggregation,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub variables: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bins: Option<usize>,
}

impl ChartSpec {
    fn xy(
        name: &str,
        title: &str,
        kind: ChartKind,
        x: &str,
        y: &str,
        group: Option<&str>,
        aggregation: Aggregation,
    ) -> Self {
        Self {
            name: name.to_string(),
            title: title.to_string(),
            kind,
            x_field: Some(x.to_string()),
            y_field: Some(y.to_string()),
            grouping_field: group.map(str::to_string),
            aggregation,
            variables: Vec::new(),
            bins: None,
        }
    }

    /// File name a sink should use for the rendered artifact.
    pub fn file_name(&self) -> String {
        format!("{}.png", self.name)
    }

    /// Resolve the data this chart needs from the derived table.
    pub fn resolve(&self, rows: &[DerivedRecord]) -> ChartResult<ChartSeries> {
        if rows.is_empty() {
            return Err(ChartError::EmptyData(self.name.clone()));
        }

        match self.kind {
            ChartKind::Bar | ChartKind::Box | ChartKind::Scatter => self.resolve_points(rows),
            ChartKind::Histogram => self.resolve_histogram(rows),
            ChartKind::Radar | ChartKind::Pair => self.resolve_profiles(rows),
            ChartKind::Heatmap => self.resolve_matrix(rows),
        }
    }

    fn resolve_points(&self, rows: &[DerivedRecord]) -> ChartResult<ChartSeries> {
        let x = self.column(self.x_field.as_deref(), "x_field")?;
        let y = self.numeric_column(self.y_field.as_deref(), "y_field")?;
        let group = self
            .grouping_field
            .as_deref()
            .map(|g| self.column(Some(g), "grouping_field"))
            .transpose()?;

        let mut buckets: Vec<PointBucket> = Vec::new();
        for row in rows {
            let y_value = y.value(row);
            if y_value.is_nan() {
                continue;
            }
            let x_value = x.value(row);
            let group_value = group.map(|g| g.value(row).label());

            if self.aggregation == Aggregation::None {
                buckets.push(PointBucket::new(x_value, group_value, y_value));
                continue;
            }
            match buckets
                .iter()
                .position(|b| b.x == x_value && b.group == group_value)
            {
                Some(i) => buckets[i].add(y_value),
                None => buckets.push(PointBucket::new(x_value, group_value, y_value)),
            }
        }

        let points = buckets
            .into_iter()
            .map(|b| {
                let y = match self.aggregation {
                    Aggregation::Mean => b.sum / b.count as f64,
                    Aggregation::Sum | Aggregation::None => b.sum,
                };
                ChartPoint { x: b.x, y, group: b.group }
            })
            .collect();

        Ok(ChartSeries::Points { points })
    }

    fn resolve_matrix(&self, rows: &[DerivedRecord]) -> ChartResult<ChartSeries> {
        let fields = if self.variables.is_empty() {
            NumericField::ALL.to_vec()
        } else {
            self.variables
                .iter()
                .map(|v| self.numeric_column(Some(v), "variables"))
                .collect::<ChartResult<Vec<_>>>()?
        };

        let matrix = correlation_of(rows, &fields)
            .map_err(|_| ChartError::EmptyData(self.name.clone()))?;
        Ok(ChartSeries::Matrix(matrix))
    }

        fn resolve_histogram(&self, rows: &[DerivedRecord]) -> ChartResult<ChartSeries> {
        let field = self.numeric_column(self.x_field.as_deref(), "x_field")?;
        let values: Vec<f64> = rows
            .iter()
            .map(|r| field.value(r))
            .filter(|v| v.is_finite())
            .collect();
        if values.is_empty() {
            return Err(ChartError::EmptyData(self.name.clone()));
        }

        let bins = self.bins.unwrap_or(10).max(1);
        let mut lo = values.iter().copied().fold(f64::INFINITY, f64::min);
        let mut hi = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if lo == hi {
            lo -= 0.5;
            hi += 0.5;
        }

        let width = (hi - lo) / bins as f64;
        let edges: Vec<f64> = (0..=bins).map(|i| lo + width * i as f64).collect();
        let mut counts = vec![0usize; bins];
        for v in values {
            // The last bin is closed on the right
            let idx = (((v - lo) / width).floor() as usize).min(bins - 1);
            counts[idx] += 1;
        }

        Ok(ChartSeries::Histogram { edges, counts })
    }

    fn resolve_profiles(&self, rows: &[DerivedRecord]) -> ChartResult<ChartSeries> {
        let variables = self
            .variables
            .iter()
            .map(|v| self.numeric_column(Some(v), "variables"))
            .collect::<ChartResult<Vec<_>>>()?;
        let label = match (&self.x_field, &self.grouping_field) {
            (Some(x), _) => self.column(Some(x), "x_field")?,
            (None, Some(g)) => self.column(Some(g), "grouping_field")?,
            (None, None) => Column::ClientId,
        };

        let profiles = rows
            .iter()
            .map(|row| Profile {
                label: label.value(row).label(),
                values: variables.iter().map(|v| v.value(row)).collect(),
            })
            .collect();

        Ok(ChartSeries::Profiles {
            variables: self.variables.clone(),
            profiles,
        })
    }

    fn column(&self, name: Option<&str>, role: &str) -> ChartResult<Column> {
        let name = name.ok_or_else(|| self.unknown(role))?;
        Column::from_name(name).ok_or_else(|| self.unknown(name))
    }

    fn numeric_column(&self, name: Option<&str>, role: &str) -> ChartResult<NumericField> {
        let name = name.ok_or_else(|| self.unknown(role))?;
        NumericField::from_name(name).ok_or_else(|| self.unknown(name))
    }

    fn unknown(&self, field: &str) -> ChartError {
        ChartError::UnknownField {
            chart: self.name.clone(),
            field: field.to_string(),
        }
    }
}

/// A cell value as seen by a chart axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChartValue {
    Number(f64),
    Text(String),
}

impl ChartValue {
    fn label(&self) -> String {
        match self {
            Self::Number(v) => v.to_string(),
            Self::Text(s) => s.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChartPoint {
    pub x: ChartValue,
    pub y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
}

/// One entity's values across the chart's variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Profile {
    pub label: String,
    pub values: Vec<f64>,
}

/// Data handed to a sink for one chart.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ChartSeries {
    /// x/y points in first-seen order, aggregated per (x, group).
    Points { points: Vec<ChartPoint> },
    /// Equal-width bins; `edges.len() == counts.len() + 1`.
    Histogram { edges: Vec<f64>, counts: Vec<usize> },
    /// One profile per row, values in `variables` order.
    Profiles {
        variables: Vec<String>,
        profiles: Vec<Profile>,
    },
    Matrix(CorrelationMatrix),
}

/// Consumer of resolved charts (e.g. an image renderer).
pub trait ChartSink {
    fn render(&mut self, spec: &ChartSpec, series: &ChartSeries) -> ChartResult<()>;
}

/// Resolve every spec against the derived table and pass it to the sink.
pub fn render_all<S: ChartSink + ?Sized>(
    sink: &mut S,
    rows: &[DerivedRecord],
    specs: &[ChartSpec],
) -> ChartResult<usize> {
    for spec in specs {
        let series = spec.resolve(rows)?;
        sink.render(spec, &series)?;
    }
    Ok(specs.len())
}

/// Sink that keeps every resolved chart in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub charts: Vec<(ChartSpec, ChartSeries)>,
}

impl ChartSink for CollectingSink {
    fn render(&mut self, spec: &ChartSpec, series: &ChartSeries) -> ChartResult<()> {
        self.charts.push((spec.clone(), series.clone()));
        Ok(())
    }
}

/// The fixed set of portfolio charts.
pub fn chart_catalog() -> Vec<ChartSpec> {
    use Aggregation::{Mean, None as Each, Sum};
    use ChartKind::*;

    let risks: Vec<String> = ["water_stress", "flood_risk", "drought_risk"]
        .iter()
        .map(|s| s.to_string())
        .collect();

    vec![
        ChartSpec::xy("financed_by_country", "Total Financed Amount by Country", Bar, "country", "financed_amount", None, Sum),
        ChartSpec::xy("water_stress_segment", "Water Stress by Company Segment", Box, "segment", "water_stress", None, Each),
        ChartSpec::xy("co2_by_industry", "Average CO2 Emissions by Industry", Bar, "industry", "co2_tons", None, Mean),
        ChartSpec::xy("financed_vs_co2", "Financed Amount vs CO2 Emissions", Scatter, "financed_amount", "co2_tons", Some("segment"), Each),
        ChartSpec {
            name: "correlation_matrix".into(),
            title: "Correlation Matrix".into(),
            kind: Heatmap,
            x_field: None,
            y_field: None,
            grouping_field: None,
            aggregation: Each,
            variables: NumericField::ALL.iter().map(|f| f.name().to_string()).collect(),
            bins: None,
        },
        ChartSpec::xy("co2_per_euro", "CO2 Intensity per €k Financed", Bar, "client_id", "co2_per_k", Some("segment"), Each),
        ChartSpec {
            name: "risk_radar_chart".into(),
            title: "Risk Profile Radar Chart".into(),
            kind: Radar,
            x_field: Some("client_id".into()),
            y_field: None,
            grouping_field: None,
            aggregation: Each,
            variables: risks.clone(),
            bins: None,
        },
        ChartSpec {
            name: "risk_pairplot".into(),
            title: "Risk Pair Plot".into(),
            kind: Pair,
            x_field: None,
            y_field: None,
            grouping_field: Some("country".into()),
            aggregation: Each,
            variables: risks,
            bins: None,
        },
        ChartSpec {
            name: "total_risk_dist".into(),
            title: "Distribution of Total Environmental Risk".into(),
            kind: Histogram,
            x_field: Some("total_risk".into()),
            y_field: None,
            grouping_field: None,
            aggregation: Each,
            variables: Vec::new(),
            bins: Some(5),
        },
        ChartSpec::xy("energy_per_euro", "Energy Intensity per €k Financed", Bar, "client_id", "energy_per_k", Some("country"), Each),
    ]
}

// =============================================================================
// Column lookup
// =============================================================================

#[derive(Debug, Clone, Copy)]
enum Column {
    ClientId,
    Numeric(NumericField),
    Categorical(CategoricalField),
}

impl Column {
    fn from_name(name: &str) -> Option<Self> {
        if name == "client_id" {
            return Some(Self::ClientId);
        }
        NumericField::from_name(name)
            .map(Self::Numeric)
            .or_else(|| CategoricalField::from_name(name).map(Self::Categorical))
    }

    fn value(&self, row: &DerivedRecord) -> ChartValue {
        match self {
            Self::ClientId => ChartValue::Text(row.record.client_id.to_string()),
            Self::Numeric(f) => ChartValue::Number(f.value(row)),
            Self::Categorical(f) => ChartValue::Text(f.value(row).to_string()),
        }
    }
}

struct PointBucket {
    x: ChartValue,
    group: Option<String>,
    sum: f64,
    count: usize,
}

impl PointBucket {
    fn new(x: ChartValue, group: Option<String>, y: f64) -> Self {
        Self { x, group, sum: y, count: 1 }
    }

    fn add(&mut self, y: f64) {
        self.sum += y;
        self.count += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{sample_records, RecordSet};
    use crate::transform::derive::{derive_metrics, ZeroFinancingPolicy};
    use std::collections::HashSet;

    fn sample_table() -> Vec<DerivedRecord> {
        let set = RecordSet::from_raw(sample_records()).unwrap();
        derive_metrics(&set, ZeroFinancingPolicy::Fail).unwrap()
    }

    fn spec(name: &str) -> ChartSpec {
        chart_catalog().into_iter().find(|s| s.name == name).unwrap()
    }

    #[test]
    fn test_catalog_names_unique() {
        let catalog = chart_catalog();
        assert_eq!(catalog.len(), 10);
        let names: HashSet<&str> = catalog.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names.len(), 10);
        assert_eq!(catalog[0].file_name(), "financed_by_country.png");
    }

    #[test]
    fn test_every_catalog_chart_resolves() {
        let table = sample_table();
        let mut sink = CollectingSink::default();
        let count = render_all(&mut sink, &table, &chart_catalog()).unwrap();
        assert_eq!(count, 10);
        assert_eq!(sink.charts.len(), 10);
    }

    #[test]
    fn test_financed_by_country_sums() {
        let series = spec("financed_by_country").resolve(&sample_table()).unwrap();
        let ChartSeries::Points { points } = series else {
            panic!("expected points");
        };

        // First-seen order: Lithuania, Estonia, Latvia
        assert_eq!(points.len(), 3);
        assert_eq!(points[0].x, ChartValue::Text("Lithuania".into()));
        assert_eq!(points[0].y, 816040.0);
        assert_eq!(points[1].y, 19642.0);
    }

    #[test]
    fn test_co2_by_industry_means() {
        let series = spec("co2_by_industry").resolve(&sample_table()).unwrap();
        let ChartSeries::Points { points } = series else {
            panic!("expected points");
        };

        let transport = points
            .iter()
            .find(|p| p.x == ChartValue::Text("Transportation and Storage".into()))
            .unwrap();
        assert!((transport.y - (3184.0 + 562.0 + 944.0) / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_scatter_keeps_every_row() {
        let series = spec("financed_vs_co2").resolve(&sample_table()).unwrap();
        let ChartSeries::Points { points } = series else {
            panic!("expected points");
        };
        assert_eq!(points.len(), 6);
        assert_eq!(points[0].x, ChartValue::Number(405639.0));
        assert_eq!(points[0].group.as_deref(), Some("Medium Corporate"));
    }

    #[test]
    fn test_histogram_counts_all_rows() {
        let series = spec("total_risk_dist").resolve(&sample_table()).unwrap();
        let ChartSeries::Histogram { edges, counts } = series else {
            panic!("expected histogram");
        };
        assert_eq!(counts.len(), 5);
        assert_eq!(edges.len(), 6);
        assert_eq!(counts.iter().sum::<usize>(), 6);
    }

    #[test]
    fn test_radar_profiles() {
        let series = spec("risk_radar_chart").resolve(&sample_table()).unwrap();
        let ChartSeries::Profiles { variables, profiles } = series else {
            panic!("expected profiles");
        };
        assert_eq!(variables, vec!["water_stress", "flood_risk", "drought_risk"]);
        assert_eq!(profiles[0].label, "101");
        assert_eq!(profiles[0].values, vec![0.76, 0.47, 0.65]);
    }

    #[test]
    fn test_heatmap_uses_listed_variables() {
        let mut heatmap = spec("correlation_matrix");
        heatmap.variables = vec!["water_stress".into(), "flood_risk".into()];

        let ChartSeries::Matrix(matrix) = heatmap.resolve(&sample_table()).unwrap() else {
            panic!("expected matrix");
        };
        assert_eq!(matrix.fields, vec![NumericField::WaterStress, NumericField::FloodRisk]);
        assert_eq!(matrix.values.len(), 2);
        assert!(matrix.values.iter().all(|row| row.len() == 2));
    }

    #[test]
    fn test_heatmap_rejects_unknown_variable() {
        let mut heatmap = spec("correlation_matrix");
        heatmap.variables = vec!["water_stress".into(), "profit".into()];

        let err = heatmap.resolve(&sample_table()).unwrap_err();
        assert!(matches!(err, ChartError::UnknownField { ref field, .. } if field == "profit"));
    }

    #[test]
    fn test_unknown_field() {
        let mut bad = spec("financed_by_country");
        bad.y_field = Some("profit".into());
        let err = bad.resolve(&sample_table()).unwrap_err();
        assert_eq!(
            err,
            ChartError::UnknownField {
                chart: "financed_by_country".into(),
                field: "profit".into(),
            }
        );
    }

    #[test]
    fn test_empty_table() {
        let err = spec("correlation_matrix").resolve(&[]).unwrap_err();
        assert_eq!(err, ChartError::EmptyData("correlation_matrix".into()));
    }

    #[test]
    fn test_spec_serialization() {
        let json = serde_json::to_value(spec("co2_by_industry")).unwrap();
        assert_eq!(json["kind"], "bar");
        assert_eq!(json["aggregation"], "mean");
        assert_eq!(json["x_field"], "industry");
        assert!(json.get("variables").is_none());
    }
}
