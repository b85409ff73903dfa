use serde::Serialize;

/// An aggregation over one dataset column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Metric {
    pub unique_name: String,
    pub label: String,
    pub dataset: String,
    pub column: String,
    pub calculation_method: CalculationMethod,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub is_hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unrelated_dimensions_handling: Option<UnrelatedDimensions>,
}

/// A metric defined by an expression over other metrics.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricCalc {
    pub unique_name: String,
    pub label: String,
    pub expression: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub format: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub is_hidden: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Aggregation applied by a metric.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum CalculationMethod {
    #[serde(rename = "sum")]
    Sum,
    #[serde(rename = "average")]
    Average,
    #[serde(rename = "minimum")]
    Minimum,
    #[serde(rename = "maximum")]
    Maximum,
    #[serde(rename = "count non-null")]
    CountNonNull,
    #[serde(rename = "count distinct")]
    CountDistinct,
}

impl CalculationMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            CalculationMethod::Sum => "sum",
            CalculationMethod::Average => "average",
            CalculationMethod::Minimum => "minimum",
            CalculationMethod::Maximum => "maximum",
            CalculationMethod::CountNonNull => "count non-null",
            CalculationMethod::CountDistinct => "count distinct",
        }
    }
}

impl std::fmt::Display for CalculationMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What a metric returns when sliced by a dimension it cannot reach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UnrelatedDimensions {
    Error,
    Empty,
    Repeat,
}
