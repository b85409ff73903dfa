//! Measure formula translation.
//!
//! Only a small, fixed vocabulary of the source formula language is
//! translated: single-column aggregations, `COUNTROWS`, `DIVIDE`, references
//! to other measures and arithmetic composition of those. Anything else stops
//! the translation and the caller falls back (see
//! [`resolve::measure`](crate::resolve::measure)).
//!
//! The parser never creates metrics itself. Aggregations and measure
//! references are resolved through a [`MeasureSource`], which decides whether
//! to reuse or create the target metric.
//!
//! # Example
//!
//! ```
//! use bim2sml::expr::{translate, AggregateCall, MeasureSource, Translation};
//!
//! struct Fixed;
//!
//! impl MeasureSource for Fixed {
//!     fn aggregate(&mut self, call: &AggregateCall) -> Option<String> {
//!         Some(format!("{}_{}", call.function.keyword(), call.column.as_deref()?))
//!     }
//!     fn measure(&mut self, _name: &str) -> Option<String> {
//!         None
//!     }
//! }
//!
//! let translation = translate("DIVIDE(SUM(Sales[Amount]), SUM(Sales[Qty]))", &mut Fixed);
//! assert_eq!(
//!     translation,
//!     Translation::Complete("[Measures].[sum_Amount] / [Measures].[sum_Qty]".to_string())
//! );
//! ```

mod parser;
pub mod scan;

pub use parser::{is_ratio, measure_reference, single_aggregate, translate, Translation};

use crate::sml::CalculationMethod;

/// Aggregation functions recognized in formulas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AggregateFunction {
    Sum,
    Average,
    Min,
    Max,
    Count,
    CountA,
    DistinctCount,
    CountRows,
}

impl AggregateFunction {
    pub const ALL: [AggregateFunction; 8] = [
        AggregateFunction::DistinctCount,
        AggregateFunction::CountRows,
        AggregateFunction::CountA,
        AggregateFunction::Count,
        AggregateFunction::Average,
        AggregateFunction::Sum,
        AggregateFunction::Min,
        AggregateFunction::Max,
    ];

    /// Lower-case function name as written in formulas.
    pub fn keyword(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "sum",
            AggregateFunction::Average => "average",
            AggregateFunction::Min => "min",
            AggregateFunction::Max => "max",
            AggregateFunction::Count => "count",
            AggregateFunction::CountA => "counta",
            AggregateFunction::DistinctCount => "distinctcount",
            AggregateFunction::CountRows => "countrows",
        }
    }

    /// Human-readable name used in synthesized labels.
    pub fn label(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "Sum",
            AggregateFunction::Average => "Average",
            AggregateFunction::Min => "Minimum",
            AggregateFunction::Max => "Maximum",
            AggregateFunction::Count | AggregateFunction::CountA => "Count",
            AggregateFunction::DistinctCount => "Distinct Count",
            AggregateFunction::CountRows => "Row Count",
        }
    }

    /// Parse a function name or `summarizeBy` value.
    pub fn parse(name: &str) -> Option<Self> {
        let lower = name.trim().to_ascii_lowercase();
        Self::ALL.into_iter().find(|f| f.keyword() == lower)
    }

    /// The metric aggregation this function becomes. Row counts are sums over
    /// a constant column.
    pub fn calculation_method(&self) -> CalculationMethod {
        match self {
            AggregateFunction::Sum | AggregateFunction::CountRows => CalculationMethod::Sum,
            AggregateFunction::Average => CalculationMethod::Average,
            AggregateFunction::Min => CalculationMethod::Minimum,
            AggregateFunction::Max => CalculationMethod::Maximum,
            AggregateFunction::Count | AggregateFunction::CountA => CalculationMethod::CountNonNull,
            AggregateFunction::DistinctCount => CalculationMethod::CountDistinct,
        }
    }
}

/// A recognized `FUNCTION(table[column])` or `COUNTROWS(table)` call.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AggregateCall {
    pub function: AggregateFunction,
    pub table: String,
    /// `None` for row counts.
    pub column: Option<String>,
}

/// Resolves the references found while translating a formula.
pub trait MeasureSource {
    /// Get or create the metric computing `call`; returns its identifier.
    fn aggregate(&mut self, call: &AggregateCall) -> Option<String>;

    /// Identifier of the measure referenced as `[name]`.
    fn measure(&mut self, name: &str) -> Option<String>;
}
