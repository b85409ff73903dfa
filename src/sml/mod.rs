//! Target model: SML semantic-layer objects.
//!
//! Every object carries a `unique_name` allocated by
//! [`NameRegistry`](crate::names::NameRegistry) and a human-readable `label`.
//! Types derive `Serialize` with SML field names; writing files is left to
//! the caller.

mod dataset;
mod dimension;
mod metric;
mod relationship;

pub use dataset::{DataType, Dataset, DatasetColumn};
pub use dimension::{
    Dimension, DimensionType, Hierarchy, Level, LevelAttribute, SecondaryAttribute, TimeUnit,
};
pub use metric::{CalculationMethod, Metric, MetricCalc, UnrelatedDimensions};
pub use relationship::{
    EmbeddedRelationship, ModelRelationship, Relationship, RelationshipFrom, RelationshipTo,
};

use serde::Serialize;

/// Top-level repository object.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Catalog {
    pub unique_name: String,
    pub label: String,
    pub version: String,
}

/// The warehouse connection every dataset points at.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Connection {
    pub unique_name: String,
    pub label: String,
    /// Name of the connection as configured in the destination product.
    pub as_connection: String,
}

/// A queryable model tying metrics to dimensions.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Model {
    pub unique_name: String,
    pub label: String,
    pub relationships: Vec<ModelRelationship>,
    pub metrics: Vec<MetricRef>,
    pub dimensions: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub perspectives: Vec<Perspective>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MetricRef {
    pub unique_name: String,
}

/// A named subset of a model.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Perspective {
    pub unique_name: String,
    pub label: String,
    pub metrics: Vec<String>,
    pub dimensions: Vec<PerspectiveDimension>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PerspectiveDimension {
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub hierarchies: Vec<String>,
}
