use serde::Serialize;

/// A resolved join.
///
/// Where the relationship lives depends on its shape: snowflake joins belong
/// to the model, embedded joins to the dimension owning the `from` dataset.
#[derive(Debug, Clone, PartialEq)]
pub enum Relationship {
    /// Fact dataset → dimension level.
    Snowflake(ModelRelationship),
    /// Dimension dataset → level of another dimension.
    Embedded(EmbeddedRelationship),
}

impl Relationship {
    pub fn unique_name(&self) -> &str {
        match self {
            Relationship::Snowflake(r) => &r.unique_name,
            Relationship::Embedded(r) => &r.unique_name,
        }
    }
}

/// A model-level join from a dataset to a dimension level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelRelationship {
    pub unique_name: String,
    pub from: RelationshipFrom,
    pub to: RelationshipTo,
}

/// A join nesting another dimension inside the owning dimension.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmbeddedRelationship {
    pub unique_name: String,
    pub from: RelationshipFrom,
    pub to: RelationshipTo,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipFrom {
    pub dataset: String,
    pub join_columns: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RelationshipTo {
    pub dimension: String,
    pub level: String,
}
