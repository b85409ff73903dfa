//! Source model: the tabular (BIM) semantic-model tree.
//!
//! Types mirror the JSON layout of a `.bim` document so any serde format can
//! produce them. Reading and decoding the document itself happens outside
//! this crate.

mod expression;
mod table;

pub use expression::Expression;
pub use table::{
    Column, ColumnKind, Hierarchy, Level, Measure, Partition, PartitionSource, Table,
};

use serde::Deserialize;

/// Root of a BIM document.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Database {
    pub name: String,
    pub compatibility_level: Option<u32>,
    pub model: Model,
}

impl Database {
    pub fn new(name: impl Into<String>, model: Model) -> Self {
        Self {
            name: name.into(),
            compatibility_level: None,
            model,
        }
    }
}

/// The tabular model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Model {
    pub name: Option<String>,
    pub culture: Option<String>,
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
    pub perspectives: Vec<Perspective>,
    pub data_sources: Vec<DataSource>,
}

impl Model {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_table(mut self, table: Table) -> Self {
        self.tables.push(table);
        self
    }

    pub fn with_relationship(mut self, relationship: Relationship) -> Self {
        self.relationships.push(relationship);
        self
    }

    pub fn with_perspective(mut self, perspective: Perspective) -> Self {
        self.perspectives.push(perspective);
        self
    }

    /// Find a table by name (case-insensitive, as the tabular engine does).
    pub fn table(&self, name: &str) -> Option<&Table> {
        self.tables.iter().find(|t| t.name.eq_ignore_ascii_case(name))
    }
}

/// A relationship between two table columns. `from` is the many side.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relationship {
    #[serde(default)]
    pub name: Option<String>,
    pub from_table: String,
    pub from_column: String,
    pub to_table: String,
    pub to_column: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub cross_filtering_behavior: Option<String>,
}

fn default_active() -> bool {
    true
}

impl Relationship {
    pub fn new(
        from_table: impl Into<String>,
        from_column: impl Into<String>,
        to_table: impl Into<String>,
        to_column: impl Into<String>,
    ) -> Self {
        Self {
            name: None,
            from_table: from_table.into(),
            from_column: from_column.into(),
            to_table: to_table.into(),
            to_column: to_column.into(),
            is_active: true,
            cross_filtering_behavior: None,
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

/// A named subset of the model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Perspective {
    pub name: String,
    pub tables: Vec<PerspectiveTable>,
}

impl Perspective {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tables: Vec::new(),
        }
    }

    pub fn with_table(mut self, table: PerspectiveTable) -> Self {
        self.tables.push(table);
        self
    }
}

/// The part of one table a perspective exposes.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PerspectiveTable {
    pub name: String,
    pub columns: Vec<PerspectiveObject>,
    pub measures: Vec<PerspectiveObject>,
    pub hierarchies: Vec<PerspectiveObject>,
}

impl PerspectiveTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_column(mut self, name: impl Into<String>) -> Self {
        self.columns.push(PerspectiveObject { name: name.into() });
        self
    }

    pub fn with_measure(mut self, name: impl Into<String>) -> Self {
        self.measures.push(PerspectiveObject { name: name.into() });
        self
    }

    pub fn with_hierarchy(mut self, name: impl Into<String>) -> Self {
        self.hierarchies.push(PerspectiveObject { name: name.into() });
        self
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct PerspectiveObject {
    pub name: String,
}

/// A data source declared by the model.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataSource {
    pub name: String,
    pub connection_string: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<String>,
}
