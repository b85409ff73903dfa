//! Tables and everything nested inside them.

use serde::Deserialize;

use super::Expression;

/// A source table.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Table {
    pub name: String,
    pub description: Option<String>,
    /// `Time` marks a date table.
    pub data_category: Option<String>,
    pub is_hidden: bool,
    pub columns: Vec<Column>,
    pub measures: Vec<Measure>,
    pub partitions: Vec<Partition>,
    pub hierarchies: Vec<Hierarchy>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_column(mut self, column: Column) -> Self {
        self.columns.push(column);
        self
    }

    pub fn with_measure(mut self, measure: Measure) -> Self {
        self.measures.push(measure);
        self
    }

    pub fn with_partition(mut self, partition: Partition) -> Self {
        self.partitions.push(partition);
        self
    }

    pub fn with_hierarchy(mut self, hierarchy: Hierarchy) -> Self {
        self.hierarchies.push(hierarchy);
        self
    }

    pub fn with_data_category(mut self, category: impl Into<String>) -> Self {
        self.data_category = Some(category.into());
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name.eq_ignore_ascii_case(name))
    }

    pub fn measure(&self, name: &str) -> Option<&Measure> {
        self.measures.iter().find(|m| m.name.eq_ignore_ascii_case(name))
    }

    pub fn is_time(&self) -> bool {
        self.data_category
            .as_deref()
            .is_some_and(|c| c.eq_ignore_ascii_case("time"))
    }

    /// The column flagged `isKey`, if any.
    pub fn key_column(&self) -> Option<&Column> {
        self.columns.iter().find(|c| c.is_key)
    }
}

/// How a column gets its values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    Data,
    Calculated,
    CalculatedTableColumn,
    RowNumber,
}

/// A source column.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Column {
    pub name: String,
    pub data_type: Option<String>,
    /// Raw `type` property: `data`, `calculated`, `calculatedTableColumn`, `rowNumber`.
    #[serde(rename = "type")]
    pub column_type: Option<String>,
    pub source_column: Option<String>,
    pub expression: Option<Expression>,
    pub summarize_by: Option<String>,
    pub is_hidden: bool,
    pub is_key: bool,
    pub sort_by_column: Option<String>,
    pub display_folder: Option<String>,
    pub format_string: Option<String>,
    pub description: Option<String>,
}

impl Column {
    pub fn data(name: impl Into<String>, data_type: impl Into<String>) -> Self {
        let name = name.into();
        Self {
            source_column: Some(name.clone()),
            name,
            data_type: Some(data_type.into()),
            ..Default::default()
        }
    }

    pub fn calculated(
        name: impl Into<String>,
        data_type: impl Into<String>,
        expression: impl Into<Expression>,
    ) -> Self {
        Self {
            name: name.into(),
            data_type: Some(data_type.into()),
            column_type: Some("calculated".to_string()),
            expression: Some(expression.into()),
            ..Default::default()
        }
    }

    pub fn with_summarize_by(mut self, summarize_by: impl Into<String>) -> Self {
        self.summarize_by = Some(summarize_by.into());
        self
    }

    pub fn with_source_column(mut self, source: impl Into<String>) -> Self {
        self.source_column = Some(source.into());
        self
    }

    pub fn with_sort_by(mut self, column: impl Into<String>) -> Self {
        self.sort_by_column = Some(column.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }

    pub fn key(mut self) -> Self {
        self.is_key = true;
        self
    }

    pub fn kind(&self) -> ColumnKind {
        match self.column_type.as_deref() {
            Some(t) if t.eq_ignore_ascii_case("calculated") => ColumnKind::Calculated,
            Some(t) if t.eq_ignore_ascii_case("calculatedTableColumn") => {
                ColumnKind::CalculatedTableColumn
            }
            Some(t) if t.eq_ignore_ascii_case("rowNumber") => ColumnKind::RowNumber,
            _ => ColumnKind::Data,
        }
    }

    /// Physical column name in the source query.
    pub fn physical_name(&self) -> &str {
        self.source_column.as_deref().unwrap_or(&self.name)
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self.data_type.as_deref().map(str::to_ascii_lowercase).as_deref(),
            Some("int64" | "double" | "decimal")
        )
    }
}

/// A DAX measure.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Measure {
    pub name: String,
    pub expression: Expression,
    pub format_string: Option<String>,
    pub display_folder: Option<String>,
    pub is_hidden: bool,
    pub description: Option<String>,
}

impl Measure {
    pub fn new(name: impl Into<String>, expression: impl Into<Expression>) -> Self {
        Self {
            name: name.into(),
            expression: expression.into(),
            ..Default::default()
        }
    }

    pub fn with_format(mut self, format: impl Into<String>) -> Self {
        self.format_string = Some(format.into());
        self
    }

    pub fn with_folder(mut self, folder: impl Into<String>) -> Self {
        self.display_folder = Some(folder.into());
        self
    }

    pub fn hidden(mut self) -> Self {
        self.is_hidden = true;
        self
    }
}

/// A table partition.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Partition {
    #[serde(default)]
    pub name: String,
    pub source: PartitionSource,
}

impl Partition {
    pub fn query(name: impl Into<String>, query: impl Into<Expression>) -> Self {
        Self {
            name: name.into(),
            source: PartitionSource::Query {
                query: query.into(),
                data_source: None,
            },
        }
    }

    pub fn m(name: impl Into<String>, expression: impl Into<Expression>) -> Self {
        Self {
            name: name.into(),
            source: PartitionSource::M {
                expression: expression.into(),
            },
        }
    }
}

/// Where a partition's rows come from.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum PartitionSource {
    /// Native query text against a data source.
    #[serde(rename_all = "camelCase")]
    Query {
        query: Expression,
        #[serde(default)]
        data_source: Option<String>,
    },
    /// Power Query (M) expression.
    M { expression: Expression },
    /// DAX calculated table.
    Calculated { expression: Expression },
    #[serde(other)]
    Other,
}

/// A user hierarchy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Hierarchy {
    pub name: String,
    pub display_folder: Option<String>,
    pub is_hidden: bool,
    pub levels: Vec<Level>,
}

impl Hierarchy {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }

    pub fn with_level(mut self, name: impl Into<String>, column: impl Into<String>) -> Self {
        let ordinal = self.levels.len() as u32;
        self.levels.push(Level {
            name: name.into(),
            ordinal,
            column: column.into(),
        });
        self
    }
}

/// One level of a user hierarchy.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Level {
    pub name: String,
    pub ordinal: u32,
    pub column: String,
}
