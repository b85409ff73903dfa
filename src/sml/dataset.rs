use serde::Serialize;

/// A dataset: one physical table or SQL query on a connection.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub unique_name: String,
    pub label: String,
    pub connection_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub table: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    pub columns: Vec<DatasetColumn>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// No SQL could be derived; the table must be materialized by hand.
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub needs_materialization: bool,
}

impl Dataset {
    pub fn column(&self, name: &str) -> Option<&DatasetColumn> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// A dataset column.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatasetColumn {
    pub name: String,
    pub data_type: DataType,
    /// Expression replacing the physical column of the same name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
}

/// Column data types understood by SML.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    String,
    Long,
    Double,
    Decimal,
    Boolean,
    DateTime,
}

impl DataType {
    /// Map a BIM `dataType`. Returns `None` for types without an SML counterpart.
    pub fn from_bim(data_type: &str) -> Option<Self> {
        match data_type.to_ascii_lowercase().as_str() {
            "string" => Some(DataType::String),
            "int64" => Some(DataType::Long),
            "double" => Some(DataType::Double),
            "decimal" => Some(DataType::Decimal),
            "boolean" => Some(DataType::Boolean),
            "datetime" => Some(DataType::DateTime),
            _ => None,
        }
    }
}
