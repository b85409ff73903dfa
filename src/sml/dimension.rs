use serde::Serialize;

use super::EmbeddedRelationship;

/// A dimension with its hierarchies and attributes.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dimension {
    pub unique_name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub dimension_type: DimensionType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub hierarchies: Vec<Hierarchy>,
    pub level_attributes: Vec<LevelAttribute>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub relationships: Vec<EmbeddedRelationship>,
}

impl Dimension {
    pub fn hierarchy(&self, unique_name: &str) -> Option<&Hierarchy> {
        self.hierarchies.iter().find(|h| h.unique_name == unique_name)
    }

    pub fn level_attribute(&self, unique_name: &str) -> Option<&LevelAttribute> {
        self.level_attributes
            .iter()
            .find(|a| a.unique_name == unique_name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DimensionType {
    Standard,
    Time,
}

/// An ordered drill path of levels.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Hierarchy {
    pub unique_name: String,
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub levels: Vec<Level>,
}

impl Hierarchy {
    /// The most granular level.
    pub fn leaf(&self) -> Option<&Level> {
        self.levels.last()
    }
}

/// A level of a hierarchy, pointing at a level attribute by unique name.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Level {
    pub unique_name: String,
    pub is_hidden: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub secondary_attributes: Vec<SecondaryAttribute>,
}

/// Key and name columns backing a level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelAttribute {
    pub unique_name: String,
    pub label: String,
    pub dataset: String,
    pub key_columns: Vec<String>,
    pub name_column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_column: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_unit: Option<TimeUnit>,
    pub is_hidden: bool,
}

/// A descriptive attribute hanging off a level.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SecondaryAttribute {
    pub unique_name: String,
    pub label: String,
    pub dataset: String,
    pub key_columns: Vec<String>,
    pub name_column: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub folder: Option<String>,
    pub is_hidden: bool,
}

/// Granularity of a time level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TimeUnit {
    Day,
    Week,
    Month,
    Quarter,
    Year,
}

impl TimeUnit {
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "day" => Some(TimeUnit::Day),
            "week" => Some(TimeUnit::Week),
            "month" => Some(TimeUnit::Month),
            "quarter" => Some(TimeUnit::Quarter),
            "year" => Some(TimeUnit::Year),
            _ => None,
        }
    }
}
