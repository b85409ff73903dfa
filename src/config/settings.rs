//! TOML-based configuration for conversions.
//!
//! Every setting has a default, so an empty file (or no file) is valid.
//!
//! Example configuration:
//! ```toml
//! [naming]
//! max_length = 63
//! max_suffix = 999
//!
//! [datasets]
//! row_count_column = "row_count_one"
//!
//! [measures]
//! non_additive_suffixes = ["key", "id", "rate"]
//! non_additive_patterns = ["%"]
//!
//! [[dimensions.time_units]]
//! keyword = "fiscal period"
//! unit = "month"
//!
//! [relationships]
//! max_depth = 64
//! ```

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::sml::TimeUnit;

/// Error type for settings.
#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Config file not found: {0}")]
    FileNotFound(PathBuf),

    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Settings {
    pub naming: NamingSettings,
    pub datasets: DatasetSettings,
    pub measures: MeasureSettings,
    pub dimensions: DimensionSettings,
    pub relationships: RelationshipSettings,
    pub catalog: CatalogSettings,
}

/// Identifier allocation limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NamingSettings {
    /// Maximum identifier length in characters.
    pub max_length: usize,
    /// Highest numeric suffix tried before giving up.
    pub max_suffix: u32,
}

impl Default for NamingSettings {
    fn default() -> Self {
        Self {
            max_length: 63,
            max_suffix: 999,
        }
    }
}

/// Dataset generation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DatasetSettings {
    /// Base name of the constant `1` column added to every dataset.
    pub row_count_column: String,
    /// Check extracted SQL with a SQL parser and warn when it does not parse.
    pub validate_sql: bool,
}

impl Default for DatasetSettings {
    fn default() -> Self {
        Self {
            row_count_column: "row_count_one".to_string(),
            validate_sql: true,
        }
    }
}

/// Measure generation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct MeasureSettings {
    /// Column-name suffixes that mark non-additive columns (case-insensitive).
    pub non_additive_suffixes: Vec<String>,
    /// Substrings that mark non-additive columns (case-insensitive).
    pub non_additive_patterns: Vec<String>,
    /// Synthesize metrics for summarizable columns.
    pub column_measures: bool,
}

impl Default for MeasureSettings {
    fn default() -> Self {
        Self {
            non_additive_suffixes: [
                "key", "id", "code", "year", "month", "quarter", "week", "day", "date", "number",
                "num", "no", "pct", "percent", "rate", "ratio", "price",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            non_additive_patterns: vec!["%".to_string()],
            column_measures: true,
        }
    }
}

impl MeasureSettings {
    /// Whether a column name looks non-additive.
    pub fn is_non_additive(&self, column: &str) -> bool {
        let lower = column.trim().to_lowercase();
        self.non_additive_suffixes
            .iter()
            .any(|suffix| lower.ends_with(&suffix.to_lowercase()))
            || self
                .non_additive_patterns
                .iter()
                .any(|pattern| lower.contains(&pattern.to_lowercase()))
    }
}

/// Dimension generation.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct DimensionSettings {
    /// Keyword → time unit rules, checked in order against level names.
    pub time_units: Vec<TimeUnitRule>,
}

impl Default for DimensionSettings {
    fn default() -> Self {
        let rule = |keyword: &str, unit: &str| TimeUnitRule {
            keyword: keyword.to_string(),
            unit: unit.to_string(),
        };
        Self {
            time_units: vec![
                rule("day", "day"),
                rule("date", "day"),
                rule("week", "week"),
                rule("month", "month"),
                rule("quarter", "quarter"),
                rule("year", "year"),
            ],
        }
    }
}

impl DimensionSettings {
    /// Infer a time unit from a level name: the first rule whose keyword the
    /// name contains wins.
    pub fn infer_time_unit(&self, level_name: &str) -> Option<TimeUnit> {
        let lower = level_name.to_lowercase();
        self.time_units
            .iter()
            .find(|rule| lower.contains(&rule.keyword.to_lowercase()))
            .and_then(|rule| TimeUnit::parse(&rule.unit))
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TimeUnitRule {
    pub keyword: String,
    pub unit: String,
}

/// Relationship resolution.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RelationshipSettings {
    /// Depth ceiling for embedded-dimension traversal.
    pub max_depth: usize,
}

impl Default for RelationshipSettings {
    fn default() -> Self {
        Self { max_depth: 64 }
    }
}

/// Catalog metadata.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CatalogSettings {
    pub version: String,
}

impl Default for CatalogSettings {
    fn default() -> Self {
        Self {
            version: "1.0".to_string(),
        }
    }
}

impl Settings {
    /// Load settings from a TOML file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SettingsError::FileNotFound(path.to_path_buf()));
        }

        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Parse and validate settings from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self, SettingsError> {
        let settings: Settings = toml::from_str(content)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Load settings from the default config file locations.
    ///
    /// Searches in order:
    /// 1. Environment variable `BIM2SML_CONFIG`
    /// 2. `./bim2sml.toml`
    /// 3. `~/.config/bim2sml/config.toml`
    pub fn load() -> Result<Self, SettingsError> {
        if let Ok(path) = env::var("BIM2SML_CONFIG") {
            return Self::from_file(&path);
        }

        let local_config = PathBuf::from("bim2sml.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = dirs::config_dir() {
            let user_config = config_dir.join("bim2sml").join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        Ok(Settings::default())
    }

    /// Reject settings the resolvers cannot work with.
    pub fn validate(&self) -> Result<(), SettingsError> {
        if self.naming.max_length < 8 {
            return Err(SettingsError::InvalidConfig(format!(
                "naming.max_length must be at least 8, got {}",
                self.naming.max_length
            )));
        }
        if self.relationships.max_depth == 0 {
            return Err(SettingsError::InvalidConfig(
                "relationships.max_depth must be positive".to_string(),
            ));
        }
        if self.datasets.row_count_column.trim().is_empty() {
            return Err(SettingsError::InvalidConfig(
                "datasets.row_count_column must not be empty".to_string(),
            ));
        }
        for rule in &self.dimensions.time_units {
            if TimeUnit::parse(&rule.unit).is_none() {
                return Err(SettingsError::InvalidConfig(format!(
                    "unknown time unit '{}' for keyword '{}'",
                    rule.unit, rule.keyword
                )));
            }
        }
        Ok(())
    }
}

/// Expand environment variables in a string.
///
/// Supports `${VAR}` and `$VAR` syntax.
pub fn expand_env_vars(s: &str) -> Result<String, SettingsError> {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c != '$' {
            result.push(c);
            continue;
        }

        let var_name: String = if chars.peek() == Some(&'{') {
            chars.next();
            chars.by_ref().take_while(|&ch| ch != '}').collect()
        } else {
            let mut name = String::new();
            while let Some(&ch) = chars.peek() {
                if !(ch.is_alphanumeric() || ch == '_') {
                    break;
                }
                name.push(ch);
                chars.next();
            }
            if name.is_empty() {
                // A lone `$` is kept.
                result.push('$');
                continue;
            }
            name
        };

        let value = env::var(&var_name).map_err(|_| SettingsError::MissingEnvVar(var_name))?;
        result.push_str(&value);
    }

    Ok(result)
}
