//! Configuration module.
//!
//! Conversion tunables (identifier limits, heuristics tables, traversal
//! ceilings) and environment expansion for connection labels.

mod settings;

pub use settings::{
    expand_env_vars, CatalogSettings, DatasetSettings, DimensionSettings, MeasureSettings,
    NamingSettings, RelationshipSettings, Settings, SettingsError, TimeUnitRule,
};
