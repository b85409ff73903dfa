//! Dimensions: one per table on the `to` side of a relationship.
//!
//! Levels are keyed by their source column, so a column used by several
//! hierarchies yields one level attribute shared by all of them. Every column
//! a relationship joins on must be a level of every hierarchy; missing ones
//! are appended as hidden levels. Remaining columns become secondary
//! attributes of a single designated level.

use std::collections::HashSet;

use indexmap::IndexMap;

use crate::bim::{self, ColumnKind};
use crate::error::ConvertResult;
use crate::names::{key, NameRequest, ObjectKind};
use crate::sml::{
    Dimension, DimensionType, Hierarchy, Level, LevelAttribute, SecondaryAttribute,
};

use super::ConversionContext;

/// Allocate dimension identifiers before anything else claims the table names.
pub fn reserve_dimension_names(ctx: &mut ConversionContext<'_>) {
    let tables: Vec<String> = ctx.tables.dimension.iter().cloned().collect();
    for table in tables {
        ctx.dimension_name(&table);
    }
}

/// Build a dimension for every dimension table.
pub fn resolve_dimensions(ctx: &mut ConversionContext<'_>) -> ConvertResult<()> {
    let source = ctx.source;
    for table in &source.tables {
        if ctx.tables.is_dimension(&table.name) {
            resolve_dimension(ctx, table)?;
        }
    }
    Ok(())
}

fn resolve_dimension<'a>(ctx: &mut ConversionContext<'a>, table: &'a bim::Table) -> ConvertResult<()> {
    let unique_name = ctx.dimension_name(&table.name);
    let join_columns = join_columns(ctx, table);
    let mut levels = LevelAttributes {
        table,
        dataset: ctx.dataset_name(&table.name),
        by_column: IndexMap::new(),
    };

    let mut hierarchies = Vec::new();
    for hierarchy in &table.hierarchies {
        if let Some(resolved) = explicit_hierarchy(ctx, &mut levels, hierarchy, &join_columns) {
            hierarchies.push(resolved);
        }
    }
    if hierarchies.is_empty() {
        if let Some(resolved) = default_hierarchy(ctx, &mut levels, &join_columns) {
            hierarchies.push(resolved);
        }
    }

    attach_secondary_attributes(ctx, &levels, &mut hierarchies);

    let mut level_attributes: Vec<LevelAttribute> = levels.by_column.into_values().collect();
    let dimension_type = if table.is_time() {
        assign_time_units(ctx, &table.name, &mut level_attributes)
    } else {
        DimensionType::Standard
    };

    ctx.output.add_dimension(Dimension {
        unique_name,
        label: table.name.clone(),
        dimension_type,
        description: table.description.clone(),
        hierarchies,
        level_attributes,
        relationships: Vec::new(),
    })
}

/// Columns of `table` that active relationships join on, in source order.
fn join_columns<'a>(ctx: &mut ConversionContext<'a>, table: &'a bim::Table) -> Vec<&'a bim::Column> {
    let source = ctx.source;
    let mut columns: Vec<&'a bim::Column> = Vec::new();
    for relationship in source
        .relationships
        .iter()
        .filter(|r| r.is_active && r.to_table.eq_ignore_ascii_case(&table.name))
    {
        match table.column(&relationship.to_column) {
            Some(column) if !columns.iter().any(|c| c.name == column.name) => {
                columns.push(column)
            }
            Some(_) => {}
            None => ctx.diagnostics.warning(
                table.name.as_str(),
                format!(
                    "relationship joins on unknown column '{}'",
                    relationship.to_column
                ),
            ),
        }
    }
    columns
}

// ============================================================================
// Levels
// ============================================================================

/// Level attributes of one dimension, keyed by lower-cased source column.
struct LevelAttributes<'a> {
    table: &'a bim::Table,
    dataset: String,
    by_column: IndexMap<String, LevelAttribute>,
}

impl LevelAttributes<'_> {
    /// Identifier of the level attribute for `column`, creating it on first use.
    fn get_or_create(
        &mut self,
        ctx: &mut ConversionContext<'_>,
        column: &bim::Column,
        label: &str,
        hidden: bool,
    ) -> String {
        let lookup = column.name.to_lowercase();
        if let Some(existing) = self.by_column.get(&lookup) {
            return existing.unique_name.clone();
        }

        let verbose = key::level(&self.table.name, &column.name);
        let unique_name = ctx.unique_name(NameRequest::new(
            label,
            &verbose,
            ObjectKind::LevelAttribute,
            &self.table.name,
        ));

        let sort_column = match column.sort_by_column.as_deref() {
            Some(sort_by) => match self.table.column(sort_by) {
                Some(sort) => Some(sort.name.clone()),
                None => {
                    ctx.diagnostics.warning(
                        format!("{}[{}]", self.table.name, column.name),
                        format!("sort-by column '{}' does not exist", sort_by),
                    );
                    None
                }
            },
            None => None,
        };

        self.by_column.insert(
            lookup,
            LevelAttribute {
                unique_name: unique_name.clone(),
                label: label.to_string(),
                dataset: self.dataset.clone(),
                key_columns: vec![column.name.clone()],
                name_column: column.name.clone(),
                sort_column,
                time_unit: None,
                is_hidden: hidden || column.is_hidden,
            },
        );
        unique_name
    }

    fn contains(&self, column: &bim::Column) -> bool {
        self.by_column.contains_key(&column.name.to_lowercase())
    }
}

// ============================================================================
// Hierarchies
// ============================================================================

fn explicit_hierarchy(
    ctx: &mut ConversionContext<'_>,
    levels: &mut LevelAttributes<'_>,
    hierarchy: &bim::Hierarchy,
    join_columns: &[&bim::Column],
) -> Option<Hierarchy> {
    let table = levels.table;
    let mut ordered: Vec<&bim::Level> = hierarchy.levels.iter().collect();
    ordered.sort_by_key(|level| level.ordinal);

    let mut used = HashSet::new();
    let mut resolved = Vec::new();
    for level in ordered {
        let Some(column) = table.column(&level.column) else {
            ctx.diagnostics.warning(
                format!("{}/{}", table.name, hierarchy.name),
                format!("level '{}' uses unknown column '{}'", level.name, level.column),
            );
            continue;
        };
        if !used.insert(column.name.to_lowercase()) {
            continue;
        }
        resolved.push(Level {
            unique_name: levels.get_or_create(ctx, column, &level.name, false),
            is_hidden: false,
            secondary_attributes: Vec::new(),
        });
    }

    for column in join_columns {
        if used.insert(column.name.to_lowercase()) {
            ctx.diagnostics.info(
                format!("{}/{}", table.name, hierarchy.name),
                format!("appended hidden level '{}' so relationships can join", column.name),
            );
            resolved.push(Level {
                unique_name: levels.get_or_create(ctx, column, &column.name, true),
                is_hidden: true,
                secondary_attributes: Vec::new(),
            });
        }
    }

    if resolved.is_empty() {
        ctx.diagnostics.warning(
            format!("{}/{}", table.name, hierarchy.name),
            "hierarchy has no usable levels; skipped",
        );
        return None;
    }

    let verbose = key::hierarchy(&table.name, &hierarchy.name);
    Some(Hierarchy {
        unique_name: ctx.unique_name(NameRequest::new(
            &hierarchy.name,
            &verbose,
            ObjectKind::Hierarchy,
            &table.name,
        )),
        label: hierarchy.name.clone(),
        folder: hierarchy.display_folder.clone(),
        levels: resolved,
    })
}

/// A single hierarchy over the join columns, or over the key column when
/// nothing joins to the table.
fn default_hierarchy(
    ctx: &mut ConversionContext<'_>,
    levels: &mut LevelAttributes<'_>,
    join_columns: &[&bim::Column],
) -> Option<Hierarchy> {
    let table = levels.table;
    let columns: Vec<&bim::Column> = if join_columns.is_empty() {
        table
            .key_column()
            .or_else(|| {
                table
                    .columns
                    .iter()
                    .find(|c| !c.is_hidden && c.kind() != ColumnKind::RowNumber)
            })
            .into_iter()
            .collect()
    } else {
        join_columns.to_vec()
    };

    if columns.is_empty() {
        ctx.diagnostics.warning(
            table.name.as_str(),
            "dimension has no column to build a hierarchy from",
        );
        return None;
    }

    let resolved = columns
        .into_iter()
        .map(|column| Level {
            unique_name: levels.get_or_create(ctx, column, &column.name, false),
            is_hidden: false,
            secondary_attributes: Vec::new(),
        })
        .collect();

    let verbose = key::hierarchy(&table.name, &table.name);
    let candidate = format!("{}_hierarchy", table.name);
    Some(Hierarchy {
        unique_name: ctx.unique_name(NameRequest::new(
            &candidate,
            &verbose,
            ObjectKind::Hierarchy,
            &table.name,
        )),
        label: table.name.clone(),
        folder: None,
        levels: resolved,
    })
}

// ============================================================================
// Attributes
// ============================================================================

/// Hang every visible non-level column off one level of the first hierarchy:
/// the key column's level when it has one, the leaf level otherwise.
fn attach_secondary_attributes(
    ctx: &mut ConversionContext<'_>,
    levels: &LevelAttributes<'_>,
    hierarchies: &mut [Hierarchy],
) {
    let table = levels.table;
    let Some(first) = hierarchies.first_mut() else {
        return;
    };

    let key_level = table
        .key_column()
        .and_then(|column| levels.by_column.get(&column.name.to_lowercase()))
        .map(|attribute| attribute.unique_name.clone());
    let position = key_level
        .and_then(|id| first.levels.iter().position(|level| level.unique_name == id))
        .unwrap_or(first.levels.len().saturating_sub(1));
    let Some(designated) = first.levels.get_mut(position) else {
        return;
    };

    for column in &table.columns {
        if column.is_hidden || column.kind() == ColumnKind::RowNumber || levels.contains(column) {
            continue;
        }
        let verbose = key::secondary_attribute(&table.name, &column.name);
        let unique_name = ctx.unique_name(NameRequest::new(
            &column.name,
            &verbose,
            ObjectKind::SecondaryAttribute,
            &table.name,
        ));
        designated.secondary_attributes.push(SecondaryAttribute {
            unique_name,
            label: column.name.clone(),
            dataset: levels.dataset.clone(),
            key_columns: vec![column.name.clone()],
            name_column: column.name.clone(),
            folder: column.display_folder.clone(),
            is_hidden: false,
        });
    }
}

/// Infer a time unit for every level from its label. When any level has no
/// recognizable unit the dimension falls back to a standard one.
fn assign_time_units(
    ctx: &mut ConversionContext<'_>,
    table: &str,
    attributes: &mut [LevelAttribute],
) -> DimensionType {
    let settings = ctx.settings;
    let mut unknown = Vec::new();
    for attribute in attributes.iter_mut() {
        attribute.time_unit = settings.dimensions.infer_time_unit(&attribute.label);
        if attribute.time_unit.is_none() {
            unknown.push(attribute.label.clone());
        }
    }

    if unknown.is_empty() {
        return DimensionType::Time;
    }

    for attribute in attributes.iter_mut() {
        attribute.time_unit = None;
    }
    ctx.diagnostics.error(
        table,
        format!(
            "no time unit matches level(s) {}; emitted as a standard dimension",
            unknown.join(", ")
        ),
    );
    DimensionType::Standard
}
