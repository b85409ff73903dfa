//! Relationships between datasets and dimensions.
//!
//! Each active source relationship joins the dataset of its `from` table to
//! the level keyed by its `to` column. A fact `from` table yields a snowflake
//! relationship on the model; a dimension `from` table yields an embedded
//! relationship on its own dimension. A table that is both yields both.

use indexmap::{IndexMap, IndexSet};

use crate::bim;
use crate::error::ConvertResult;
use crate::names::{key, NameRequest, ObjectKind};
use crate::sml::{
    EmbeddedRelationship, ModelRelationship, Relationship, RelationshipFrom, RelationshipTo,
    UnrelatedDimensions,
};

use super::{ConversionContext, DimensionGraph};

/// Resolve every source relationship, then join each fact-and-dimension table
/// to itself.
pub fn resolve_relationships(ctx: &mut ConversionContext<'_>) -> ConvertResult<()> {
    let source = ctx.source;
    for relationship in &source.relationships {
        resolve_relationship(ctx, relationship)?;
    }

    let fact_dimensions: Vec<String> = ctx.tables.fact_dimensions().cloned().collect();
    for table in fact_dimensions {
        add_self_relationship(ctx, &table)?;
    }

    warn_ambiguous_paths(ctx)
}

fn resolve_relationship(
    ctx: &mut ConversionContext<'_>,
    relationship: &bim::Relationship,
) -> ConvertResult<()> {
    let object = format!(
        "{}[{}] -> {}[{}]",
        relationship.from_table,
        relationship.from_column,
        relationship.to_table,
        relationship.to_column
    );
    if !relationship.is_active {
        ctx.diagnostics.info(object, "inactive relationship skipped");
        return Ok(());
    }

    let (Some(from), Some(to)) = (
        ctx.table(&relationship.from_table),
        ctx.table(&relationship.to_table),
    ) else {
        ctx.diagnostics.warning(object, "relationship references an unknown table");
        return Ok(());
    };
    let (Some(from_column), Some(to_column)) = (
        from.column(&relationship.from_column),
        to.column(&relationship.to_column),
    ) else {
        ctx.diagnostics.warning(object, "relationship references an unknown column");
        return Ok(());
    };

    let Some(level) = ctx
        .names
        .lookup(&key::level(&to.name, &to_column.name))
        .map(str::to_string)
    else {
        ctx.diagnostics.warning(object, "join column is not a level of the target dimension");
        return Ok(());
    };
    let dimension = ctx.dimension_name(&to.name);
    let dataset = ctx.dataset_name(&from.name);
    if !ctx.output.dimensions.contains_key(&dimension) || !ctx.output.datasets.contains_key(&dataset)
    {
        ctx.diagnostics.warning(object, "relationship endpoints were not converted");
        return Ok(());
    }

    let join = RelationshipFrom {
        dataset,
        join_columns: vec![from_column.name.clone()],
    };
    let target = RelationshipTo { dimension, level };
    let candidate = format!("{}_{}", from.name, to.name);

    if ctx.tables.is_fact(&from.name) {
        let verbose = key::relationship(&from.name, &from_column.name, &to.name, &to_column.name);
        let unique_name = ctx.unique_name(NameRequest::new(
            &candidate,
            &verbose,
            ObjectKind::Relationship,
            &from.name,
        ));
        ctx.output.add_relationship(
            Relationship::Snowflake(ModelRelationship {
                unique_name,
                from: join.clone(),
                to: target.clone(),
            }),
            "",
        )?;
    }

    if ctx.tables.is_dimension(&from.name) {
        let verbose =
            key::embedded_relationship(&from.name, &from_column.name, &to.name, &to_column.name);
        let unique_name = ctx.unique_name(NameRequest::new(
            &candidate,
            &verbose,
            ObjectKind::Relationship,
            &from.name,
        ));
        let owner = ctx.dimension_name(&from.name);
        ctx.output.add_relationship(
            Relationship::Embedded(EmbeddedRelationship {
                unique_name,
                from: join,
                to: target,
            }),
            &owner,
        )?;
    }
    Ok(())
}

/// Join the dataset of `table` to its own dimension, on the key column's level
/// or else the leaf level of the first hierarchy. At most one per table.
fn add_self_relationship(ctx: &mut ConversionContext<'_>, table: &str) -> ConvertResult<()> {
    let verbose = key::self_relationship(table);
    if ctx.names.lookup(&verbose).is_some() {
        return Ok(());
    }
    let Some(source_table) = ctx.table(table) else {
        return Ok(());
    };
    let dimension = ctx.dimension_name(&source_table.name);
    let Some(resolved) = ctx.output.dimensions.get(&dimension) else {
        return Ok(());
    };

    let target = source_table
        .key_column()
        .and_then(|column| {
            let level = ctx.names.lookup(&key::level(&source_table.name, &column.name))?;
            Some((column.name.clone(), level.to_string()))
        })
        .or_else(|| {
            let leaf = resolved.hierarchies.first()?.leaf()?;
            let attribute = resolved.level_attribute(&leaf.unique_name)?;
            Some((attribute.key_columns.first()?.clone(), leaf.unique_name.clone()))
        });
    let Some((column, level)) = target else {
        ctx.diagnostics.warning(
            source_table.name.as_str(),
            "dimension has no level to join its own dataset to",
        );
        return Ok(());
    };

    let dataset = ctx.dataset_name(&source_table.name);
    let candidate = format!("{}_self", source_table.name);
    let unique_name = ctx.unique_name(NameRequest::new(
        &candidate,
        &verbose,
        ObjectKind::Relationship,
        &source_table.name,
    ));
    ctx.output.add_relationship(
        Relationship::Snowflake(ModelRelationship {
            unique_name,
            from: RelationshipFrom {
                dataset,
                join_columns: vec![column],
            },
            to: RelationshipTo { dimension, level },
        }),
        "",
    )?;
    ctx.diagnostics.info(
        source_table.name.as_str(),
        "joined dataset to its own dimension",
    );
    Ok(())
}

/// Make metrics on dimension-only tables usable across unrelated dimensions.
///
/// A metric whose table is only ever on the `to` side of relationships would
/// otherwise return nothing when sliced by a dimension it cannot reach. Such
/// metrics repeat their value instead, and their dataset gets joined to its
/// own dimension if nothing joins it yet.
pub fn backfill_relationships(ctx: &mut ConversionContext<'_>) -> ConvertResult<()> {
    for table in ctx.metric_tables() {
        if ctx.tables.left.contains(&table) || !ctx.tables.right.contains(&table) {
            continue;
        }

        let dataset = ctx.dataset_name(&table);
        let dimension = ctx.dimension_name(&table);
        if !ctx.output.joins(&dataset, &dimension) {
            add_self_relationship(ctx, &table)?;
        }

        let mut repeated = 0;
        for metric in ctx
            .output
            .metrics
            .values_mut()
            .filter(|metric| metric.dataset == dataset)
        {
            metric.unrelated_dimensions_handling = Some(UnrelatedDimensions::Repeat);
            repeated += 1;
        }
        ctx.diagnostics.info(
            table,
            format!("{} metric(s) repeat across unrelated dimensions", repeated),
        );
    }
    Ok(())
}

// ============================================================================
// Reachability
// ============================================================================

/// Dimensions each dataset joins directly, excluding its own dimension.
fn direct_dimensions(ctx: &ConversionContext<'_>) -> IndexMap<String, IndexSet<String>> {
    let mut direct: IndexMap<String, IndexSet<String>> = IndexMap::new();
    for relationship in ctx.output.relationships.values() {
        let owner = |name: &str| ctx.names.registration(name).map(|r| r.owner.to_lowercase());
        if owner(&relationship.from.dataset) == owner(&relationship.to.dimension) {
            continue;
        }
        direct
            .entry(relationship.from.dataset.clone())
            .or_default()
            .insert(relationship.to.dimension.clone());
    }
    direct
}

/// Warn when a dataset joins a dimension directly that it can also reach
/// through another dimension.
fn warn_ambiguous_paths(ctx: &mut ConversionContext<'_>) -> ConvertResult<()> {
    let graph = DimensionGraph::from_dimensions(ctx.output.dimensions.values());
    let max_depth = ctx.settings.relationships.max_depth;

    let mut warnings = Vec::new();
    for (dataset, dimensions) in direct_dimensions(ctx) {
        for dimension in &dimensions {
            let reachable = graph.reachable(dimension, max_depth)?;
            for other in dimensions
                .iter()
                .filter(|other| *other != dimension && reachable.contains(*other))
            {
                warnings.push((
                    dataset.clone(),
                    format!(
                        "dimension '{}' is joined directly and also reachable through '{}'",
                        other, dimension
                    ),
                ));
            }
        }
    }

    for (dataset, message) in warnings {
        ctx.diagnostics.warning(dataset, message);
    }
    Ok(())
}

/// Dimensions the model exposes: those joined by model relationships and
/// everything reachable from them through embedded relationships.
pub fn model_dimensions(ctx: &ConversionContext<'_>) -> ConvertResult<IndexSet<String>> {
    let graph = DimensionGraph::from_dimensions(ctx.output.dimensions.values());
    let max_depth = ctx.settings.relationships.max_depth;

    let mut dimensions = IndexSet::new();
    for relationship in ctx.output.relationships.values() {
        let dimension = &relationship.to.dimension;
        if dimensions.insert(dimension.clone()) {
            dimensions.extend(graph.reachable(dimension, max_depth)?);
        }
    }
    Ok(dimensions)
}
