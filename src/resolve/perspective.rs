//! Perspectives: named subsets of metrics and dimensions.
//!
//! A perspective table contributes its listed measures as metrics. A
//! dimension table contributes its dimension, restricted to the listed
//! hierarchies when there are any. Dimensions embedded in an included
//! dimension come along in full, since they are only reachable through it.

use indexmap::IndexMap;

use crate::bim;
use crate::error::ConvertResult;
use crate::names::{key, NameRequest, ObjectKind};
use crate::sml::{Perspective, PerspectiveDimension};

use super::{ConversionContext, DimensionGraph};

pub fn resolve_perspectives(ctx: &mut ConversionContext<'_>) -> ConvertResult<()> {
    let source = ctx.source;
    for perspective in &source.perspectives {
        resolve_perspective(ctx, perspective)?;
    }
    Ok(())
}

fn resolve_perspective(
    ctx: &mut ConversionContext<'_>,
    perspective: &bim::Perspective,
) -> ConvertResult<()> {
    let mut metrics = Vec::new();
    let mut dimensions: IndexMap<String, Vec<String>> = IndexMap::new();

    for entry in &perspective.tables {
        let object = format!("{}/{}", perspective.name, entry.name);
        let Some(table) = ctx.table(&entry.name) else {
            ctx.diagnostics.warning(object, "perspective references an unknown table");
            continue;
        };

        for measure in &entry.measures {
            let identifier = ctx
                .measures
                .resolved
                .get(&key::measure(&table.name, &measure.name))
                .cloned();
            match identifier {
                Some(identifier) if !metrics.contains(&identifier) => metrics.push(identifier),
                Some(_) => {}
                None => ctx.diagnostics.warning(
                    object.as_str(),
                    format!("perspective measure '{}' was not converted", measure.name),
                ),
            }
        }

        let exposes_attributes = !entry.columns.is_empty() || !entry.hierarchies.is_empty();
        if !ctx.tables.is_dimension(&table.name) || !exposes_attributes {
            continue;
        }
        let dimension = ctx.dimension_name(&table.name);
        let hierarchies = dimensions.entry(dimension).or_default();
        for hierarchy in &entry.hierarchies {
            match ctx
                .names
                .lookup(&key::hierarchy(&table.name, &hierarchy.name))
            {
                Some(identifier) => {
                    if !hierarchies.iter().any(|h| h == identifier) {
                        hierarchies.push(identifier.to_string());
                    }
                }
                None => ctx.diagnostics.warning(
                    object.as_str(),
                    format!("perspective hierarchy '{}' was not converted", hierarchy.name),
                ),
            }
        }
    }

    let graph = DimensionGraph::from_dimensions(ctx.output.dimensions.values());
    let max_depth = ctx.settings.relationships.max_depth;
    let included: Vec<String> = dimensions.keys().cloned().collect();
    for dimension in included {
        for embedded in graph.reachable(&dimension, max_depth)? {
            dimensions.entry(embedded).or_default();
        }
    }

    let verbose = key::perspective(&perspective.name);
    let unique_name = ctx.unique_name(NameRequest::new(
        &perspective.name,
        &verbose,
        ObjectKind::Perspective,
        "",
    ));
    ctx.output.add_perspective(Perspective {
        unique_name,
        label: perspective.name.clone(),
        metrics,
        dimensions: dimensions
            .into_iter()
            .map(|(name, hierarchies)| PerspectiveDimension { name, hierarchies })
            .collect(),
    })
}
