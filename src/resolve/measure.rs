//! Measures: simple metrics, calculated metrics and column-implied metrics.
//!
//! A measure whose whole formula is one aggregation becomes a [`Metric`]
//! named after the measure. Anything else is translated into a
//! [`MetricCalc`] whose expression references metrics, creating hidden helper
//! metrics for every aggregation it mentions. Helper metrics are memoized by
//! `(function, table, column)`, so two formulas summing the same column share
//! one metric.
//!
//! Translation falls back in tiers. The formula is translated as written, then
//! once more after normalization. If both stop early the measure becomes a
//! hidden placeholder calc that evaluates to `0` and carries the original
//! formula in a comment.

use std::collections::HashSet;

use crate::bim::{self, ColumnKind};
use crate::error::{ConvertError, ConvertResult};
use crate::expr::{self, scan, AggregateCall, AggregateFunction, MeasureSource, Translation};
use crate::names::{key, NameRequest, ObjectKind};
use crate::sml::{Metric, MetricCalc};

use super::ConversionContext;

// ============================================================================
// Simple measures
// ============================================================================

/// Turn every measure consisting of a single aggregation into a metric.
pub fn resolve_simple_measures(ctx: &mut ConversionContext<'_>) -> ConvertResult<()> {
    let source = ctx.source;
    for table in &source.tables {
        for measure in &table.measures {
            let Some(call) = expr::single_aggregate(measure.expression.as_str()) else {
                continue;
            };
            simple_measure(ctx, table, measure, &call)?;
        }
    }
    Ok(())
}

fn simple_measure(
    ctx: &mut ConversionContext<'_>,
    owner: &bim::Table,
    measure: &bim::Measure,
    call: &AggregateCall,
) -> ConvertResult<()> {
    let Some(target) = aggregate_target(ctx, call, &measure.name) else {
        return Ok(());
    };

    let verbose = key::measure(&owner.name, &measure.name);
    let unique_name = ctx.unique_name(NameRequest::new(
        &measure.name,
        &verbose,
        ObjectKind::Metric,
        &owner.name,
    ));
    let metric = Metric {
        unique_name: unique_name.clone(),
        label: measure.name.clone(),
        dataset: ctx.dataset_name(&target.table.name),
        column: target.column,
        calculation_method: call.function.calculation_method(),
        format: measure.format_string.clone(),
        folder: measure.display_folder.clone(),
        is_hidden: measure.is_hidden,
        description: measure.description.clone(),
        unrelated_dimensions_handling: None,
    };
    register_metric(ctx, metric, &target.table.name, target.key)?;
    ctx.measures.resolved.insert(verbose, unique_name);
    Ok(())
}

// ============================================================================
// Aggregations
// ============================================================================

/// The table and dataset column an aggregation reads.
struct AggregateTarget<'a> {
    table: &'a bim::Table,
    column: String,
    key: String,
}

fn aggregate_target<'a>(
    ctx: &mut ConversionContext<'a>,
    call: &AggregateCall,
    object: &str,
) -> Option<AggregateTarget<'a>> {
    let Some(table) = ctx.table(&call.table) else {
        ctx.diagnostics.warning(
            object,
            format!("formula references unknown table '{}'", call.table),
        );
        return None;
    };

    let (column, key_column) = match &call.column {
        Some(name) => {
            let Some(column) = table.column(name) else {
                ctx.diagnostics.warning(
                    object,
                    format!("formula references unknown column '{}'[{}]", table.name, name),
                );
                return None;
            };
            (column.name.clone(), column.name.clone())
        }
        None => (ctx.row_count_column(table), String::new()),
    };

    Some(AggregateTarget {
        table,
        column,
        key: key::aggregate(call.function.keyword(), &table.name, &key_column),
    })
}

/// Get or create the hidden helper metric computing `call`.
fn aggregate_metric(
    ctx: &mut ConversionContext<'_>,
    call: &AggregateCall,
    object: &str,
) -> ConvertResult<Option<String>> {
    let Some(target) = aggregate_target(ctx, call, object) else {
        return Ok(None);
    };
    if let Some(existing) = ctx.measures.aggregates.get(&target.key) {
        return Ok(Some(existing.clone()));
    }

    let keyword = call.function.keyword();
    let (candidate, label) = match call.column {
        Some(_) => (
            format!("{}_{}", target.column, keyword),
            format!("{} of {}", call.function.label(), target.column),
        ),
        None => (
            format!("{}_{}", target.table.name, keyword),
            format!("{} of {}", call.function.label(), target.table.name),
        ),
    };
    let suffix = format!("_{}", keyword);
    let unique_name = ctx.unique_name(
        NameRequest::new(&candidate, &target.key, ObjectKind::Metric, &target.table.name)
            .with_suffix(&suffix),
    );

    let metric = Metric {
        unique_name: unique_name.clone(),
        label,
        dataset: ctx.dataset_name(&target.table.name),
        column: target.column,
        calculation_method: call.function.calculation_method(),
        format: None,
        folder: None,
        is_hidden: true,
        description: None,
        unrelated_dimensions_handling: None,
    };
    register_metric(ctx, metric, &target.table.name, target.key)?;
    ctx.measures.helpers.push(unique_name.clone());
    Ok(Some(unique_name))
}

/// Report helper metrics no translated formula refers to.
///
/// A formula that stops partway keeps the helpers created for the part that
/// did translate, while the measure itself becomes a placeholder.
pub fn report_unreferenced_helpers(ctx: &mut ConversionContext<'_>) {
    let unreferenced: Vec<String> = ctx
        .measures
        .helpers
        .iter()
        .filter(|helper| {
            let reference = expr::measure_reference(helper);
            !ctx
                .output
                .metric_calcs
                .values()
                .any(|calc| calc.expression.contains(&reference))
        })
        .cloned()
        .collect();
    for helper in unreferenced {
        ctx.diagnostics.info(
            helper,
            "helper metric is not referenced by any translated formula",
        );
    }
}

fn register_metric(
    ctx: &mut ConversionContext<'_>,
    metric: Metric,
    table: &str,
    aggregate_key: String,
) -> ConvertResult<()> {
    let unique_name = metric.unique_name.clone();
    ctx.output.add_metric(metric)?;
    ctx.measures
        .metric_tables
        .insert(unique_name.clone(), table.to_string());
    ctx.measures
        .aggregates
        .entry(aggregate_key)
        .or_insert(unique_name);
    Ok(())
}

// ============================================================================
// Calculated measures
// ============================================================================

/// Translate every measure of `table` that is not already a metric.
pub fn resolve_calculated_measures<'a>(
    ctx: &mut ConversionContext<'a>,
    table: &'a bim::Table,
) -> ConvertResult<()> {
    for measure in &table.measures {
        calculated_measure(ctx, table, measure)?;
    }
    Ok(())
}

fn calculated_measure<'a>(
    ctx: &mut ConversionContext<'a>,
    owner: &'a bim::Table,
    measure: &'a bim::Measure,
) -> ConvertResult<Option<String>> {
    let verbose = key::measure(&owner.name, &measure.name);
    if let Some(existing) = ctx.measures.resolved.get(&verbose) {
        return Ok(Some(existing.clone()));
    }
    if !ctx.measures.in_progress.insert(verbose.clone()) {
        ctx.diagnostics.warning(
            measure.name.as_str(),
            "measure reaches itself through other measures",
        );
        return Ok(None);
    }

    let translated = translate_measure(ctx, measure);
    ctx.measures.in_progress.remove(&verbose);

    let original = measure.expression.as_str().trim();
    let calc = match translated? {
        Ok(expression) => MetricCalc {
            unique_name: String::new(),
            label: measure.name.clone(),
            expression,
            format: measure.format_string.clone(),
            folder: measure.display_folder.clone(),
            is_hidden: measure.is_hidden,
            description: measure.description.clone(),
        },
        Err(remainder) => {
            let shape = if expr::is_ratio(original) { "ratio" } else { "formula" };
            ctx.diagnostics.warning(
                measure.name.as_str(),
                format!(
                    "{} could not be translated past `{}`; emitted a disabled placeholder",
                    shape, remainder
                ),
            );
            MetricCalc {
                unique_name: String::new(),
                label: measure.name.clone(),
                expression: placeholder(original),
                format: measure.format_string.clone(),
                folder: measure.display_folder.clone(),
                is_hidden: true,
                description: Some(format!(
                    "Not translated, needs manual follow-up. Original formula: {}",
                    original
                )),
            }
        }
    };

    let unique_name = ctx.unique_name(NameRequest::new(
        &measure.name,
        &verbose,
        ObjectKind::MetricCalc,
        &owner.name,
    ));
    ctx.output.add_metric_calc(MetricCalc {
        unique_name: unique_name.clone(),
        ..calc
    })?;
    ctx.measures.resolved.insert(verbose, unique_name.clone());
    Ok(Some(unique_name))
}

/// Translate a formula as written, then normalized. The inner `Err` carries
/// the untranslated remainder of the first attempt.
fn translate_measure(
    ctx: &mut ConversionContext<'_>,
    measure: &bim::Measure,
) -> ConvertResult<Result<String, String>> {
    let original = measure.expression.as_str().trim();
    let mut resolver = Resolver {
        ctx: &mut *ctx,
        object: measure.name.clone(),
        error: None,
    };

    let first = expr::translate(original, &mut resolver);
    let mut normalized_used = false;
    let outcome = match first {
        Translation::Complete(expression) => Ok(expression),
        Translation::Incomplete { remainder, .. } => {
            let normalized = scan::normalize(original);
            match (normalized != original)
                .then(|| expr::translate(&normalized, &mut resolver))
            {
                Some(Translation::Complete(expression)) => {
                    normalized_used = true;
                    Ok(expression)
                }
                _ => Err(remainder),
            }
        }
    };

    if let Some(error) = resolver.error.take() {
        return Err(error);
    }
    if normalized_used {
        ctx.diagnostics.info(
            measure.name.as_str(),
            "formula translated after removing comments and redundant parentheses",
        );
    }
    Ok(outcome)
}

/// A calc that evaluates to zero and keeps the original formula readable.
fn placeholder(original: &str) -> String {
    format!("0 /* {} */", original.replace("*/", "* /"))
}

/// Adapter letting the formula parser create and look up metrics.
struct Resolver<'c, 'a> {
    ctx: &'c mut ConversionContext<'a>,
    object: String,
    error: Option<ConvertError>,
}

impl Resolver<'_, '_> {
    fn keep(&mut self, result: ConvertResult<Option<String>>) -> Option<String> {
        match result {
            Ok(identifier) => identifier,
            Err(error) => {
                self.error.get_or_insert(error);
                None
            }
        }
    }
}

impl MeasureSource for Resolver<'_, '_> {
    fn aggregate(&mut self, call: &AggregateCall) -> Option<String> {
        let result = aggregate_metric(self.ctx, call, &self.object);
        self.keep(result)
    }

    fn measure(&mut self, name: &str) -> Option<String> {
        let result = referenced_measure(self.ctx, name);
        self.keep(result)
    }
}

/// Resolve `[name]`, translating the referenced measure first if needed.
fn referenced_measure(ctx: &mut ConversionContext<'_>, name: &str) -> ConvertResult<Option<String>> {
    let source = ctx.source;
    let Some((owner, measure)) = source
        .tables
        .iter()
        .find_map(|table| table.measure(name).map(|measure| (table, measure)))
    else {
        return Ok(None);
    };
    calculated_measure(ctx, owner, measure)
}

// ============================================================================
// Column-implied metrics
// ============================================================================

/// Create visible metrics for fact columns carrying a summarization.
///
/// Columns used as join keys, levels or attributes are skipped, as are names
/// that look non-additive and aggregations some measure already produced.
pub fn resolve_column_measures(ctx: &mut ConversionContext<'_>) -> ConvertResult<()> {
    if !ctx.settings.measures.column_measures {
        return Ok(());
    }

    let source = ctx.source;
    for table in &source.tables {
        if !ctx.tables.is_fact(&table.name) {
            continue;
        }
        let consumed = consumed_columns(ctx, table);

        for column in &table.columns {
            if column.is_hidden
                || column.kind() == ColumnKind::RowNumber
                || consumed.contains(&column.name.to_lowercase())
            {
                continue;
            }
            let Some(function) = implied_function(ctx, table, column) else {
                continue;
            };
            if ctx.settings.measures.is_non_additive(&column.name) {
                ctx.diagnostics.info(
                    format!("{}[{}]", table.name, column.name),
                    "column looks non-additive; no metric created",
                );
                continue;
            }

            let verbose = key::aggregate(function.keyword(), &table.name, &column.name);
            if ctx.measures.aggregates.contains_key(&verbose) {
                continue;
            }
            let suffix = format!("_{}", function.keyword());
            let unique_name = ctx.unique_name(
                NameRequest::new(&column.name, &verbose, ObjectKind::Metric, &table.name)
                    .with_suffix(&suffix),
            );
            let metric = Metric {
                unique_name,
                label: column.name.clone(),
                dataset: ctx.dataset_name(&table.name),
                column: column.name.clone(),
                calculation_method: function.calculation_method(),
                format: column.format_string.clone(),
                folder: column.display_folder.clone(),
                is_hidden: false,
                description: column.description.clone(),
                unrelated_dimensions_handling: None,
            };
            register_metric(ctx, metric, &table.name, verbose)?;
        }
    }
    Ok(())
}

fn implied_function(
    ctx: &mut ConversionContext<'_>,
    table: &bim::Table,
    column: &bim::Column,
) -> Option<AggregateFunction> {
    let summarize_by = column.summarize_by.as_deref()?.trim();
    if summarize_by.eq_ignore_ascii_case("none") {
        return None;
    }
    if summarize_by.eq_ignore_ascii_case("default") {
        return column.is_numeric().then_some(AggregateFunction::Sum);
    }
    match AggregateFunction::parse(summarize_by) {
        Some(AggregateFunction::CountRows) | None => {
            ctx.diagnostics.warning(
                format!("{}[{}]", table.name, column.name),
                format!("unknown summarizeBy '{}'; using sum", summarize_by),
            );
            Some(AggregateFunction::Sum)
        }
        Some(function) => Some(function),
    }
}

/// Lower-cased names of columns already used by relationships or dimensions.
fn consumed_columns(ctx: &ConversionContext<'_>, table: &bim::Table) -> HashSet<String> {
    let mut consumed = HashSet::new();
    for relationship in &ctx.source.relationships {
        if relationship.from_table.eq_ignore_ascii_case(&table.name) {
            consumed.insert(relationship.from_column.to_lowercase());
        }
        if relationship.to_table.eq_ignore_ascii_case(&table.name) {
            consumed.insert(relationship.to_column.to_lowercase());
        }
    }
    for column in &table.columns {
        let is_level = ctx.names.lookup(&key::level(&table.name, &column.name)).is_some();
        let is_attribute = ctx
            .names
            .lookup(&key::secondary_attribute(&table.name, &column.name))
            .is_some();
        if is_level || is_attribute {
            consumed.insert(column.name.to_lowercase());
        }
    }
    consumed
}
