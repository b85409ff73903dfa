//! Datasets: one per fact or dimension table.
//!
//! The dataset source is derived from the table's partitions, in order of
//! preference: explicit query partitions, SQL embedded in M expressions, a
//! table reached by M navigation. Multiple partitions are stacked with
//! `UNION ALL`. A table with no usable partition gets a dataset flagged for
//! manual materialization.

use indexmap::IndexSet;
use sqlparser::dialect::{GenericDialect, MsSqlDialect};
use sqlparser::parser::Parser;

use crate::bim::{self, ColumnKind, PartitionSource};
use crate::error::ConvertResult;
use crate::expr::scan;
use crate::sml::{DataType, Dataset, DatasetColumn};

use super::mquery::{self, MSource};
use super::{measure, ConversionContext};

/// Build datasets for every used table, translating each table's calculated
/// measures right after its dataset exists.
pub fn resolve_datasets(ctx: &mut ConversionContext<'_>) -> ConvertResult<()> {
    let source = ctx.source;
    for table in &source.tables {
        if ctx.tables.is_unused(&table.name) {
            continue;
        }
        if !ctx.tables.measure_only.contains(&table.name) {
            ensure_dataset(ctx, table)?;
        }
        measure::resolve_calculated_measures(ctx, table)?;
    }

    // Formulas may aggregate columns of tables that were classified as unused.
    for name in ctx.metric_tables() {
        if let Some(table) = ctx.table(&name) {
            ensure_dataset(ctx, table)?;
        }
    }
    Ok(())
}

/// Create the dataset for `table` unless it already exists.
pub fn ensure_dataset(ctx: &mut ConversionContext<'_>, table: &bim::Table) -> ConvertResult<String> {
    let unique_name = ctx.dataset_name(&table.name);
    if ctx.output.datasets.contains_key(&unique_name) {
        return Ok(unique_name);
    }

    let mut columns = dataset_columns(ctx, table);
    columns.push(DatasetColumn {
        name: ctx.row_count_column(table),
        data_type: DataType::Long,
        sql: Some("1".to_string()),
    });

    let (physical_table, sql) = match source_query(ctx, table) {
        DatasetSource::Table(name) => (Some(name), None),
        DatasetSource::Sql(sql) => {
            validate_sql(ctx, &table.name, &sql);
            (None, Some(sql))
        }
        DatasetSource::Unresolved => {
            ctx.diagnostics.warning(
                table.name.as_str(),
                "no SQL source could be derived; the dataset must be materialized manually",
            );
            (None, None)
        }
    };
    let needs_materialization = physical_table.is_none() && sql.is_none();

    ctx.output.add_dataset(Dataset {
        unique_name: unique_name.clone(),
        label: table.name.clone(),
        connection_id: ctx.connection_id.clone(),
        table: physical_table,
        sql,
        columns,
        description: table.description.clone(),
        needs_materialization,
    })?;
    Ok(unique_name)
}

// ============================================================================
// Columns
// ============================================================================

fn dataset_columns(ctx: &mut ConversionContext<'_>, table: &bim::Table) -> Vec<DatasetColumn> {
    let mut columns = Vec::with_capacity(table.columns.len() + 1);

    for column in &table.columns {
        if column.kind() == ColumnKind::RowNumber {
            continue;
        }
        let object = format!("{}[{}]", table.name, column.name);
        let data_type = match column.data_type.as_deref().and_then(DataType::from_bim) {
            Some(data_type) => data_type,
            None => {
                ctx.diagnostics.warning(
                    object.as_str(),
                    format!(
                        "unsupported data type '{}'; using string",
                        column.data_type.as_deref().unwrap_or("")
                    ),
                );
                DataType::String
            }
        };

        let sql = match column.kind() {
            ColumnKind::Data | ColumnKind::CalculatedTableColumn | ColumnKind::RowNumber => {
                let physical = column.physical_name();
                (physical != column.name).then(|| quote_ident(physical))
            }
            ColumnKind::Calculated => {
                let expression = column.expression.as_ref().map(|e| e.as_str()).unwrap_or("");
                match self_reference(table, expression) {
                    Some(physical) => Some(quote_ident(physical)),
                    None => {
                        ctx.diagnostics.warning(
                            object.as_str(),
                            "calculated column could not be translated; emitted NULL",
                        );
                        Some(format!("NULL /* {} */", expression.trim().replace("*/", "* /")))
                    }
                }
            }
        };

        columns.push(DatasetColumn {
            name: column.name.clone(),
            data_type,
            sql,
        });
    }
    columns
}

/// Physical name of the sibling column a calculated column merely copies.
fn self_reference<'t>(table: &'t bim::Table, expression: &str) -> Option<&'t str> {
    let expression = scan::normalize(expression);
    let name = match scan::bracket_name(&expression) {
        Some((consumed, name)) if consumed == expression.len() => name,
        _ => {
            let (owner, name) = scan::column_ref(&expression)?;
            if !owner.eq_ignore_ascii_case(&table.name) {
                return None;
            }
            name
        }
    };
    let column = table.column(&name)?;
    (column.kind() != ColumnKind::Calculated).then(|| column.physical_name())
}

/// Quote an SQL identifier with ANSI double quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

// ============================================================================
// Source query
// ============================================================================

enum DatasetSource {
    Table(String),
    Sql(String),
    Unresolved,
}

/// What one partition contributes.
enum PartitionQuery {
    Table { schema: Option<String>, item: String },
    Sql(String),
}

impl PartitionQuery {
    fn table_name(&self) -> Option<String> {
        match self {
            PartitionQuery::Table {
                schema: Some(schema),
                item,
            } => Some(format!("{}.{}", schema, item)),
            PartitionQuery::Table { schema: None, item } => Some(item.clone()),
            PartitionQuery::Sql(_) => None,
        }
    }

    fn sql(&self) -> String {
        match self {
            PartitionQuery::Table {
                schema: Some(schema),
                item,
            } => format!("SELECT * FROM {}.{}", quote_ident(schema), quote_ident(item)),
            PartitionQuery::Table { schema: None, item } => {
                format!("SELECT * FROM {}", quote_ident(item))
            }
            PartitionQuery::Sql(sql) => sql.clone(),
        }
    }
}

fn source_query(ctx: &mut ConversionContext<'_>, table: &bim::Table) -> DatasetSource {
    let parts: Vec<PartitionQuery> = table
        .partitions
        .iter()
        .filter_map(|partition| partition_query(ctx, table, partition))
        .collect();

    match parts.as_slice() {
        [] => DatasetSource::Unresolved,
        [single] => match single.table_name() {
            Some(name) => DatasetSource::Table(name),
            None => DatasetSource::Sql(single.sql()),
        },
        many => DatasetSource::Sql(
            many.iter()
                .map(PartitionQuery::sql)
                .collect::<Vec<_>>()
                .join("\nUNION ALL\n"),
        ),
    }
}

fn partition_query(
    ctx: &mut ConversionContext<'_>,
    table: &bim::Table,
    partition: &bim::Partition,
) -> Option<PartitionQuery> {
    let object = if partition.name.is_empty() {
        table.name.clone()
    } else {
        format!("{}/{}", table.name, partition.name)
    };

    match &partition.source {
        PartitionSource::Query { query, .. } => {
            (!query.is_blank()).then(|| PartitionQuery::Sql(query.as_str().trim().to_string()))
        }
        PartitionSource::M { expression } => {
            let text = expression.as_str();
            let base = match mquery::extract(text) {
                Some(MSource::Sql(sql)) => PartitionQuery::Sql(sql.trim().to_string()),
                Some(MSource::Table { schema, item }) => PartitionQuery::Table { schema, item },
                None => {
                    ctx.diagnostics.warning(
                        object,
                        "M expression has no recognizable SQL or table source",
                    );
                    return None;
                }
            };
            match mquery::renames(text) {
                Ok(None) => Some(base),
                Ok(Some(pairs)) => Some(PartitionQuery::Sql(rename_wrapper(
                    table,
                    &base.sql(),
                    &pairs,
                ))),
                Err(()) => {
                    ctx.diagnostics.warning(
                        object,
                        "column renames could not be read; source columns may not match",
                    );
                    Some(base)
                }
            }
        }
        PartitionSource::Calculated { .. } => {
            ctx.diagnostics.warning(object, "calculated table partitions have no SQL source");
            None
        }
        PartitionSource::Other => {
            ctx.diagnostics.warning(object, "unsupported partition source type");
            None
        }
    }
}

/// Wrap `inner` in a select applying M column renames.
fn rename_wrapper(table: &bim::Table, inner: &str, pairs: &[(String, String)]) -> String {
    let physical: IndexSet<&str> = table
        .columns
        .iter()
        .filter(|c| c.kind() == ColumnKind::Data)
        .map(|c| c.physical_name())
        .collect();

    let projections: Vec<String> = if physical.is_empty() {
        std::iter::once("*".to_string())
            .chain(
                pairs
                    .iter()
                    .map(|(old, new)| format!("{} AS {}", quote_ident(old), quote_ident(new))),
            )
            .collect()
    } else {
        physical
            .iter()
            .map(|name| match pairs.iter().find(|(_, new)| new.as_str() == *name) {
                Some((old, _)) => format!("{} AS {}", quote_ident(old), quote_ident(name)),
                None => quote_ident(name),
            })
            .collect()
    };

    format!(
        "SELECT {} FROM ({}) AS {}",
        projections.join(", "),
        inner,
        quote_ident("renamed")
    )
}

/// Warn when SQL parses under neither the generic nor the SQL Server dialect.
fn validate_sql(ctx: &mut ConversionContext<'_>, table: &str, sql: &str) {
    if !ctx.settings.datasets.validate_sql {
        return;
    }
    let Err(error) = Parser::parse_sql(&GenericDialect {}, sql) else {
        return;
    };
    if Parser::parse_sql(&MsSqlDialect {}, sql).is_ok() {
        return;
    }
    ctx.diagnostics.warning(
        table,
        format!("dataset SQL could not be parsed; verify it manually: {}", error),
    );
}
