//! End-to-end conversion from a BIM model to SML objects.
//!
//! ```text
//! classify → simple measures → datasets + calculated measures → reclassify
//!          → dimensions → relationships → column metrics → back-fill
//!          → perspectives → catalog + model
//! ```
//!
//! # Example
//!
//! ```
//! use bim2sml::bim::{Column, Database, Measure, Model, Partition, Relationship, Table};
//! use bim2sml::convert::convert;
//!
//! let model = Model::new()
//!     .with_table(
//!         Table::new("Sales")
//!             .with_column(Column::data("CustomerKey", "int64"))
//!             .with_column(Column::data("Amount", "double"))
//!             .with_measure(Measure::new("Total", "SUM(Sales[Amount])"))
//!             .with_partition(Partition::query("p", "SELECT * FROM sales")),
//!     )
//!     .with_table(
//!         Table::new("Customer")
//!             .with_column(Column::data("CustomerKey", "int64"))
//!             .with_partition(Partition::query("p", "SELECT * FROM customer")),
//!     )
//!     .with_relationship(Relationship::new("Sales", "CustomerKey", "Customer", "CustomerKey"));
//!
//! let result = convert(&Database::new("Retail", model), "warehouse").unwrap();
//! assert_eq!(result.metrics.len(), 1);
//! assert_eq!(result.dimensions.len(), 1);
//! assert_eq!(result.models[0].relationships.len(), 1);
//! ```

use crate::bim;
use crate::classify::classify;
use crate::config::Settings;
use crate::diagnostics::{Diagnostic, Severity};
use crate::error::ConvertResult;
use crate::names::{key, NameRequest, ObjectKind};
use crate::resolve::{dataset, dimension, measure, perspective, relationship, ConversionContext};
use crate::sml;

// ============================================================================
// Result Types
// ============================================================================

/// Everything produced by one conversion.
#[derive(Debug, Clone)]
pub struct Conversion {
    pub catalog: sml::Catalog,
    pub models: Vec<sml::Model>,
    pub datasets: Vec<sml::Dataset>,
    pub metrics: Vec<sml::Metric>,
    pub metric_calcs: Vec<sml::MetricCalc>,
    pub dimensions: Vec<sml::Dimension>,
    pub connections: Vec<sml::Connection>,
    /// Everything that was skipped, renamed or approximated, in order.
    pub diagnostics: Vec<Diagnostic>,
}

impl Conversion {
    pub fn dataset(&self, unique_name: &str) -> Option<&sml::Dataset> {
        self.datasets.iter().find(|d| d.unique_name == unique_name)
    }

    /// The dataset built from a source table.
    pub fn dataset_for_table(&self, table: &str) -> Option<&sml::Dataset> {
        self.datasets.iter().find(|d| d.label == table)
    }

    pub fn metric(&self, unique_name: &str) -> Option<&sml::Metric> {
        self.metrics.iter().find(|m| m.unique_name == unique_name)
    }

    pub fn metric_calc(&self, unique_name: &str) -> Option<&sml::MetricCalc> {
        self.metric_calcs.iter().find(|m| m.unique_name == unique_name)
    }

    pub fn dimension(&self, unique_name: &str) -> Option<&sml::Dimension> {
        self.dimensions.iter().find(|d| d.unique_name == unique_name)
    }

    /// The dimension built from a source table.
    pub fn dimension_for_table(&self, table: &str) -> Option<&sml::Dimension> {
        self.dimensions.iter().find(|d| d.label == table)
    }

    /// Whether any diagnostic has error severity.
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }
}

// ============================================================================
// Conversion
// ============================================================================

/// Convert `database` with default settings. Every dataset uses the
/// connection labelled `connection`.
pub fn convert(database: &bim::Database, connection: &str) -> ConvertResult<Conversion> {
    convert_with_settings(database, connection, &Settings::default())
}

/// Convert `database` with explicit settings.
///
/// `connection` is used verbatim. Callers that keep `${VAR}` references in
/// their connection labels expand them first with
/// [`expand_env_vars`](crate::config::expand_env_vars).
pub fn convert_with_settings(
    database: &bim::Database,
    connection: &str,
    settings: &Settings,
) -> ConvertResult<Conversion> {
    settings.validate()?;

    let _span = tracing::info_span!("convert", database = %database.name).entered();
    let mut ctx = ConversionContext::new(&database.model, settings);

    let catalog = resolve_catalog(&mut ctx, database);
    resolve_connection(&mut ctx, connection)?;

    ctx.tables = classify(&database.model, &Default::default());
    for table in &ctx.tables.unused {
        ctx.diagnostics
            .push(Diagnostic::info(Some(table.clone()), "table is unused and was skipped"));
    }
    dimension::reserve_dimension_names(&mut ctx);

    measure::resolve_simple_measures(&mut ctx)?;
    dataset::resolve_datasets(&mut ctx)?;
    measure::report_unreferenced_helpers(&mut ctx);

    ctx.tables = classify(&database.model, &ctx.metric_tables());
    tracing::debug!(
        facts = ctx.tables.fact.len(),
        dimensions = ctx.tables.dimension.len(),
        "classified tables"
    );

    dimension::resolve_dimensions(&mut ctx)?;
    relationship::resolve_relationships(&mut ctx)?;
    measure::resolve_column_measures(&mut ctx)?;
    relationship::backfill_relationships(&mut ctx)?;
    perspective::resolve_perspectives(&mut ctx)?;

    let model = assemble_model(&mut ctx, database)?;
    tracing::info!(
        datasets = ctx.output.datasets.len(),
        metrics = ctx.output.metrics.len(),
        metric_calcs = ctx.output.metric_calcs.len(),
        dimensions = ctx.output.dimensions.len(),
        diagnostics = ctx.diagnostics.len(),
        "conversion finished"
    );

    let output = ctx.output;
    Ok(Conversion {
        catalog,
        models: vec![model],
        datasets: output.datasets.into_values().collect(),
        metrics: output.metrics.into_values().collect(),
        metric_calcs: output.metric_calcs.into_values().collect(),
        dimensions: output.dimensions.into_values().collect(),
        connections: output.connections.into_values().collect(),
        diagnostics: ctx.diagnostics.into_vec(),
    })
}

fn resolve_catalog(ctx: &mut ConversionContext<'_>, database: &bim::Database) -> sml::Catalog {
    let verbose = key::catalog(&database.name);
    sml::Catalog {
        unique_name: ctx.unique_name(NameRequest::new(
            &database.name,
            &verbose,
            ObjectKind::Catalog,
            "",
        )),
        label: database.name.clone(),
        version: ctx.settings.catalog.version.clone(),
    }
}

fn resolve_connection(ctx: &mut ConversionContext<'_>, label: &str) -> ConvertResult<()> {
    let verbose = key::connection(label);
    let unique_name = ctx.unique_name(NameRequest::new(
        label,
        &verbose,
        ObjectKind::Connection,
        "",
    ));
    ctx.connection_id = unique_name.clone();
    ctx.output.add_connection(sml::Connection {
        unique_name,
        label: label.to_string(),
        as_connection: label.to_string(),
    })
}

fn assemble_model(
    ctx: &mut ConversionContext<'_>,
    database: &bim::Database,
) -> ConvertResult<sml::Model> {
    let label = database
        .model
        .name
        .clone()
        .unwrap_or_else(|| database.name.clone());
    let verbose = key::model(&label);
    let unique_name = ctx.unique_name(NameRequest::new(&label, &verbose, ObjectKind::Model, ""));

    let dimensions = relationship::model_dimensions(ctx)?;
    for orphan in ctx
        .output
        .dimensions
        .keys()
        .filter(|name| !dimensions.contains(*name))
        .cloned()
        .collect::<Vec<_>>()
    {
        ctx.diagnostics.info(
            orphan,
            "dimension is not reachable from any dataset; not referenced by the model",
        );
    }

    let output = &ctx.output;
    Ok(sml::Model {
        unique_name,
        label,
        relationships: output.relationships.values().cloned().collect(),
        metrics: output
            .metrics
            .keys()
            .chain(output.metric_calcs.keys())
            .map(|name| sml::MetricRef {
                unique_name: name.clone(),
            })
            .collect(),
        dimensions: dimensions.into_iter().collect(),
        perspectives: output.perspectives.values().cloned().collect(),
    })
}
