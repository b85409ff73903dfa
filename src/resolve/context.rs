//! Conversion state shared by all resolvers.

use std::collections::{HashMap, HashSet};

use indexmap::{IndexMap, IndexSet};

use crate::bim;
use crate::classify::TableLists;
use crate::config::Settings;
use crate::diagnostics::Diagnostics;
use crate::error::{ConvertError, ConvertResult};
use crate::names::{key, NameRegistry, NameRequest, NameResolution, ObjectKind};
use crate::sml;

/// Everything a conversion reads and writes.
///
/// One context lives for exactly one conversion. Resolvers receive it by
/// `&mut`, so all name allocation and output appends are serialized and happen
/// in source order.
pub struct ConversionContext<'a> {
    pub source: &'a bim::Model,
    pub settings: &'a Settings,
    pub names: NameRegistry,
    pub tables: TableLists,
    pub output: Output,
    pub diagnostics: Diagnostics,
    pub(crate) measures: MeasureMemo,
    /// Identifier of the connection every dataset uses.
    pub connection_id: String,
}

impl<'a> ConversionContext<'a> {
    pub fn new(source: &'a bim::Model, settings: &'a Settings) -> Self {
        Self {
            source,
            settings,
            names: NameRegistry::new(settings.naming.max_length, settings.naming.max_suffix),
            tables: TableLists::default(),
            output: Output::default(),
            diagnostics: Diagnostics::new(),
            measures: MeasureMemo::default(),
            connection_id: String::new(),
        }
    }

    /// Allocate an identifier, recording renames and exhaustion as diagnostics.
    pub fn unique_name(&mut self, request: NameRequest<'_>) -> String {
        let allocation = self.names.allocate(&request);
        match allocation.resolution {
            NameResolution::Unchanged => {}
            NameResolution::Renamed => self.diagnostics.info(
                request.candidate,
                format!(
                    "{} identifier renamed to '{}' to keep it unique and valid",
                    request.kind, allocation.name
                ),
            ),
            NameResolution::Exhausted => self.diagnostics.warning(
                request.candidate,
                format!(
                    "no free {} identifier found; using the unsafe name '{}'",
                    request.kind, allocation.name
                ),
            ),
        }
        allocation.name
    }

    /// Identifier of the dataset built from `table`, allocating it on first use.
    pub fn dataset_name(&mut self, table: &str) -> String {
        let verbose = key::dataset(table);
        self.unique_name(NameRequest::new(table, &verbose, ObjectKind::Dataset, table))
    }

    /// Identifier of the dimension built from `table`, allocating it on first use.
    pub fn dimension_name(&mut self, table: &str) -> String {
        let verbose = key::dimension(table);
        self.unique_name(NameRequest::new(table, &verbose, ObjectKind::Dimension, table))
    }

    /// Look up a source table by name, case-insensitively.
    pub fn table(&self, name: &str) -> Option<&'a bim::Table> {
        self.source.table(name)
    }

    /// Tables whose datasets back at least one metric, in creation order.
    pub fn metric_tables(&self) -> IndexSet<String> {
        self.measures.metric_tables.values().cloned().collect()
    }

    /// Source table behind a metric.
    pub fn metric_table(&self, metric: &str) -> Option<&str> {
        self.measures.metric_tables.get(metric).map(String::as_str)
    }

    /// Name of the constant `1` column appended to the dataset of `table`.
    pub fn row_count_column(&self, table: &bim::Table) -> String {
        let base = &self.settings.datasets.row_count_column;
        if table.column(base).is_none() {
            return base.clone();
        }
        (1..)
            .map(|n| format!("{}_{}", base, n))
            .find(|name| table.column(name).is_none())
            .unwrap_or_else(|| base.clone())
    }
}

/// Memoized measure resolution.
#[derive(Debug, Default)]
pub(crate) struct MeasureMemo {
    /// Aggregate verbose key → metric identifier.
    pub(crate) aggregates: HashMap<String, String>,
    /// Measure verbose key → metric or metric calc identifier.
    pub(crate) resolved: HashMap<String, String>,
    /// Calculated measures currently being translated.
    pub(crate) in_progress: HashSet<String>,
    /// Metric identifier → source table.
    pub(crate) metric_tables: IndexMap<String, String>,
    /// Hidden helper metrics created while translating formulas.
    pub(crate) helpers: Vec<String>,
}

/// Objects produced so far, keyed by identifier in creation order.
#[derive(Debug, Default)]
pub struct Output {
    pub connections: IndexMap<String, sml::Connection>,
    pub datasets: IndexMap<String, sml::Dataset>,
    pub metrics: IndexMap<String, sml::Metric>,
    pub metric_calcs: IndexMap<String, sml::MetricCalc>,
    pub dimensions: IndexMap<String, sml::Dimension>,
    pub relationships: IndexMap<String, sml::ModelRelationship>,
    pub perspectives: IndexMap<String, sml::Perspective>,
    /// Identifiers of embedded relationships, stored on their dimensions.
    pub embedded: IndexSet<String>,
}

impl Output {
    pub fn add_connection(&mut self, connection: sml::Connection) -> ConvertResult<()> {
        insert_unique(
            &mut self.connections,
            ObjectKind::Connection,
            connection.unique_name.clone(),
            connection,
        )
    }

    pub fn add_dataset(&mut self, dataset: sml::Dataset) -> ConvertResult<()> {
        insert_unique(
            &mut self.datasets,
            ObjectKind::Dataset,
            dataset.unique_name.clone(),
            dataset,
        )
    }

    pub fn add_metric(&mut self, metric: sml::Metric) -> ConvertResult<()> {
        insert_unique(
            &mut self.metrics,
            ObjectKind::Metric,
            metric.unique_name.clone(),
            metric,
        )
    }

    pub fn add_metric_calc(&mut self, calc: sml::MetricCalc) -> ConvertResult<()> {
        insert_unique(
            &mut self.metric_calcs,
            ObjectKind::MetricCalc,
            calc.unique_name.clone(),
            calc,
        )
    }

    pub fn add_dimension(&mut self, dimension: sml::Dimension) -> ConvertResult<()> {
        insert_unique(
            &mut self.dimensions,
            ObjectKind::Dimension,
            dimension.unique_name.clone(),
            dimension,
        )
    }

    pub fn add_perspective(&mut self, perspective: sml::Perspective) -> ConvertResult<()> {
        insert_unique(
            &mut self.perspectives,
            ObjectKind::Perspective,
            perspective.unique_name.clone(),
            perspective,
        )
    }

    /// Store a relationship where its shape says it belongs.
    ///
    /// `owner` is the identifier of the dimension owning an embedded
    /// relationship; it is ignored for snowflake relationships.
    pub fn add_relationship(
        &mut self,
        relationship: sml::Relationship,
        owner: &str,
    ) -> ConvertResult<()> {
        let name = relationship.unique_name().to_string();
        if self.relationships.contains_key(&name) || self.embedded.contains(&name) {
            return Err(ConvertError::DuplicateIdentifier {
                kind: ObjectKind::Relationship,
                name,
            });
        }
        match relationship {
            sml::Relationship::Snowflake(model_relationship) => {
                self.relationships.insert(name, model_relationship);
            }
            sml::Relationship::Embedded(embedded) => {
                let Some(dimension) = self.dimensions.get_mut(owner) else {
                    return Err(ConvertError::MissingObject {
                        kind: ObjectKind::Dimension,
                        name: owner.to_string(),
                    });
                };
                dimension.relationships.push(embedded);
                self.embedded.insert(name);
            }
        }
        Ok(())
    }

    /// Whether a model relationship already joins `dataset` to `dimension`.
    pub fn joins(&self, dataset: &str, dimension: &str) -> bool {
        self.relationships
            .values()
            .any(|r| r.from.dataset == dataset && r.to.dimension == dimension)
    }
}

fn insert_unique<T>(
    map: &mut IndexMap<String, T>,
    kind: ObjectKind,
    name: String,
    value: T,
) -> ConvertResult<()> {
    if map.contains_key(&name) {
        return Err(ConvertError::DuplicateIdentifier { kind, name });
    }
    map.insert(name, value);
    Ok(())
}
