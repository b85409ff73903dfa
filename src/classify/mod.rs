//! Fact/dimension classification of source tables.
//!
//! The source model never says which tables are facts and which are
//! dimensions; the relationship graph does. A table on the `from` (many) side
//! of a relationship holds rows to aggregate, a table on the `to` (one) side
//! describes them. Tables in the middle of a snowflake chain are both `from`
//! and `to` and count as dimensions only.
//!
//! Classification runs twice: once up front, and once after metrics exist,
//! because a formula may aggregate a column of any table and so turn it into a
//! fact.

use indexmap::IndexSet;

use crate::bim;

/// Classification state.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableLists {
    /// Tables contributing nothing to the output.
    pub unused: IndexSet<String>,
    /// Tables on the `from` side of an active relationship.
    pub left: IndexSet<String>,
    /// Tables on the `to` side of an active relationship.
    pub right: IndexSet<String>,
    /// Unrelated tables that only carry calculated measures.
    pub measure_only: IndexSet<String>,
    pub fact: IndexSet<String>,
    pub dimension: IndexSet<String>,
}

impl TableLists {
    pub fn is_fact(&self, table: &str) -> bool {
        self.fact.contains(table)
    }

    pub fn is_dimension(&self, table: &str) -> bool {
        self.dimension.contains(table)
    }

    pub fn is_unused(&self, table: &str) -> bool {
        self.unused.contains(table)
    }

    /// Tables that are both facts and dimensions, in source order.
    pub fn fact_dimensions(&self) -> impl Iterator<Item = &String> {
        self.fact.iter().filter(|t| self.dimension.contains(*t))
    }
}

/// Classify the tables of `model`.
///
/// `metric_tables` names the tables whose columns back at least one metric;
/// pass an empty set for the first run.
pub fn classify(model: &bim::Model, metric_tables: &IndexSet<String>) -> TableLists {
    let mut lists = TableLists::default();

    for relationship in model.relationships.iter().filter(|r| r.is_active) {
        let (Some(from), Some(to)) = (
            model.table(&relationship.from_table),
            model.table(&relationship.to_table),
        ) else {
            continue;
        };
        lists.left.insert(from.name.clone());
        lists.right.insert(to.name.clone());
    }

    for table in &model.tables {
        let name = &table.name;
        let related = lists.left.contains(name) || lists.right.contains(name);
        let backs_metric = metric_tables.contains(name);

        if lists.right.contains(name) {
            lists.dimension.insert(name.clone());
        }

        if (lists.left.contains(name) && !lists.right.contains(name)) || backs_metric {
            lists.fact.insert(name.clone());
        } else if !related && !table.measures.is_empty() {
            if has_visible_columns(table) {
                lists.fact.insert(name.clone());
            } else {
                lists.measure_only.insert(name.clone());
            }
        }

        if !lists.fact.contains(name)
            && !lists.dimension.contains(name)
            && !lists.measure_only.contains(name)
        {
            lists.unused.insert(name.clone());
        }
    }

    lists
}

fn has_visible_columns(table: &bim::Table) -> bool {
    table
        .columns
        .iter()
        .any(|c| !c.is_hidden && c.kind() != bim::ColumnKind::RowNumber)
}
