//! Tests for dimension generation: hierarchies, levels, secondary attributes
//! and time dimensions.

use bim2sml::bim::{Column, Database, Hierarchy, Model, Partition, Relationship, Table};
use bim2sml::convert::{convert, Conversion};
use bim2sml::sml::{DimensionType, TimeUnit};
use bim2sml::Severity;

fn with_sales(dimension: Table, key: &str) -> Conversion {
    let sales = Table::new("Sales")
        .with_column(Column::data(key, "int64"))
        .with_column(Column::data("Amount", "double"))
        .with_partition(Partition::query("p", "SELECT * FROM sales"));
    let table = dimension.name.clone();
    let model = Model::new()
        .with_table(sales)
        .with_table(dimension)
        .with_relationship(Relationship::new("Sales", key, table, key));
    convert(&Database::new("Retail", model), "warehouse").unwrap()
}

fn customer() -> Table {
    Table::new("Customer")
        .with_column(Column::data("CustomerKey", "int64").key())
        .with_column(Column::data("Country", "string"))
        .with_column(Column::data("City", "string"))
        .with_column(Column::data("Name", "string"))
        .with_column(Column::data("Segment", "string").hidden())
        .with_partition(Partition::query("p", "SELECT * FROM customer"))
}

fn date() -> Table {
    Table::new("Date")
        .with_data_category("Time")
        .with_column(Column::data("DateKey", "int64").key())
        .with_column(Column::data("Year", "int64"))
        .with_column(Column::data("Month", "string").with_sort_by("MonthNumber"))
        .with_column(Column::data("MonthNumber", "int64"))
        .with_column(Column::data("Day", "datetime"))
        .with_partition(Partition::query("p", "SELECT * FROM dates"))
}

#[test]
fn test_explicit_hierarchy_gets_hidden_join_level() {
    let result = with_sales(
        customer().with_hierarchy(
            Hierarchy::new("Geography")
                .with_level("Country", "Country")
                .with_level("City", "City"),
        ),
        "CustomerKey",
    );

    let dimension = result.dimension("Customer").unwrap();
    assert_eq!(dimension.dimension_type, DimensionType::Standard);
    assert_eq!(dimension.hierarchies.len(), 1);

    let hierarchy = dimension.hierarchy("Geography").unwrap();
    let levels: Vec<(&str, bool)> = hierarchy
        .levels
        .iter()
        .map(|l| (l.unique_name.as_str(), l.is_hidden))
        .collect();
    assert_eq!(
        levels,
        vec![("Country", false), ("City", false), ("CustomerKey", true)]
    );

    let key = dimension.level_attribute("CustomerKey").unwrap();
    assert!(key.is_hidden);
    assert_eq!(key.dataset, "Customer_Customer");
    assert_eq!(key.key_columns, vec!["CustomerKey"]);

    assert!(result.diagnostics.iter().any(|d| d.severity == Severity::Info
        && d.object.as_deref() == Some("Customer/Geography")
        && d.message.contains("appended hidden level 'CustomerKey'")));
}

#[test]
fn test_secondary_attributes_hang_off_key_level() {
    let result = with_sales(
        customer().with_hierarchy(Hierarchy::new("Geography").with_level("Country", "Country")),
        "CustomerKey",
    );

    let hierarchy = &result.dimension("Customer").unwrap().hierarchies[0];
    let key_level = hierarchy
        .levels
        .iter()
        .find(|l| l.unique_name == "CustomerKey")
        .unwrap();
    let attributes: Vec<(&str, bool)> = key_level
        .secondary_attributes
        .iter()
        .map(|a| (a.unique_name.as_str(), a.is_hidden))
        .collect();
    assert_eq!(
        attributes,
        vec![("City", false), ("Name", false)]
    );
    assert!(hierarchy.levels[0].secondary_attributes.is_empty());
}

#[test]
fn test_default_hierarchy_over_join_column() {
    let result = with_sales(customer(), "CustomerKey");

    let dimension = result.dimension("Customer").unwrap();
    let hierarchy = dimension.hierarchy("Customer_hierarchy").unwrap();
    assert_eq!(hierarchy.label, "Customer");
    assert_eq!(hierarchy.levels.len(), 1);
    assert_eq!(hierarchy.levels[0].unique_name, "CustomerKey");
    assert!(!hierarchy.levels[0].is_hidden);
    let attributes: Vec<&str> = hierarchy.levels[0]
        .secondary_attributes
        .iter()
        .map(|a| a.unique_name.as_str())
        .collect();
    assert_eq!(attributes, vec!["Country", "City", "Name"]);
}

#[test]
fn test_hidden_columns_are_not_secondary_attributes() {
    let result = with_sales(customer(), "CustomerKey");

    let dimension = result.dimension("Customer").unwrap();
    let attributes: Vec<_> = dimension
        .hierarchies
        .iter()
        .flat_map(|h| &h.levels)
        .flat_map(|l| &l.secondary_attributes)
        .collect();
    assert!(!attributes.is_empty());
    assert!(attributes.iter().all(|a| !a.is_hidden));
    assert!(attributes.iter().all(|a| a.name_column != "Segment"));
}

#[test]
fn test_shared_column_yields_one_level_attribute() {
    let result = with_sales(
        customer()
            .with_hierarchy(Hierarchy::new("Geography").with_level("Country", "Country"))
            .with_hierarchy(
                Hierarchy::new("Drill")
                    .with_level("Country", "Country")
                    .with_level("Customer", "Name"),
            ),
        "CustomerKey",
    );

    let dimension = result.dimension("Customer").unwrap();
    let labels: Vec<&str> = dimension
        .level_attributes
        .iter()
        .map(|a| a.label.as_str())
        .collect();
    assert_eq!(labels, vec!["Country", "CustomerKey", "Customer"]);
    assert_eq!(dimension.hierarchies[1].levels[0].unique_name, "Country");
}

#[test]
fn test_time_dimension_units() {
    let result = with_sales(
        date().with_hierarchy(
            Hierarchy::new("Calendar")
                .with_level("Year", "Year")
                .with_level("Month", "Month")
                .with_level("Day", "Day"),
        ),
        "DateKey",
    );

    let dimension = result.dimension("Date").unwrap();
    assert_eq!(dimension.dimension_type, DimensionType::Time);

    let units: Vec<(&str, Option<TimeUnit>)> = dimension
        .level_attributes
        .iter()
        .map(|a| (a.label.as_str(), a.time_unit))
        .collect();
    assert_eq!(
        units,
        vec![
            ("Year", Some(TimeUnit::Year)),
            ("Month", Some(TimeUnit::Month)),
            ("Day", Some(TimeUnit::Day)),
            ("DateKey", Some(TimeUnit::Day)),
        ]
    );

    let month = dimension.level_attribute("Month").unwrap();
    assert_eq!(month.sort_column.as_deref(), Some("MonthNumber"));
    assert!(!result.has_errors());
}

#[test]
fn test_failed_time_inference_falls_back_to_standard() {
    let table = date()
        .with_column(Column::data("FiscalPeriod", "string"))
        .with_hierarchy(
            Hierarchy::new("Fiscal")
                .with_level("Year", "Year")
                .with_level("Fiscal Period", "FiscalPeriod"),
        );
    let result = with_sales(table, "DateKey");

    let dimension = result.dimension("Date").unwrap();
    assert_eq!(dimension.dimension_type, DimensionType::Standard);
    assert!(dimension.level_attributes.iter().all(|a| a.time_unit.is_none()));

    assert!(result.has_errors());
    let error = result
        .diagnostics
        .iter()
        .find(|d| d.severity == Severity::Error)
        .unwrap();
    assert_eq!(error.object.as_deref(), Some("Date"));
    assert!(error.message.contains("Fiscal Period"));
}

#[test]
fn test_missing_sort_column_is_reported() {
    let table = customer()
        .with_column(Column::data("Tier", "string").with_sort_by("TierOrder"))
        .with_hierarchy(Hierarchy::new("Tiers").with_level("Tier", "Tier"));
    let result = with_sales(table, "CustomerKey");

    let tier = result
        .dimension("Customer")
        .unwrap()
        .level_attribute("Tier")
        .unwrap();
    assert_eq!(tier.sort_column, None);
    assert!(result.diagnostics.iter().any(|d| d.severity == Severity::Warning
        && d.object.as_deref() == Some("Customer[Tier]")
        && d.message.contains("'TierOrder'")));
}
