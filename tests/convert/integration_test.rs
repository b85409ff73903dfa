//! End-to-end conversion tests.

use std::collections::HashSet;

use bim2sml::bim::{Column, Database, Measure, Model, Partition, Relationship, Table};
use bim2sml::config::{expand_env_vars, Settings, SettingsError};
use bim2sml::convert::{convert, convert_with_settings, Conversion};
use bim2sml::sml::{CalculationMethod, DimensionType};
use bim2sml::ConvertError;
use serde_json::json;

fn retail() -> Database {
    let model = Model::new()
        .with_table(
            Table::new("Sales")
                .with_column(Column::data("CustomerKey", "int64"))
                .with_column(Column::data("Amount", "double"))
                .with_measure(Measure::new("Total", "SUM(Sales[Amount])"))
                .with_partition(Partition::query("p", "SELECT * FROM sales")),
        )
        .with_table(
            Table::new("Customer")
                .with_column(Column::data("CustomerKey", "int64"))
                .with_partition(Partition::query("p", "SELECT * FROM customer")),
        )
        .with_relationship(Relationship::new("Sales", "CustomerKey", "Customer", "CustomerKey"));
    Database::new("Retail", model)
}

/// Every identifier in the result, in output order.
fn identifiers(result: &Conversion) -> Vec<String> {
    let mut names = vec![result.catalog.unique_name.clone()];
    names.extend(result.models.iter().map(|m| m.unique_name.clone()));
    names.extend(result.connections.iter().map(|c| c.unique_name.clone()));
    names.extend(result.datasets.iter().map(|d| d.unique_name.clone()));
    names.extend(result.metrics.iter().map(|m| m.unique_name.clone()));
    names.extend(result.metric_calcs.iter().map(|c| c.unique_name.clone()));
    for dimension in &result.dimensions {
        names.push(dimension.unique_name.clone());
        names.extend(dimension.hierarchies.iter().map(|h| h.unique_name.clone()));
        names.extend(dimension.level_attributes.iter().map(|a| a.unique_name.clone()));
        names.extend(dimension.relationships.iter().map(|r| r.unique_name.clone()));
        for hierarchy in &dimension.hierarchies {
            for level in &hierarchy.levels {
                names.extend(level.secondary_attributes.iter().map(|a| a.unique_name.clone()));
            }
        }
    }
    for model in &result.models {
        names.extend(model.relationships.iter().map(|r| r.unique_name.clone()));
        names.extend(model.perspectives.iter().map(|p| p.unique_name.clone()));
    }
    names
}

fn assert_identifiers_valid(result: &Conversion, max_length: usize) {
    let names = identifiers(result);
    let mut seen = HashSet::new();
    for name in &names {
        assert!(seen.insert(name.to_lowercase()), "duplicate identifier {name}");
        assert!(name.chars().count() <= max_length, "identifier too long: {name}");
        assert!(
            name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_'),
            "illegal identifier: {name}"
        );
    }
}

// ============================================================================
// Star schema
// ============================================================================

#[test]
fn test_star_schema() {
    let result = convert(&retail(), "warehouse").unwrap();

    assert_eq!(result.catalog.unique_name, "Retail");
    assert_eq!(result.catalog.version, "1.0");
    assert_eq!(result.connections[0].unique_name, "warehouse");

    let datasets: Vec<&str> = result.datasets.iter().map(|d| d.unique_name.as_str()).collect();
    assert_eq!(datasets, vec!["Sales", "Customer_Customer"]);
    assert!(result
        .datasets
        .iter()
        .all(|d| d.connection_id == "warehouse"));

    let total = result.metric("Total").unwrap();
    assert_eq!(total.calculation_method, CalculationMethod::Sum);
    assert_eq!(total.column, "Amount");
    assert_eq!(total.dataset, "Sales");

    let customer = result.dimension("Customer").unwrap();
    assert_eq!(customer.dimension_type, DimensionType::Standard);
    assert_eq!(customer.hierarchies[0].levels[0].unique_name, "CustomerKey");
    assert_eq!(
        customer.level_attribute("CustomerKey").unwrap().dataset,
        "Customer_Customer"
    );

    let model = &result.models[0];
    assert_eq!(model.label, "Retail");
    assert_eq!(model.unique_name, "Retail_1");
    assert_eq!(model.relationships[0].unique_name, "Sales_Customer");
    assert_eq!(model.dimensions, vec!["Customer"]);
    let metrics: Vec<&str> = model.metrics.iter().map(|m| m.unique_name.as_str()).collect();
    assert_eq!(metrics, vec!["Total"]);

    assert!(!result.has_errors());
    assert_identifiers_valid(&result, 63);
}

#[test]
fn test_identifiers_stay_unique_under_collisions() {
    let model = Model::new()
        .with_table(
            Table::new("Sales")
                .with_column(Column::data("Customer", "int64"))
                .with_column(Column::data("Amount", "double").with_summarize_by("sum"))
                .with_measure(Measure::new("Customer", "DISTINCTCOUNT(Sales[Customer])"))
                .with_measure(Measure::new("Sales", "SUM(Sales[Amount])"))
                .with_measure(Measure::new("Sales %", "DIVIDE([Sales], SUM(Sales[Amount]))"))
                .with_measure(Measure::new(
                    "A very long measure name that cannot possibly fit in an identifier",
                    "[Sales] * 2",
                ))
                .with_partition(Partition::query("p", "SELECT * FROM sales")),
        )
        .with_table(
            Table::new("Customer")
                .with_column(Column::data("Customer", "int64").key())
                .with_column(Column::data("Sales", "string"))
                .with_partition(Partition::query("p", "SELECT * FROM customer")),
        )
        .with_relationship(Relationship::new("Sales", "Customer", "Customer", "Customer"));
    let database = Database::new("Sales", model);

    let result = convert(&database, "Sales").unwrap();
    assert_identifiers_valid(&result, 63);
    assert_eq!(result.dimension_for_table("Customer").unwrap().unique_name, "Customer");

    let settings = Settings::from_toml_str("[naming]\nmax_length = 12\n").unwrap();
    let result = convert_with_settings(&database, "Sales", &settings).unwrap();
    assert_identifiers_valid(&result, 12);
}

// ============================================================================
// Settings and environment
// ============================================================================

#[test]
fn test_connection_label_is_used_verbatim() {
    let result = convert(&retail(), "dw$1").unwrap();

    assert_eq!(result.connections[0].label, "dw$1");
    assert_eq!(result.connections[0].as_connection, "dw$1");
    assert_eq!(result.connections[0].unique_name, "dw_1");
    assert!(result.datasets.iter().all(|d| d.connection_id == "dw_1"));
}

#[test]
fn test_caller_expands_environment() {
    std::env::set_var("BIM2SML_IT_CONNECTION", "warehouse");
    let label = expand_env_vars("${BIM2SML_IT_CONNECTION}").unwrap();
    std::env::remove_var("BIM2SML_IT_CONNECTION");

    let result = convert(&retail(), &label).unwrap();
    assert_eq!(result.connections[0].label, "warehouse");
    assert_eq!(result.datasets[0].connection_id, "warehouse");

    assert!(matches!(
        expand_env_vars("${BIM2SML_IT_DOES_NOT_EXIST}"),
        Err(SettingsError::MissingEnvVar(_))
    ));
    let verbatim = convert(&retail(), "${BIM2SML_IT_DOES_NOT_EXIST}").unwrap();
    assert_eq!(verbatim.connections[0].label, "${BIM2SML_IT_DOES_NOT_EXIST}");
}

#[test]
fn test_invalid_settings_are_rejected() {
    let mut settings = Settings::default();
    settings.relationships.max_depth = 0;

    assert!(matches!(
        convert_with_settings(&retail(), "warehouse", &settings),
        Err(ConvertError::Settings(SettingsError::InvalidConfig(_)))
    ));
}

// ============================================================================
// Document formats
// ============================================================================

fn bim_document() -> serde_json::Value {
    json!({
        "name": "Retail",
        "compatibilityLevel": 1500,
        "model": {
            "name": "Model",
            "culture": "en-US",
            "dataSources": [{ "type": "structured", "name": "SQL/srv;dw" }],
            "tables": [
                {
                    "name": "Sales",
                    "columns": [
                        { "name": "CustomerKey", "dataType": "int64", "sourceColumn": "CustomerKey", "summarizeBy": "none" },
                        { "name": "Amount", "dataType": "double", "sourceColumn": "amount", "summarizeBy": "sum" },
                        {
                            "type": "rowNumber",
                            "name": "RowNumber-2662979B-1795-4F74-8F37-6A1BA8059B61",
                            "dataType": "int64",
                            "isHidden": true,
                            "isUnique": true,
                            "isKey": true
                        }
                    ],
                    "partitions": [
                        {
                            "name": "Sales",
                            "mode": "import",
                            "source": {
                                "type": "m",
                                "expression": [
                                    "let",
                                    "    Source = Sql.Database(\"srv\", \"dw\"),",
                                    "    dbo_Sales = Source{[Schema=\"dbo\",Item=\"Sales\"]}[Data]",
                                    "in",
                                    "    dbo_Sales"
                                ]
                            }
                        }
                    ],
                    "measures": [
                        { "name": "Total", "expression": "SUM(Sales[Amount])", "formatString": "#,0" },
                        { "name": "Avg Sale", "expression": ["DIVIDE(", "  [Total],", "  COUNTROWS(Sales)", ")"] }
                    ]
                },
                {
                    "name": "Customer",
                    "columns": [
                        { "name": "CustomerKey", "dataType": "int64", "sourceColumn": "CustomerKey", "isKey": true },
                        { "name": "Name", "dataType": "string", "sourceColumn": "Name" }
                    ],
                    "partitions": [
                        {
                            "name": "Customer",
                            "source": { "type": "query", "query": "SELECT * FROM dbo.Customer", "dataSource": "SQL/srv;dw" }
                        }
                    ]
                }
            ],
            "relationships": [
                {
                    "name": "8d2c1a4e",
                    "fromTable": "Sales",
                    "fromColumn": "CustomerKey",
                    "toTable": "Customer",
                    "toColumn": "CustomerKey"
                }
            ]
        }
    })
}

#[test]
fn test_bim_document_converts() {
    let database: Database = serde_json::from_value(bim_document()).unwrap();
    assert_eq!(database.compatibility_level, Some(1500));
    assert!(database.model.relationships[0].is_active);

    let result = convert(&database, "warehouse").unwrap();

    assert_eq!(result.models[0].unique_name, "Model");
    let sales = result.dataset("Sales").unwrap();
    assert_eq!(sales.table.as_deref(), Some("dbo.Sales"));
    assert_eq!(sales.column("Amount").unwrap().sql.as_deref(), Some("\"amount\""));
    assert!(sales.columns.iter().all(|c| !c.name.starts_with("RowNumber")));

    assert_eq!(
        result.dataset("Customer_Customer").unwrap().sql.as_deref(),
        Some("SELECT * FROM dbo.Customer")
    );

    assert_eq!(
        result.metric_calc("Avg_Sale_Sales").unwrap().expression,
        "[Measures].[Total] / [Measures].[Sales_countrows]"
    );
    let metrics: Vec<&str> = result.models[0]
        .metrics
        .iter()
        .map(|m| m.unique_name.as_str())
        .collect();
    assert_eq!(metrics, vec!["Total", "Sales_countrows", "Avg_Sale_Sales"]);

    // `summarizeBy: sum` on Amount is already covered by the Total measure.
    assert_eq!(result.metrics.len(), 2);
    assert_identifiers_valid(&result, 63);
}

#[test]
fn test_sml_serialization() {
    let database: Database = serde_json::from_value(bim_document()).unwrap();
    let result = convert(&database, "warehouse").unwrap();

    assert_eq!(
        serde_json::to_value(result.metric("Total").unwrap()).unwrap(),
        json!({
            "unique_name": "Total",
            "label": "Total",
            "dataset": "Sales",
            "column": "Amount",
            "calculation_method": "sum",
            "format": "#,0",
            "is_hidden": false
        })
    );

    let relationship = serde_json::to_value(&result.models[0].relationships[0]).unwrap();
    assert_eq!(
        relationship,
        json!({
            "unique_name": "Sales_Customer",
            "from": { "dataset": "Sales", "join_columns": ["CustomerKey"] },
            "to": { "dimension": "Customer", "level": "CustomerKey" }
        })
    );

    let dimension = serde_json::to_value(result.dimension("Customer").unwrap()).unwrap();
    assert_eq!(dimension["type"], "standard");
    assert_eq!(dimension["hierarchies"][0]["unique_name"], "Customer_hierarchy");
    assert!(dimension.get("relationships").is_none());
}
