//! Tests for measure resolution: simple metrics, calculated metrics, fallback
//! placeholders and column-implied metrics.

use bim2sml::bim::{Column, Database, Measure, Model, Partition, Relationship, Table};
use bim2sml::config::Settings;
use bim2sml::convert::{convert, convert_with_settings, Conversion};
use bim2sml::sml::CalculationMethod;
use bim2sml::Severity;

fn sales(measures: Vec<Measure>) -> Table {
    measures.into_iter().fold(
        Table::new("Sales")
            .with_column(Column::data("CustomerKey", "int64"))
            .with_column(Column::data("Amount", "double"))
            .with_column(Column::data("Cost", "double"))
            .with_column(Column::data("Qty", "int64"))
            .with_partition(Partition::query("p", "SELECT * FROM sales")),
        |table, measure| table.with_measure(measure),
    )
}

fn run(tables: Vec<Table>) -> Conversion {
    let model = tables
        .into_iter()
        .fold(Model::new(), |model, table| model.with_table(table));
    convert(&Database::new("Retail", model), "warehouse").unwrap()
}

fn has_diagnostic(result: &Conversion, severity: Severity, object: &str, fragment: &str) -> bool {
    result.diagnostics.iter().any(|d| {
        d.severity == severity
            && d.object.as_deref() == Some(object)
            && d.message.contains(fragment)
    })
}

// ============================================================================
// Simple metrics
// ============================================================================

#[test]
fn test_single_aggregate_becomes_metric() {
    let result = run(vec![sales(vec![Measure::new("Total Sales", "SUM(Sales[Amount])")
        .with_format("#,0.00")
        .with_folder("Revenue")])]);

    assert_eq!(result.metrics.len(), 1);
    assert!(result.metric_calcs.is_empty());

    let metric = result.metric("Total_Sales_Sales").unwrap();
    assert_eq!(metric.label, "Total Sales");
    assert_eq!(metric.dataset, "Sales");
    assert_eq!(metric.column, "Amount");
    assert_eq!(metric.calculation_method, CalculationMethod::Sum);
    assert_eq!(metric.format.as_deref(), Some("#,0.00"));
    assert_eq!(metric.folder.as_deref(), Some("Revenue"));
    assert!(!metric.is_hidden);
}

#[test]
fn test_countrows_measure_sums_constant_column() {
    let result = run(vec![sales(vec![Measure::new("Orders", "COUNTROWS(Sales)")])]);

    let metric = result.metric("Orders").unwrap();
    assert_eq!(metric.column, "row_count_one");
    assert_eq!(metric.calculation_method, CalculationMethod::Sum);

    let column = result.dataset("Sales").unwrap().column("row_count_one").unwrap();
    assert_eq!(column.sql.as_deref(), Some("1"));
}

#[test]
fn test_aggregate_of_unknown_column_is_skipped() {
    let result = run(vec![sales(vec![Measure::new("Broken", "SUM(Sales[Missing])")])]);

    assert!(result.metrics.is_empty());
    assert!(has_diagnostic(&result, Severity::Warning, "Broken", "unknown column"));
}

// ============================================================================
// Calculated metrics
// ============================================================================

#[test]
fn test_helper_metrics_are_shared_between_formulas() {
    let result = run(vec![sales(vec![
        Measure::new(
            "Margin",
            "DIVIDE(SUM(Sales[Amount]) - SUM(Sales[Cost]), SUM(Sales[Amount]))",
        ),
        Measure::new("Avg Price", "DIVIDE(SUM(Sales[Amount]), SUM(Sales[Qty]))"),
    ])]);

    let names: Vec<&str> = result.metrics.iter().map(|m| m.unique_name.as_str()).collect();
    assert_eq!(names, vec!["Amount_sum", "Cost_sum", "Qty_sum"]);
    assert!(result.metrics.iter().all(|m| m.is_hidden));
    assert_eq!(result.metric("Amount_sum").unwrap().label, "Sum of Amount");

    assert_eq!(
        result.metric_calc("Margin").unwrap().expression,
        "([Measures].[Amount_sum] - [Measures].[Cost_sum]) / [Measures].[Amount_sum]"
    );
    assert_eq!(
        result.metric_calc("Avg_Price_Sales").unwrap().expression,
        "[Measures].[Amount_sum] / [Measures].[Qty_sum]"
    );
}

#[test]
fn test_formula_reuses_simple_metric_for_same_aggregation() {
    let result = run(vec![sales(vec![
        Measure::new("Total", "SUM(Sales[Amount])"),
        Measure::new("Double", "SUM(Sales[Amount]) * 2"),
    ])]);

    assert_eq!(result.metrics.len(), 1);
    assert_eq!(
        result.metric_calc("Double").unwrap().expression,
        "[Measures].[Total] * 2"
    );
}

#[test]
fn test_measure_references_resolve_in_any_order() {
    let result = run(vec![sales(vec![
        Measure::new("Ratio", "DIVIDE([Net], [Total])"),
        Measure::new("Net", "[Total] - SUM(Sales[Cost])"),
        Measure::new("Total", "SUM(Sales[Amount])"),
    ])]);

    assert_eq!(
        result.metric_calc("Net").unwrap().expression,
        "[Measures].[Total] - [Measures].[Cost_sum]"
    );
    assert_eq!(
        result.metric_calc("Ratio").unwrap().expression,
        "[Measures].[Net] / [Measures].[Total]"
    );
    let calcs: Vec<&str> = result
        .metric_calcs
        .iter()
        .map(|c| c.unique_name.as_str())
        .collect();
    assert_eq!(calcs, vec!["Net", "Ratio"]);
}

#[test]
fn test_row_count_helper_in_formula() {
    let result = run(vec![sales(vec![Measure::new(
        "Avg Amount",
        "DIVIDE(SUM(Sales[Amount]), COUNTROWS(Sales))",
    )])]);

    let helper = result.metric("Sales_countrows").unwrap();
    assert!(helper.is_hidden);
    assert_eq!(helper.label, "Row Count of Sales");
    assert_eq!(helper.column, "row_count_one");
    assert_eq!(
        result.metric_calc("Avg_Amount_Sales").unwrap().expression,
        "[Measures].[Amount_sum] / [Measures].[Sales_countrows]"
    );
}

#[test]
fn test_normalized_formula_is_translated() {
    let result = run(vec![sales(vec![
        Measure::new("Total", "SUM(Sales[Amount])"),
        Measure::new("Commented", "( [Total] * 2 ) // doubled"),
    ])]);

    assert_eq!(
        result.metric_calc("Commented").unwrap().expression,
        "[Measures].[Total] * 2"
    );
    assert!(has_diagnostic(&result, Severity::Info, "Commented", "removing comments"));
}

// ============================================================================
// Fallbacks
// ============================================================================

#[test]
fn test_untranslatable_formula_becomes_hidden_placeholder() {
    let formula = r#"CALCULATE(SUM(Sales[Amount]), Sales[Region] = "West")"#;
    let result = run(vec![sales(vec![Measure::new("West", formula)])]);

    let calc = result.metric_calc("West").unwrap();
    assert!(calc.is_hidden);
    assert_eq!(calc.expression, format!("0 /* {} */", formula));
    assert_eq!(
        calc.description.as_deref(),
        Some(format!("Not translated, needs manual follow-up. Original formula: {}", formula).as_str())
    );
    assert!(has_diagnostic(&result, Severity::Warning, "West", "could not be translated"));
}

#[test]
fn test_untranslatable_ratio_is_reported_as_ratio() {
    let formula = r#"DIVIDE(SUM(Sales[Amount]), CALCULATE(SUM(Sales[Cost]), Sales[Region] = "West"))"#;
    let result = run(vec![sales(vec![Measure::new("West Share", formula)])]);

    let calc = result.metric_calc("West_Share_Sales").unwrap();
    assert_eq!(calc.expression, format!("0 /* {} */", formula));
    assert!(has_diagnostic(
        &result,
        Severity::Warning,
        "West Share",
        "ratio could not be translated"
    ));
}

#[test]
fn test_helpers_left_by_partial_translation_are_reported() {
    let result = run(vec![sales(vec![
        Measure::new(
            "Partial",
            r#"SUM(Sales[Amount]) + CALCULATE(SUM(Sales[Cost]), Sales[Region] = "West")"#,
        ),
        Measure::new("Units", "SUM(Sales[Qty]) * 2"),
    ])]);

    assert!(result.metric_calc("Partial").unwrap().expression.starts_with("0 /*"));
    assert!(result.metric("Amount_sum").unwrap().is_hidden);
    assert!(has_diagnostic(
        &result,
        Severity::Info,
        "Amount_sum",
        "not referenced by any translated formula"
    ));
    assert!(!has_diagnostic(
        &result,
        Severity::Info,
        "Qty_sum",
        "not referenced"
    ));
}

#[test]
fn test_measure_cycle_is_broken_with_placeholder() {
    let result = run(vec![sales(vec![
        Measure::new("A", "[B] + 1"),
        Measure::new("B", "[A] + 1"),
    ])]);

    assert!(has_diagnostic(&result, Severity::Warning, "A", "reaches itself"));
    assert!(result.metric_calc("B").unwrap().expression.starts_with("0 /*"));
    assert_eq!(result.metric_calc("A").unwrap().expression, "[Measures].[B] + 1");
}

// ============================================================================
// Column-implied metrics
// ============================================================================

fn star_with_summaries() -> Vec<Table> {
    vec![
        Table::new("Sales")
            .with_column(Column::data("CustomerKey", "int64").with_summarize_by("sum"))
            .with_column(Column::data("Amount", "double").with_summarize_by("default"))
            .with_column(Column::data("Qty", "int64").with_summarize_by("sum"))
            .with_column(Column::data("UnitPrice", "double").with_summarize_by("sum"))
            .with_column(Column::data("Region", "string").with_summarize_by("default"))
            .with_column(Column::data("Discount", "double").with_summarize_by("median"))
            .with_column(Column::data("Internal", "double").with_summarize_by("sum").hidden())
            .with_partition(Partition::query("p", "SELECT * FROM sales")),
        Table::new("Customer")
            .with_column(Column::data("CustomerKey", "int64"))
            .with_partition(Partition::query("p", "SELECT * FROM customer")),
    ]
}

fn star_model(tables: Vec<Table>) -> Database {
    let model = tables
        .into_iter()
        .fold(Model::new(), |model, table| model.with_table(table))
        .with_relationship(Relationship::new("Sales", "CustomerKey", "Customer", "CustomerKey"));
    Database::new("Retail", model)
}

#[test]
fn test_column_measures_follow_summarization() {
    let result = convert(&star_model(star_with_summaries()), "warehouse").unwrap();

    let names: Vec<&str> = result.metrics.iter().map(|m| m.unique_name.as_str()).collect();
    assert_eq!(names, vec!["Amount", "Qty", "Discount"]);

    let amount = result.metric("Amount").unwrap();
    assert!(!amount.is_hidden);
    assert_eq!(amount.label, "Amount");
    assert_eq!(amount.calculation_method, CalculationMethod::Sum);

    assert!(has_diagnostic(
        &result,
        Severity::Info,
        "Sales[UnitPrice]",
        "non-additive"
    ));
    assert!(has_diagnostic(
        &result,
        Severity::Warning,
        "Sales[Discount]",
        "unknown summarizeBy 'median'"
    ));
}

#[test]
fn test_column_measure_skipped_when_measure_covers_it() {
    let mut tables = star_with_summaries();
    tables[0] = tables[0]
        .clone()
        .with_measure(Measure::new("Revenue", "SUM(Sales[Amount])"));
    let result = convert(&star_model(tables), "warehouse").unwrap();

    assert!(result.metric("Revenue").is_some());
    assert!(result.metric("Amount").is_none());
    assert!(result.metrics.iter().all(|m| m.column != "Amount" || m.unique_name == "Revenue"));
}

#[test]
fn test_column_measures_can_be_disabled() {
    let mut settings = Settings::default();
    settings.measures.column_measures = false;
    let result =
        convert_with_settings(&star_model(star_with_summaries()), "warehouse", &settings).unwrap();

    assert!(result.metrics.is_empty());
}
