//! Integration tests for the in-memory engine.
//!
//! Runs complete models over a small shop dataset and checks the
//! materialized results: joins, filters, grouping, granularity, sorting
//! and limits.

use quarry::engine::{execute, DataSet, Value};
use quarry::prelude::*;

// ============================================================================
// Fixtures
// ============================================================================

fn shop_catalog() -> Catalog {
    Catalog::new(
        vec![
            Table::new(
                "customers",
                TableKind::Dimension,
                vec![
                    Column::new("id", ColumnType::Text, ColumnRole::Key),
                    Column::new("name", ColumnType::Text, ColumnRole::Dimension),
                    Column::new("country", ColumnType::Text, ColumnRole::Dimension),
                ],
            ),
            Table::new(
                "orders",
                TableKind::Fact,
                vec![
                    Column::new("id", ColumnType::Text, ColumnRole::Key),
                    Column::new("customer_id", ColumnType::Text, ColumnRole::Key),
                    Column::new("status", ColumnType::Text, ColumnRole::Dimension),
                    Column::new("order_date", ColumnType::Date, ColumnRole::Dimension),
                    Column::new("total_amount", ColumnType::Numeric, ColumnRole::Measure),
                ],
            ),
        ],
        vec![Relationship::new(
            "rel-1",
            "orders",
            "customer_id",
            "customers",
            "id",
            JoinKind::Left,
        )],
    )
}

fn shop_data() -> DataSet {
    let mut data = DataSet::new();
    data.insert_table_json(
        "customers",
        vec![
            serde_json::json!({"id": "c1", "name": "Acme", "country": "France"}),
            serde_json::json!({"id": "c2", "name": "Globex", "country": "Germany"}),
        ],
    );
    data.insert_table_json(
        "orders",
        vec![
            serde_json::json!({"id": "o1", "customer_id": "c1", "status": "completed", "order_date": "2024-01-10", "total_amount": 100.0}),
            serde_json::json!({"id": "o2", "customer_id": "c1", "status": "pending", "order_date": "2024-02-05", "total_amount": 50.0}),
            serde_json::json!({"id": "o3", "customer_id": "c2", "status": "completed", "order_date": "2024-02-20", "total_amount": 75.0}),
            serde_json::json!({"id": "o4", "customer_id": "c2", "status": "completed", "order_date": "2023-12-31", "total_amount": 25.0}),
            serde_json::json!({"id": "o5", "customer_id": "c1", "status": null, "order_date": "2024-03-01", "total_amount": 10.0}),
        ],
    );
    data
}

fn run(model: &QueryModel) -> QueryResult {
    execute(model, &shop_catalog(), &shop_data())
}

fn dimension(table: &str, column: &str) -> SelectedField {
    SelectedField::new(table, column, ColumnType::Text, ColumnRole::Dimension)
}

fn sum_measure(table: &str, column: &str) -> SelectedField {
    SelectedField::new(table, column, ColumnType::Numeric, ColumnRole::Measure)
        .with_aggregation(Aggregation::Sum)
}

fn projection_model() -> QueryModel {
    let mut model = QueryModel::new();
    model.add_field(dimension("orders", "id"));
    model.add_field(dimension("orders", "status"));
    model
}

fn count_matching(filter: Filter) -> usize {
    let mut model = projection_model();
    model.add_filter(filter);
    run(&model).row_count
}

fn orders_filter(column: &str, column_type: ColumnType, op: FilterOperator, value: &str) -> Filter {
    Filter::new("orders", column, column_type, op, value)
}

// ============================================================================
// End-to-end scenarios
// ============================================================================

#[test]
fn test_grouped_sum_sorted_descending() {
    let mut model = QueryModel::new();
    model.add_field(dimension("orders", "status"));
    model.add_field(sum_measure("orders", "total_amount"));
    model.add_sort(SortRule::new("orders", "total_amount", SortDirection::Desc));

    let result = run(&model);
    assert_eq!(result.row_count, 3);

    let amounts: Vec<&Value> = result
        .rows
        .iter()
        .map(|r| &r["orders.total_amount"])
        .collect();
    assert_eq!(
        amounts,
        vec![&Value::Float(200.0), &Value::Float(50.0), &Value::Float(10.0)]
    );
    assert_eq!(result.rows[0]["orders.status"], Value::Str("completed".into()));
    // null statuses group under their display string
    assert_eq!(result.rows[2]["orders.status"], Value::Str("null".into()));
}

#[test]
fn test_filter_restricts_grouped_result() {
    let mut model = QueryModel::new();
    model.add_field(dimension("orders", "status"));
    model.add_field(sum_measure("orders", "total_amount"));
    model.add_filter(orders_filter(
        "status",
        ColumnType::Text,
        FilterOperator::Equals,
        "completed",
    ));

    let result = run(&model);
    assert_eq!(result.row_count, 1);
    assert_eq!(result.rows[0]["orders.total_amount"], Value::Float(200.0));
    assert_eq!(result.total_row_count, 3);
}

#[test]
fn test_left_join_groups_by_customer_country() {
    let mut model = QueryModel::new();
    model.add_field(dimension("customers", "country"));
    model.add_field(sum_measure("orders", "total_amount"));

    let result = run(&model);
    assert_eq!(result.row_count, 2);

    let by_country: Vec<(&Value, &Value)> = result
        .rows
        .iter()
        .map(|r| (&r["customers.country"], &r["orders.total_amount"]))
        .collect();
    assert!(by_country.contains(&(&Value::Str("France".into()), &Value::Float(160.0))));
    assert!(by_country.contains(&(&Value::Str("Germany".into()), &Value::Float(100.0))));
}

#[test]
fn test_aggregated_columns_report_numeric_type() {
    let mut model = QueryModel::new();
    model.add_field(dimension("orders", "status"));
    model.add_field(sum_measure("orders", "total_amount"));

    let result = run(&model);
    let measure = result.column("orders.total_amount").unwrap();
    assert_eq!(measure.column_type, ColumnType::Numeric);
    let dim = result.column("orders.status").unwrap();
    assert_eq!(dim.column_type, ColumnType::Text);
}

// ============================================================================
// Filter operators
// ============================================================================

#[test]
fn test_string_operators() {
    let text = |op, v: &str| orders_filter("status", ColumnType::Text, op, v);

    assert_eq!(count_matching(text(FilterOperator::Equals, "completed")), 3);
    assert_eq!(count_matching(text(FilterOperator::NotEquals, "completed")), 2);
    // substring tests are case-insensitive
    assert_eq!(count_matching(text(FilterOperator::Contains, "COMP")), 3);
    assert_eq!(count_matching(text(FilterOperator::NotContains, "pend")), 4);
    assert_eq!(count_matching(text(FilterOperator::StartsWith, "Pend")), 1);
    assert_eq!(count_matching(text(FilterOperator::EndsWith, "ED")), 3);
    assert_eq!(
        count_matching(text(FilterOperator::In, "pending, cancelled")),
        1
    );
}

#[test]
fn test_numeric_operators() {
    let amount = |op, v: &str| orders_filter("total_amount", ColumnType::Numeric, op, v);

    assert_eq!(count_matching(amount(FilterOperator::Gt, "60")), 2);
    assert_eq!(count_matching(amount(FilterOperator::Gte, "50")), 3);
    assert_eq!(count_matching(amount(FilterOperator::Lt, "50")), 2);
    assert_eq!(count_matching(amount(FilterOperator::Lte, "50")), 3);
    assert_eq!(
        count_matching(amount(FilterOperator::Between, "50").with_value2("100")),
        3
    );
    // unparseable bound compares as NaN: nothing matches
    assert_eq!(count_matching(amount(FilterOperator::Gt, "lots")), 0);
}

#[test]
fn test_null_operators() {
    let status = |op| orders_filter("status", ColumnType::Text, op, "");

    assert_eq!(count_matching(status(FilterOperator::IsNull)), 1);
    assert_eq!(count_matching(status(FilterOperator::IsNotNull)), 4);
}

#[test]
fn test_date_operators() {
    let date = |op, v: &str| orders_filter("order_date", ColumnType::Date, op, v);

    assert_eq!(
        count_matching(date(FilterOperator::DateEquals, "2024-01-10")),
        1
    );
    assert_eq!(
        count_matching(date(FilterOperator::DateAfter, "2024-01-31")),
        3
    );
    assert_eq!(
        count_matching(date(FilterOperator::DateBefore, "2024-01-01")),
        1
    );
}

// ============================================================================
// Aggregations
// ============================================================================

fn single_aggregate(aggregation: Aggregation, column: &str) -> Value {
    let mut model = QueryModel::new();
    model.add_field(
        SelectedField::new("orders", column, ColumnType::Numeric, ColumnRole::Measure)
            .with_aggregation(aggregation),
    );
    let result = run(&model);
    assert_eq!(result.row_count, 1);
    result.rows[0][&format!("orders.{column}")].clone()
}

#[test]
fn test_aggregations_over_whole_table() {
    assert_eq!(single_aggregate(Aggregation::Sum, "total_amount"), Value::Float(260.0));
    assert_eq!(single_aggregate(Aggregation::Avg, "total_amount"), Value::Float(52.0));
    assert_eq!(single_aggregate(Aggregation::Count, "id"), Value::Int(5));
    assert_eq!(single_aggregate(Aggregation::CountDistinct, "status"), Value::Int(2));
    assert_eq!(single_aggregate(Aggregation::Min, "total_amount"), Value::Float(10.0));
    assert_eq!(single_aggregate(Aggregation::Max, "total_amount"), Value::Float(100.0));
    // no engine implementation for median
    assert_eq!(single_aggregate(Aggregation::Median, "total_amount"), Value::Null);
}

// ============================================================================
// Granularity, sorting, limits
// ============================================================================

#[test]
fn test_month_granularity_grouping() {
    let mut model = QueryModel::new();
    model.add_field(
        SelectedField::new("orders", "order_date", ColumnType::Date, ColumnRole::Dimension)
            .with_granularity(DateGranularity::Month),
    );
    model.add_field(sum_measure("orders", "total_amount"));
    model.add_sort(SortRule::new("orders", "order_date", SortDirection::Asc));

    let result = run(&model);
    assert_eq!(result.row_count, 4);

    let months: Vec<&Value> = result.rows.iter().map(|r| &r["orders.order_date"]).collect();
    assert_eq!(
        months,
        vec![
            &Value::Str("2023-12".into()),
            &Value::Str("2024-01".into()),
            &Value::Str("2024-02".into()),
            &Value::Str("2024-03".into()),
        ]
    );
    assert_eq!(result.rows[2]["orders.total_amount"], Value::Float(125.0));
}

#[test]
fn test_multi_key_sort_precedence() {
    let mut model = QueryModel::new();
    model.add_field(dimension("customers", "country"));
    model.add_field(SelectedField::new(
        "orders",
        "total_amount",
        ColumnType::Numeric,
        ColumnRole::Measure,
    ));
    model.add_sort(SortRule::new("customers", "country", SortDirection::Asc));
    model.add_sort(SortRule::new("orders", "total_amount", SortDirection::Desc));

    let result = run(&model);
    let rows: Vec<(&Value, &Value)> = result
        .rows
        .iter()
        .map(|r| (&r["customers.country"], &r["orders.total_amount"]))
        .collect();
    assert_eq!(
        rows,
        vec![
            (&Value::Str("France".into()), &Value::Float(100.0)),
            (&Value::Str("France".into()), &Value::Float(50.0)),
            (&Value::Str("France".into()), &Value::Float(10.0)),
            (&Value::Str("Germany".into()), &Value::Float(75.0)),
            (&Value::Str("Germany".into()), &Value::Float(25.0)),
        ]
    );
}

#[test]
fn test_limit_truncates_after_sort() {
    let mut model = projection_model();
    model.add_field(SelectedField::new(
        "orders",
        "total_amount",
        ColumnType::Numeric,
        ColumnRole::Measure,
    ));
    model.add_sort(SortRule::new("orders", "total_amount", SortDirection::Desc));
    model.set_limit(2);

    let result = run(&model);
    assert_eq!(result.row_count, 2);
    assert_eq!(result.total_row_count, 5);
    assert_eq!(result.rows[0]["orders.id"], Value::Str("o1".into()));
    assert_eq!(result.rows[1]["orders.id"], Value::Str("o3".into()));
}

#[test]
fn test_projection_pass_keeps_row_count() {
    let result = run(&projection_model());
    assert_eq!(result.row_count, 5);
    assert_eq!(result.total_row_count, 5);
    // only requested columns survive projection
    assert!(result.rows[0].contains_key("orders.id"));
    assert!(!result.rows[0].contains_key("orders.total_amount"));
}
