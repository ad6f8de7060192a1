//! Integration tests for calculated columns applied to engine results.

use quarry::calc::apply_calculated_columns;
use quarry::engine::{execute, DataSet, Value};
use quarry::prelude::*;

fn catalog() -> Catalog {
    Catalog::new(
        vec![Table::new(
            "orders",
            TableKind::Fact,
            vec![
                Column::new("status", ColumnType::Text, ColumnRole::Dimension),
                Column::new("total_amount", ColumnType::Numeric, ColumnRole::Measure),
                Column::new("shipping_cost", ColumnType::Numeric, ColumnRole::Measure),
            ],
        )],
        vec![],
    )
}

fn data() -> DataSet {
    let mut data = DataSet::new();
    data.insert_table_json(
        "orders",
        vec![
            serde_json::json!({"status": "completed", "total_amount": 100.0, "shipping_cost": 10.0}),
            serde_json::json!({"status": "pending", "total_amount": 50.0, "shipping_cost": 5.0}),
            serde_json::json!({"status": "cancelled", "total_amount": 0.0, "shipping_cost": 2.0}),
        ],
    );
    data
}

fn grouped_result() -> QueryResult {
    let mut model = QueryModel::new();
    model.add_field(SelectedField::new(
        "orders",
        "status",
        ColumnType::Text,
        ColumnRole::Dimension,
    ));
    model.add_field(
        SelectedField::new("orders", "total_amount", ColumnType::Numeric, ColumnRole::Measure)
            .with_aggregation(Aggregation::Sum),
    );
    model.add_field(
        SelectedField::new("orders", "shipping_cost", ColumnType::Numeric, ColumnRole::Measure)
            .with_aggregation(Aggregation::Sum),
    );
    model.add_sort(SortRule::new("orders", "total_amount", SortDirection::Desc));
    execute(&model, &catalog(), &data())
}

#[test]
fn test_running_total_is_non_decreasing() {
    let result = grouped_result();
    let calc = CalculatedColumn::new(
        "Running revenue",
        CalcFormula::RunningTotal {
            a: "orders.total_amount".into(),
        },
    );
    let out = apply_calculated_columns(&result, &[calc.clone()]);

    let values: Vec<f64> = out.rows.iter().map(|r| r[&calc.key()].to_f64()).collect();
    assert_eq!(values, vec![100.0, 150.0, 150.0]);
    assert!(values.windows(2).all(|w| w[0] <= w[1]));
}

#[test]
fn test_margin_null_exactly_on_zero_base() {
    let result = grouped_result();
    let calc = CalculatedColumn::new(
        "Margin %",
        CalcFormula::Margin {
            a: "orders.total_amount".into(),
            b: "orders.shipping_cost".into(),
        },
    );
    let out = apply_calculated_columns(&result, &[calc.clone()]);

    assert_eq!(out.rows[0][&calc.key()], Value::Float(90.0));
    // the cancelled group has a zero base
    assert_eq!(out.rows[2][&calc.key()], Value::Null);
}

#[test]
fn test_divide_null_exactly_on_zero_divisor() {
    let result = grouped_result();
    let calc = CalculatedColumn::new(
        "Cost ratio",
        CalcFormula::Divide {
            a: "orders.shipping_cost".into(),
            b: "orders.total_amount".into(),
        },
    );
    let out = apply_calculated_columns(&result, &[calc.clone()]);

    assert_eq!(out.rows[0][&calc.key()], Value::Float(0.1));
    assert_eq!(out.rows[1][&calc.key()], Value::Float(0.1));
    assert_eq!(out.rows[2][&calc.key()], Value::Null);
}

#[test]
fn test_pct_of_total_over_grouped_result() {
    let result = grouped_result();
    let calc = CalculatedColumn::new(
        "Share %",
        CalcFormula::PctOfTotal {
            a: "orders.total_amount".into(),
        },
    );
    let out = apply_calculated_columns(&result, &[calc.clone()]);

    // percentages of the grouped sums, not the raw source rows
    let shares: Vec<&Value> = out.rows.iter().map(|r| &r[&calc.key()]).collect();
    assert_eq!(
        shares,
        vec![
            &Value::Float(100.0 / 150.0 * 100.0),
            &Value::Float(50.0 / 150.0 * 100.0),
            &Value::Float(0.0),
        ]
    );
}

#[test]
fn test_calc_column_metadata_appended() {
    let result = grouped_result();
    let calc = CalculatedColumn::new(
        "Net",
        CalcFormula::Subtract {
            a: "orders.total_amount".into(),
            b: "orders.shipping_cost".into(),
        },
    );
    let out = apply_calculated_columns(&result, &[calc.clone()]);

    let meta = out.column(&calc.key()).unwrap();
    assert_eq!(meta.name, "Net");
    assert_eq!(meta.column_type, ColumnType::Numeric);
    // input untouched
    assert!(result.column(&calc.key()).is_none());
}

#[test]
fn test_no_calculated_columns_is_a_copy() {
    let result = grouped_result();
    let out = apply_calculated_columns(&result, &[]);
    assert_eq!(out, result);
}
