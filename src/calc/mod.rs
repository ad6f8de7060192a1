//! Calculated-column evaluation over a materialized result.
//!
//! Runs after the engine (or remote execution) has produced a
//! [`QueryResult`]: each calculated column appends one synthetic numeric
//! column, derived row-by-row from columns already present. Calculated
//! columns never reach the SQL compiler.

use crate::catalog::{ColumnRole, ColumnType};
use crate::engine::Value;
use crate::model::{CalcFormula, CalculatedColumn};
use crate::result::{ColumnMeta, QueryResult};

use std::collections::HashMap;

/// Append one column per calculated column to a fresh copy of the result.
///
/// Columns are evaluated in list order, so a later column may reference an
/// earlier one's `calc_<id>` key. The input result is never mutated.
pub fn apply_calculated_columns(
    result: &QueryResult,
    columns: &[CalculatedColumn],
) -> QueryResult {
    let mut out = result.clone();

    for calc in columns {
        let key = calc.key();
        let values = evaluate(&out.rows, &calc.formula);
        for (row, value) in out.rows.iter_mut().zip(values) {
            row.insert(key.clone(), value);
        }
        out.columns.push(ColumnMeta::new(
            &key,
            &calc.label,
            ColumnType::Numeric,
            "",
            ColumnRole::Measure,
        ));
    }

    out
}

fn evaluate(rows: &[HashMap<String, Value>], formula: &CalcFormula) -> Vec<Value> {
    match formula {
        CalcFormula::Add { a, b } => {
            rows.iter().map(|r| Value::Float(operand(r, a) + operand(r, b))).collect()
        }
        CalcFormula::Subtract { a, b } => {
            rows.iter().map(|r| Value::Float(operand(r, a) - operand(r, b))).collect()
        }
        CalcFormula::Multiply { a, b } => {
            rows.iter().map(|r| Value::Float(operand(r, a) * operand(r, b))).collect()
        }
        CalcFormula::Divide { a, b } => rows
            .iter()
            .map(|r| {
                let divisor = operand(r, b);
                if divisor == 0.0 {
                    Value::Null
                } else {
                    Value::Float(operand(r, a) / divisor)
                }
            })
            .collect(),
        CalcFormula::Margin { a, b } => rows
            .iter()
            .map(|r| {
                let base = operand(r, a);
                if base == 0.0 {
                    Value::Null
                } else {
                    Value::Float((base - operand(r, b)) / base * 100.0)
                }
            })
            .collect(),
        CalcFormula::PctOfTotal { a } => {
            // Total over the materialized result, so grouped values count
            // once each
            let total: f64 = rows.iter().map(|r| operand(r, a)).sum();
            rows.iter()
                .map(|r| {
                    if total == 0.0 {
                        Value::Null
                    } else {
                        Value::Float(operand(r, a) / total * 100.0)
                    }
                })
                .collect()
        }
        CalcFormula::RunningTotal { a } => {
            let mut running = 0.0;
            rows.iter()
                .map(|r| {
                    running += operand(r, a);
                    Value::Float(running)
                })
                .collect()
        }
        // Expression text is captured but not evaluated; the source value
        // passes through unchanged
        CalcFormula::Custom { a, .. } => rows
            .iter()
            .map(|r| r.get(a).cloned().unwrap_or(Value::Null))
            .collect(),
    }
}

/// Numeric operand lookup: missing cells and unparseable strings count as 0.
fn operand(row: &HashMap<String, Value>, key: &str) -> f64 {
    let n = row.get(key).map_or(0.0, Value::to_f64);
    if n.is_nan() {
        0.0
    } else {
        n
    }
}
