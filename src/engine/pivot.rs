//! Pivot-table computation over the joined row set.

use std::collections::{BTreeSet, HashMap};

use crate::catalog::{Catalog, JoinGraph};
use crate::model::{Filter, SelectedField};

use super::dataset::{ColumnKey, DataSet};
use super::execute::{apply_filters, join_rows};
use super::granularity::apply_granularity;
use super::Value;

/// A pivoted result: one output row per distinct row-field tuple, one
/// output column per row field plus one per distinct column-field value.
#[derive(Debug, Clone, PartialEq)]
pub struct PivotResult {
    /// Output column keys: the row-field keys first, then the sorted
    /// distinct column values.
    pub columns: Vec<String>,
    pub rows: Vec<HashMap<String, Value>>,
}

/// Cross-tabulate the measure over row and column dimensions.
///
/// The measure is always summed; non-numeric measure values count as zero.
/// Cells with no contributing rows are zero, not null. Row tuples appear in
/// first-occurrence order, column values sorted ascending.
pub fn compute_pivot(
    row_fields: &[SelectedField],
    col_field: &SelectedField,
    measure_field: &SelectedField,
    filters: &[Filter],
    catalog: &Catalog,
    data: &DataSet,
) -> PivotResult {
    let mut required: Vec<String> = Vec::new();
    let mut add = |name: &str| {
        if !required.iter().any(|t| t == name) {
            required.push(name.to_string());
        }
    };
    for field in row_fields {
        add(&field.table_name);
    }
    add(&col_field.table_name);
    add(&measure_field.table_name);
    for filter in filters {
        add(&filter.table_name);
    }

    let plan = JoinGraph::new(catalog).resolve(&required);
    let mut rows = join_rows(&plan, data);
    if !filters.is_empty() {
        rows = apply_filters(rows, filters);
    }

    let measure_key = ColumnKey::new(&measure_field.table_name, &measure_field.name);
    let col_key = ColumnKey::new(&col_field.table_name, &col_field.name);

    let mut col_values: BTreeSet<String> = BTreeSet::new();
    let mut tuple_index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut cells: Vec<(Vec<String>, HashMap<String, f64>)> = Vec::new();

    for row in &rows {
        let tuple: Vec<String> = row_fields
            .iter()
            .map(|field| {
                let key = ColumnKey::new(&field.table_name, &field.name);
                let value = row.get(&key).cloned().unwrap_or(Value::Null);
                apply_granularity(&value, field.date_granularity).display()
            })
            .collect();

        let col_value = {
            let value = row.get(&col_key).cloned().unwrap_or(Value::Null);
            apply_granularity(&value, col_field.date_granularity).display()
        };
        col_values.insert(col_value.clone());

        let measure = row.get(&measure_key).map_or(0.0, Value::to_f64);
        let measure = if measure.is_nan() { 0.0 } else { measure };

        let idx = match tuple_index.get(&tuple) {
            Some(&idx) => idx,
            None => {
                tuple_index.insert(tuple.clone(), cells.len());
                cells.push((tuple, HashMap::new()));
                cells.len() - 1
            }
        };
        *cells[idx].1.entry(col_value).or_insert(0.0) += measure;
    }

    let row_keys: Vec<String> = row_fields.iter().map(SelectedField::key).collect();

    let mut columns = row_keys.clone();
    columns.extend(col_values.iter().cloned());

    let rows = cells
        .into_iter()
        .map(|(tuple, sums)| {
            let mut out: HashMap<String, Value> = row_keys
                .iter()
                .cloned()
                .zip(tuple.into_iter().map(Value::Str))
                .collect();
            for col_value in &col_values {
                let sum = sums.get(col_value).copied().unwrap_or(0.0);
                out.insert(col_value.clone(), Value::Float(sum));
            }
            out
        })
        .collect();

    PivotResult { columns, rows }
}
