//! The interpretation pipeline: join → filter → group/aggregate → sort → limit.

use std::collections::{HashMap, HashSet};
use std::time::Instant;

use crate::catalog::{Catalog, ColumnType, JoinGraph, JoinKind, JoinPlan};
use crate::model::{Aggregation, Filter, FilterOperator, QueryModel, SelectedField, SortDirection, SortRule};
use crate::result::{ColumnMeta, QueryResult};

use super::dataset::{ColumnKey, DataSet, Row};
use super::granularity::{apply_granularity, parse_date};
use super::Value;

/// Execute a model against the in-memory row store.
///
/// Interprets the same model as the SQL compiler, over concrete rows
/// instead of emitting text. Quick calculations and calculated columns are
/// not evaluated here; the latter are applied downstream by the
/// calculated-column evaluator.
pub fn execute(model: &QueryModel, catalog: &Catalog, data: &DataSet) -> QueryResult {
    let started = Instant::now();

    let plan = JoinGraph::new(catalog).resolve(&model.required_tables());
    let mut rows = join_rows(&plan, data);

    if !model.filters.is_empty() {
        rows = apply_filters(rows, &model.filters);
    }
    let total_row_count = rows.len();

    let mut rows = group_and_aggregate(rows, &model.fields);

    if !model.sort_rules.is_empty() {
        apply_sort(&mut rows, &model.sort_rules);
    }

    if model.limit > 0 {
        rows.truncate(model.limit as usize);
    }

    let columns = model
        .fields
        .iter()
        .map(|f| {
            let column_type = if f.aggregation.is_aggregating() {
                ColumnType::Numeric
            } else {
                f.column_type
            };
            ColumnMeta::new(&f.key(), &f.name, column_type, &f.table_name, f.role)
        })
        .collect();

    let rows: Vec<HashMap<String, Value>> = rows
        .into_iter()
        .map(|row| row.into_iter().map(|(k, v)| (k.to_string(), v)).collect())
        .collect();

    QueryResult {
        row_count: rows.len(),
        columns,
        rows,
        total_row_count,
        execution_time_ms: started.elapsed().as_millis() as u64,
    }
}

/// Materialize the joined row set for a plan.
///
/// Nested-loop equality joins in plan order. LEFT joins keep unmatched
/// left-side rows, INNER joins drop them. Dropped (unreachable) tables
/// contribute nothing, mirroring the compiler's silent join drop.
pub fn join_rows(plan: &JoinPlan, data: &DataSet) -> Vec<Row> {
    let Some(base) = &plan.base else {
        return Vec::new();
    };

    let mut rows = data.prefixed_rows(base);

    for join in &plan.joins {
        let incoming = data.rows(&join.table);

        // The relationship edge may be declared in either direction; probe
        // with the side that is already in the join set.
        let (probe_key, incoming_column) = if join.table == join.target_table {
            (
                ColumnKey::new(&join.source_table, &join.source_column),
                join.target_column.as_str(),
            )
        } else {
            (
                ColumnKey::new(&join.target_table, &join.target_column),
                join.source_column.as_str(),
            )
        };

        rows = rows
            .into_iter()
            .filter_map(|mut row| {
                let matched = row.get(&probe_key).and_then(|probe| {
                    incoming.iter().find(|candidate| {
                        candidate
                            .get(incoming_column)
                            .map_or(false, |v| v.loose_eq(probe))
                    })
                });

                match matched {
                    Some(matching) => {
                        for (column, value) in matching {
                            row.insert(ColumnKey::new(&join.table, column), value.clone());
                        }
                        Some(row)
                    }
                    None => match join.kind {
                        JoinKind::Left => Some(row),
                        JoinKind::Inner => None,
                    },
                }
            })
            .collect();
    }

    rows
}

/// Keep rows matching every filter (conjunction).
pub fn apply_filters(rows: Vec<Row>, filters: &[Filter]) -> Vec<Row> {
    rows.into_iter()
        .filter(|row| filters.iter().all(|f| filter_matches(row, f)))
        .collect()
}

fn filter_matches(row: &Row, filter: &Filter) -> bool {
    let key = ColumnKey::new(&filter.table_name, &filter.column);
    let value = row.get(&key);

    let display_eq = || value.map_or(false, |v| v.display() == filter.value);
    let contains = || {
        value.map_or(false, |v| {
            v.display()
                .to_lowercase()
                .contains(&filter.value.to_lowercase())
        })
    };
    // NaN operands make every comparison false
    let number = || value.map_or(f64::NAN, Value::to_f64);
    let bound = |raw: &str| raw.trim().parse::<f64>().unwrap_or(f64::NAN);

    match filter.operator {
        FilterOperator::Equals => display_eq(),
        FilterOperator::NotEquals => !display_eq(),
        FilterOperator::Contains => contains(),
        FilterOperator::NotContains => !contains(),
        FilterOperator::Gt => number() > bound(&filter.value),
        FilterOperator::Gte => number() >= bound(&filter.value),
        FilterOperator::Lt => number() < bound(&filter.value),
        FilterOperator::Lte => number() <= bound(&filter.value),
        FilterOperator::Between => {
            let n = number();
            n >= bound(&filter.value) && n <= bound(filter.value2.as_deref().unwrap_or("0"))
        }
        FilterOperator::In => value.map_or(false, |v| {
            let shown = v.display();
            filter.value.split(',').any(|item| item.trim() == shown)
        }),
        FilterOperator::IsNull => value.map_or(true, Value::is_null),
        FilterOperator::IsNotNull => value.map_or(false, |v| !v.is_null()),
        FilterOperator::StartsWith => value.map_or(false, |v| {
            v.display()
                .to_lowercase()
                .starts_with(&filter.value.to_lowercase())
        }),
        FilterOperator::EndsWith => value.map_or(false, |v| {
            v.display()
                .to_lowercase()
                .ends_with(&filter.value.to_lowercase())
        }),
        FilterOperator::DateEquals => value
            .and_then(parse_date)
            .map_or(false, |d| d.format("%Y-%m-%d").to_string() == filter.value),
        FilterOperator::DateBefore => match (value.and_then(parse_date), parse_filter_date(filter))
        {
            (Some(v), Some(bound)) => v < bound,
            _ => false,
        },
        FilterOperator::DateAfter => match (value.and_then(parse_date), parse_filter_date(filter)) {
            (Some(v), Some(bound)) => v > bound,
            _ => false,
        },
    }
}

fn parse_filter_date(filter: &Filter) -> Option<chrono::NaiveDate> {
    parse_date(&Value::Str(filter.value.clone()))
}

/// Group rows by the non-aggregated fields and fold each aggregated measure.
///
/// With no aggregating measure this is a projection-only pass: one output
/// row per input row, restricted to the requested columns with granularity
/// transforms applied.
pub fn group_and_aggregate(rows: Vec<Row>, fields: &[SelectedField]) -> Vec<Row> {
    let has_aggregation = fields.iter().any(|f| f.aggregation.is_aggregating());

    if !has_aggregation {
        return rows
            .iter()
            .map(|row| {
                fields
                    .iter()
                    .map(|field| {
                        let key = ColumnKey::new(&field.table_name, &field.name);
                        let value = row.get(&key).cloned().unwrap_or(Value::Null);
                        (key, apply_granularity(&value, field.date_granularity))
                    })
                    .collect()
            })
            .collect();
    }

    let group_fields: Vec<&SelectedField> = fields
        .iter()
        .filter(|f| !f.aggregation.is_aggregating())
        .collect();
    let aggregate_fields: Vec<&SelectedField> = fields
        .iter()
        .filter(|f| f.aggregation.is_aggregating())
        .collect();

    // Insertion-ordered partitions: first occurrence fixes group position
    let mut group_index: HashMap<Vec<String>, usize> = HashMap::new();
    let mut groups: Vec<(Vec<String>, Vec<&Row>)> = Vec::new();

    for row in &rows {
        let key: Vec<String> = group_fields
            .iter()
            .map(|field| {
                let cell = ColumnKey::new(&field.table_name, &field.name);
                let value = row.get(&cell).cloned().unwrap_or(Value::Null);
                apply_granularity(&value, field.date_granularity).display()
            })
            .collect();

        match group_index.get(&key) {
            Some(&idx) => groups[idx].1.push(row),
            None => {
                group_index.insert(key.clone(), groups.len());
                groups.push((key, vec![row]));
            }
        }
    }

    groups
        .into_iter()
        .map(|(key_parts, group_rows)| {
            let mut out: Row = Row::new();

            for (field, part) in group_fields.iter().zip(key_parts) {
                out.insert(
                    ColumnKey::new(&field.table_name, &field.name),
                    Value::Str(part),
                );
            }

            for field in &aggregate_fields {
                let cell = ColumnKey::new(&field.table_name, &field.name);
                let values: Vec<&Value> = group_rows
                    .iter()
                    .filter_map(|r| r.get(&cell))
                    .filter(|v| !v.is_null())
                    .collect();
                out.insert(cell, aggregate(field.aggregation, &values, group_rows.len()));
            }

            out
        })
        .collect()
}

fn aggregate(aggregation: Aggregation, values: &[&Value], group_size: usize) -> Value {
    match aggregation {
        Aggregation::Sum => Value::Float(values.iter().map(|v| v.to_f64()).sum()),
        Aggregation::Avg => {
            if values.is_empty() {
                Value::Float(0.0)
            } else {
                let total: f64 = values.iter().map(|v| v.to_f64()).sum();
                Value::Float(total / values.len() as f64)
            }
        }
        // COUNT counts group rows, nulls included
        Aggregation::Count => Value::Int(group_size as i64),
        Aggregation::CountDistinct => {
            let distinct: HashSet<String> = values.iter().map(|v| v.display()).collect();
            Value::Int(distinct.len() as i64)
        }
        // Empty inputs yield the fold identities (+/- infinity), a display
        // concern rather than an engine failure
        Aggregation::Min => Value::Float(
            values
                .iter()
                .map(|v| v.to_f64())
                .fold(f64::INFINITY, f64::min),
        ),
        Aggregation::Max => Value::Float(
            values
                .iter()
                .map(|v| v.to_f64())
                .fold(f64::NEG_INFINITY, f64::max),
        ),
        // No engine implementation; the compiler still emits MEDIAN() in SQL
        Aggregation::Median | Aggregation::None => Value::Null,
    }
}

/// Stable multi-key sort following rule order; the first rule is primary.
pub fn apply_sort(rows: &mut [Row], sorts: &[SortRule]) {
    rows.sort_by(|a, b| {
        for sort in sorts {
            let key = ColumnKey::new(&sort.table_name, &sort.column);
            let ordering = match (a.get(&key), b.get(&key)) {
                (Some(left), Some(right)) => left.cmp_native(right),
                _ => std::cmp::Ordering::Equal,
            };
            let ordering = match sort.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            if ordering != std::cmp::Ordering::Equal {
                return ordering;
            }
        }
        std::cmp::Ordering::Equal
    });
}
