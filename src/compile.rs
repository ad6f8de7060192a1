//! Query model → SQL text.
//!
//! `compile` is a pure function over the model and the catalog: it is rerun
//! from scratch on every model change, never incrementally patched. Join
//! resolution goes through the shared [`JoinPlan`] so the compiler and the
//! in-memory engine drop unreachable tables identically.

use crate::catalog::{Catalog, ColumnType, JoinGraph, JoinPlan};
use crate::model::{
    Aggregation, Filter, FilterOperator, QueryModel, QuickCalc, SelectedField, SortDirection,
};
use crate::sql::expr::{
    self, avg, col, count, count_distinct, func, lag, lit_int, lit_str, max, min, rank, sum,
    table_col, Expr, ExprExt, WindowExt, WindowOrderBy,
};
use crate::sql::query::{JoinType, OrderByExpr, Query, SelectExpr, TableRef};
use crate::sql::Dialect;

/// Returned instead of SQL when the model has no selected fields.
pub const EMPTY_MODEL_PLACEHOLDER: &str = "-- Select fields to generate SQL";

/// Compile a model to SQL text using the default dialect.
pub fn compile(model: &QueryModel, catalog: &Catalog) -> String {
    compile_for_dialect(model, catalog, Dialect::default())
}

/// Compile a model to SQL text for a specific dialect.
pub fn compile_for_dialect(model: &QueryModel, catalog: &Catalog, dialect: Dialect) -> String {
    match compile_query(model, catalog) {
        Some(query) => query.to_sql(dialect),
        None => EMPTY_MODEL_PLACEHOLDER.into(),
    }
}

/// Compile a model to a [`Query`] AST. `None` when no fields are selected.
pub fn compile_query(model: &QueryModel, catalog: &Catalog) -> Option<Query> {
    if model.fields.is_empty() {
        return None;
    }

    let dimensions: Vec<&SelectedField> = model.dimensions().collect();
    let measures: Vec<&SelectedField> = model.measures().collect();

    let mut query = Query::new();

    // SELECT: dimensions first, then measures, each in insertion order
    for field in &dimensions {
        query = query.select_item(dimension_select(field));
    }

    // Quick-calc windows order by the first dimension, or a constant when
    // the query has none
    let window_order = dimensions
        .first()
        .map(|d| table_col(&d.table_name, &d.name))
        .unwrap_or_else(|| lit_int(1));

    for field in &measures {
        query = query.select_item(measure_select(field, &window_order));
    }

    // FROM / JOINs through the shared join plan
    let plan = join_plan(model, catalog);
    if let Some(base) = &plan.base {
        query = query.from(TableRef::new(base));
    }
    for join in &plan.joins {
        let join_type = match join.kind {
            crate::catalog::JoinKind::Left => JoinType::Left,
            crate::catalog::JoinKind::Inner => JoinType::Inner,
        };
        query = query.join(
            join_type,
            TableRef::new(&join.table),
            table_col(&join.source_table, &join.source_column)
                .eq(table_col(&join.target_table, &join.target_column)),
        );
    }

    // WHERE: conjunction over all filters
    for filter in &model.filters {
        query = query.filter(filter_predicate(filter));
    }

    // GROUP BY: only when something aggregates, repeating the dimension
    // projection expressions in SELECT order
    if model.has_aggregation() && !dimensions.is_empty() {
        query = query.group_by(dimensions.iter().map(|d| dimension_expr(d)).collect());
    }

    // ORDER BY addresses output aliases, never qualified source columns:
    // aggregated and windowed expressions have no other stable name
    let order_by: Vec<OrderByExpr> = model
        .sort_rules
        .iter()
        .map(|sort| {
            let alias = output_alias(model, &sort.table_name, &sort.column);
            match sort.direction {
                SortDirection::Asc => OrderByExpr::asc(col(&alias)),
                SortDirection::Desc => OrderByExpr::desc(col(&alias)),
            }
        })
        .collect();
    query = query.order_by(order_by);

    if model.limit > 0 {
        query = query.limit(model.limit);
    }

    Some(query)
}

/// Resolve the join plan for a model. Shared with the engine.
pub fn join_plan(model: &QueryModel, catalog: &Catalog) -> JoinPlan {
    JoinGraph::new(catalog).resolve(&model.required_tables())
}

fn dimension_expr(field: &SelectedField) -> Expr {
    let base = table_col(&field.table_name, &field.name);
    if field.date_granularity.is_bucketing() {
        func(
            "DATE_TRUNC",
            vec![lit_str(field.date_granularity.name()), base],
        )
    } else {
        base
    }
}

fn dimension_select(field: &SelectedField) -> SelectExpr {
    let expr = dimension_expr(field);
    if field.date_granularity.is_bucketing() {
        SelectExpr::new(expr).with_alias(&format!(
            "{}_{}",
            field.name,
            field.date_granularity.name()
        ))
    } else {
        SelectExpr::new(expr)
    }
}

fn aggregate_expr(field: &SelectedField) -> Expr {
    let base = table_col(&field.table_name, &field.name);
    match field.aggregation {
        Aggregation::None => base,
        Aggregation::Sum => sum(base),
        Aggregation::Avg => avg(base),
        Aggregation::Count => count(base),
        Aggregation::CountDistinct => count_distinct(base),
        Aggregation::Min => min(base),
        Aggregation::Max => max(base),
        Aggregation::Median => func("MEDIAN", vec![base]),
    }
}

fn measure_alias(field: &SelectedField) -> String {
    match field.aggregation.alias_prefix() {
        Some(prefix) => format!("{}_{}", prefix, field.name),
        None => field.name.clone(),
    }
}

fn measure_select(field: &SelectedField, window_order: &Expr) -> SelectExpr {
    let base = aggregate_expr(field);

    let Some(prefix) = field.quick_calc.alias_prefix() else {
        return SelectExpr::new(base).with_alias(&measure_alias(field));
    };

    let alias = format!("{}_{}", prefix, field.name);
    let order = vec![WindowOrderBy::new(window_order.clone())];

    let expr = match field.quick_calc {
        QuickCalc::None => unreachable!("alias_prefix is None for QuickCalc::None"),
        QuickCalc::PctOfTotal => base
            .clone()
            .mul(100.0)
            .div(sum(base).over().build()),
        QuickCalc::RunningTotal => sum(base).over().order_by(order).build(),
        QuickCalc::Difference => {
            let lagged = lag(base.clone()).over().order_by(order).build();
            base.sub(lagged)
        }
        QuickCalc::PctChange => {
            let lagged = lag(base.clone()).over().order_by(order.clone()).build();
            let lagged_divisor = lag(base.clone()).over().order_by(order).build();
            func(
                "ROUND",
                vec![
                    base.sub(lagged)
                        .paren()
                        .mul(100.0)
                        .div(func("NULLIF", vec![lagged_divisor, lit_int(0)])),
                    lit_int(2),
                ],
            )
        }
        QuickCalc::Rank => rank()
            .over()
            .order_by(vec![WindowOrderBy::desc(base)])
            .build(),
        QuickCalc::CumulativeAvg => avg(base)
            .over()
            .order_by(order)
            .rows_to_current()
            .build(),
    };

    SelectExpr::new(expr).with_alias(&alias)
}

fn filter_predicate(filter: &Filter) -> Expr {
    let column = table_col(&filter.table_name, &filter.column);
    match filter.operator {
        FilterOperator::Equals => column.eq(lit_str(&filter.value)),
        FilterOperator::NotEquals => column.ne(lit_str(&filter.value)),
        FilterOperator::Contains => column.like(format!("%{}%", filter.value).as_str()),
        FilterOperator::NotContains => column.not_like(format!("%{}%", filter.value).as_str()),
        FilterOperator::StartsWith => column.like(format!("{}%", filter.value).as_str()),
        FilterOperator::EndsWith => column.like(format!("%{}", filter.value).as_str()),
        FilterOperator::Gt => column.gt(value_literal(filter, &filter.value)),
        FilterOperator::Gte => column.gte(value_literal(filter, &filter.value)),
        FilterOperator::Lt => column.lt(value_literal(filter, &filter.value)),
        FilterOperator::Lte => column.lte(value_literal(filter, &filter.value)),
        FilterOperator::Between => {
            let low = value_literal(filter, &filter.value);
            let high = value_literal(filter, filter.value2.as_deref().unwrap_or("0"));
            column.between(low, high)
        }
        FilterOperator::In => {
            let values = filter
                .value
                .split(',')
                .map(|v| lit_str(v.trim()))
                .collect();
            column.in_list(values)
        }
        FilterOperator::IsNull => column.is_null(),
        FilterOperator::IsNotNull => column.is_not_null(),
        FilterOperator::DateEquals => column.eq(lit_str(&filter.value)),
        FilterOperator::DateBefore => column.lt(lit_str(&filter.value)),
        FilterOperator::DateAfter => column.gt(lit_str(&filter.value)),
    }
}

/// Literal for comparison operands: numeric columns compare against numeric
/// literals (unparseable input degrades to 0), everything else against
/// strings.
fn value_literal(filter: &Filter, raw: &str) -> Expr {
    if filter.column_type == ColumnType::Numeric {
        if let Ok(n) = raw.trim().parse::<i64>() {
            return lit_int(n);
        }
        if let Ok(f) = raw.trim().parse::<f64>() {
            return expr::lit_float(f);
        }
        return lit_int(0);
    }
    lit_str(raw)
}

/// Resolve the ORDER BY alias for a sorted column: the quick-calc alias,
/// the aggregation alias, the granularity alias, or the bare column name.
fn output_alias(model: &QueryModel, table_name: &str, column: &str) -> String {
    let field = model
        .fields
        .iter()
        .find(|f| f.table_name == table_name && f.name == column);

    match field {
        Some(f) => {
            if let Some(prefix) = f.quick_calc.alias_prefix() {
                format!("{}_{}", prefix, f.name)
            } else if f.aggregation.is_aggregating() {
                measure_alias(f)
            } else if f.date_granularity.is_bucketing() {
                format!("{}_{}", f.name, f.date_granularity.name())
            } else {
                f.name.clone()
            }
        }
        None => column.to_string(),
    }
}
