//! Query model - the declarative, serializable representation of user intent.
//!
//! A [`QueryModel`] is built up by discrete edit actions (add/remove field,
//! add/remove filter, ...) and consumed whole by the compiler and the engine
//! on every run. It carries no behavior beyond those edits.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::catalog::{ColumnRole, ColumnType};

/// Aggregation applied to a measure.
///
/// Meaningful only when the field's role is `Measure`; `None` otherwise.
/// `Median` is accepted by the model and emitted verbatim in SQL, but the
/// in-memory engine has no implementation for it and aggregates it to null.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Aggregation {
    #[default]
    #[serde(rename = "none")]
    None,
    Sum,
    Avg,
    Count,
    CountDistinct,
    Min,
    Max,
    Median,
}

impl Aggregation {
    /// SQL function name, `None` for the no-aggregation case.
    pub fn sql_name(&self) -> Option<&'static str> {
        match self {
            Aggregation::None => None,
            Aggregation::Sum => Some("SUM"),
            Aggregation::Avg => Some("AVG"),
            Aggregation::Count => Some("COUNT"),
            Aggregation::CountDistinct => Some("COUNT_DISTINCT"),
            Aggregation::Min => Some("MIN"),
            Aggregation::Max => Some("MAX"),
            Aggregation::Median => Some("MEDIAN"),
        }
    }

    /// Alias prefix: `sum_total_amount`, `count_distinct_id`, ...
    pub fn alias_prefix(&self) -> Option<String> {
        self.sql_name().map(|n| n.to_lowercase())
    }

    pub fn is_aggregating(&self) -> bool {
        *self != Aggregation::None
    }
}

/// Temporal truncation applied to a date dimension.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateGranularity {
    #[default]
    Raw,
    Year,
    Quarter,
    Month,
    Week,
    Day,
}

impl DateGranularity {
    /// Name used inside `DATE_TRUNC('...')` and in output aliases.
    pub fn name(&self) -> &'static str {
        match self {
            DateGranularity::Raw => "raw",
            DateGranularity::Year => "year",
            DateGranularity::Quarter => "quarter",
            DateGranularity::Month => "month",
            DateGranularity::Week => "week",
            DateGranularity::Day => "day",
        }
    }

    pub fn is_bucketing(&self) -> bool {
        *self != DateGranularity::Raw
    }
}

/// A windowed derived measure rendered via SQL window functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuickCalc {
    #[default]
    None,
    PctOfTotal,
    RunningTotal,
    Difference,
    PctChange,
    Rank,
    CumulativeAvg,
}

impl QuickCalc {
    /// Alias prefix for the windowed expression's output column.
    pub fn alias_prefix(&self) -> Option<&'static str> {
        match self {
            QuickCalc::None => None,
            QuickCalc::PctOfTotal => Some("pct"),
            QuickCalc::RunningTotal => Some("running"),
            QuickCalc::Difference => Some("diff"),
            QuickCalc::PctChange => Some("pct_chg"),
            QuickCalc::Rank => Some("rank"),
            QuickCalc::CumulativeAvg => Some("cum_avg"),
        }
    }
}

/// A field the user has placed on the query.
///
/// `id` is `"table.column"` and unique within a model; adding a duplicate is
/// a no-op. `aggregation` is meaningful only for measures, `date_granularity`
/// only for date-typed fields - both default to their inert variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SelectedField {
    pub id: String,
    pub name: String,
    pub table_name: String,
    pub column_type: ColumnType,
    pub role: ColumnRole,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default)]
    pub date_granularity: DateGranularity,
    #[serde(default)]
    pub quick_calc: QuickCalc,
}

impl SelectedField {
    pub fn new(table_name: &str, name: &str, column_type: ColumnType, role: ColumnRole) -> Self {
        Self {
            id: format!("{table_name}.{name}"),
            name: name.into(),
            table_name: table_name.into(),
            column_type,
            role,
            aggregation: Aggregation::None,
            date_granularity: DateGranularity::Raw,
            quick_calc: QuickCalc::None,
        }
    }

    pub fn with_aggregation(mut self, aggregation: Aggregation) -> Self {
        self.aggregation = aggregation;
        self
    }

    pub fn with_granularity(mut self, granularity: DateGranularity) -> Self {
        self.date_granularity = granularity;
        self
    }

    pub fn with_quick_calc(mut self, quick_calc: QuickCalc) -> Self {
        self.quick_calc = quick_calc;
        self
    }

    /// Row/column key in engine results: `"table.column"`.
    pub fn key(&self) -> String {
        format!("{}.{}", self.table_name, self.name)
    }
}

/// Filter comparison operators.
///
/// Operator legality is type-scoped by the caller (temporal operators for
/// date columns, comparisons for numerics, substring tests for text); the
/// compiler does not validate combinations defensively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterOperator {
    Equals,
    NotEquals,
    Contains,
    NotContains,
    Gt,
    Gte,
    Lt,
    Lte,
    Between,
    In,
    IsNull,
    IsNotNull,
    StartsWith,
    EndsWith,
    DateEquals,
    DateBefore,
    DateAfter,
}

impl FilterOperator {
    /// Range-like operators populate `value2`.
    pub fn uses_second_value(&self) -> bool {
        matches!(self, FilterOperator::Between)
    }
}

/// A filter predicate over one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Filter {
    pub id: String,
    pub column: String,
    pub table_name: String,
    pub column_type: ColumnType,
    pub operator: FilterOperator,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value2: Option<String>,
}

impl Filter {
    pub fn new(
        table_name: &str,
        column: &str,
        column_type: ColumnType,
        operator: FilterOperator,
        value: &str,
    ) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            column: column.into(),
            table_name: table_name.into(),
            column_type,
            operator,
            value: value.into(),
            value2: None,
        }
    }

    pub fn with_value2(mut self, value2: &str) -> Self {
        self.value2 = Some(value2.into());
        self
    }
}

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

/// A sort rule. List order defines tie-break precedence (first is primary).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SortRule {
    pub id: String,
    pub column: String,
    pub table_name: String,
    pub direction: SortDirection,
}

impl SortRule {
    pub fn new(table_name: &str, column: &str, direction: SortDirection) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            column: column.into(),
            table_name: table_name.into(),
            direction,
        }
    }
}

/// Formula of a calculated column, each variant carrying exactly the
/// operands it needs. Operand strings are result-column keys
/// (`"table.column"` or an aggregation alias key).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "formula", rename_all = "snake_case")]
pub enum CalcFormula {
    Add { a: String, b: String },
    Subtract { a: String, b: String },
    Multiply { a: String, b: String },
    Divide { a: String, b: String },
    /// `(a - b) / a * 100`
    Margin { a: String, b: String },
    /// `a / sum(a over all rows) * 100`, over the materialized result.
    PctOfTotal { a: String },
    /// Prefix sum of `a` in current row order.
    RunningTotal { a: String },
    /// Free-text expression. Captured but not evaluated: the value of `a`
    /// passes through unchanged. Acknowledged stub, kept as-is.
    Custom { a: String, expression: String },
}

/// A derived numeric column applied after the base result exists.
/// Never participates in SQL generation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalculatedColumn {
    pub id: String,
    pub label: String,
    #[serde(flatten)]
    pub formula: CalcFormula,
}

impl CalculatedColumn {
    pub fn new(label: &str, formula: CalcFormula) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            label: label.into(),
            formula,
        }
    }

    /// Key of the synthetic output column.
    pub fn key(&self) -> String {
        format!("calc_{}", self.id)
    }
}

/// Whether the model drives generation or the user supplied raw SQL.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum QueryMode {
    #[default]
    Visual,
    RawSql {
        sql: String,
    },
}

/// Default row limit for a fresh explorer session.
pub const DEFAULT_LIMIT: u64 = 500;

/// The aggregate root: everything the user has asked for.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryModel {
    pub fields: Vec<SelectedField>,
    pub calculated_columns: Vec<CalculatedColumn>,
    pub filters: Vec<Filter>,
    pub sort_rules: Vec<SortRule>,
    pub limit: u64,
    #[serde(default)]
    pub mode: QueryMode,
}

impl Default for QueryModel {
    fn default() -> Self {
        Self {
            fields: Vec::new(),
            calculated_columns: Vec::new(),
            filters: Vec::new(),
            sort_rules: Vec::new(),
            limit: DEFAULT_LIMIT,
            mode: QueryMode::Visual,
        }
    }
}

impl QueryModel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a field. Duplicate ids are no-ops.
    pub fn add_field(&mut self, field: SelectedField) {
        if self.fields.iter().any(|f| f.id == field.id) {
            return;
        }
        self.fields.push(field);
    }

    pub fn remove_field(&mut self, field_id: &str) {
        self.fields.retain(|f| f.id != field_id);
    }

    pub fn set_aggregation(&mut self, field_id: &str, aggregation: Aggregation) {
        if let Some(f) = self.fields.iter_mut().find(|f| f.id == field_id) {
            f.aggregation = aggregation;
        }
    }

    pub fn set_granularity(&mut self, field_id: &str, granularity: DateGranularity) {
        if let Some(f) = self.fields.iter_mut().find(|f| f.id == field_id) {
            f.date_granularity = granularity;
        }
    }

    pub fn set_quick_calc(&mut self, field_id: &str, quick_calc: QuickCalc) {
        if let Some(f) = self.fields.iter_mut().find(|f| f.id == field_id) {
            f.quick_calc = quick_calc;
        }
    }

    /// Add a filter. Duplicate ids are no-ops.
    pub fn add_filter(&mut self, filter: Filter) {
        if self.filters.iter().any(|f| f.id == filter.id) {
            return;
        }
        self.filters.push(filter);
    }

    pub fn remove_filter(&mut self, filter_id: &str) {
        self.filters.retain(|f| f.id != filter_id);
    }

    pub fn update_filter(&mut self, filter_id: &str, update: impl FnOnce(&mut Filter)) {
        if let Some(f) = self.filters.iter_mut().find(|f| f.id == filter_id) {
            update(f);
        }
    }

    /// Add a sort rule. Duplicate ids are no-ops.
    pub fn add_sort(&mut self, sort: SortRule) {
        if self.sort_rules.iter().any(|s| s.id == sort.id) {
            return;
        }
        self.sort_rules.push(sort);
    }

    pub fn remove_sort(&mut self, sort_id: &str) {
        self.sort_rules.retain(|s| s.id != sort_id);
    }

    pub fn add_calculated_column(&mut self, column: CalculatedColumn) {
        if self.calculated_columns.iter().any(|c| c.id == column.id) {
            return;
        }
        self.calculated_columns.push(column);
    }

    pub fn remove_calculated_column(&mut self, column_id: &str) {
        self.calculated_columns.retain(|c| c.id != column_id);
    }

    pub fn set_limit(&mut self, limit: u64) {
        self.limit = limit;
    }

    /// Fields with role `Dimension`, in insertion order.
    pub fn dimensions(&self) -> impl Iterator<Item = &SelectedField> {
        self.fields.iter().filter(|f| f.role == ColumnRole::Dimension)
    }

    /// Fields with role `Measure`, in insertion order.
    pub fn measures(&self) -> impl Iterator<Item = &SelectedField> {
        self.fields.iter().filter(|f| f.role == ColumnRole::Measure)
    }

    /// Does any measure actually aggregate?
    pub fn has_aggregation(&self) -> bool {
        self.measures().any(|m| m.aggregation.is_aggregating())
    }

    /// Tables referenced by fields, filters and sorts, first-reference order.
    pub fn required_tables(&self) -> Vec<String> {
        let mut tables: Vec<String> = Vec::new();
        let mut add = |name: &str| {
            if !tables.iter().any(|t| t == name) {
                tables.push(name.to_string());
            }
        };
        for f in &self.fields {
            add(&f.table_name);
        }
        for f in &self.filters {
            add(&f.table_name);
        }
        for s in &self.sort_rules {
            add(&s.table_name);
        }
        tables
    }
}
