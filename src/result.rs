//! Tabular query results.
//!
//! A [`QueryResult`] is immutable once produced; downstream stages (the
//! calculated-column evaluator) return a new result rather than mutating
//! in place.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::catalog::{ColumnRole, ColumnType};
use crate::engine::Value;

/// Output column descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnMeta {
    /// Key under which row values are stored (`"table.column"`, an
    /// aggregation alias, or `calc_<id>` for derived columns).
    pub key: String,
    /// Display name.
    pub name: String,
    pub column_type: ColumnType,
    pub table_name: String,
    pub role: ColumnRole,
}

impl ColumnMeta {
    pub fn new(
        key: &str,
        name: &str,
        column_type: ColumnType,
        table_name: &str,
        role: ColumnRole,
    ) -> Self {
        Self {
            key: key.into(),
            name: name.into(),
            column_type,
            table_name: table_name.into(),
            role,
        }
    }
}

/// A materialized tabular result.
///
/// Rows are heterogeneous maps keyed by the same `key` used in `columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    pub columns: Vec<ColumnMeta>,
    pub rows: Vec<HashMap<String, Value>>,
    pub row_count: usize,
    /// Row count before the limit was applied.
    pub total_row_count: usize,
    pub execution_time_ms: u64,
}

impl QueryResult {
    /// An empty result with no columns.
    pub fn empty() -> Self {
        Self {
            columns: Vec::new(),
            rows: Vec::new(),
            row_count: 0,
            total_row_count: 0,
            execution_time_ms: 0,
        }
    }

    pub fn column(&self, key: &str) -> Option<&ColumnMeta> {
        self.columns.iter().find(|c| c.key == key)
    }
}
