//! In-memory row store.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::Value;

/// Typed key for joined-row maps: table plus column, never a concatenated
/// string, so keys from different tables cannot collide.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ColumnKey {
    pub table: String,
    pub column: String,
}

impl ColumnKey {
    pub fn new(table: &str, column: &str) -> Self {
        Self {
            table: table.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.table, self.column)
    }
}

/// A joined row: table-qualified cells.
pub type Row = HashMap<ColumnKey, Value>;

/// The preview row store: raw table rows keyed by table name, with
/// unqualified column names.
#[derive(Debug, Clone, Default)]
pub struct DataSet {
    tables: HashMap<String, Vec<HashMap<String, Value>>>,
}

impl DataSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a table's rows, replacing any existing rows for that name.
    pub fn insert_table(&mut self, name: &str, rows: Vec<HashMap<String, Value>>) {
        self.tables.insert(name.into(), rows);
    }

    /// Load a table from JSON objects. Non-object entries are skipped.
    pub fn insert_table_json(&mut self, name: &str, rows: Vec<serde_json::Value>) {
        let converted = rows
            .into_iter()
            .filter_map(|row| match row {
                serde_json::Value::Object(map) => Some(
                    map.into_iter()
                        .map(|(k, v)| (k, Value::from(v)))
                        .collect::<HashMap<String, Value>>(),
                ),
                _ => None,
            })
            .collect();
        self.tables.insert(name.into(), converted);
    }

    /// Rows of a table; empty for unknown names.
    pub fn rows(&self, table: &str) -> &[HashMap<String, Value>] {
        self.tables.get(table).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Rows of a table with every key qualified by the table name.
    pub fn prefixed_rows(&self, table: &str) -> Vec<Row> {
        self.rows(table)
            .iter()
            .map(|row| {
                row.iter()
                    .map(|(k, v)| (ColumnKey::new(table, k), v.clone()))
                    .collect()
            })
            .collect()
    }

    /// Sorted distinct display values of a column, nulls excluded.
    /// Used for filter-value suggestions.
    pub fn distinct_values(&self, table: &str, column: &str) -> Vec<String> {
        let mut values: Vec<String> = self
            .rows(table)
            .iter()
            .filter_map(|row| row.get(column))
            .filter(|v| !v.is_null())
            .map(Value::display)
            .collect();
        values.sort();
        values.dedup();
        values
    }
}
