//! Schema catalog - static description of tables, columns and relationships.
//!
//! The catalog is pure data supplied by an upstream semantic-layer service
//! and consumed read-only by both the SQL compiler and the in-memory engine.

mod graph;

pub use graph::{JoinGraph, JoinPlan, ResolvedJoin};

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by strict catalog lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CatalogError {
    #[error("Unknown table: '{0}'")]
    UnknownTable(String),

    #[error("Unknown column '{column}' on table '{table}'")]
    UnknownColumn { table: String, column: String },
}

/// Broad column type classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
    Numeric,
    Date,
    Text,
    Boolean,
}

static NUMERIC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)int|float|double|decimal|numeric|number|bigint|real").unwrap());
static DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)date|time|timestamp").unwrap());
static BOOL_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)bool").unwrap());

impl ColumnType {
    /// Classify a raw SQL type name (`VARCHAR`, `DOUBLE`, `TIMESTAMP`, ...).
    ///
    /// Anything that is not recognizably numeric, temporal or boolean is text.
    pub fn from_raw(raw: &str) -> Self {
        if BOOL_RE.is_match(raw) {
            ColumnType::Boolean
        } else if NUMERIC_RE.is_match(raw) {
            ColumnType::Numeric
        } else if DATE_RE.is_match(raw) {
            ColumnType::Date
        } else {
            ColumnType::Text
        }
    }
}

/// Role a column plays in queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Dimension,
    Measure,
    Key,
}

/// A column descriptor. Belongs to exactly one table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Column {
    pub name: String,
    pub column_type: ColumnType,
    pub role: ColumnRole,
}

impl Column {
    pub fn new(name: &str, column_type: ColumnType, role: ColumnRole) -> Self {
        Self {
            name: name.into(),
            column_type,
            role,
        }
    }
}

/// Whether a table is a fact (transactional grain) or a dimension lookup.
///
/// Join resolution prefers a fact table as the base of the FROM chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TableKind {
    Fact,
    #[default]
    Dimension,
}

/// A table descriptor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub display_name: String,
    pub kind: TableKind,
    pub columns: Vec<Column>,
    /// Advisory row count from the upstream service, for display only.
    pub row_count: u64,
}

impl Table {
    pub fn new(name: &str, kind: TableKind, columns: Vec<Column>) -> Self {
        Self {
            name: name.into(),
            display_name: name.into(),
            kind,
            columns,
            row_count: 0,
        }
    }

    pub fn with_display_name(mut self, display_name: &str) -> Self {
        self.display_name = display_name.into();
        self
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.columns.iter().find(|c| c.name == name)
    }
}

/// How two tables join.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum JoinKind {
    Left,
    Inner,
}

/// A declared relationship edge between two tables.
///
/// Directed source → target, but traversable both ways during join-path
/// search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    pub source_table: String,
    pub source_column: String,
    pub target_table: String,
    pub target_column: String,
    pub join_kind: JoinKind,
}

impl Relationship {
    pub fn new(
        id: &str,
        source_table: &str,
        source_column: &str,
        target_table: &str,
        target_column: &str,
        join_kind: JoinKind,
    ) -> Self {
        Self {
            id: id.into(),
            source_table: source_table.into(),
            source_column: source_column.into(),
            target_table: target_table.into(),
            target_column: target_column.into(),
            join_kind,
        }
    }

    /// Does this edge touch the given table?
    pub fn touches(&self, table: &str) -> bool {
        self.source_table == table || self.target_table == table
    }

    /// Given one endpoint, return the other, if this edge touches it.
    pub fn other_end(&self, table: &str) -> Option<&str> {
        if self.source_table == table {
            Some(&self.target_table)
        } else if self.target_table == table {
            Some(&self.source_table)
        } else {
            None
        }
    }
}

/// The schema catalog: tables plus relationship edges.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Catalog {
    pub tables: Vec<Table>,
    pub relationships: Vec<Relationship>,
}

impl Catalog {
    pub fn new(tables: Vec<Table>, relationships: Vec<Relationship>) -> Self {
        Self {
            tables,
            relationships,
        }
    }

    pub fn table(&self, name: &str) -> Result<&Table, CatalogError> {
        self.tables
            .iter()
            .find(|t| t.name == name)
            .ok_or_else(|| CatalogError::UnknownTable(name.into()))
    }

    pub fn column(&self, table: &str, column: &str) -> Result<&Column, CatalogError> {
        self.table(table)?
            .column(column)
            .ok_or_else(|| CatalogError::UnknownColumn {
                table: table.into(),
                column: column.into(),
            })
    }

    /// Fact tables in declaration order.
    pub fn fact_tables(&self) -> impl Iterator<Item = &Table> {
        self.tables.iter().filter(|t| t.kind == TableKind::Fact)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_type_from_raw() {
        assert_eq!(ColumnType::from_raw("DOUBLE"), ColumnType::Numeric);
        assert_eq!(ColumnType::from_raw("INTEGER"), ColumnType::Numeric);
        assert_eq!(ColumnType::from_raw("decimal(18,2)"), ColumnType::Numeric);
        assert_eq!(ColumnType::from_raw("TIMESTAMP"), ColumnType::Date);
        assert_eq!(ColumnType::from_raw("DATE"), ColumnType::Date);
        assert_eq!(ColumnType::from_raw("BOOLEAN"), ColumnType::Boolean);
        assert_eq!(ColumnType::from_raw("VARCHAR"), ColumnType::Text);
        assert_eq!(ColumnType::from_raw("whatever"), ColumnType::Text);
    }

    #[test]
    fn test_catalog_lookup() {
        let catalog = Catalog::new(
            vec![Table::new(
                "orders",
                TableKind::Fact,
                vec![Column::new("id", ColumnType::Text, ColumnRole::Key)],
            )],
            vec![],
        );

        assert!(catalog.table("orders").is_ok());
        assert_eq!(
            catalog.table("missing"),
            Err(CatalogError::UnknownTable("missing".into()))
        );
        assert!(catalog.column("orders", "id").is_ok());
        assert_eq!(
            catalog.column("orders", "nope"),
            Err(CatalogError::UnknownColumn {
                table: "orders".into(),
                column: "nope".into()
            })
        );
    }

    #[test]
    fn test_relationship_other_end() {
        let rel = Relationship::new("r1", "orders", "customer_id", "customers", "id", JoinKind::Left);
        assert_eq!(rel.other_end("orders"), Some("customers"));
        assert_eq!(rel.other_end("customers"), Some("orders"));
        assert_eq!(rel.other_end("products"), None);
    }
}
