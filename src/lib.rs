//! # Quarry
//!
//! A visual query model that compiles to SQL and executes in memory.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │              QueryModel (user intent)                    │
//! │  (fields, filters, sorts, limit, calculated columns)     │
//! └─────────────────────────────────────────────────────────┘
//!            │                               │
//!            ▼ [compile]                     ▼ [engine]
//! ┌──────────────────────────┐   ┌──────────────────────────┐
//! │        SQL text          │   │  QueryResult (in-memory) │
//! │  (token stream, dialect) │   │  join→filter→group→sort  │
//! └──────────────────────────┘   └──────────────────────────┘
//!                                            │
//!                                            ▼ [calc]
//!                                ┌──────────────────────────┐
//!                                │  Derived columns applied │
//!                                └──────────────────────────┘
//! ```
//!
//! The compiler and the engine are two independent interpretations of the
//! same model over the same [`catalog::Catalog`]: one renders SQL text for a
//! remote warehouse, the other materializes a preview result from an
//! in-memory [`engine::DataSet`]. Neither consumes the other's output.

pub mod calc;
pub mod catalog;
pub mod compile;
pub mod engine;
pub mod model;
pub mod result;
pub mod runner;
pub mod sql;

// Re-export SQL submodules at crate level for convenient paths
pub use sql::dialect;
pub use sql::expr;
pub use sql::query;
pub use sql::token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::calc::apply_calculated_columns;
    pub use crate::catalog::{
        Catalog, Column, ColumnRole, ColumnType, JoinKind, Relationship, Table, TableKind,
    };
    pub use crate::compile::compile;
    pub use crate::engine::{compute_pivot, execute, ColumnKey, DataSet, Value};
    pub use crate::model::{
        Aggregation, CalcFormula, CalculatedColumn, DateGranularity, Filter, FilterOperator,
        QueryMode, QueryModel, QuickCalc, SelectedField, SortDirection, SortRule,
    };
    pub use crate::result::{ColumnMeta, QueryResult};
    pub use crate::runner::{GenerationGuard, QueryRunner, RunError, RunOutput};
    pub use crate::sql::{Dialect, SqlDialect};
}

pub use catalog::Catalog;
pub use model::QueryModel;
pub use result::QueryResult;
