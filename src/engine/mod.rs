//! In-memory relational engine.
//!
//! Interprets a query model directly over client-side rows, producing the
//! same logical result shape the generated SQL would. Used for instant
//! preview; the SQL compiler remains the source of truth for warehouse
//! execution.

pub mod dataset;
pub mod execute;
pub mod granularity;
pub mod pivot;
pub mod value;

pub use dataset::{ColumnKey, DataSet, Row};
pub use execute::execute;
pub use granularity::{apply_granularity, parse_date};
pub use pivot::{compute_pivot, PivotResult};
pub use value::Value;
