//! SQL generation module.
//!
//! A type-safe SQL builder that generates multi-dialect SELECT statements:
//!
//! - [`query`] - SELECT query builder
//! - [`expr`] - Expression AST and builder DSL
//! - [`token`] - Token types for SQL generation
//! - [`dialect`] - SQL dialect implementations

pub mod dialect;
pub mod expr;
pub mod query;
pub mod token;

#[cfg(test)]
pub mod test_utils;

// Re-export commonly used types at the sql module level
pub use dialect::{Dialect, SqlDialect};
pub use expr::{
    avg, col, count, count_distinct, func, lag, lit_bool, lit_float, lit_int, lit_null, lit_str,
    max, min, rank, sum, table_col, BinaryOperator, Expr, ExprExt, Literal, SortDir, WindowExt,
    WindowFrame, WindowOrderBy,
};
pub use query::{Join, JoinType, OrderByExpr, Query, SelectExpr, TableRef};
pub use token::{Token, TokenStream};
