//! Query orchestration: compile, execute, post-process.
//!
//! The compiler and engine are pure and synchronous; the runner wraps them
//! for callers that trigger execution off user edits. In-flight work is
//! tracked by a monotonic generation counter so a result produced from an
//! outdated model is discarded instead of overwriting a newer one.

use std::sync::atomic::{AtomicU64, Ordering};

use thiserror::Error;

use crate::calc::apply_calculated_columns;
use crate::catalog::Catalog;
use crate::compile::compile;
use crate::engine::{execute, DataSet};
use crate::model::{QueryMode, QueryModel};
use crate::result::QueryResult;

/// Errors surfaced to the caller as a single displayable message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RunError {
    #[error("Query was superseded by a newer edit")]
    Stale,
}

/// Monotonic request-generation counter.
///
/// Each triggered execution calls [`begin`](Self::begin) and carries the
/// returned generation with its in-flight work; a later `begin` invalidates
/// every earlier generation. Results are applied only through
/// [`accept`](Self::accept), which drops stale ones deterministically.
#[derive(Debug, Default)]
pub struct GenerationGuard {
    latest: AtomicU64,
}

impl GenerationGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a new execution, invalidating all prior generations.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.latest.load(Ordering::SeqCst) == generation
    }

    /// Pass a finished result through only if its generation is still the
    /// latest.
    pub fn accept<T>(&self, generation: u64, value: T) -> Option<T> {
        if self.is_current(generation) {
            Some(value)
        } else {
            None
        }
    }
}

/// What one run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// Generation this run was started under.
    pub generation: u64,
    /// Compiled SQL (visual mode) or the user's own text (raw mode).
    pub sql: String,
    /// Local engine result. `None` in raw-SQL mode, which is submitted to
    /// the remote endpoint instead of executed here.
    pub result: Option<QueryResult>,
}

/// Runs models against a fixed catalog.
#[derive(Debug, Default)]
pub struct QueryRunner {
    catalog: Catalog,
    guard: GenerationGuard,
}

impl QueryRunner {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            catalog,
            guard: GenerationGuard::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn guard(&self) -> &GenerationGuard {
        &self.guard
    }

    /// Run a model: compile and, in visual mode, execute locally and apply
    /// calculated columns.
    ///
    /// Returns [`RunError::Stale`] if another run began while this one was
    /// executing.
    pub fn run(&self, model: &QueryModel, data: &DataSet) -> Result<RunOutput, RunError> {
        let generation = self.guard.begin();

        match &model.mode {
            QueryMode::RawSql { sql } => Ok(RunOutput {
                generation,
                sql: sql.clone(),
                result: None,
            }),
            QueryMode::Visual => {
                let sql = compile(model, &self.catalog);
                let result = execute(model, &self.catalog, data);
                let result = apply_calculated_columns(&result, &model.calculated_columns);
                self.guard
                    .accept(
                        generation,
                        RunOutput {
                            generation,
                            sql,
                            result: Some(result),
                        },
                    )
                    .ok_or(RunError::Stale)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_invalidates_earlier_ones() {
        let guard = GenerationGuard::new();
        let first = guard.begin();
        let second = guard.begin();

        assert!(!guard.is_current(first));
        assert!(guard.is_current(second));
        assert_eq!(guard.accept(first, "stale"), None);
        assert_eq!(guard.accept(second, "fresh"), Some("fresh"));
    }

    #[test]
    fn test_generations_are_monotonic() {
        let guard = GenerationGuard::new();
        let a = guard.begin();
        let b = guard.begin();
        let c = guard.begin();
        assert!(a < b && b < c);
    }
}
