//! Rowfn Driver - the engine contract consumed by `rowfn`.
//!
//! `rowfn` never talks to a database directly. Everything it needs from an
//! execution engine is expressed by the traits in this crate:
//!
//! - [`RowCursor`]: an open, forward-only result set
//! - [`SingleRow`]: the deferred result of a single-row query
//! - [`Statement`] / [`Prepare`]: prepared statements and their factory
//! - [`TxScope`]: the capability of binding a statement to a transaction
//! - [`Scan`]: the per-column decode contract for destinations
//!
//! Engines report failures as [`DriverError`], a boxed error. `rowfn`
//! forwards them verbatim, adding only positional context.

mod context;
mod cursor;
mod scan;
mod statement;
mod value;

pub use context::{Context, ContextError};
pub use cursor::{RowCursor, Rows, SingleRow};
pub use scan::{Destination, Scan, ScanError};
pub use statement::{Prepare, Statement, TxScope};
pub use value::{Value, ValueKind};

/// Error type reported by engines.
pub type DriverError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Marker error returned by [`SingleRow::decode_into`] when the query
/// produced no row.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, thiserror::Error)]
#[error("no rows in result set")]
pub struct NoRows;

impl NoRows {
    /// Check whether an engine error is the no-rows marker.
    pub fn matches(err: &DriverError) -> bool {
        err.is::<NoRows>()
    }
}

/// Outcome of executing a statement that returns no rows.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Number of rows inserted, updated or deleted.
    pub rows_affected: u64,
    /// Identifier generated by the last insert, when the engine reports one.
    pub last_insert_id: Option<i64>,
}

impl ExecOutcome {
    pub fn new(rows_affected: u64) -> Self {
        ExecOutcome {
            rows_affected,
            last_insert_id: None,
        }
    }

    #[must_use]
    pub fn with_last_insert_id(mut self, id: i64) -> Self {
        self.last_insert_id = Some(id);
        self
    }
}
