//! Prepared statements.

use std::sync::Arc;

use crate::context::Context;
use crate::cursor::{Rows, SingleRow};
use crate::value::Value;
use crate::{DriverError, ExecOutcome};

/// A prepared statement.
///
/// Statements are shared by every call of the function bound to them, so
/// implementations must be safe to use from several threads at once.
pub trait Statement: Send + Sync {
    fn execute(&self, ctx: &Context, args: &[Value]) -> Result<ExecOutcome, DriverError>;

    fn query_one<'s>(&'s self, ctx: &Context, args: &[Value]) -> Box<dyn SingleRow + 's>;

    fn query_many(&self, ctx: &Context, args: &[Value]) -> Result<Rows, DriverError>;

    /// Release the statement. Must be idempotent.
    fn close(&self) -> Result<(), DriverError>;
}

/// Anything able to prepare statements: a connection, a pool, a transaction.
pub trait Prepare {
    fn prepare(&self, ctx: &Context, query: &str) -> Result<Arc<dyn Statement>, DriverError>;
}

/// Capability of running a prepared statement inside a transaction.
///
/// Any type implementing this trait can be passed as the transaction
/// argument of a statement call; the concrete transaction type is never
/// inspected.
pub trait TxScope {
    /// Return a transaction-scoped view of `stmt`.
    fn bind(&self, ctx: &Context, stmt: &Arc<dyn Statement>) -> Arc<dyn Statement>;
}
