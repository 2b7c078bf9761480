//! Dynamic API: shapes known only at run time.
//!
//! Same registries and adapters as the typed API, with less compile-time
//! checking. Shapes are classified on every build, so an unsupported shape
//! is reported as [`Error::Shape`] instead of failing to compile.

use std::sync::Arc;

use rowfn_driver::{Context, Destination, Prepare, RowCursor, Scan, Statement, TxScope, Value};
use rowfn_shape::{classify_row, classify_statement, FunctionShape, StatementKind, Style};
use tracing::debug;

use crate::error::{Error, Result};
use crate::for_each::drive;
use crate::scan::resolve;
use crate::stmt::Release;
use crate::synth::{self, Flow, Halt, Reply, ScanAdapter, StatementAdapter};
use crate::RowFn;

/// A row decoder built from a runtime shape.
#[derive(Clone)]
pub struct DynScanner {
    shape: FunctionShape,
    style: Style,
    adapter: ScanAdapter,
}

impl DynScanner {
    pub fn shape(&self) -> &FunctionShape {
        &self.shape
    }

    pub fn style(&self) -> Style {
        self.style
    }

    /// Decode the current row.
    ///
    /// Out-parameter shapes decode into `dest` and return nothing.
    /// Return-value shapes expect an empty `dest` and return one fresh
    /// destination per column.
    pub fn scan(
        &self,
        rows: &mut dyn RowCursor,
        dest: &mut [&mut dyn Scan],
    ) -> Result<Vec<Box<dyn Destination>>> {
        (self.adapter)(rows, dest)
    }
}

impl std::fmt::Debug for DynScanner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynScanner")
            .field("shape", &self.shape.to_string())
            .field("style", &self.style)
            .finish_non_exhaustive()
    }
}

/// A statement function built from a runtime shape.
#[derive(Clone)]
pub struct DynStatement {
    kind: StatementKind,
    stmt: Arc<dyn Statement>,
    adapter: StatementAdapter,
}

impl DynStatement {
    pub fn kind(&self) -> StatementKind {
        self.kind
    }

    /// Run the statement. `tx` must be given exactly when the shape
    /// declares a transaction scope.
    pub fn call(&self, ctx: &Context, tx: Option<&dyn TxScope>, args: &[Value]) -> Result<Reply> {
        (self.adapter)(&self.stmt, ctx, tx, args)
    }
}

impl std::fmt::Debug for DynStatement {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DynStatement")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

impl RowFn {
    /// Build a row decoder for `shape`.
    pub fn scan_dyn(&self, shape: FunctionShape) -> Result<DynScanner> {
        let row = classify_row(&shape).map_err(|err| Error::shape(&shape, err))?;
        let adapter = resolve(&self.registries.scan, &shape, synth::row)?;
        Ok(DynScanner {
            shape,
            style: row.style,
            adapter,
        })
    }

    /// Iterate `rows`, dispatching each decoded row to `dispatch`.
    ///
    /// `shape` is the callback's shape; `dispatch` answers with the [`Flow`]
    /// matching its declared control return. The cursor is closed exactly
    /// once.
    pub fn for_each_dyn(
        &self,
        mut rows: impl RowCursor,
        shape: &FunctionShape,
        mut dispatch: impl FnMut(Vec<Box<dyn Destination>>) -> Flow,
    ) -> Result<(), Halt> {
        let adapter = match resolve(&self.registries.for_each, shape, synth::for_each) {
            Ok(adapter) => adapter,
            Err(err) => {
                if let Err(close_err) = rows.close() {
                    debug!(error = %close_err, "closing cursor after synthesis failure");
                }
                return Err(Halt::Failed(err));
            }
        };
        drive(&adapter, &mut rows, &mut dispatch)
    }

    /// Prepare `query` and bind it to an adapter for `shape`.
    pub fn statement_dyn(
        &self,
        ctx: &Context,
        conn: &dyn Prepare,
        query: &str,
        shape: &FunctionShape,
    ) -> Result<(DynStatement, Release)> {
        let kind = classify_statement(shape)
            .map_err(|err| Error::shape(shape, err))?
            .kind;
        let stmt = conn.prepare(ctx, query).map_err(|source| Error::Prepare {
            query: query.to_owned(),
            source,
        })?;
        let adapter = resolve(&self.registries.statement, shape, synth::statement)?;
        let release = Release::closing(Arc::clone(&stmt));
        Ok((
            DynStatement {
                kind,
                stmt,
                adapter,
            },
            release,
        ))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
