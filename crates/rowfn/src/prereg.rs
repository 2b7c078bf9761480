//! Pre-registration: fill the cache before first use.
//!
//! Code generators emit calls to the `register_*` functions with adapters
//! written ahead of time; applications can also `warm_*` shapes at startup
//! so that the first real call is already a cache hit. Registration goes
//! through the same registries as the runtime path, keyed by the same
//! shapes.

use rowfn_shape::{classify_callback, classify_row, classify_statement, FunctionShape};
use tracing::debug;

use crate::error::{Error, Result};
use crate::signature::{callback_shape, Columns, Control, RowSignature, StatementSignature};
use crate::synth::{self, ForEachAdapter, ScanAdapter, StatementAdapter};
use crate::RowFn;

/// Adapter family of a raw shape.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Family {
    ForEach,
    Scan,
    Statement,
}

impl RowFn {
    /// Register `adapter` as the decoder for signature `S`.
    pub fn register_scan<S: RowSignature>(&self, adapter: ScanAdapter) {
        self.registries.scan.register(S::shape(), adapter);
    }

    /// Register `adapter` as the iterator for callbacks taking `Args` and
    /// returning `R`.
    pub fn register_for_each<Args: Columns, R: Control>(&self, adapter: ForEachAdapter) {
        self.registries
            .for_each
            .register(callback_shape::<Args, R>(), adapter);
    }

    /// Register `adapter` for statement signature `S` (exec, query-row and
    /// query alike).
    pub fn register_statement<S: StatementSignature>(&self, adapter: StatementAdapter) {
        self.registries.statement.register(S::shape(), adapter);
    }

    /// Register an adapter for a raw scan shape, after checking the shape.
    pub fn register_scan_shape(&self, shape: FunctionShape, adapter: ScanAdapter) -> Result<()> {
        classify_row(&shape).map_err(|err| Error::shape(&shape, err))?;
        self.registries.scan.register(shape, adapter);
        Ok(())
    }

    /// Register an adapter for a raw callback shape, after checking the shape.
    pub fn register_for_each_shape(
        &self,
        shape: FunctionShape,
        adapter: ForEachAdapter,
    ) -> Result<()> {
        classify_callback(&shape).map_err(|err| Error::shape(&shape, err))?;
        self.registries.for_each.register(shape, adapter);
        Ok(())
    }

    /// Register an adapter for a raw statement shape, after checking the shape.
    pub fn register_statement_shape(
        &self,
        shape: FunctionShape,
        adapter: StatementAdapter,
    ) -> Result<()> {
        classify_statement(&shape).map_err(|err| Error::shape(&shape, err))?;
        self.registries.statement.register(shape, adapter);
        Ok(())
    }

    /// Synthesize and register the decoder for `S`.
    pub fn warm_scan<S: RowSignature>(&self) -> Result<()> {
        self.warm(Family::Scan, &S::shape())
    }

    /// Synthesize and register the iterator for callbacks `Args -> R`.
    pub fn warm_for_each<Args: Columns, R: Control>(&self) -> Result<()> {
        self.warm(Family::ForEach, &callback_shape::<Args, R>())
    }

    /// Synthesize and register the adapter for statement signature `S`.
    pub fn warm_statement<S: StatementSignature>(&self) -> Result<()> {
        self.warm(Family::Statement, &S::shape())
    }

    /// Synthesize and register the adapter for a raw shape.
    ///
    /// Registration happens even when the family is disabled, so the entry
    /// is ready once caching is turned back on.
    pub fn warm(&self, family: Family, shape: &FunctionShape) -> Result<()> {
        debug!(?family, %shape, "warming adapter");
        let registries = &self.registries;
        match family {
            Family::Scan => registries.scan.register(shape.clone(), synth::row(shape)?),
            Family::ForEach => registries
                .for_each
                .register(shape.clone(), synth::for_each(shape)?),
            Family::Statement => registries
                .statement
                .register(shape.clone(), synth::statement(shape)?),
        }
        Ok(())
    }
}
