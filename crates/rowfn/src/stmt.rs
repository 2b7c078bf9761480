//! Statement-call builder: functions bound to a prepared statement.

use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use rowfn_driver::{Context, Prepare, Statement, TxScope, Value};
use rowfn_registry::Registry;
use tracing::debug;

use crate::error::{Error, Result};
use crate::scan::resolve;
use crate::signature::{Param, StatementOutput, StatementSignature};
use crate::synth::{self, StatementAdapter};

/// A function bound to a prepared statement.
///
/// `S` is the function's signature: a context, optionally a transaction
/// scope, then the query arguments, returning the statement's result:
///
/// ```ignore
/// // Exec
/// fn(&Context, String, i64) -> Result<ExecOutcome>
/// // QueryRow, inside a transaction
/// fn(&Context, &dyn TxScope, i64) -> Result<(String, f64)>
/// // Query
/// fn(&Context) -> Result<Rows>
/// ```
///
/// Calls without a transaction use [`StatementFn::call`], calls with one
/// use [`StatementFn::call_tx`].
pub struct StatementFn<S> {
    stmt: Arc<dyn Statement>,
    adapter: StatementAdapter,
    _sig: PhantomData<S>,
}

impl<S: StatementSignature> StatementFn<S> {
    /// Prepare `query` and bind it to the adapter for `S`.
    pub(crate) fn build(
        registry: &Registry<StatementAdapter>,
        ctx: &Context,
        conn: &dyn Prepare,
        query: &str,
    ) -> Result<(Self, Release)> {
        let stmt = conn.prepare(ctx, query).map_err(|source| Error::Prepare {
            query: query.to_owned(),
            source,
        })?;
        match resolve(registry, &S::shape(), synth::statement) {
            Ok(adapter) => Ok(Self::bind(stmt, adapter)),
            Err(err) => {
                if let Err(close_err) = stmt.close() {
                    debug!(error = %close_err, "closing statement after synthesis failure");
                }
                Err(err)
            }
        }
    }

    /// Bind an already prepared statement to an adapter.
    pub fn bind(stmt: Arc<dyn Statement>, adapter: StatementAdapter) -> (Self, Release) {
        let release = Release::closing(Arc::clone(&stmt));
        let func = StatementFn {
            stmt,
            adapter,
            _sig: PhantomData,
        };
        (func, release)
    }
}

impl<S> StatementFn<S> {
    fn invoke<O: StatementOutput>(
        &self,
        ctx: &Context,
        tx: Option<&dyn TxScope>,
        args: &[Value],
    ) -> Result<O> {
        let reply = (self.adapter)(&self.stmt, ctx, tx, args)?;
        O::from_reply(reply)
    }
}

impl<S> Clone for StatementFn<S> {
    fn clone(&self) -> Self {
        StatementFn {
            stmt: Arc::clone(&self.stmt),
            adapter: Arc::clone(&self.adapter),
            _sig: PhantomData,
        }
    }
}

impl<S> fmt::Debug for StatementFn<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StatementFn")
            .field("signature", &std::any::type_name::<S>())
            .finish_non_exhaustive()
    }
}

macro_rules! impl_call {
    ($($A:ident $a:ident),*) => {
        impl<$($A: Param,)* O: StatementOutput> StatementFn<fn(&Context, $($A),*) -> Result<O>> {
            pub fn call(&self, ctx: &Context, $($a: $A),*) -> Result<O> {
                self.invoke(ctx, None, &[$($a.into_value()),*])
            }
        }

        impl<$($A: Param,)* O: StatementOutput>
            StatementFn<fn(&Context, &dyn TxScope, $($A),*) -> Result<O>>
        {
            pub fn call_tx(&self, ctx: &Context, tx: &dyn TxScope, $($a: $A),*) -> Result<O> {
                self.invoke(ctx, Some(tx), &[$($a.into_value()),*])
            }
        }
    };
}

impl_call!();
impl_call!(A a);
impl_call!(A a, B b);
impl_call!(A a, B b, C c);
impl_call!(A a, B b, C c, D d);
impl_call!(A a, B b, C c, D d, E e);
impl_call!(A a, B b, C c, D d, E e, F f);

/// Handle releasing the prepared statement behind a [`StatementFn`].
///
/// Calling the function after release reaches a closed statement; what
/// happens then is up to the engine.
#[must_use = "the prepared statement is only closed by `Release::release`"]
pub struct Release {
    stmt: Option<Arc<dyn Statement>>,
}

impl Release {
    /// A handle with nothing to release.
    pub fn noop() -> Self {
        Release { stmt: None }
    }

    pub(crate) fn closing(stmt: Arc<dyn Statement>) -> Self {
        Release { stmt: Some(stmt) }
    }

    pub fn is_noop(&self) -> bool {
        self.stmt.is_none()
    }

    /// Close the statement.
    pub fn release(self) -> Result<()> {
        match self.stmt {
            Some(stmt) => stmt.close().map_err(Error::Release),
            None => Ok(()),
        }
    }
}

impl fmt::Debug for Release {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Release")
            .field("noop", &self.is_noop())
            .finish()
    }
}
