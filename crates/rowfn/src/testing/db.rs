//! Statement factory answering canned results.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use rowfn_driver::{
    Context, DriverError, ExecOutcome, Prepare, Rows, SingleRow, Statement, TxScope, Value,
};
use rustc_hash::FxHashMap;

use super::rows::{MemoryError, MemoryRow, MemoryRows};

/// What a query answers for one call.
#[derive(Clone, Debug)]
pub enum Canned {
    /// Result of an exec.
    Exec(ExecOutcome),
    /// Result set of a query.
    Rows(Vec<Vec<Value>>),
    /// Fail the call with this message.
    Fail(String),
}

type Handler = Arc<dyn Fn(&[Value]) -> Canned + Send + Sync>;

/// Counters and call log shared by a [`MemoryDb`] and its statements.
#[derive(Debug, Default)]
pub struct DbStats {
    prepared: AtomicUsize,
    closed: AtomicUsize,
    calls: Mutex<Vec<(String, Vec<Value>)>>,
}

impl DbStats {
    pub fn prepared(&self) -> usize {
        self.prepared.load(Ordering::Relaxed)
    }

    /// Statement `close` calls, including repeated ones.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::Relaxed)
    }

    /// Every statement call so far, as `(query, args)`.
    pub fn calls(&self) -> Vec<(String, Vec<Value>)> {
        self.calls.lock().clone()
    }
}

/// An engine whose queries are answered by per-query handlers.
#[derive(Default)]
pub struct MemoryDb {
    handlers: FxHashMap<String, Handler>,
    fail_prepare: FxHashMap<String, String>,
    stats: Arc<DbStats>,
}

impl MemoryDb {
    pub fn new() -> Self {
        MemoryDb::default()
    }

    /// Answer `query` by calling `handler` with the bound arguments.
    #[must_use]
    pub fn on(
        mut self,
        query: impl Into<String>,
        handler: impl Fn(&[Value]) -> Canned + Send + Sync + 'static,
    ) -> Self {
        self.handlers.insert(query.into(), Arc::new(handler));
        self
    }

    /// Answer `query` with the same result on every call.
    #[must_use]
    pub fn always(self, query: impl Into<String>, canned: Canned) -> Self {
        self.on(query, move |_| canned.clone())
    }

    /// Make preparing `query` fail with `msg`.
    #[must_use]
    pub fn fail_prepare(mut self, query: impl Into<String>, msg: impl Into<String>) -> Self {
        self.fail_prepare.insert(query.into(), msg.into());
        self
    }

    pub fn stats(&self) -> Arc<DbStats> {
        Arc::clone(&self.stats)
    }
}

impl Prepare for MemoryDb {
    fn prepare(&self, ctx: &Context, query: &str) -> Result<Arc<dyn Statement>, DriverError> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }
        if let Some(msg) = self.fail_prepare.get(query) {
            return Err(MemoryError::message(msg.clone()).into());
        }
        let handler = self
            .handlers
            .get(query)
            .ok_or_else(|| MemoryError::message(format!("no such query: {query}")))?;
        self.stats.prepared.fetch_add(1, Ordering::Relaxed);
        Ok(Arc::new(MemoryStatement {
            query: query.to_owned(),
            handler: Arc::clone(handler),
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MemoryStatement {
    query: String,
    handler: Handler,
    stats: Arc<DbStats>,
}

impl MemoryStatement {
    fn answer(&self, ctx: &Context, args: &[Value]) -> Result<Canned, DriverError> {
        if let Some(err) = ctx.err() {
            return Err(err.into());
        }
        self.stats
            .calls
            .lock()
            .push((self.query.clone(), args.to_vec()));
        match (self.handler)(args) {
            Canned::Fail(msg) => Err(MemoryError::Message(msg).into()),
            canned => Ok(canned),
        }
    }
}

impl Statement for MemoryStatement {
    fn execute(&self, ctx: &Context, args: &[Value]) -> Result<ExecOutcome, DriverError> {
        match self.answer(ctx, args)? {
            Canned::Exec(outcome) => Ok(outcome),
            _ => Ok(ExecOutcome::default()),
        }
    }

    fn query_one<'s>(&'s self, ctx: &Context, args: &[Value]) -> Box<dyn SingleRow + 's> {
        let result = self.answer(ctx, args).map(|canned| match canned {
            Canned::Rows(rows) => rows.into_iter().next(),
            _ => None,
        });
        Box::new(MemoryRow { result })
    }

    fn query_many(&self, ctx: &Context, args: &[Value]) -> Result<Rows, DriverError> {
        let rows = match self.answer(ctx, args)? {
            Canned::Rows(rows) => rows,
            _ => Vec::new(),
        };
        Ok(Box::new(MemoryRows::new(rows)))
    }

    fn close(&self) -> Result<(), DriverError> {
        self.stats.closed.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}

/// A transaction scope that records the statement calls made through it.
#[derive(Clone, Debug, Default)]
pub struct MemoryTx {
    bound: Arc<AtomicUsize>,
    calls: Arc<Mutex<Vec<Vec<Value>>>>,
}

impl MemoryTx {
    pub fn new() -> Self {
        MemoryTx::default()
    }

    /// Statements bound so far.
    pub fn bound(&self) -> usize {
        self.bound.load(Ordering::Relaxed)
    }

    /// Arguments of every call made through this transaction.
    pub fn calls(&self) -> Vec<Vec<Value>> {
        self.calls.lock().clone()
    }
}

impl TxScope for MemoryTx {
    fn bind(&self, _ctx: &Context, stmt: &Arc<dyn Statement>) -> Arc<dyn Statement> {
        self.bound.fetch_add(1, Ordering::Relaxed);
        Arc::new(TxStatement {
            calls: Arc::clone(&self.calls),
            inner: Arc::clone(stmt),
        })
    }
}

struct TxStatement {
    calls: Arc<Mutex<Vec<Vec<Value>>>>,
    inner: Arc<dyn Statement>,
}

impl TxStatement {
    fn record(&self, args: &[Value]) {
        self.calls.lock().push(args.to_vec());
    }
}

impl Statement for TxStatement {
    fn execute(&self, ctx: &Context, args: &[Value]) -> Result<ExecOutcome, DriverError> {
        self.record(args);
        self.inner.execute(ctx, args)
    }

    fn query_one<'s>(&'s self, ctx: &Context, args: &[Value]) -> Box<dyn SingleRow + 's> {
        self.record(args);
        self.inner.query_one(ctx, args)
    }

    fn query_many(&self, ctx: &Context, args: &[Value]) -> Result<Rows, DriverError> {
        self.record(args);
        self.inner.query_many(ctx, args)
    }

    // The prepared statement outlives the transaction view and is closed on its own.
    fn close(&self) -> Result<(), DriverError> {
        Ok(())
    }
}
