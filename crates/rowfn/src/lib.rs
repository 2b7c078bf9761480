//! Rowfn - shape-driven row decoders.
//!
//! Describe how query results are decoded by naming a function signature,
//! and let `rowfn` build the decoding code:
//!
//! ```ignore
//! use rowfn::{Context, ExecOutcome, Result, RowCursor};
//!
//! // Decode the current row into caller-owned destinations.
//! let scan = rowfn::scan::<fn(&mut dyn RowCursor, &mut i64, &mut String) -> Result<()>>()?;
//!
//! // Iterate a result set.
//! rowfn::for_each(rows, |id: i64, name: String| println!("{id}: {name}"))?;
//!
//! // Bind a prepared statement to a typed function.
//! let (rename, release) = rowfn::exec::<fn(&Context, String, i64) -> Result<ExecOutcome>>(
//!     &ctx, &db, "UPDATE poi SET name = ? WHERE id = ?",
//! )?;
//! rename.call(&ctx, "Louvre".to_owned(), 1)?;
//! release.release()?;
//! ```
//!
//! # Architecture
//!
//! - `rowfn_shape` classifies a function shape (parameter and return
//!   descriptors) into a supported decoding form, or rejects it
//! - [`synth`] turns a classified shape into a type-erased adapter
//! - `rowfn_registry` caches adapters per shape, one registry per family
//! - [`Scanner`], [`RowFn::for_each`] and [`StatementFn`] are the typed
//!   front ends; [`dynamic`] serves shapes only known at run time
//!
//! # Configuration
//!
//! The process-wide instance ([`RowFn::global`]) reads `ROWFN_NO_CACHE`
//! once (see [`Config`]). [`RowFn::new`] creates isolated instances.

mod config;
pub mod dynamic;
mod error;
mod for_each;
pub mod prereg;
mod scan;
mod signature;
mod stmt;
pub mod synth;
pub mod testing;

use std::sync::{Arc, Once, OnceLock};

use rowfn_registry::Registry;

pub use rowfn_driver as driver;
pub use rowfn_driver::{
    Context, ExecOutcome, NoRows, Prepare, RowCursor, Rows, Scan, Statement, TxScope, Value,
};
pub use rowfn_shape::{FunctionShape, ShapeError, StatementKind, Style, TypeDesc, TypeKind};

pub use config::{Config, NO_CACHE_VAR};
pub use dynamic::{DynScanner, DynStatement};
pub use error::{Error, Result};
pub use prereg::Family;
pub use scan::Scanner;
pub use signature::{
    callback_shape, Columns, Control, Param, RowCallback, RowSignature, StatementOutput,
    StatementSignature,
};
pub use stmt::{Release, StatementFn};
pub use synth::{ForEachAdapter, ScanAdapter, StatementAdapter};

/// The three adapter caches.
///
/// Exec, query-row and query functions share one family: their return
/// shapes never overlap.
#[derive(Debug)]
pub struct Registries {
    pub for_each: Registry<ForEachAdapter>,
    pub scan: Registry<ScanAdapter>,
    pub statement: Registry<StatementAdapter>,
}

impl Default for Registries {
    fn default() -> Self {
        Registries {
            for_each: Registry::new("foreach"),
            scan: Registry::new("scan"),
            statement: Registry::new("stmt"),
        }
    }
}

/// Entry point holding a set of [`Registries`].
///
/// Clones share their registries.
#[derive(Clone, Debug, Default)]
pub struct RowFn {
    registries: Arc<Registries>,
}

static GLOBAL: OnceLock<RowFn> = OnceLock::new();

impl RowFn {
    /// An isolated instance with every cache enabled.
    pub fn new() -> Self {
        RowFn::default()
    }

    /// An isolated instance configured by `config`.
    pub fn with_config(config: Config) -> Self {
        let rowfn = RowFn::new();
        config.apply(&rowfn.registries);
        rowfn
    }

    /// The process-wide instance, configured from the environment on first
    /// use.
    pub fn global() -> &'static RowFn {
        GLOBAL.get_or_init(|| RowFn::with_config(Config::from_env()))
    }

    pub fn registries(&self) -> &Registries {
        &self.registries
    }

    /// Turn the cache of one family off (`true`) or back on (`false`).
    pub fn disable(&self, family: Family, disabled: bool) {
        match family {
            Family::ForEach => self.registries.for_each.disable(disabled),
            Family::Scan => self.registries.scan.disable(disabled),
            Family::Statement => self.registries.statement.disable(disabled),
        }
    }

    /// Build a single-row decoder with signature `S`.
    pub fn scan<S: RowSignature>(&self) -> Result<Scanner<S>> {
        Scanner::build(&self.registries.scan)
    }

    /// Decode every remaining row of `rows` and pass it to `callback`.
    ///
    /// The callback returns `()`, `bool` (`false` stops) or
    /// `Result<(), E>` (an error stops and is returned unchanged). `rows`
    /// is closed exactly once.
    pub fn for_each<Args, F>(
        &self,
        rows: impl RowCursor,
        callback: F,
    ) -> Result<(), <F::Control as Control>::Error>
    where
        F: RowCallback<Args>,
    {
        for_each::run(&self.registries.for_each, rows, callback)
    }

    /// Prepare `query` and bind it to an exec function with signature `S`.
    pub fn exec<S>(
        &self,
        ctx: &Context,
        conn: &dyn Prepare,
        query: &str,
    ) -> Result<(StatementFn<S>, Release)>
    where
        S: StatementSignature<Output = ExecOutcome>,
    {
        StatementFn::build(&self.registries.statement, ctx, conn, query)
    }

    /// Prepare `query` and bind it to a single-row function with signature `S`.
    pub fn query_row<S>(
        &self,
        ctx: &Context,
        conn: &dyn Prepare,
        query: &str,
    ) -> Result<(StatementFn<S>, Release)>
    where
        S: StatementSignature,
        S::Output: Columns,
    {
        StatementFn::build(&self.registries.statement, ctx, conn, query)
    }

    /// Prepare `query` and bind it to a function returning open cursors.
    pub fn query<S>(
        &self,
        ctx: &Context,
        conn: &dyn Prepare,
        query: &str,
    ) -> Result<(StatementFn<S>, Release)>
    where
        S: StatementSignature<Output = Rows>,
    {
        StatementFn::build(&self.registries.statement, ctx, conn, query)
    }
}

/// [`RowFn::scan`] on the global instance.
pub fn scan<S: RowSignature>() -> Result<Scanner<S>> {
    RowFn::global().scan()
}

/// [`RowFn::for_each`] on the global instance.
pub fn for_each<Args, F>(
    rows: impl RowCursor,
    callback: F,
) -> Result<(), <F::Control as Control>::Error>
where
    F: RowCallback<Args>,
{
    RowFn::global().for_each(rows, callback)
}

/// [`RowFn::exec`] on the global instance.
pub fn exec<S>(
    ctx: &Context,
    conn: &dyn Prepare,
    query: &str,
) -> Result<(StatementFn<S>, Release)>
where
    S: StatementSignature<Output = ExecOutcome>,
{
    RowFn::global().exec(ctx, conn, query)
}

/// [`RowFn::query_row`] on the global instance.
pub fn query_row<S>(
    ctx: &Context,
    conn: &dyn Prepare,
    query: &str,
) -> Result<(StatementFn<S>, Release)>
where
    S: StatementSignature,
    S::Output: Columns,
{
    RowFn::global().query_row(ctx, conn, query)
}

/// [`RowFn::query`] on the global instance.
pub fn query<S>(ctx: &Context, conn: &dyn Prepare, query: &str) -> Result<(StatementFn<S>, Release)>
where
    S: StatementSignature<Output = Rows>,
{
    RowFn::global().query(ctx, conn, query)
}

static TRACING_INIT: Once = Once::new();

/// Install a `tracing` subscriber writing to stderr.
///
/// Only takes effect when `RUST_LOG` is set, and only once per process.
/// Use e.g. `RUST_LOG=rowfn=debug` to see synthesis and cache publishes.
pub fn init_tracing() {
    TRACING_INIT.call_once(|| {
        use tracing_subscriber::{fmt, prelude::*, EnvFilter};

        if std::env::var("RUST_LOG").is_ok() {
            let filter = EnvFilter::from_default_env();
            tracing_subscriber::registry()
                .with(fmt::layer().with_target(true).with_level(true))
                .with(filter)
                .init();
        }
    });
}
