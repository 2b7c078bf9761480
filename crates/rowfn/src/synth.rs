//! Adapter synthesis.
//!
//! A classified shape is turned into a type-erased adapter closure. The
//! closure only knows the shape: how many columns, which allocator builds
//! each fresh destination, and how the callback signals a stop. The typed
//! layer (`scan`, `for_each`, `stmt`) converts between Rust values and the
//! boxed destinations the adapters exchange.
//!
//! Adapters are immutable and `Send + Sync`; every invocation allocates its
//! own destinations, so rows never alias.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use rowfn_driver::{
    Context, Destination, DriverError, ExecOutcome, NoRows, RowCursor, Rows, Scan, Statement,
    TxScope, Value,
};
use rowfn_shape::{
    classify_callback, classify_row, classify_statement, Alloc, CallbackShape, ControlReturn,
    FunctionShape, RowShape, StatementKind, StatementShape, Style, TypeDesc,
};
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{Error, Result};

/// Decodes the current row of a cursor.
///
/// Out-parameter adapters decode into the given destinations and return an
/// empty list. Return-value adapters expect no destinations and return the
/// freshly decoded values.
pub type ScanAdapter = Arc<
    dyn Fn(&mut dyn RowCursor, &mut [&mut dyn Scan]) -> Result<Vec<Box<dyn Destination>>>
        + Send
        + Sync,
>;

/// Per-row callback as seen by a [`ForEachAdapter`].
pub type Dispatch<'a> = dyn FnMut(Vec<Box<dyn Destination>>) -> Flow + 'a;

/// Iterates a cursor, handing each decoded row to a dispatch callback.
///
/// The adapter never closes the cursor; the driver does.
pub type ForEachAdapter =
    Arc<dyn Fn(&mut dyn RowCursor, &mut Dispatch<'_>) -> Result<(), Halt> + Send + Sync>;

/// Runs a prepared statement with positional arguments.
pub type StatementAdapter = Arc<
    dyn Fn(&Arc<dyn Statement>, &Context, Option<&dyn TxScope>, &[Value]) -> Result<Reply>
        + Send
        + Sync,
>;

/// Verdict of a per-row callback.
pub enum Flow {
    /// Go on with the next row.
    Continue,
    /// Stop without error (a `bool` callback returned `false`).
    Stop,
    /// Stop with the callback's own error, returned to the caller as is.
    Fail(Box<dyn Any>),
    /// Stop with a `rowfn` error raised while dispatching.
    Abort(Error),
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Flow::Continue => f.write_str("Continue"),
            Flow::Stop => f.write_str("Stop"),
            Flow::Fail(_) => f.write_str("Fail(..)"),
            Flow::Abort(err) => f.debug_tuple("Abort").field(err).finish(),
        }
    }
}

/// Why an iteration ended early.
pub enum Halt {
    /// Decoding, iteration, release or dispatch failed.
    Failed(Error),
    /// The callback failed; the payload is the callback's own error value.
    Callback(Box<dyn Any>),
}

impl Halt {
    /// Recover the callback's error as `E`, or convert a `rowfn` failure.
    pub fn into_callback_error<E: From<Error> + 'static>(self) -> E {
        match self {
            Halt::Failed(err) => E::from(err),
            Halt::Callback(payload) => match payload.downcast::<E>() {
                Ok(err) => *err,
                Err(_) => E::from(Error::Signature(format!(
                    "callback error is not `{}`",
                    std::any::type_name::<E>()
                ))),
            },
        }
    }
}

impl fmt::Debug for Halt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Halt::Failed(err) => f.debug_tuple("Failed").field(err).finish(),
            Halt::Callback(_) => f.write_str("Callback(..)"),
        }
    }
}

impl From<Error> for Halt {
    fn from(err: Error) -> Self {
        Halt::Failed(err)
    }
}

/// Result of a [`StatementAdapter`] call, by statement kind.
pub enum Reply {
    Executed(ExecOutcome),
    Row(Vec<Box<dyn Destination>>),
    Rows(Rows),
}

impl fmt::Debug for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reply::Executed(outcome) => f.debug_tuple("Executed").field(outcome).finish(),
            Reply::Row(values) => write!(f, "Row({} columns)", values.len()),
            Reply::Rows(_) => f.write_str("Rows(..)"),
        }
    }
}

/// Synthesize a single-row decoder for `shape`.
#[tracing::instrument(level = "debug", skip_all, fields(shape = %shape))]
pub fn row(shape: &FunctionShape) -> Result<ScanAdapter> {
    let row = classify_row(shape).map_err(|err| Error::shape(shape, err))?;
    debug!(style = ?row.style, columns = row.columns.len(), "synthesizing row decoder");
    build_row(&row)
}

/// Synthesize a row-iteration adapter for a callback of shape `shape`.
#[tracing::instrument(level = "debug", skip_all, fields(shape = %shape))]
pub fn for_each(shape: &FunctionShape) -> Result<ForEachAdapter> {
    let callback = classify_callback(shape).map_err(|err| Error::shape(shape, err))?;
    debug!(
        control = ?callback.control,
        columns = callback.columns.len(),
        "synthesizing row iterator"
    );
    build_for_each(&callback)
}

/// Synthesize a statement adapter for `shape`.
#[tracing::instrument(level = "debug", skip_all, fields(shape = %shape))]
pub fn statement(shape: &FunctionShape) -> Result<StatementAdapter> {
    let stmt = classify_statement(shape).map_err(|err| Error::shape(shape, err))?;
    debug!(kind = ?stmt.kind, tx = stmt.tx, args = stmt.args.len(), "synthesizing statement");
    build_statement(&stmt)
}

fn allocators(columns: &[TypeDesc]) -> Result<Box<[Alloc]>> {
    columns
        .iter()
        .map(|desc| {
            desc.allocator()
                .ok_or_else(|| Error::Signature(format!("`{desc}` cannot be allocated")))
        })
        .collect()
}

fn allocate(allocs: &[Alloc]) -> Vec<Box<dyn Destination>> {
    allocs.iter().map(|alloc| alloc()).collect()
}

/// Run `decode` over borrowed views of `values`.
fn decode_fresh(
    values: &mut [Box<dyn Destination>],
    decode: impl FnOnce(&mut [&mut dyn Scan]) -> Result<(), DriverError>,
) -> Result<(), DriverError> {
    let mut dest: SmallVec<[&mut dyn Scan; 8]> =
        values.iter_mut().map(|value| value.as_scan()).collect();
    decode(&mut dest[..])
}

fn arity_mismatch(what: &str, expected: usize, found: usize) -> Error {
    Error::Signature(format!("expected {expected} {what}, got {found}"))
}

fn build_row(row: &RowShape) -> Result<ScanAdapter> {
    let columns = row.columns.len();
    let adapter: ScanAdapter = match row.style {
        Style::OutParams => Arc::new(
            move |rows: &mut dyn RowCursor, dest: &mut [&mut dyn Scan]| {
                if dest.len() != columns {
                    return Err(arity_mismatch("destinations", columns, dest.len()));
                }
                rows.decode_into(dest)
                    .map_err(|source| Error::Decode { columns, source })?;
                Ok(Vec::new())
            },
        ),
        Style::ReturnValues => {
            let allocs = allocators(&row.columns)?;
            Arc::new(
                move |rows: &mut dyn RowCursor, dest: &mut [&mut dyn Scan]| {
                    if !dest.is_empty() {
                        return Err(arity_mismatch("destinations", 0, dest.len()));
                    }
                    let mut values = allocate(&allocs);
                    decode_fresh(&mut values, |slots| rows.decode_into(slots))
                        .map_err(|source| Error::Decode { columns, source })?;
                    Ok(values)
                },
            )
        }
    };
    Ok(adapter)
}

fn build_for_each(callback: &CallbackShape) -> Result<ForEachAdapter> {
    let allocs = allocators(&callback.columns)?;
    let control = callback.control;
    let adapter: ForEachAdapter = Arc::new(
        move |rows: &mut dyn RowCursor, dispatch: &mut Dispatch<'_>| {
            let mut row = 0;
            while rows.advance() {
                let mut values = allocate(&allocs);
                decode_fresh(&mut values, |slots| rows.decode_into(slots))
                    .map_err(|source| Error::DecodeRow { row, source })?;
                match (dispatch(values), control) {
                    (Flow::Continue, _) => {}
                    (Flow::Stop, ControlReturn::Bool) => return Ok(()),
                    (Flow::Fail(payload), ControlReturn::Error) => {
                        return Err(Halt::Callback(payload))
                    }
                    (Flow::Abort(err), _) => return Err(Halt::Failed(err)),
                    (flow, control) => {
                        return Err(Halt::Failed(Error::Signature(format!(
                            "callback answered {flow:?} but is declared {control:?}"
                        ))))
                    }
                }
                row += 1;
            }
            match rows.err() {
                Some(source) if NoRows::matches(&source) => Ok(()),
                Some(source) => Err(Halt::Failed(Error::Cursor(source))),
                None => Ok(()),
            }
        },
    );
    Ok(adapter)
}

fn build_statement(stmt: &StatementShape) -> Result<StatementAdapter> {
    let kind = stmt.kind;
    let tx = stmt.tx;
    let arity = stmt.args.len();
    let allocs = allocators(&stmt.columns)?;

    let adapter: StatementAdapter = Arc::new(
        move |prepared: &Arc<dyn Statement>,
              ctx: &Context,
              scope: Option<&dyn TxScope>,
              args: &[Value]| {
            if args.len() != arity {
                return Err(arity_mismatch("arguments", arity, args.len()));
            }
            let bound;
            let prepared = match (tx, scope) {
                (true, Some(scope)) => {
                    bound = scope.bind(ctx, prepared);
                    &bound
                }
                (false, None) => prepared,
                (true, None) => {
                    return Err(Error::Signature(
                        "statement runs in a transaction but none was given".to_owned(),
                    ))
                }
                (false, Some(_)) => {
                    return Err(Error::Signature(
                        "statement does not run in a transaction but one was given".to_owned(),
                    ))
                }
            };

            match kind {
                StatementKind::Exec => prepared
                    .execute(ctx, args)
                    .map(Reply::Executed)
                    .map_err(Error::Execute),
                StatementKind::QueryRow => {
                    let mut values = allocate(&allocs);
                    let row = prepared.query_one(ctx, args);
                    decode_fresh(&mut values, |slots| row.decode_into(slots)).map_err(
                        |source| {
                            if NoRows::matches(&source) {
                                Error::NoRows
                            } else {
                                Error::Decode {
                                    columns: allocs.len(),
                                    source,
                                }
                            }
                        },
                    )?;
                    Ok(Reply::Row(values))
                }
                StatementKind::Query => prepared
                    .query_many(ctx, args)
                    .map(Reply::Rows)
                    .map_err(Error::Execute),
            }
        },
    );
    Ok(adapter)
}
