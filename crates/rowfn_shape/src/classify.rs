//! Shape classification.
//!
//! Every function here is a gate in front of synthesis: nothing is
//! allocated and no decoding state is created. A rejected shape is a
//! programming mistake, reported as a [`ShapeError`].

use std::fmt;

use crate::desc::{TypeDesc, TypeKind};
use crate::shape::FunctionShape;

/// A parameter or return position, for diagnostics.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Position {
    Param(usize),
    Return(usize),
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Position::Param(i) => write!(f, "parameter {}", i + 1),
            Position::Return(i) => write!(f, "return value {}", i + 1),
        }
    }
}

/// Why a function shape cannot be decoded.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ShapeError {
    #[error("function must take at least one parameter")]
    NoParams,
    #[error("first parameter must be a row cursor, found `{found}`")]
    FirstParamNotCursor { found: String },
    #[error("first parameter must be a context, found `{found}`")]
    FirstParamNotContext { found: String },
    #[error("last return value must be an error, found {found}")]
    MissingError { found: String },
    #[error("function must either take destinations as parameters or return column values")]
    NoColumns,
    #[error("function takes destinations as parameters but returns {returns} values")]
    MixedStyle { returns: usize },
    #[error("{position} must be {expected}, found `{found}`")]
    Unexpected {
        position: Position,
        expected: TypeKind,
        found: String,
    },
    #[error("callback must accept at least one column")]
    CallbackNoColumns,
    #[error("callback must return nothing, a bool or an error, found {found}")]
    BadControlReturn { found: String },
    #[error("statement function must return an outcome, a row cursor or columns before its error, found {found}")]
    BadStatementReturn { found: String },
}

/// How a row decoder hands decoded values back.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum Style {
    /// `fn(rows, &mut A, &mut B) -> error`
    OutParams,
    /// `fn(rows) -> (A, B, error)`
    ReturnValues,
}

/// A classified single-row decoder.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RowShape {
    pub style: Style,
    /// One descriptor per decoded column, in order.
    pub columns: Vec<TypeDesc>,
}

/// How a per-row callback asks the driver to stop.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum ControlReturn {
    /// The callback returns nothing; every row is dispatched.
    None,
    /// `false` stops iteration without error.
    Bool,
    /// An error stops iteration and is returned to the caller.
    Error,
}

/// A classified per-row callback.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CallbackShape {
    pub columns: Vec<TypeDesc>,
    pub control: ControlReturn,
}

/// Which statement operation a function is bound to.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum StatementKind {
    /// Execute, return the outcome.
    Exec,
    /// Decode exactly one row.
    QueryRow,
    /// Return an open row cursor.
    Query,
}

/// A classified statement function.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StatementShape {
    pub kind: StatementKind,
    /// Whether the second parameter binds the call to a transaction.
    pub tx: bool,
    /// Positional query arguments.
    pub args: Vec<TypeDesc>,
    /// Decoded columns (`QueryRow` only).
    pub columns: Vec<TypeDesc>,
}

fn describe_returns(returns: &[TypeDesc]) -> String {
    match returns {
        [] => "nothing".to_owned(),
        [single] => format!("`{single}`"),
        many => {
            let names: Vec<String> = many.iter().map(ToString::to_string).collect();
            format!("`({})`", names.join(", "))
        }
    }
}

/// Require `descs[i].kind == expected` for every descriptor, reporting the
/// first mismatch at `position(i)`.
fn expect_all(
    descs: &[TypeDesc],
    expected: TypeKind,
    position: impl Fn(usize) -> Position,
) -> Result<(), ShapeError> {
    match descs.iter().position(|d| !d.is(expected)) {
        Some(i) => Err(ShapeError::Unexpected {
            position: position(i),
            expected,
            found: descs[i].to_string(),
        }),
        None => Ok(()),
    }
}

/// Split off a trailing error return.
fn strip_error(returns: &[TypeDesc]) -> Result<&[TypeDesc], ShapeError> {
    match returns.split_last() {
        Some((last, body)) if last.is(TypeKind::Error) => Ok(body),
        Some((last, _)) => Err(ShapeError::MissingError {
            found: format!("`{last}`"),
        }),
        None => Err(ShapeError::MissingError {
            found: "nothing".to_owned(),
        }),
    }
}

/// Classify a single-row decoder.
///
/// Out-parameter style: `fn(rows, &mut A, ..) -> error`.
/// Return-value style: `fn(rows) -> (A, .., error)`.
pub fn classify_row(shape: &FunctionShape) -> Result<RowShape, ShapeError> {
    let params = shape.params();
    let first = params.first().ok_or(ShapeError::NoParams)?;
    if !first.is(TypeKind::RowCursor) {
        return Err(ShapeError::FirstParamNotCursor {
            found: first.to_string(),
        });
    }
    let body = strip_error(shape.returns())?;

    match (params.len(), body.len()) {
        (1, 0) => Err(ShapeError::NoColumns),
        (1, _) => {
            expect_all(body, TypeKind::Column, Position::Return)?;
            Ok(RowShape {
                style: Style::ReturnValues,
                columns: body.to_vec(),
            })
        }
        (_, 0) => {
            let outs = &params[1..];
            expect_all(outs, TypeKind::OutParam, |i| Position::Param(i + 1))?;
            Ok(RowShape {
                style: Style::OutParams,
                columns: outs.to_vec(),
            })
        }
        (_, _) => Err(ShapeError::MixedStyle {
            returns: shape.returns().len(),
        }),
    }
}

/// Classify a per-row callback: `fn(A, ..)`, `fn(A, ..) -> bool` or
/// `fn(A, ..) -> error`.
pub fn classify_callback(shape: &FunctionShape) -> Result<CallbackShape, ShapeError> {
    let params = shape.params();
    if params.is_empty() {
        return Err(ShapeError::CallbackNoColumns);
    }
    expect_all(params, TypeKind::Column, Position::Param)?;

    let control = match shape.returns() {
        [] => ControlReturn::None,
        [ret] if ret.is(TypeKind::Bool) => ControlReturn::Bool,
        [ret] if ret.is(TypeKind::Error) => ControlReturn::Error,
        other => {
            return Err(ShapeError::BadControlReturn {
                found: describe_returns(other),
            })
        }
    };

    Ok(CallbackShape {
        columns: params.to_vec(),
        control,
    })
}

/// Classify a statement function:
/// `fn(ctx, [tx,] args..) -> (outcome | cursor | columns.., error)`.
///
/// The three return forms never overlap, so the statement kind is read off
/// the return list.
pub fn classify_statement(shape: &FunctionShape) -> Result<StatementShape, ShapeError> {
    let params = shape.params();
    let first = params.first().ok_or(ShapeError::NoParams)?;
    if !first.is(TypeKind::Context) {
        return Err(ShapeError::FirstParamNotContext {
            found: first.to_string(),
        });
    }

    let rest = &params[1..];
    let tx = rest.first().is_some_and(|d| d.is(TypeKind::Transaction));
    let skip = 1 + usize::from(tx);
    let args = &params[skip..];
    expect_all(args, TypeKind::Arg, |i| Position::Param(i + skip))?;

    let body = strip_error(shape.returns())?;
    let (kind, columns) = match body {
        [] => {
            return Err(ShapeError::BadStatementReturn {
                found: describe_returns(shape.returns()),
            })
        }
        [ret] if ret.is(TypeKind::ExecOutcome) => (StatementKind::Exec, Vec::new()),
        [ret] if ret.is(TypeKind::RowCursor) => (StatementKind::Query, Vec::new()),
        cols => {
            expect_all(cols, TypeKind::Column, Position::Return)?;
            (StatementKind::QueryRow, cols.to_vec())
        }
    };

    Ok(StatementShape {
        kind,
        tx,
        args: args.to_vec(),
        columns,
    })
}
