//! Typed signatures and the shapes they derive.
//!
//! A decoding function is named by a function-pointer type, for example
//! `fn(&mut dyn RowCursor, &mut i64, &mut String) -> Result<()>`. The traits
//! here turn such a type into its [`FunctionShape`] and convert between the
//! Rust values of the signature and the boxed destinations adapters use.
//! Implementations are generated per arity: up to 8 columns and up to 6
//! query arguments.

use std::any::type_name;

use rowfn_driver::{Context, Destination, ExecOutcome, RowCursor, Rows, Scan, TxScope, Value};
use rowfn_shape::{FunctionShape, TypeDesc};

use crate::error::{Error, Result};
use crate::synth::{Flow, Halt, Reply};

/// A single-row decoder signature usable with [`crate::Scanner`].
pub trait RowSignature: 'static {
    fn shape() -> FunctionShape;
}

/// A statement function signature usable with [`crate::StatementFn`].
pub trait StatementSignature: 'static {
    type Output: StatementOutput;

    fn shape() -> FunctionShape;
}

/// A typed query argument.
pub trait Param: 'static {
    fn into_value(self) -> Value;
}

/// A tuple of decoded columns.
pub trait Columns: Sized + 'static {
    const COUNT: usize;

    fn descs() -> Vec<TypeDesc>;

    /// Rebuild the tuple from destinations allocated by [`Columns::descs`].
    fn from_values(values: Vec<Box<dyn Destination>>) -> Result<Self>;
}

/// What a statement function returns before its error.
pub trait StatementOutput: Sized + 'static {
    fn returns() -> Vec<TypeDesc>;

    fn from_reply(reply: Reply) -> Result<Self>;
}

/// Return type of a per-row callback: `()`, `bool` or `Result<(), E>`.
pub trait Control: 'static {
    /// Error type `for_each` reports with this callback.
    type Error;

    fn returns() -> Vec<TypeDesc>;

    fn into_flow(self) -> Flow;

    /// Report a `rowfn` error as this callback's error type.
    fn lift(err: Error) -> Self::Error;

    /// Report an early end of iteration.
    fn halt(halt: Halt) -> Self::Error;
}

/// A per-row callback taking the columns `Args`.
///
/// Implemented for every `FnMut(A, B, ..) -> R` where each argument is a
/// decodable column and `R` is a [`Control`].
pub trait RowCallback<Args> {
    type Control: Control;

    fn shape() -> FunctionShape;

    fn call_with(&mut self, values: Vec<Box<dyn Destination>>) -> Flow;
}

/// Shape key of a callback taking `Args` and returning `R`.
pub fn callback_shape<Args: Columns, R: Control>() -> FunctionShape {
    FunctionShape::new(Args::descs(), R::returns())
}

fn error_desc() -> TypeDesc {
    TypeDesc::error::<Error>()
}

fn with_error(mut returns: Vec<TypeDesc>) -> Vec<TypeDesc> {
    returns.push(error_desc());
    returns
}

fn cursor_desc() -> TypeDesc {
    TypeDesc::row_cursor::<dyn RowCursor>()
}

fn take<T: 'static>(value: Option<Box<dyn Destination>>, index: usize) -> Result<T> {
    let value = value.ok_or_else(|| Error::Signature(format!("column {index} is missing")))?;
    value.into_any().downcast::<T>().map(|v| *v).map_err(|_| {
        Error::Signature(format!(
            "column {index} was not decoded as `{}`",
            type_name::<T>()
        ))
    })
}

// === Params ===

macro_rules! impl_param_via_from {
    ($($ty:ty),*) => {$(
        impl Param for $ty {
            fn into_value(self) -> Value {
                Value::from(self)
            }
        }
    )*};
}

impl_param_via_from!(i64, i32, f64, bool, String, Vec<u8>, Value);

impl Param for u32 {
    fn into_value(self) -> Value {
        Value::Int(i64::from(self))
    }
}

impl<T: Param> Param for Option<T> {
    fn into_value(self) -> Value {
        match self {
            Some(v) => v.into_value(),
            None => Value::Null,
        }
    }
}

// === Controls ===

impl Control for () {
    type Error = Error;

    fn returns() -> Vec<TypeDesc> {
        Vec::new()
    }

    fn into_flow(self) -> Flow {
        Flow::Continue
    }

    fn lift(err: Error) -> Error {
        err
    }

    fn halt(halt: Halt) -> Error {
        halt.into_callback_error()
    }
}

impl Control for bool {
    type Error = Error;

    fn returns() -> Vec<TypeDesc> {
        vec![TypeDesc::bool()]
    }

    fn into_flow(self) -> Flow {
        if self {
            Flow::Continue
        } else {
            Flow::Stop
        }
    }

    fn lift(err: Error) -> Error {
        err
    }

    fn halt(halt: Halt) -> Error {
        halt.into_callback_error()
    }
}

impl<E: From<Error> + 'static> Control for std::result::Result<(), E> {
    type Error = E;

    fn returns() -> Vec<TypeDesc> {
        vec![TypeDesc::error::<E>()]
    }

    fn into_flow(self) -> Flow {
        match self {
            Ok(()) => Flow::Continue,
            Err(err) => Flow::Fail(Box::new(err)),
        }
    }

    fn lift(err: Error) -> E {
        E::from(err)
    }

    fn halt(halt: Halt) -> E {
        halt.into_callback_error()
    }
}

// === Outputs ===

impl StatementOutput for ExecOutcome {
    fn returns() -> Vec<TypeDesc> {
        vec![TypeDesc::exec_outcome::<ExecOutcome>()]
    }

    fn from_reply(reply: Reply) -> Result<Self> {
        match reply {
            Reply::Executed(outcome) => Ok(outcome),
            other => Err(Error::Signature(format!(
                "exec function received {other:?}"
            ))),
        }
    }
}

impl StatementOutput for Rows {
    fn returns() -> Vec<TypeDesc> {
        vec![TypeDesc::row_cursor::<Rows>()]
    }

    fn from_reply(reply: Reply) -> Result<Self> {
        match reply {
            Reply::Rows(rows) => Ok(rows),
            other => Err(Error::Signature(format!(
                "query function received {other:?}"
            ))),
        }
    }
}

// === Columns ===

macro_rules! impl_columns {
    ($count:literal => $($T:ident $v:ident $idx:literal),+) => {
        impl<$($T: Scan + Default + 'static),+> Columns for ($($T,)+) {
            const COUNT: usize = $count;

            fn descs() -> Vec<TypeDesc> {
                vec![$(TypeDesc::column::<$T>()),+]
            }

            fn from_values(values: Vec<Box<dyn Destination>>) -> Result<Self> {
                if values.len() != $count {
                    return Err(Error::Signature(format!(
                        "expected {} columns, got {}",
                        $count,
                        values.len()
                    )));
                }
                let mut values = values.into_iter();
                Ok(($(take::<$T>(values.next(), $idx)?,)+))
            }
        }

        impl<$($T: Scan + Default + 'static),+> StatementOutput for ($($T,)+) {
            fn returns() -> Vec<TypeDesc> {
                <Self as Columns>::descs()
            }

            fn from_reply(reply: Reply) -> Result<Self> {
                match reply {
                    Reply::Row(values) => <Self as Columns>::from_values(values),
                    other => Err(Error::Signature(format!(
                        "row function received {other:?}"
                    ))),
                }
            }
        }

        impl<$($T: Scan + Default + 'static),+> RowSignature
            for fn(&mut dyn RowCursor) -> Result<($($T,)+)>
        {
            fn shape() -> FunctionShape {
                FunctionShape::new([cursor_desc()], with_error(<($($T,)+) as Columns>::descs()))
            }
        }

        impl<$($T: Scan + 'static),+> RowSignature
            for fn(&mut dyn RowCursor, $(&mut $T),+) -> Result<()>
        {
            fn shape() -> FunctionShape {
                FunctionShape::new(
                    [cursor_desc(), $(TypeDesc::out_param::<$T>()),+],
                    [error_desc()],
                )
            }
        }

        impl<Func, R, $($T),+> RowCallback<($($T,)+)> for Func
        where
            Func: FnMut($($T),+) -> R,
            R: Control,
            $($T: Scan + Default + 'static),+
        {
            type Control = R;

            fn shape() -> FunctionShape {
                callback_shape::<($($T,)+), R>()
            }

            fn call_with(&mut self, values: Vec<Box<dyn Destination>>) -> Flow {
                match <($($T,)+) as Columns>::from_values(values) {
                    Ok(($($v,)+)) => (self)($($v),+).into_flow(),
                    Err(err) => Flow::Abort(err),
                }
            }
        }
    };
}

impl_columns!(1 => A a 0);
impl_columns!(2 => A a 0, B b 1);
impl_columns!(3 => A a 0, B b 1, C c 2);
impl_columns!(4 => A a 0, B b 1, C c 2, D d 3);
impl_columns!(5 => A a 0, B b 1, C c 2, D d 3, E e 4);
impl_columns!(6 => A a 0, B b 1, C c 2, D d 3, E e 4, F f 5);
impl_columns!(7 => A a 0, B b 1, C c 2, D d 3, E e 4, F f 5, G g 6);
impl_columns!(8 => A a 0, B b 1, C c 2, D d 3, E e 4, F f 5, G g 6, H h 7);

// === Statement signatures ===

macro_rules! impl_statement {
    ($($A:ident),*) => {
        impl<$($A: Param,)* O: StatementOutput> StatementSignature
            for fn(&Context, $($A),*) -> Result<O>
        {
            type Output = O;

            fn shape() -> FunctionShape {
                FunctionShape::new(
                    [TypeDesc::context::<Context>(), $(TypeDesc::arg::<$A>()),*],
                    with_error(O::returns()),
                )
            }
        }

        impl<$($A: Param,)* O: StatementOutput> StatementSignature
            for fn(&Context, &dyn TxScope, $($A),*) -> Result<O>
        {
            type Output = O;

            fn shape() -> FunctionShape {
                FunctionShape::new(
                    [
                        TypeDesc::context::<Context>(),
                        TypeDesc::transaction::<dyn TxScope>(),
                        $(TypeDesc::arg::<$A>()),*
                    ],
                    with_error(O::returns()),
                )
            }
        }
    };
}

impl_statement!();
impl_statement!(A);
impl_statement!(A, B);
impl_statement!(A, B, C);
impl_statement!(A, B, C, D);
impl_statement!(A, B, C, D, E);
impl_statement!(A, B, C, D, E, F);
