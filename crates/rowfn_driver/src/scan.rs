//! Per-column decode contract.
//!
//! A destination is anything an engine can decode one column into. The
//! engine owns the conversion from its wire representation to [`Value`];
//! the destination owns the conversion from [`Value`] to its Rust type.

use std::any::Any;

use crate::value::{Value, ValueKind};

/// Error produced when a column value does not fit its destination.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ScanError {
    #[error("cannot decode {found} into `{target}`")]
    Mismatch {
        target: &'static str,
        found: ValueKind,
    },
    #[error("cannot decode NULL into `{target}` (use `Option<{target}>`)")]
    UnexpectedNull { target: &'static str },
    #[error("value {value} is out of range for `{target}`")]
    OutOfRange { target: &'static str, value: i64 },
    #[error("TEXT column is not valid UTF-8")]
    InvalidUtf8,
}

/// A decode destination for one column.
pub trait Scan {
    /// Store `value` into `self`, converting as needed.
    fn scan(&mut self, value: &Value) -> Result<(), ScanError>;
}

/// A type-erased, heap-allocated destination.
///
/// Synthesized adapters allocate these per row, hand them to the engine as
/// [`Scan`] objects and give them back to the typed layer, which recovers
/// the concrete type through [`Destination::into_any`].
pub trait Destination: Scan {
    fn as_scan(&mut self) -> &mut dyn Scan;

    fn into_any(self: Box<Self>) -> Box<dyn Any>;
}

impl<T: Scan + Any> Destination for T {
    fn as_scan(&mut self) -> &mut dyn Scan {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }
}

fn mismatch(target: &'static str, value: &Value) -> ScanError {
    if value.is_null() {
        ScanError::UnexpectedNull { target }
    } else {
        ScanError::Mismatch {
            target,
            found: value.kind(),
        }
    }
}

impl Scan for i64 {
    fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
        *self = match value {
            Value::Int(v) => *v,
            Value::Bool(b) => i64::from(*b),
            other => return Err(mismatch("i64", other)),
        };
        Ok(())
    }
}

macro_rules! impl_scan_narrow_int {
    ($($ty:ty),*) => {$(
        impl Scan for $ty {
            fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
                let wide = match value {
                    Value::Int(v) => *v,
                    Value::Bool(b) => i64::from(*b),
                    other => return Err(mismatch(stringify!($ty), other)),
                };
                *self = <$ty>::try_from(wide).map_err(|_| ScanError::OutOfRange {
                    target: stringify!($ty),
                    value: wide,
                })?;
                Ok(())
            }
        }
    )*};
}

impl_scan_narrow_int!(i32, u32);

impl Scan for f64 {
    fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
        *self = match value {
            Value::Float(v) => *v,
            #[expect(
                clippy::cast_precision_loss,
                reason = "integer columns read as REAL follow engine semantics"
            )]
            Value::Int(v) => *v as f64,
            other => return Err(mismatch("f64", other)),
        };
        Ok(())
    }
}

impl Scan for f32 {
    fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
        let mut wide = 0.0f64;
        wide.scan(value).map_err(|e| match e {
            ScanError::Mismatch { found, .. } => ScanError::Mismatch {
                target: "f32",
                found,
            },
            ScanError::UnexpectedNull { .. } => ScanError::UnexpectedNull { target: "f32" },
            other => other,
        })?;
        #[expect(
            clippy::cast_possible_truncation,
            reason = "REAL columns narrowed to f32 on request"
        )]
        let narrow = wide as f32;
        *self = narrow;
        Ok(())
    }
}

impl Scan for bool {
    fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
        *self = match value {
            Value::Bool(b) => *b,
            Value::Int(v) => *v != 0,
            other => return Err(mismatch("bool", other)),
        };
        Ok(())
    }
}

impl Scan for String {
    fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
        match value {
            Value::Text(s) => {
                self.clear();
                self.push_str(s);
            }
            Value::Bytes(b) => {
                let s = std::str::from_utf8(b).map_err(|_| ScanError::InvalidUtf8)?;
                self.clear();
                self.push_str(s);
            }
            other => return Err(mismatch("String", other)),
        }
        Ok(())
    }
}

impl Scan for Vec<u8> {
    fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
        match value {
            Value::Bytes(b) => {
                self.clear();
                self.extend_from_slice(b);
            }
            Value::Text(s) => {
                self.clear();
                self.extend_from_slice(s.as_bytes());
            }
            other => return Err(mismatch("Vec<u8>", other)),
        }
        Ok(())
    }
}

impl Scan for Value {
    fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
        self.clone_from(value);
        Ok(())
    }
}

impl<T: Scan + Default> Scan for Option<T> {
    fn scan(&mut self, value: &Value) -> Result<(), ScanError> {
        if value.is_null() {
            *self = None;
            return Ok(());
        }
        let mut inner = T::default();
        inner.scan(value)?;
        *self = Some(inner);
        Ok(())
    }
}
