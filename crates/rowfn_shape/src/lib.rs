//! Rowfn Shape - function shape descriptors and their classification.
//!
//! A [`FunctionShape`] is the identity of a requested decoding function:
//! its ordered parameter descriptors and its ordered return descriptors.
//! Shapes are derived from Rust signatures by the `rowfn` crate, or built
//! by hand for the dynamic API and pre-registration.
//!
//! # Classification
//!
//! Classification is total and pure. Each family has one entry point:
//!
//! - [`classify_row`]: single-row decoders (out-parameter or return-value style)
//! - [`classify_callback`]: per-row callbacks driven by `for_each`
//! - [`classify_statement`]: functions bound to a prepared statement
//!
//! Each yields exactly one classified shape or one [`ShapeError`], and the
//! same shape always yields the same answer.

mod classify;
mod desc;
mod shape;

pub use classify::{
    classify_callback, classify_row, classify_statement, CallbackShape, ControlReturn, Position,
    RowShape, ShapeError, StatementKind, StatementShape, Style,
};
pub use desc::{Alloc, TypeDesc, TypeKind};
pub use shape::FunctionShape;
