//! Error type for every `rowfn` operation.

use rowfn_driver::DriverError;
use rowfn_shape::{FunctionShape, ShapeError};

/// Errors reported by `rowfn`.
///
/// Two groups matter to callers. Configuration errors ([`Error::Shape`],
/// [`Error::Signature`]) mean the requested function can never work and are
/// not worth retrying; see [`Error::is_config`]. Everything else wraps an
/// engine error verbatim, with positional context.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The function shape was rejected by classification.
    #[error("unsupported function `{shape}`: {source}")]
    Shape {
        shape: FunctionShape,
        #[source]
        source: ShapeError,
    },

    /// An adapter and the typed layer disagree (arity, column types, or
    /// control flow).
    #[error("adapter does not match its signature: {0}")]
    Signature(String),

    /// Preparing the statement failed.
    #[error("preparing `{query}`: {source}")]
    Prepare {
        query: String,
        #[source]
        source: DriverError,
    },

    /// Decoding a single row failed.
    #[error("decoding {columns} column(s): {source}")]
    Decode {
        columns: usize,
        #[source]
        source: DriverError,
    },

    /// Decoding row `row` (zero-based) of an iteration failed.
    #[error("decoding row {row}: {source}")]
    DecodeRow {
        row: usize,
        #[source]
        source: DriverError,
    },

    /// Executing a statement failed.
    #[error("executing statement: {0}")]
    Execute(#[source] DriverError),

    /// The cursor reported a terminal error while iterating.
    #[error("iterating rows: {0}")]
    Cursor(#[source] DriverError),

    /// A single-row query produced no row.
    #[error("no rows in result set")]
    NoRows,

    /// Closing a cursor or statement failed.
    #[error("releasing resources: {0}")]
    Release(#[source] DriverError),
}

impl Error {
    /// Whether this is a configuration error: the function shape itself is
    /// unusable, independently of any data.
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Shape { .. } | Error::Signature(_))
    }

    pub(crate) fn shape(shape: &FunctionShape, source: ShapeError) -> Self {
        Error::Shape {
            shape: shape.clone(),
            source,
        }
    }
}

/// Result alias used throughout `rowfn`.
pub type Result<T, E = Error> = std::result::Result<T, E>;
