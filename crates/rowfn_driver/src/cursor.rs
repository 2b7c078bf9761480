//! Row cursors and single-row results.

use crate::scan::Scan;
use crate::DriverError;

/// An open, forward-only result set.
///
/// The lifecycle mirrors the usual engine contract: call [`advance`] until
/// it returns `false`, decode each current row with [`decode_into`], then
/// check [`err`] for a terminal failure and [`close`] the cursor exactly
/// once.
///
/// [`advance`]: RowCursor::advance
/// [`decode_into`]: RowCursor::decode_into
/// [`err`]: RowCursor::err
/// [`close`]: RowCursor::close
pub trait RowCursor {
    /// Move to the next row. Returns `false` once the cursor is exhausted
    /// or failed.
    fn advance(&mut self) -> bool;

    /// Decode the current row's columns, by position, into `dest`.
    fn decode_into(&mut self, dest: &mut [&mut dyn Scan]) -> Result<(), DriverError>;

    /// Terminal error observed while advancing, if any.
    fn err(&mut self) -> Option<DriverError>;

    /// Release the cursor. Must be idempotent.
    fn close(&mut self) -> Result<(), DriverError>;
}

/// An owned, sendable cursor as returned by [`crate::Statement::query_many`].
pub type Rows = Box<dyn RowCursor + Send>;

impl<R: RowCursor + ?Sized> RowCursor for Box<R> {
    fn advance(&mut self) -> bool {
        (**self).advance()
    }

    fn decode_into(&mut self, dest: &mut [&mut dyn Scan]) -> Result<(), DriverError> {
        (**self).decode_into(dest)
    }

    fn err(&mut self) -> Option<DriverError> {
        (**self).err()
    }

    fn close(&mut self) -> Result<(), DriverError> {
        (**self).close()
    }
}

/// Deferred result of a single-row query.
///
/// Errors from executing the query surface when the row is decoded. A
/// query that produced no row reports [`crate::NoRows`].
pub trait SingleRow {
    fn decode_into(self: Box<Self>, dest: &mut [&mut dyn Scan]) -> Result<(), DriverError>;
}
