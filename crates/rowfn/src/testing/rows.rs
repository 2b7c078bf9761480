//! Row cursor over literal values.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use rowfn_driver::{DriverError, RowCursor, Scan, ScanError, SingleRow, Value};

/// Errors raised by the in-memory engine.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum MemoryError {
    #[error("{0}")]
    Message(String),
    #[error("column {index}: {source}")]
    Column {
        index: usize,
        #[source]
        source: ScanError,
    },
    #[error("expected {expected} destination arguments, got {found}")]
    ColumnCount { expected: usize, found: usize },
    #[error("decode called without a current row")]
    NoCurrentRow,
}

impl MemoryError {
    pub fn message(msg: impl Into<String>) -> Self {
        MemoryError::Message(msg.into())
    }
}

/// Counters shared between a [`MemoryRows`] and the test observing it.
#[derive(Debug, Default)]
pub struct RowStats {
    advanced: AtomicUsize,
    decoded: AtomicUsize,
    closed: AtomicUsize,
}

impl RowStats {
    /// Rows the cursor moved onto.
    pub fn advanced(&self) -> usize {
        self.advanced.load(Ordering::Relaxed)
    }

    /// Successful decodes.
    pub fn decoded(&self) -> usize {
        self.decoded.load(Ordering::Relaxed)
    }

    /// Calls to `close`, including repeated ones.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::Relaxed)
    }
}

/// Decode `row` into `dest` by position.
pub(crate) fn decode_row(row: &[Value], dest: &mut [&mut dyn Scan]) -> Result<(), MemoryError> {
    if row.len() != dest.len() {
        return Err(MemoryError::ColumnCount {
            expected: row.len(),
            found: dest.len(),
        });
    }
    for (index, (value, slot)) in row.iter().zip(dest.iter_mut()).enumerate() {
        slot.scan(value)
            .map_err(|source| MemoryError::Column { index, source })?;
    }
    Ok(())
}

/// A forward-only cursor over literal rows.
#[derive(Debug, Default)]
pub struct MemoryRows {
    pending: VecDeque<Vec<Value>>,
    current: Option<Vec<Value>>,
    fail_after: Option<(usize, MemoryError)>,
    fail_decode_at: Option<(usize, MemoryError)>,
    fail_close: Option<MemoryError>,
    terminal: Option<MemoryError>,
    stats: Arc<RowStats>,
}

impl MemoryRows {
    pub fn new(rows: Vec<Vec<Value>>) -> Self {
        MemoryRows {
            pending: rows.into(),
            ..MemoryRows::default()
        }
    }

    /// After yielding `rows` rows, stop and report `err` from [`RowCursor::err`].
    #[must_use]
    pub fn fail_after(mut self, rows: usize, err: MemoryError) -> Self {
        self.fail_after = Some((rows, err));
        self
    }

    /// Fail decoding of the zero-based row `row`.
    #[must_use]
    pub fn fail_decode_at(mut self, row: usize, err: MemoryError) -> Self {
        self.fail_decode_at = Some((row, err));
        self
    }

    /// Fail the first `close`.
    #[must_use]
    pub fn fail_close(mut self, err: MemoryError) -> Self {
        self.fail_close = Some(err);
        self
    }

    /// Shared counters, readable after the cursor has been moved or dropped.
    pub fn stats(&self) -> Arc<RowStats> {
        Arc::clone(&self.stats)
    }
}

impl RowCursor for MemoryRows {
    fn advance(&mut self) -> bool {
        if self.terminal.is_some() {
            return false;
        }
        if let Some((limit, err)) = &self.fail_after {
            if self.stats.advanced() >= *limit {
                self.terminal = Some(err.clone());
                self.current = None;
                return false;
            }
        }
        self.current = self.pending.pop_front();
        if self.current.is_none() {
            return false;
        }
        self.stats.advanced.fetch_add(1, Ordering::Relaxed);
        true
    }

    fn decode_into(&mut self, dest: &mut [&mut dyn Scan]) -> Result<(), DriverError> {
        let row = self.current.as_ref().ok_or(MemoryError::NoCurrentRow)?;
        if let Some((at, err)) = &self.fail_decode_at {
            if *at + 1 == self.stats.advanced() {
                return Err(err.clone().into());
            }
        }
        decode_row(row, dest)?;
        self.stats.decoded.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn err(&mut self) -> Option<DriverError> {
        self.terminal.clone().map(Into::into)
    }

    fn close(&mut self) -> Result<(), DriverError> {
        self.stats.closed.fetch_add(1, Ordering::Relaxed);
        self.pending.clear();
        self.current = None;
        match self.fail_close.take() {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }
}

/// Deferred single-row result.
pub(crate) struct MemoryRow {
    pub(crate) result: Result<Option<Vec<Value>>, DriverError>,
}

impl SingleRow for MemoryRow {
    fn decode_into(self: Box<Self>, dest: &mut [&mut dyn Scan]) -> Result<(), DriverError> {
        match self.result? {
            Some(row) => Ok(decode_row(&row, dest)?),
            None => Err(rowfn_driver::NoRows.into()),
        }
    }
}
