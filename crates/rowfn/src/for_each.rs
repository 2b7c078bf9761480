//! Row-iteration driver.

use rowfn_driver::{Destination, RowCursor};
use rowfn_registry::Registry;
use tracing::debug;

use crate::error::Error;
use crate::scan::resolve;
use crate::signature::{Control, RowCallback};
use crate::synth::{self, Flow, ForEachAdapter, Halt};

/// Decode every remaining row of `rows` and hand it to `callback`.
///
/// The cursor is owned and closed exactly once, whatever happens. Errors
/// are reported in this order of precedence: a configuration or decode
/// error, the callback's own error, the cursor's terminal error, and last
/// a close error.
pub(crate) fn run<Args, F>(
    registry: &Registry<ForEachAdapter>,
    mut rows: impl RowCursor,
    mut callback: F,
) -> Result<(), <F::Control as Control>::Error>
where
    F: RowCallback<Args>,
{
    let shape = F::shape();
    let adapter = match resolve(registry, &shape, synth::for_each) {
        Ok(adapter) => adapter,
        Err(err) => {
            if let Err(close_err) = rows.close() {
                debug!(error = %close_err, "closing cursor after synthesis failure");
            }
            return Err(<F::Control as Control>::lift(err));
        }
    };

    let mut dispatch = |values: Vec<Box<dyn Destination>>| callback.call_with(values);
    drive(&adapter, &mut rows, &mut dispatch)
        .map_err(<F::Control as Control>::halt)
}

/// Closes the cursor if a callback panics mid-iteration.
struct CloseOnUnwind<'a> {
    rows: &'a mut dyn RowCursor,
}

impl Drop for CloseOnUnwind<'_> {
    fn drop(&mut self) {
        if std::thread::panicking() {
            if let Err(close_err) = self.rows.close() {
                debug!(error = %close_err, "close failed while unwinding");
            }
        }
    }
}

/// Run `adapter` over `rows`, then close the cursor.
///
/// A close error is reported only when the iteration itself succeeded.
pub(crate) fn drive(
    adapter: &ForEachAdapter,
    rows: &mut dyn RowCursor,
    dispatch: &mut dyn FnMut(Vec<Box<dyn Destination>>) -> Flow,
) -> Result<(), Halt> {
    let mut guard = CloseOnUnwind { rows };
    let outcome = adapter(&mut *guard.rows, dispatch);
    let closed = guard.rows.close();
    match (outcome, closed) {
        (Err(halt), Err(close_err)) => {
            debug!(error = %close_err, "close failed after iteration stopped");
            Err(halt)
        }
        (Err(halt), Ok(())) => Err(halt),
        (Ok(()), Err(close_err)) => Err(Halt::Failed(Error::Release(close_err))),
        (Ok(()), Ok(())) => Ok(()),
    }
}
