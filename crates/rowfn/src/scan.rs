//! Single-row scan builder.

use std::fmt;
use std::marker::PhantomData;

use rowfn_driver::{RowCursor, Scan};
use rowfn_registry::Registry;
use rowfn_shape::FunctionShape;

use crate::error::Result;
use crate::signature::{Columns, RowSignature};
use crate::synth::{self, ScanAdapter};

/// A reusable decoder for the current row of a cursor.
///
/// `S` is the decoder's signature, in one of two styles:
///
/// ```ignore
/// // Out-parameters: decode into caller-owned destinations.
/// let scan = rowfn::scan::<fn(&mut dyn RowCursor, &mut i64, &mut String) -> Result<()>>()?;
/// scan.scan(&mut rows, &mut id, &mut name)?;
///
/// // Return values: decode into fresh values.
/// let scan = rowfn::scan::<fn(&mut dyn RowCursor) -> Result<(i64, String)>>()?;
/// let (id, name) = scan.scan(&mut rows)?;
/// ```
///
/// The cursor must already be positioned on a row. The scanner neither
/// advances nor closes it.
pub struct Scanner<S> {
    adapter: ScanAdapter,
    _sig: PhantomData<S>,
}

impl<S: RowSignature> Scanner<S> {
    pub(crate) fn build(registry: &Registry<ScanAdapter>) -> Result<Self> {
        let adapter = resolve(registry, &S::shape(), synth::row)?;
        Ok(Scanner::from_adapter(adapter))
    }

    /// Wrap an adapter, for example one written ahead of time.
    ///
    /// The adapter must follow the conventions of [`ScanAdapter`] for `S`;
    /// a mismatch surfaces as [`crate::Error::Signature`] on the first call.
    pub fn from_adapter(adapter: ScanAdapter) -> Self {
        Scanner {
            adapter,
            _sig: PhantomData,
        }
    }
}

impl<S> Clone for Scanner<S> {
    fn clone(&self) -> Self {
        Scanner {
            adapter: self.adapter.clone(),
            _sig: PhantomData,
        }
    }
}

impl<S> fmt::Debug for Scanner<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Scanner")
            .field("signature", &std::any::type_name::<S>())
            .finish_non_exhaustive()
    }
}

impl<C: Columns> Scanner<fn(&mut dyn RowCursor) -> Result<C>> {
    /// Decode the current row into fresh values.
    pub fn scan(&self, rows: &mut dyn RowCursor) -> Result<C> {
        let values = (self.adapter)(rows, &mut [])?;
        C::from_values(values)
    }
}

macro_rules! impl_scan_out_params {
    ($($T:ident $v:ident),+) => {
        impl<$($T: Scan + 'static),+> Scanner<fn(&mut dyn RowCursor, $(&mut $T),+) -> Result<()>> {
            /// Decode the current row into the given destinations.
            pub fn scan(&self, rows: &mut dyn RowCursor, $($v: &mut $T),+) -> Result<()> {
                (self.adapter)(rows, &mut [$($v as &mut dyn Scan),+])?;
                Ok(())
            }
        }
    };
}

impl_scan_out_params!(A a);
impl_scan_out_params!(A a, B b);
impl_scan_out_params!(A a, B b, C c);
impl_scan_out_params!(A a, B b, C c, D d);
impl_scan_out_params!(A a, B b, C c, D d, E e);
impl_scan_out_params!(A a, B b, C c, D d, E e, F f);
impl_scan_out_params!(A a, B b, C c, D d, E e, F f, G g);
impl_scan_out_params!(A a, B b, C c, D d, E e, F f, G g, H h);

/// Look `shape` up in `registry`, synthesizing and publishing on a miss.
///
/// Concurrent misses on the same shape each synthesize; the last publish
/// wins and every caller uses its own adapter. Nothing is published while
/// the family is disabled.
pub(crate) fn resolve<T: Clone>(
    registry: &Registry<T>,
    shape: &FunctionShape,
    synthesize: impl FnOnce(&FunctionShape) -> Result<T>,
) -> Result<T> {
    if let Some(adapter) = registry.get(shape) {
        return Ok(adapter);
    }
    let adapter = synthesize(shape)?;
    if !registry.is_disabled() {
        registry.register(shape.clone(), adapter.clone());
    }
    Ok(adapter)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, reason = "Tests use unwrap for brevity")]
mod tests;
