//! Per-family adapter map with an atomic disable switch.

use std::sync::atomic::{AtomicBool, Ordering};

use parking_lot::RwLock;
use rowfn_shape::FunctionShape;
use rustc_hash::FxHashMap;
use tracing::{debug, trace};

/// A concurrent `FunctionShape -> T` cache.
///
/// `T` is usually an `Arc<dyn Fn ..>` adapter, so cloning it out of the map
/// is cheap and the read lock is released before the adapter runs.
///
/// # Thread Safety
/// Readers share a `RwLock`; writers are serialized. The disable flag is
/// read and written without taking the lock.
pub struct Registry<T> {
    family: &'static str,
    disabled: AtomicBool,
    entries: RwLock<FxHashMap<FunctionShape, T>>,
}

impl<T: Clone> Registry<T> {
    /// Create an empty, enabled registry. `family` names it in log output.
    pub fn new(family: &'static str) -> Self {
        Registry {
            family,
            disabled: AtomicBool::new(false),
            entries: RwLock::new(FxHashMap::default()),
        }
    }

    /// Look up the adapter for `shape`.
    ///
    /// Returns `None` while the family is disabled, whatever the map holds.
    pub fn get(&self, shape: &FunctionShape) -> Option<T> {
        if self.is_disabled() {
            return None;
        }
        let hit = self.entries.read().get(shape).cloned();
        if hit.is_some() {
            trace!(family = self.family, %shape, "registry hit");
        }
        hit
    }

    /// Store `adapter` under `shape`. The last write wins.
    ///
    /// Registration is honored even while the family is disabled; the entry
    /// becomes visible once it is enabled again.
    pub fn register(&self, shape: FunctionShape, adapter: T) {
        debug!(family = self.family, %shape, "registry publish");
        self.entries.write().insert(shape, adapter);
    }

    /// Turn lookups off (`true`) or back on (`false`).
    pub fn disable(&self, disabled: bool) {
        debug!(family = self.family, disabled, "registry toggled");
        self.disabled.store(disabled, Ordering::Release);
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::Acquire)
    }

    /// Number of cached shapes, counted regardless of the disable flag.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn family(&self) -> &'static str {
        self.family
    }
}

impl<T> std::fmt::Debug for Registry<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("family", &self.family)
            .field("disabled", &self.disabled.load(Ordering::Relaxed))
            .field("len", &self.entries.read().len())
            .finish()
    }
}
