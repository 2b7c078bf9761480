//! Rowfn Registry - shape-keyed adapter cache.
//!
//! One [`Registry`] exists per adapter family. Lookups take a shared lock,
//! publishes take the exclusive lock, and neither is held across any
//! engine call. The cache never evicts.

mod registry;

pub use registry::Registry;
