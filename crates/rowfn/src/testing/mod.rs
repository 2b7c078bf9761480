//! In-memory engine for tests, benchmarks and examples.
//!
//! - **rows**: [`MemoryRows`], a row cursor over literal values with
//!   failure injection and close counting
//! - **db**: [`MemoryDb`], a statement factory answering canned results per
//!   query, and [`MemoryTx`], a transaction scope that records its use
//!
//! # Usage
//!
//! ```ignore
//! use rowfn::testing::{row, MemoryRows};
//!
//! let rows = MemoryRows::new(vec![row![1, "a"], row![2, "b"]]);
//! let stats = rows.stats();
//! rowfn::for_each(rows, |id: i64, name: String| println!("{id} {name}"))?;
//! assert_eq!(stats.closed(), 1);
//! ```

mod db;
mod rows;

pub use db::{Canned, DbStats, MemoryDb, MemoryTx};
pub use rows::{MemoryError, MemoryRows, RowStats};

/// Build a `Vec<Value>` from anything convertible into [`rowfn_driver::Value`].
#[macro_export]
macro_rules! row {
    ($($value:expr),* $(,)?) => {
        vec![$($crate::driver::Value::from($value)),*]
    };
}

pub use crate::row;
