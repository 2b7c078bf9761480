use super::*;

use std::cell::Cell;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use crate::error::Error;
use crate::row;
use crate::testing::MemoryRows;

type IdName = fn(&mut dyn RowCursor, &mut i64, &mut String) -> Result<()>;
type IdNameValues = fn(&mut dyn RowCursor) -> Result<(i64, String)>;

fn registry() -> Registry<ScanAdapter> {
    Registry::new("scan")
}

fn positioned(rows: Vec<Vec<rowfn_driver::Value>>) -> MemoryRows {
    let mut rows = MemoryRows::new(rows);
    assert!(rows.advance());
    rows
}

// === Styles ===

#[test]
fn out_params_fill_destinations() {
    let scanner = Scanner::<IdName>::build(&registry()).unwrap();
    let mut rows = positioned(vec![row![42, "Eiffel"]]);

    let mut id = 0;
    let mut name = String::new();
    scanner.scan(&mut rows, &mut id, &mut name).unwrap();

    assert_eq!((id, name.as_str()), (42, "Eiffel"));
}

#[test]
fn return_values_are_fresh_per_call() {
    let scanner = Scanner::<IdNameValues>::build(&registry()).unwrap();
    let mut rows = MemoryRows::new(vec![row![1, "a"], row![2, "b"]]);

    let mut seen = Vec::new();
    while rows.advance() {
        seen.push(scanner.scan(&mut rows).unwrap());
    }

    assert_eq!(seen, vec![(1, "a".to_owned()), (2, "b".to_owned())]);
}

#[test]
fn nullable_columns_decode_into_options() {
    let scanner = Scanner::<fn(&mut dyn RowCursor) -> Result<(Option<String>, Option<i64>)>>::build(
        &registry(),
    )
    .unwrap();
    let mut rows = positioned(vec![row![None::<String>, 5]]);

    assert_eq!(scanner.scan(&mut rows).unwrap(), (None, Some(5)));
}

#[test]
fn scanner_does_not_advance_or_close() {
    let scanner = Scanner::<IdNameValues>::build(&registry()).unwrap();
    let mut rows = positioned(vec![row![1, "a"], row![2, "b"]]);
    let stats = rows.stats();

    scanner.scan(&mut rows).unwrap();
    scanner.scan(&mut rows).unwrap();

    assert_eq!(stats.advanced(), 1);
    assert_eq!(stats.closed(), 0);
}

#[test]
fn eight_columns() {
    type Wide = fn(&mut dyn RowCursor) -> Result<(i64, i64, i64, i64, i64, i64, i64, String)>;
    let scanner = Scanner::<Wide>::build(&registry()).unwrap();
    let mut rows = positioned(vec![row![1, 2, 3, 4, 5, 6, 7, "eight"]]);

    let row = scanner.scan(&mut rows).unwrap();
    assert_eq!(row.7, "eight");
    assert_eq!(row.0 + row.6, 8);
}

// === Errors ===

#[test]
fn decode_error_is_wrapped() {
    let scanner = Scanner::<IdName>::build(&registry()).unwrap();
    let mut rows = positioned(vec![row!["not an id", "a"]]);

    let mut id = 0;
    let mut name = String::new();
    let err = scanner.scan(&mut rows, &mut id, &mut name).unwrap_err();
    assert!(matches!(err, Error::Decode { columns: 2, .. }), "{err:?}");
}

#[test]
fn scanning_without_a_row_fails() {
    let scanner = Scanner::<IdNameValues>::build(&registry()).unwrap();
    let mut rows = MemoryRows::new(vec![row![1, "a"]]);

    let err = scanner.scan(&mut rows).unwrap_err();
    assert!(matches!(err, Error::Decode { .. }), "{err:?}");
}

#[test]
fn mismatched_adapter_is_a_signature_error() {
    let other = Scanner::<fn(&mut dyn RowCursor) -> Result<(i64, i64)>>::build(&registry())
        .unwrap()
        .adapter;
    let scanner = Scanner::<IdNameValues>::from_adapter(other);
    let mut rows = positioned(vec![row![1, 2]]);

    let err = scanner.scan(&mut rows).unwrap_err();
    assert!(matches!(err, Error::Signature(_)), "{err:?}");
}

// === Caching ===

#[test]
fn scanners_share_cached_adapter() {
    let registry = registry();
    let first = Scanner::<IdName>::build(&registry).unwrap();
    let second = Scanner::<IdName>::build(&registry).unwrap();

    assert!(Arc::ptr_eq(&first.adapter, &second.adapter));
    assert_eq!(registry.len(), 1);
}

#[test]
fn styles_are_cached_separately() {
    let registry = registry();
    Scanner::<IdName>::build(&registry).unwrap();
    Scanner::<IdNameValues>::build(&registry).unwrap();
    assert_eq!(registry.len(), 2);
}

#[test]
fn disabled_registry_synthesizes_every_time() {
    let registry = registry();
    registry.disable(true);

    let first = Scanner::<IdName>::build(&registry).unwrap();
    let second = Scanner::<IdName>::build(&registry).unwrap();

    assert!(!Arc::ptr_eq(&first.adapter, &second.adapter));
    assert!(registry.is_empty());
}

#[test]
fn reenabled_registry_caches_again() {
    let registry = registry();
    registry.disable(true);
    Scanner::<IdName>::build(&registry).unwrap();
    registry.disable(false);

    Scanner::<IdName>::build(&registry).unwrap();
    assert_eq!(registry.len(), 1);
}

// === resolve ===

#[test]
fn resolve_synthesizes_only_on_miss() {
    let registry: Registry<u32> = Registry::new("test");
    let shape = <IdName as RowSignature>::shape();
    let calls = Cell::new(0);
    let synthesize = |_: &FunctionShape| {
        calls.set(calls.get() + 1);
        Ok(7)
    };

    assert_eq!(resolve(&registry, &shape, synthesize).unwrap(), 7);
    assert_eq!(resolve(&registry, &shape, synthesize).unwrap(), 7);
    assert_eq!(calls.get(), 1);
}

#[test]
fn resolve_does_not_publish_failures() {
    let registry: Registry<u32> = Registry::new("test");
    let shape = <IdName as RowSignature>::shape();

    let err = resolve(&registry, &shape, |_| Err(Error::NoRows)).unwrap_err();
    assert!(matches!(err, Error::NoRows), "{err:?}");
    assert!(registry.is_empty());
}
