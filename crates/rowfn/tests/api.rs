//! End-to-end tests of the public API against the in-memory engine.
//!
//! Each test builds its own [`RowFn`] so cache assertions do not depend on
//! test order; the free functions are exercised once against the global
//! instance.

#![allow(clippy::unwrap_used, clippy::expect_used, reason = "Tests can panic")]

use std::sync::Arc;
use std::thread;

use pretty_assertions::assert_eq;
use rowfn::testing::{Canned, MemoryDb, MemoryError, MemoryRows, MemoryTx};
use rowfn::{
    row, Context, Error, ExecOutcome, Family, Result, RowCursor, RowFn, Rows, TxScope, Value,
};

// -- Fixtures --

#[derive(Debug, PartialEq)]
struct Poi {
    id: i64,
    name: String,
    rating: Option<f64>,
}

fn poi_rows() -> Vec<Vec<Value>> {
    vec![
        row![1, "Louvre", 4.7],
        row![2, "Orsay", None::<f64>],
        row![3, "Pompidou", 4.1],
    ]
}

fn poi_db() -> MemoryDb {
    MemoryDb::new()
        .always("SELECT id, name, rating FROM poi", Canned::Rows(poi_rows()))
        .on("SELECT name FROM poi WHERE id = ?", |args: &[Value]| {
            let found = poi_rows().into_iter().find(|row| row[0] == args[0]);
            Canned::Rows(found.map(|row| vec![row[1].clone()]).into_iter().collect())
        })
        .on("UPDATE poi SET name = ? WHERE id = ?", |args: &[Value]| {
            let known = matches!(args[1], Value::Int(1..=3));
            Canned::Exec(ExecOutcome::new(u64::from(known)))
        })
        .always(
            "INSERT INTO poi (name) VALUES (?)",
            Canned::Exec(ExecOutcome::new(1).with_last_insert_id(4)),
        )
}

#[derive(Debug)]
enum AppError {
    Stop(i64),
    Rowfn(Error),
}

impl From<Error> for AppError {
    fn from(err: Error) -> Self {
        AppError::Rowfn(err)
    }
}

// -- Scan --

#[test]
fn scan_out_params_over_a_cursor() {
    let rowfn = RowFn::new();
    let scan = rowfn
        .scan::<fn(&mut dyn RowCursor, &mut i64, &mut String, &mut Option<f64>) -> Result<()>>()
        .unwrap();

    let mut rows = MemoryRows::new(poi_rows());
    let mut pois = Vec::new();
    while rows.advance() {
        let mut poi = Poi {
            id: 0,
            name: String::new(),
            rating: None,
        };
        scan.scan(&mut rows, &mut poi.id, &mut poi.name, &mut poi.rating)
            .unwrap();
        pois.push(poi);
    }

    assert_eq!(pois.len(), 3);
    assert_eq!(
        pois[1],
        Poi {
            id: 2,
            name: "Orsay".to_owned(),
            rating: None
        }
    );
}

#[test]
fn scan_return_values_over_a_cursor() {
    let rowfn = RowFn::new();
    let scan = rowfn
        .scan::<fn(&mut dyn RowCursor) -> Result<(i64, String, Option<f64>)>>()
        .unwrap();

    let mut rows = MemoryRows::new(poi_rows());
    let mut ids = Vec::new();
    while rows.advance() {
        let (id, _, _) = scan.scan(&mut rows).unwrap();
        ids.push(id);
    }
    assert_eq!(ids, vec![1, 2, 3]);
}

// -- ForEach --

#[test]
fn for_each_round_trip() {
    let rowfn = RowFn::new();
    let rows = MemoryRows::new(vec![row![1, "a"], row![2, "b"]]);

    let mut seen = Vec::new();
    rowfn
        .for_each(rows, |id: i64, name: String| seen.push((id, name)))
        .unwrap();

    assert_eq!(seen, vec![(1, "a".to_owned()), (2, "b".to_owned())]);
}

#[test]
fn for_each_stops_on_false() {
    let rowfn = RowFn::new();
    let rows = MemoryRows::new(poi_rows());
    let stats = rows.stats();

    let mut names = Vec::new();
    rowfn
        .for_each(rows, |id: i64, name: String, _: Option<f64>| {
            names.push(name);
            id != 2
        })
        .unwrap();

    assert_eq!(names, vec!["Louvre".to_owned(), "Orsay".to_owned()]);
    assert_eq!(stats.closed(), 1);
}

#[test]
fn for_each_returns_callback_error() {
    let rowfn = RowFn::new();
    let rows = MemoryRows::new(poi_rows());
    let stats = rows.stats();

    let err = rowfn
        .for_each(rows, |id: i64, _: String, _: Option<f64>| {
            if id == 2 {
                Err(AppError::Stop(id))
            } else {
                Ok(())
            }
        })
        .unwrap_err();

    assert!(matches!(err, AppError::Stop(2)), "{err:?}");
    assert_eq!(stats.closed(), 1);
}

#[test]
fn for_each_lifts_engine_errors() {
    let rowfn = RowFn::new();
    let rows = MemoryRows::new(poi_rows()).fail_after(1, MemoryError::message("reset"));

    let err = rowfn
        .for_each(rows, |_: i64, _: String, _: Option<f64>| -> Result<(), AppError> { Ok(()) })
        .unwrap_err();

    assert!(matches!(err, AppError::Rowfn(Error::Cursor(_))), "{err:?}");
}

#[test]
fn for_each_over_query_result() {
    let rowfn = RowFn::new();
    let db = poi_db();
    let ctx = Context::background();
    let (all, release) = rowfn
        .query::<fn(&Context) -> Result<Rows>>(&ctx, &db, "SELECT id, name, rating FROM poi")
        .unwrap();

    let mut total = 0.0;
    rowfn
        .for_each(all.call(&ctx).unwrap(), |_: i64, _: String, rating: Option<f64>| {
            total += rating.unwrap_or_default();
        })
        .unwrap();
    release.release().unwrap();

    assert!((total - 8.8_f64).abs() < 1e-9);
}

// -- Statements --

#[test]
fn exec_with_outcome() {
    let rowfn = RowFn::new();
    let db = poi_db();
    let ctx = Context::background();

    let (insert, release) = rowfn
        .exec::<fn(&Context, String) -> Result<ExecOutcome>>(
            &ctx,
            &db,
            "INSERT INTO poi (name) VALUES (?)",
        )
        .unwrap();
    let outcome = insert.call(&ctx, "Rodin".to_owned()).unwrap();
    release.release().unwrap();

    assert_eq!(outcome.last_insert_id, Some(4));
    assert_eq!(db.stats().closed(), 1);
}

#[test]
fn query_row_and_no_rows() {
    let rowfn = RowFn::new();
    let db = poi_db();
    let ctx = Context::background();

    let (name_of, _release) = rowfn
        .query_row::<fn(&Context, i64) -> Result<(String,)>>(
            &ctx,
            &db,
            "SELECT name FROM poi WHERE id = ?",
        )
        .unwrap();

    assert_eq!(name_of.call(&ctx, 3).unwrap(), ("Pompidou".to_owned(),));
    assert!(matches!(name_of.call(&ctx, 42), Err(Error::NoRows)));
}

#[test]
fn exec_inside_transaction() {
    let rowfn = RowFn::new();
    let db = poi_db();
    let tx = MemoryTx::new();
    let ctx = Context::background();

    let (rename, _release) = rowfn
        .exec::<fn(&Context, &dyn TxScope, String, i64) -> Result<ExecOutcome>>(
            &ctx,
            &db,
            "UPDATE poi SET name = ? WHERE id = ?",
        )
        .unwrap();
    let outcome = rename
        .call_tx(&ctx, &tx, "Centre Pompidou".to_owned(), 3)
        .unwrap();

    assert_eq!(outcome.rows_affected, 1);
    assert_eq!(
        tx.calls(),
        vec![vec![Value::from("Centre Pompidou"), Value::Int(3)]]
    );
}

#[test]
fn prepare_failure_is_not_a_config_error() {
    let rowfn = RowFn::new();
    let db = poi_db().fail_prepare("SELECT name FROM poi WHERE id = ?", "no such table");
    let ctx = Context::background();

    let err = rowfn
        .query_row::<fn(&Context, i64) -> Result<(String,)>>(
            &ctx,
            &db,
            "SELECT name FROM poi WHERE id = ?",
        )
        .unwrap_err();

    assert!(matches!(err, Error::Prepare { .. }), "{err:?}");
    assert!(!err.is_config());
}

// -- Caching --

#[test]
fn concurrent_first_use() {
    let rowfn = RowFn::new();

    let handles: Vec<_> = (0..8)
        .map(|_| {
            let rowfn = rowfn.clone();
            thread::spawn(move || {
                let scan = rowfn
                    .scan::<fn(&mut dyn RowCursor) -> Result<(i64, String, Option<f64>)>>()
                    .unwrap();
                let mut rows = MemoryRows::new(poi_rows());
                assert!(rows.advance());
                scan.scan(&mut rows).unwrap().0
            })
        })
        .collect();

    for handle in handles {
        assert_eq!(handle.join().unwrap(), 1);
    }
    assert_eq!(rowfn.registries().scan.len(), 1);
}

#[test]
fn disabled_family_still_works() {
    let rowfn = RowFn::new();
    rowfn.disable(Family::ForEach, true);

    let mut count = 0;
    for _ in 0..3 {
        rowfn
            .for_each(MemoryRows::new(poi_rows()), |_: i64, _: String, _: Option<f64>| {
                count += 1;
            })
            .unwrap();
    }

    assert_eq!(count, 9);
    assert!(rowfn.registries().for_each.is_empty());

    rowfn.disable(Family::ForEach, false);
    rowfn
        .for_each(MemoryRows::new(poi_rows()), |_: i64, _: String, _: Option<f64>| {})
        .unwrap();
    assert_eq!(rowfn.registries().for_each.len(), 1);
}

#[test]
fn shared_instance_across_threads() {
    let rowfn = Arc::new(RowFn::new());
    let db = Arc::new(poi_db());

    let handles: Vec<_> = (1..=3)
        .map(|id| {
            let rowfn = Arc::clone(&rowfn);
            let db = Arc::clone(&db);
            thread::spawn(move || {
                let ctx = Context::background();
                let (name_of, release) = rowfn
                    .query_row::<fn(&Context, i64) -> Result<(String,)>>(
                        &ctx,
                        db.as_ref(),
                        "SELECT name FROM poi WHERE id = ?",
                    )
                    .unwrap();
                let (name,) = name_of.call(&ctx, id).unwrap();
                release.release().unwrap();
                name
            })
        })
        .collect();

    let names: Vec<String> = handles.into_iter().map(|h| h.join().unwrap()).collect();
    assert_eq!(
        names,
        vec!["Louvre".to_owned(), "Orsay".to_owned(), "Pompidou".to_owned()]
    );
}

// -- Global instance --

#[test]
fn free_functions() {
    let rows = MemoryRows::new(poi_rows());
    let mut ids = Vec::new();
    rowfn::for_each(rows, |id: i64, _: String, _: Option<f64>| ids.push(id)).unwrap();
    assert_eq!(ids, vec![1, 2, 3]);

    let scan = rowfn::scan::<fn(&mut dyn RowCursor, &mut i64) -> Result<()>>().unwrap();
    let mut rows = MemoryRows::new(vec![row![5]]);
    assert!(rows.advance());
    let mut id = 0;
    scan.scan(&mut rows, &mut id).unwrap();
    assert_eq!(id, 5);
}
