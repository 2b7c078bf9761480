use super::*;

use pretty_assertions::assert_eq;
use rowfn_driver::ExecOutcome;
use rowfn_shape::{ShapeError, TypeDesc};

use crate::row;
use crate::testing::{Canned, MemoryDb, MemoryError, MemoryRows, MemoryTx};

fn cursor() -> TypeDesc {
    TypeDesc::row_cursor::<dyn RowCursor>()
}

fn error() -> TypeDesc {
    TypeDesc::error::<Error>()
}

fn unbox<T: 'static>(value: Box<dyn Destination>) -> T {
    *value.into_any().downcast::<T>().unwrap()
}

// === Scan ===

#[test]
fn scan_dyn_out_params() {
    let rowfn = RowFn::new();
    let shape = FunctionShape::new(
        [cursor(), TypeDesc::out_param::<String>()],
        [error()],
    );
    let scanner = rowfn.scan_dyn(shape.clone()).unwrap();
    assert_eq!(scanner.style(), Style::OutParams);
    assert_eq!(scanner.shape(), &shape);

    let mut rows = MemoryRows::new(vec![row!["x"]]);
    assert!(rows.advance());
    let mut name = String::new();
    let fresh = scanner.scan(&mut rows, &mut [&mut name as &mut dyn Scan]).unwrap();

    assert!(fresh.is_empty());
    assert_eq!(name, "x");
}

#[test]
fn scan_dyn_return_values() {
    let rowfn = RowFn::new();
    let shape = FunctionShape::new(
        [cursor()],
        [TypeDesc::column::<i64>(), TypeDesc::column::<bool>(), error()],
    );
    let scanner = rowfn.scan_dyn(shape).unwrap();
    assert_eq!(scanner.style(), Style::ReturnValues);

    let mut rows = MemoryRows::new(vec![row![3, true]]);
    assert!(rows.advance());
    let mut values = scanner.scan(&mut rows, &mut []).unwrap().into_iter();

    assert_eq!(unbox::<i64>(values.next().unwrap()), 3);
    assert!(unbox::<bool>(values.next().unwrap()));
}

#[test]
fn scan_dyn_rejects_bad_first_parameter() {
    let rowfn = RowFn::new();
    let shape = FunctionShape::new([TypeDesc::out_param::<i64>()], [error()]);

    let err = rowfn.scan_dyn(shape).unwrap_err();
    assert!(
        matches!(
            err,
            Error::Shape {
                source: ShapeError::FirstParamNotCursor { .. },
                ..
            }
        ),
        "{err:?}"
    );
    assert!(rowfn.registries().scan.is_empty());
}

#[test]
fn scan_dyn_shares_typed_cache() {
    let rowfn = RowFn::new();
    let typed = rowfn
        .scan::<fn(&mut dyn RowCursor, &mut String) -> Result<()>>()
        .unwrap();
    drop(typed);

    let shape = FunctionShape::new(
        [cursor(), TypeDesc::out_param::<String>()],
        [error()],
    );
    rowfn.scan_dyn(shape).unwrap();
    assert_eq!(rowfn.registries().scan.len(), 1);
}

// === ForEach ===

fn callback_shape(returns: Vec<TypeDesc>) -> FunctionShape {
    FunctionShape::new([TypeDesc::column::<i64>()], returns)
}

#[test]
fn for_each_dyn_dispatches_and_closes() {
    let rowfn = RowFn::new();
    let rows = MemoryRows::new(vec![row![1], row![2], row![3]]);
    let stats = rows.stats();

    let mut sum = 0;
    rowfn
        .for_each_dyn(rows, &callback_shape(Vec::new()), |mut values| {
            sum += unbox::<i64>(values.remove(0));
            Flow::Continue
        })
        .unwrap();

    assert_eq!(sum, 6);
    assert_eq!(stats.closed(), 1);
}

#[test]
fn for_each_dyn_bool_stop() {
    let rowfn = RowFn::new();
    let rows = MemoryRows::new(vec![row![1], row![2], row![3]]);

    let mut dispatched = 0;
    rowfn
        .for_each_dyn(rows, &callback_shape(vec![TypeDesc::bool()]), |_| {
            dispatched += 1;
            Flow::Stop
        })
        .unwrap();

    assert_eq!(dispatched, 1);
}

#[test]
fn for_each_dyn_closes_on_bad_shape() {
    let rowfn = RowFn::new();
    let rows = MemoryRows::new(vec![row![1]]);
    let stats = rows.stats();

    let halt = rowfn
        .for_each_dyn(rows, &FunctionShape::new([], []), |_| Flow::Continue)
        .unwrap_err();

    assert!(matches!(halt, Halt::Failed(Error::Shape { .. })), "{halt:?}");
    assert_eq!(stats.closed(), 1);
}

#[test]
fn for_each_dyn_reports_cursor_error() {
    let rowfn = RowFn::new();
    let rows =
        MemoryRows::new(vec![row![1], row![2]]).fail_after(1, MemoryError::message("reset"));

    let halt = rowfn
        .for_each_dyn(rows, &callback_shape(Vec::new()), |_| Flow::Continue)
        .unwrap_err();
    assert!(matches!(halt, Halt::Failed(Error::Cursor(_))), "{halt:?}");
}

// === Statements ===

fn exec_shape(tx: bool) -> FunctionShape {
    let mut params = vec![TypeDesc::context::<Context>()];
    if tx {
        params.push(TypeDesc::transaction::<dyn TxScope>());
    }
    params.push(TypeDesc::arg::<String>());
    FunctionShape::new(params, [TypeDesc::exec_outcome::<ExecOutcome>(), error()])
}

#[test]
fn statement_dyn_exec() {
    let rowfn = RowFn::new();
    let db = MemoryDb::new().always("DELETE", Canned::Exec(ExecOutcome::new(4)));
    let ctx = Context::background();

    let (stmt, release) = rowfn
        .statement_dyn(&ctx, &db, "DELETE", &exec_shape(false))
        .unwrap();
    assert_eq!(stmt.kind(), StatementKind::Exec);

    let reply = stmt.call(&ctx, None, &[Value::from("old")]).unwrap();
    assert!(
        matches!(reply, Reply::Executed(ExecOutcome { rows_affected: 4, .. })),
        "{reply:?}"
    );
    release.release().unwrap();
    assert_eq!(db.stats().closed(), 1);
}

#[test]
fn statement_dyn_in_transaction() {
    let rowfn = RowFn::new();
    let db = MemoryDb::new().always("DELETE", Canned::Exec(ExecOutcome::new(1)));
    let tx = MemoryTx::new();
    let ctx = Context::background();

    let (stmt, _release) = rowfn
        .statement_dyn(&ctx, &db, "DELETE", &exec_shape(true))
        .unwrap();
    stmt.call(&ctx, Some(&tx as &dyn TxScope), &[Value::from("old")])
        .unwrap();

    assert_eq!(tx.calls(), vec![vec![Value::from("old")]]);
}

#[test]
fn statement_dyn_checks_shape_before_preparing() {
    let rowfn = RowFn::new();
    let db = MemoryDb::new().always("DELETE", Canned::Exec(ExecOutcome::new(1)));
    let shape = FunctionShape::new([TypeDesc::arg::<String>()], [error()]);

    let err = rowfn
        .statement_dyn(&Context::background(), &db, "DELETE", &shape)
        .unwrap_err();

    assert!(
        matches!(
            err,
            Error::Shape {
                source: ShapeError::FirstParamNotContext { .. },
                ..
            }
        ),
        "{err:?}"
    );
    assert_eq!(db.stats().prepared(), 0);
}

#[test]
fn statement_dyn_prepare_failure() {
    let rowfn = RowFn::new();
    let db = MemoryDb::new();

    let err = rowfn
        .statement_dyn(&Context::background(), &db, "DELETE", &exec_shape(false))
        .unwrap_err();
    assert!(matches!(err, Error::Prepare { .. }), "{err:?}");
}
