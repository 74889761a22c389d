//! Indexers: declared ones and those synthesized for host arrays.

mod common;

use std::sync::Arc;

use common::*;
use interop_dispatch::host::ArrayBase;
use interop_dispatch::prelude::*;
use interop_dispatch::types::ResolveError;
use parking_lot::RwLock;

fn grid() -> UserData {
    let values = (1..=6).map(|v| num(f64::from(v))).collect();
    HostArray::from_values(ParamType::Int32, &[2, 3], values)
        .unwrap()
        .into_user_data()
}

#[test]
fn test_rank_two_array_indexing() {
    let dispatcher = Dispatcher::new(Arc::new(TypeRegistry::default()));
    let arr = grid();

    assert_eq!(dispatcher.index_get(&arr, &[num(1.0), num(2.0)]).unwrap(), num(6.0));
    dispatcher
        .index_set(&arr, &[num(0.0), num(1.0)], num(20.0))
        .unwrap();
    assert_eq!(dispatcher.index_get(&arr, &[num(0.0), num(1.0)]).unwrap(), num(20.0));

    let err = dispatcher.index_get(&arr, &[num(1.0)]).unwrap_err();
    assert!(matches!(
        err.as_resolve(),
        Some(ResolveError::NoViableCandidate { .. })
    ));
    assert!(matches!(
        dispatcher.index_get(&arr, &[num(2.0), num(0.0)]),
        Err(InteropError::Runtime(RuntimeError::BoundsError { index: 2, length: 2 }))
    ));
}

#[test]
fn test_arrays_need_registration_when_auto_registration_is_off() {
    let registry = Arc::new(TypeRegistry::new(InteropConfig {
        auto_register_arrays: false,
        ..InteropConfig::default()
    }));
    let dispatcher = Dispatcher::new(Arc::clone(&registry));
    let arr = grid();
    assert!(matches!(
        dispatcher.index_get(&arr, &[num(0.0), num(0.0)]),
        Err(InteropError::UnregisteredType(_))
    ));
    registry.register_array(ParamType::Int32, 2).unwrap();
    assert_eq!(dispatcher.index_get(&arr, &[num(0.0), num(0.0)]).unwrap(), num(1.0));
}

struct Stats;

impl HostType for Stats {
    fn describe(ty: &mut TypeBuilder<Self>) {
        ty.static_method("Count", vec![param("values", ParamType::host::<ArrayBase>())], |frame| {
            let values: UserData = frame.get(0)?;
            let array = values
                .downcast_ref::<HostArray>()
                .ok_or_else(|| RuntimeError::type_error("expected an array"))?;
            Ok(num(array.len() as f64))
        });
    }
}

#[test]
fn test_array_passes_as_array_base() {
    let registry = Arc::new(TypeRegistry::default());
    registry.register::<Stats>(VisibilityPolicy::Default).unwrap();
    registry.register_array(ParamType::Int32, 2).unwrap();
    let dispatcher = Dispatcher::new(registry);

    let stats = UserData::static_facade(TypeTag::of::<Stats>());
    let out = dispatcher
        .call(&stats, CallStyle::Static, "Count", &[DynamicValue::UserData(grid())])
        .unwrap();
    assert_eq!(out, num(6.0));
}

/// Sparse map keyed by (row, column) with a declared two-key indexer.
#[derive(Default)]
struct Sheet {
    cells: RwLock<Vec<((i64, i64), String)>>,
}

impl HostType for Sheet {
    fn describe(ty: &mut TypeBuilder<Self>) {
        ty.constructor(vec![], |_| Ok(Sheet::default()));
        ty.indexer_rw(
            vec![param("row", ParamType::Int32), param("col", ParamType::Int32)],
            ParamType::String,
            |this, frame| {
                let key = (frame.get::<i64>(0)?, frame.get::<i64>(1)?);
                let cells = this.cells.read();
                let found = cells.iter().find(|(k, _)| *k == key).map(|(_, v)| v.clone());
                Ok(DynamicValue::from(found))
            },
            |this, frame| {
                let key = (frame.get::<i64>(0)?, frame.get::<i64>(1)?);
                let value: String = frame.get(2)?;
                let mut cells = this.cells.write();
                cells.retain(|(k, _)| *k != key);
                cells.push((key, value));
                Ok(())
            },
        );
    }
}

#[test]
fn test_declared_indexer() {
    let registry = Arc::new(TypeRegistry::default());
    registry.register::<Sheet>(VisibilityPolicy::Default).unwrap();
    let dispatcher = Dispatcher::new(registry);

    let sheet = dispatcher.construct(TypeTag::of::<Sheet>(), &[]).unwrap();
    let sheet = sheet.as_user_data().unwrap();
    assert_eq!(dispatcher.index_get(sheet, &[num(1.0), num(1.0)]).unwrap(), nil());
    dispatcher
        .index_set(sheet, &[num(1.0), num(1.0)], s("A1"))
        .unwrap();
    assert_eq!(dispatcher.index_get(sheet, &[num(1.0), num(1.0)]).unwrap(), s("A1"));
}
