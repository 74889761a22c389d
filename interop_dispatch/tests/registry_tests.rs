//! Registry lifetime: registration, lazy nested types, unregistration and
//! concurrent first use.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier};
use std::thread;

use common::*;
use interop_dispatch::prelude::*;

static INNER_BUILDS: AtomicUsize = AtomicUsize::new(0);

struct Outer;
struct Inner;

impl HostType for Outer {
    fn describe(ty: &mut TypeBuilder<Self>) {
        ty.nested::<Inner>();
        ty.static_method("Version", vec![], |_| Ok(DynamicValue::Number(2.0)));
    }
}

impl HostType for Inner {
    fn describe(ty: &mut TypeBuilder<Self>) {
        INNER_BUILDS.fetch_add(1, Ordering::SeqCst);
        ty.static_method("Answer", vec![], |_| Ok(DynamicValue::Number(42.0)));
    }
}

#[test]
fn test_nested_types_build_once_under_contention() {
    let registry = Arc::new(TypeRegistry::default());
    registry.register::<Outer>(VisibilityPolicy::Default).unwrap();

    let inner = TypeTag::of::<Inner>();
    assert!(registry.is_registered(inner));
    assert!(registry.built_descriptor(inner).is_none());
    assert_eq!(INNER_BUILDS.load(Ordering::SeqCst), 0);

    let barrier = Arc::new(Barrier::new(8));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.descriptor(inner).unwrap()
            })
        })
        .collect();
    let sets: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    assert_eq!(INNER_BUILDS.load(Ordering::SeqCst), 1);
    assert!(sets.windows(2).all(|w| Arc::ptr_eq(&w[0], &w[1])));
}

struct Shelf;
struct Drawer;

impl HostType for Shelf {
    fn describe(ty: &mut TypeBuilder<Self>) {
        ty.nested::<Drawer>();
    }
}

impl HostType for Drawer {
    fn describe(ty: &mut TypeBuilder<Self>) {
        ty.static_method("Open", vec![], |_| Ok(DynamicValue::from("open")));
    }
}

#[test]
fn test_nested_type_reads_as_static_facade() {
    let registry = Arc::new(TypeRegistry::default());
    registry.register::<Shelf>(VisibilityPolicy::Default).unwrap();
    let dispatcher = Dispatcher::new(registry);

    let shelf = UserData::static_facade(TypeTag::of::<Shelf>());
    let drawer = dispatcher.get(&shelf, "Drawer").unwrap();
    let drawer = drawer.as_user_data().unwrap();
    assert!(drawer.is_static_facade());
    assert_eq!(drawer.tag(), TypeTag::of::<Drawer>());
    assert_eq!(
        dispatcher.call(drawer, CallStyle::Instance, "Open", &[]).unwrap(),
        DynamicValue::from("open")
    );
}

#[test]
fn test_unregister_invalidates_later_lookups() {
    let fx = Fixture::new();
    assert_eq!(fx.colon(&fx.o, "Method1", &[num(5.0)]).unwrap(), s("3"));

    let tag = TypeTag::of::<OverloadsTestClass>();
    let held = fx.registry().descriptor(tag).unwrap();
    assert!(fx.registry().unregister_type(tag));

    assert!(held.is_discarded());
    assert!(held.call_cache().is_empty());
    assert!(matches!(
        fx.colon(&fx.o, "Method1", &[num(5.0)]),
        Err(InteropError::UnregisteredType(t)) if t == tag
    ));

    // A held set still describes the type.
    assert!(held.member("Method1").is_some());

    fx.registry()
        .register::<OverloadsTestClass>(VisibilityPolicy::Default)
        .unwrap();
    assert_eq!(fx.colon(&fx.o, "Method1", &[num(5.0)]).unwrap(), s("3"));
}

#[test]
fn test_independent_registries() {
    let a = Fixture::new();
    let b = Fixture::new();
    a.registry().clear();
    assert!(a.colon(&a.o, "Method1", &[]).is_err());
    assert_eq!(b.colon(&b.o, "Method1", &[]).unwrap(), s("1"));
}

struct Vault;

impl HostType for Vault {
    fn describe(ty: &mut TypeBuilder<Self>) {
        ty.static_method("Open", vec![], |_| Ok(DynamicValue::Nil));
    }
}

#[test]
fn test_no_reflection_only_fails_that_type() {
    let fx = Fixture::new();
    let err = fx
        .registry()
        .register::<Vault>(VisibilityPolicy::NoReflection)
        .unwrap_err();
    assert!(err.to_string().starts_with("ReflectionNotAllowed"));
    assert!(!fx.registry().is_registered(TypeTag::of::<Vault>()));
    assert_eq!(fx.colon(&fx.o, "Method1", &[]).unwrap(), s("1"));
}

#[test]
fn test_value_type_default_constructor() {
    let fx = Fixture::new();
    let made = fx
        .dispatcher
        .construct(TypeTag::of::<OverloadsTestClass>(), &[])
        .unwrap();
    let made = made.as_user_data().unwrap();
    assert!(made.downcast_ref::<OverloadsTestClass>().is_some());
    assert_eq!(fx.colon(made, "Method1", &[]).unwrap(), s("1"));
}
