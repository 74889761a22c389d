//! Wiring export snapshots.

mod common;

use std::sync::Arc;

use common::*;
use interop_dispatch::prelude::*;
use interop_dispatch::{export, WireNode};
use pretty_assertions::assert_eq;

struct Meter;
struct Reading;

impl HostType for Meter {
    fn describe(ty: &mut TypeBuilder<Self>) {
        ty.method("Sample", vec![param("n", ParamType::Int32).with_default(1)], |_, _| {
            Ok(DynamicValue::Nil)
        })
        .no_return();
        ty.static_property("Unit", || Ok(DynamicValue::from("mV")));
        ty.nested::<Reading>();
    }
}

impl HostType for Reading {
    fn describe(ty: &mut TypeBuilder<Self>) {
        ty.static_method("Zero", vec![], |_| Ok(DynamicValue::Number(0.0)));
    }
}

fn table(entries: Vec<(&str, WireNode)>) -> WireNode {
    let mut node = WireNode::table();
    for (k, v) in entries {
        node.set(k, v);
    }
    node
}

fn meter_sample() -> WireNode {
    table(vec![
        ("class", "OverloadedMethodMemberDescriptor".into()),
        ("name", "Sample".into()),
        ("decltype", "Meter".into()),
        ("static", false.into()),
        (
            "overloads",
            table(vec![(
                "Sample(Int32 n = 1)",
                table(vec![
                    ("class", "MethodMemberDescriptor".into()),
                    ("name", "Sample".into()),
                    ("static", false.into()),
                    ("visibility", "public".into()),
                    ("decltype", "Meter".into()),
                    ("ret", 0usize.into()),
                    (
                        "params",
                        table(vec![(
                            "01",
                            table(vec![
                                ("name", "n".into()),
                                ("type", "Int32".into()),
                                ("ref", false.into()),
                                ("varargs", false.into()),
                                ("default", "1".into()),
                            ]),
                        )]),
                    ),
                ]),
            )]),
        ),
    ])
}

fn meter_unit() -> WireNode {
    table(vec![
        ("class", "PropertyMemberDescriptor".into()),
        ("name", "Unit".into()),
        ("decltype", "Meter".into()),
        ("static", true.into()),
        ("visibility", "public".into()),
        ("read", true.into()),
        ("write", false.into()),
    ])
}

#[test]
fn test_export_before_nested_type_is_built() {
    let registry = Arc::new(TypeRegistry::default());
    let handle = registry.register::<Meter>(VisibilityPolicy::Default).unwrap();
    let set = registry.descriptor(handle.tag()).unwrap();

    let expected = table(vec![
        ("class", "StandardUserDataDescriptor".into()),
        ("name", "Meter".into()),
        ("visibility", "public".into()),
        (
            "members",
            table(vec![
                ("Sample", meter_sample()),
                ("Unit", meter_unit()),
                ("Reading", "nested type not yet built : Reading".into()),
            ]),
        ),
        ("metamembers", WireNode::table()),
    ]);
    assert_eq!(export(&set, &registry), expected);
}

#[test]
fn test_export_embeds_built_nested_type() {
    let registry = Arc::new(TypeRegistry::default());
    let handle = registry.register::<Meter>(VisibilityPolicy::Default).unwrap();
    let dispatcher = Dispatcher::new(Arc::clone(&registry));
    let facade = UserData::static_facade(handle.tag());
    dispatcher.get(&facade, "Reading").unwrap();

    let set = registry.descriptor(handle.tag()).unwrap();
    let tree = export(&set, &registry);
    let reading = tree.get("members").and_then(|m| m.get("Reading")).unwrap();
    assert_eq!(reading.get("name").and_then(WireNode::as_str), Some("Reading"));
    assert!(reading.get("members").and_then(|m| m.get("Zero")).is_some());
}

#[test]
fn test_export_of_fixture_is_json() {
    let fx = Fixture::new();
    let set = fx
        .registry()
        .descriptor(TypeTag::of::<OverloadsTestClass>())
        .unwrap();
    let json = export(&set, fx.registry()).to_json();
    let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
    let overloads = &parsed["members"]["Method1"]["overloads"];
    assert_eq!(overloads.as_object().map(|o| o.len()), Some(6));
    assert!(parsed["members"]["__new"].is_object());
}

#[test]
fn test_internal_types_are_skipped() {
    let registry = TypeRegistry::default();
    let handle = registry.register_array(ParamType::Float64, 1).unwrap();
    let set = registry.descriptor(handle.tag()).unwrap();
    assert_eq!(export(&set, &registry), table(vec![("skip", true.into())]));
}
