use std::hint::black_box;
use std::sync::Arc;

use criterion::{criterion_group, criterion_main, Criterion};
use interop_dispatch::prelude::*;

struct Target;

impl HostType for Target {
    fn describe(ty: &mut TypeBuilder<Self>) {
        ty.method("Pick", vec![], |_, _| Ok(DynamicValue::Number(0.0)));
        ty.method("Pick", vec![param("a", ParamType::Int32)], |_, _| {
            Ok(DynamicValue::Number(1.0))
        });
        ty.method("Pick", vec![param("d", ParamType::Float64)], |_, _| {
            Ok(DynamicValue::Number(2.0))
        });
        ty.method(
            "Pick",
            vec![param("d", ParamType::Float64), param("x", ParamType::String).optional()],
            |_, _| Ok(DynamicValue::Number(3.0)),
        );
        ty.method(
            "Pick",
            vec![param("fmt", ParamType::String), param("rest", ParamType::Any).variadic()],
            |_, _| Ok(DynamicValue::Number(4.0)),
        );
    }
}

fn dispatcher(call_cache: bool) -> Dispatcher {
    let registry = Arc::new(TypeRegistry::new(InteropConfig {
        call_cache,
        ..InteropConfig::default()
    }));
    registry
        .register::<Target>(VisibilityPolicy::Default)
        .expect("register bench type");
    Dispatcher::new(registry)
}

fn bench_overloaded_call(c: &mut Criterion) {
    let receiver = UserData::new(Target);
    let args = [DynamicValue::Number(5.0), DynamicValue::from("x")];

    let cached = dispatcher(true);
    c.bench_function("overloaded_call_cached", |b| {
        b.iter(|| {
            cached
                .call(&receiver, CallStyle::Instance, "Pick", black_box(&args))
                .expect("cached call")
        })
    });

    let cold = dispatcher(false);
    c.bench_function("overloaded_call_uncached", |b| {
        b.iter(|| {
            cold.call(&receiver, CallStyle::Instance, "Pick", black_box(&args))
                .expect("uncached call")
        })
    });
}

criterion_group!(benches, bench_overloaded_call);
criterion_main!(benches);
