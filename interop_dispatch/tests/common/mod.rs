//! Shared fixtures for integration tests
// Each test target uses a different subset of these helpers.
#![allow(dead_code)]

use std::sync::Arc;

use interop_dispatch::prelude::*;

/// Host type with overlapping overload sets.
#[derive(Debug, Default)]
pub struct OverloadsTestClass;

/// Format `fmt` the way host-side composite formatting does: `{i}` is
/// replaced by argument `i`, booleans print as `True`/`False`.
pub fn host_format(fmt: &str, args: &[DynamicValue]) -> String {
    let mut out = fmt.to_string();
    for (i, arg) in args.iter().enumerate() {
        let text = match arg.scalar() {
            DynamicValue::Boolean(true) => "True".to_string(),
            DynamicValue::Boolean(false) => "False".to_string(),
            other => other.to_string(),
        };
        out = out.replace(&format!("{{{}}}", i), &text);
    }
    out
}

fn tag(s: &str) -> RuntimeResult<DynamicValue> {
    Ok(DynamicValue::from(s))
}

impl HostType for OverloadsTestClass {
    fn describe(ty: &mut TypeBuilder<Self>) {
        ty.value_type();

        ty.method(
            "MethodV",
            vec![
                param("fmt", ParamType::String),
                param("args", ParamType::Any).variadic(),
            ],
            |_, frame| {
                let fmt: String = frame.get(0)?;
                Ok(DynamicValue::from(format!("varargs:{}", host_format(&fmt, frame.rest(1)))))
            },
        );
        ty.method(
            "MethodV",
            vec![
                param("fmt", ParamType::String),
                param("a", ParamType::Int32),
                param("b", ParamType::Bool),
            ],
            |_, frame| {
                let fmt: String = frame.get(0)?;
                let formatted = host_format(&fmt, &frame.args()[1..]);
                Ok(DynamicValue::from(format!("exact:{}", formatted)))
            },
        );

        ty.method("Method1", vec![], |_, _| tag("1"));
        ty.static_method("Method1", vec![param("b", ParamType::Bool)], |_| tag("s"));
        ty.method("Method1", vec![param("a", ParamType::Int32)], |_, _| tag("2"));
        ty.method("Method1", vec![param("d", ParamType::Float64)], |_, _| tag("3"));
        ty.method(
            "Method1",
            vec![
                param("d", ParamType::Float64),
                param("x", ParamType::String).optional(),
            ],
            |_, _| tag("4"),
        );
        ty.method(
            "Method1",
            vec![
                param("d", ParamType::Float64),
                param("x", ParamType::String),
                param("y", ParamType::Int32).with_default(5),
            ],
            |_, _| tag("5"),
        );

        ty.method(
            "Method2",
            vec![param("x", ParamType::String), param("y", ParamType::String)],
            |_, _| tag("v"),
        );
        ty.method(
            "Method2",
            vec![
                param("x", ParamType::String),
                param("y", ParamType::String).by_ref(),
            ],
            |_, frame| {
                frame.set_ref(1, "rr");
                tag("r")
            },
        );
        ty.method(
            "Method2",
            vec![
                param("x", ParamType::String),
                param("y", ParamType::String).by_ref(),
                param("z", ParamType::Int32),
            ],
            |_, frame| {
                frame.set_ref(1, "RR");
                tag("R")
            },
        );
    }
}

/// Extension methods on [`OverloadsTestClass`].
pub struct OverloadsExtensions;

impl ExtensionProvider for OverloadsExtensions {
    fn describe(ext: &mut ExtensionBuilder) {
        ext.method::<OverloadsTestClass, _>(
            "Method1",
            vec![param("x", ParamType::String), param("b", ParamType::Bool)],
            |_, _| tag("X1"),
        );
        ext.method::<OverloadsTestClass, _>("Method3", vec![], |_, _| tag("X3"));
    }
}

/// A registry with the fixture registered, plus an instance and the static
/// facade of the fixture type.
pub struct Fixture {
    pub dispatcher: Dispatcher,
    pub o: UserData,
    pub s: UserData,
}

impl Fixture {
    pub fn new() -> Self {
        Self::with_config(InteropConfig::default())
    }

    pub fn with_config(config: InteropConfig) -> Self {
        let registry = Arc::new(TypeRegistry::new(config));
        registry
            .register::<OverloadsTestClass>(VisibilityPolicy::Default)
            .expect("fixture registers");
        Fixture {
            dispatcher: Dispatcher::new(registry),
            o: UserData::new(OverloadsTestClass),
            s: UserData::static_facade(TypeTag::of::<OverloadsTestClass>()),
        }
    }

    pub fn with_extensions(self) -> Self {
        self.dispatcher
            .registry()
            .register_extension_provider::<OverloadsExtensions>();
        self
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        self.dispatcher.registry()
    }

    /// `recv:name(args)`
    pub fn colon(&self, recv: &UserData, name: &str, args: &[DynamicValue]) -> InteropResult<DynamicValue> {
        self.dispatcher.call(recv, CallStyle::Instance, name, args)
    }

    /// `recv.name(args)`
    pub fn dot(&self, recv: &UserData, name: &str, args: &[DynamicValue]) -> InteropResult<DynamicValue> {
        self.dispatcher.call(recv, CallStyle::Static, name, args)
    }
}

pub fn num(n: f64) -> DynamicValue {
    DynamicValue::Number(n)
}

pub fn s(text: &str) -> DynamicValue {
    DynamicValue::from(text)
}

pub fn nil() -> DynamicValue {
    DynamicValue::Nil
}

pub fn b(v: bool) -> DynamicValue {
    DynamicValue::Boolean(v)
}
