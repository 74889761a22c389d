//! Builder API for describing host types.
//!
//! Host types implement [`HostType`] and describe their members once; the
//! closures given here are wrapped into invokers at registration so that
//! dispatch never needs runtime introspection.
//!
//! # Example
//!
//! ```
//! use interop_dispatch::prelude::*;
//!
//! struct Counter {
//!     step: i32,
//! }
//!
//! impl HostType for Counter {
//!     fn describe(ty: &mut TypeBuilder<Self>) {
//!         ty.constructor(vec![param("step", ParamType::Int32)], |frame| {
//!             Ok(Counter { step: frame.get(0)? })
//!         });
//!         ty.method("Next", vec![param("n", ParamType::Int32)], |this, frame| {
//!             let n: i32 = frame.get(0)?;
//!             Ok(DynamicValue::from(n + this.step))
//!         });
//!     }
//! }
//! ```

use std::any::Any;
use std::marker::PhantomData;

use interop_dispatch_runtime::{
    DynamicValue, RuntimeError, RuntimeResult, TypeTag, UserData,
};

use super::shape::{
    HostAccessor, HostEvent, HostIndexer, HostMember, HostMethod, HostTypeShape, MemberMarkers,
    NestedShape, ShapeFactory, TypeKind,
};
use crate::descriptor::{param, CallFrame, Getter, Invoker, ParameterDescriptor, Setter};
use crate::types::{short_type_name, MetaName, ParamType};

/// Host name of an implicit conversion operator.
pub const IMPLICIT_CONVERSION: &str = "op_Implicit";
/// Host name of an explicit conversion operator.
pub const EXPLICIT_CONVERSION: &str = "op_Explicit";

/// A Rust type exposed to scripts.
pub trait HostType: Any + Send + Sync + Sized {
    fn describe(ty: &mut TypeBuilder<Self>);
}

/// Produce the shape of `T`.
pub fn describe_type<T: HostType>() -> HostTypeShape {
    let mut builder = TypeBuilder::<T>::new();
    T::describe(&mut builder);
    builder.finish()
}

/// Borrow a receiver as `T`, failing for static facades and foreign types.
pub(crate) fn receiver_as<T: Any>(receiver: Option<&UserData>) -> RuntimeResult<&T> {
    receiver
        .and_then(|ud| ud.downcast_ref::<T>())
        .ok_or_else(|| {
            RuntimeError::type_error(format!(
                "expected an instance of {}",
                short_type_name::<T>()
            ))
        })
}

/// Setter type of accessors that have none.
type ReadOnly<T> = fn(&T, DynamicValue) -> RuntimeResult<()>;

/// Markers for the member just added.
#[derive(Debug)]
pub struct MemberOptions<'a> {
    markers: &'a mut MemberMarkers,
    return_arity: Option<&'a mut usize>,
}

impl<'a> MemberOptions<'a> {
    fn new(markers: &'a mut MemberMarkers) -> Self {
        Self {
            markers,
            return_arity: None,
        }
    }

    pub(crate) fn for_method(method: &'a mut HostMethod) -> Self {
        MemberOptions {
            markers: &mut method.markers,
            return_arity: Some(&mut method.return_arity),
        }
    }

    fn for_member(member: &'a mut HostMember) -> Self {
        match member {
            HostMember::Constructor(m) | HostMember::Method(m) => MemberOptions::for_method(m),
            HostMember::Property(a) | HostMember::Field(a) => MemberOptions::new(&mut a.markers),
            HostMember::Event(e) => MemberOptions::new(&mut e.markers),
            HostMember::Indexer(i) => MemberOptions::new(&mut i.markers),
        }
    }

    /// Explicitly visible, even under opt-in policies.
    pub fn visible(self) -> Self {
        self.markers.visible = Some(true);
        self
    }

    /// Explicitly hidden.
    pub fn hidden(self) -> Self {
        self.markers.visible = Some(false);
        self
    }

    pub fn non_public(self) -> Self {
        self.markers.non_public = true;
        self
    }

    /// Also bind the member under a metamethod name.
    pub fn meta(self, meta: MetaName) -> Self {
        if !self.markers.meta_names.contains(&meta) {
            self.markers.meta_names.push(meta);
        }
        self
    }

    pub fn special_name(self) -> Self {
        self.markers.special_name = true;
        self
    }

    /// Mark the member as using a convention the dispatcher cannot call.
    pub fn unsupported(self, reason: impl Into<String>) -> Self {
        self.markers.unsupported = Some(reason.into());
        self
    }

    pub fn generic_definition(self) -> Self {
        self.markers.generic_definition = true;
        self
    }

    /// The method returns nothing; results collapse to nil.
    pub fn no_return(mut self) -> Self {
        if let Some(arity) = self.return_arity.as_deref_mut() {
            *arity = 0;
        }
        self
    }
}

/// Collects the shape of `T`.
#[derive(Debug)]
pub struct TypeBuilder<T> {
    shape: HostTypeShape,
    _marker: PhantomData<fn() -> T>,
}

impl<T: HostType> TypeBuilder<T> {
    fn new() -> Self {
        Self {
            shape: HostTypeShape::new(TypeTag::of::<T>(), short_type_name::<T>(), TypeKind::Class),
            _marker: PhantomData,
        }
    }

    pub fn finish(self) -> HostTypeShape {
        self.shape
    }

    fn push(&mut self, member: HostMember) -> MemberOptions<'_> {
        let index = self.shape.members.len();
        self.shape.members.push(member);
        MemberOptions::for_member(&mut self.shape.members[index])
    }

    // ========== type markers ==========

    /// Script-visible type name.
    pub fn name(&mut self, name: impl Into<String>) -> &mut Self {
        self.shape.name = name.into();
        self
    }

    /// Value-like type: gets a default constructor when none is declared.
    pub fn value_type(&mut self) -> &mut Self
    where
        T: Default,
    {
        self.shape.kind = TypeKind::ValueType;
        self.shape.default_constructor =
            Some(Invoker::new(|_| Ok(DynamicValue::user_data(T::default()))));
        self
    }

    /// Callable host type; never exposes constructors.
    pub fn delegate(&mut self) -> &mut Self {
        self.shape.kind = TypeKind::Delegate;
        self
    }

    /// Class-level default visibility marker.
    pub fn default_visibility(&mut self, visible: bool) -> &mut Self {
        self.shape.default_visibility = Some(visible);
        self
    }

    /// Add a name to the hide list.
    pub fn hide(&mut self, name: impl Into<String>) -> &mut Self {
        self.shape.hide_list.insert(name.into());
        self
    }

    /// Values of `T` may be passed where `S` is expected.
    pub fn implements<S: Any + ?Sized>(&mut self) -> &mut Self {
        self.supertype(TypeTag::of::<S>())
    }

    pub fn supertype(&mut self, tag: TypeTag) -> &mut Self {
        if !self.shape.supertypes.contains(&tag) {
            self.shape.supertypes.push(tag);
        }
        self
    }

    /// Engine-owned type.
    pub fn internal(&mut self) -> &mut Self {
        self.shape.internal = true;
        self
    }

    /// Type declared non-public on the host side.
    pub fn non_public(&mut self) -> &mut Self {
        self.shape.non_public = true;
        self
    }

    // ========== callable members ==========

    pub fn constructor<F>(&mut self, params: Vec<ParameterDescriptor>, f: F) -> MemberOptions<'_>
    where
        F: Fn(&mut CallFrame<'_>) -> RuntimeResult<T> + Send + Sync + 'static,
    {
        let name = self.shape.name.clone();
        self.push(HostMember::Constructor(HostMethod {
            name,
            is_static: true,
            params,
            return_arity: 1,
            invoker: Invoker::new(move |frame| Ok(DynamicValue::user_data(f(frame)?))),
            conversion_target: None,
            markers: MemberMarkers::default(),
        }))
    }

    pub fn method<F>(
        &mut self,
        name: impl Into<String>,
        params: Vec<ParameterDescriptor>,
        f: F,
    ) -> MemberOptions<'_>
    where
        F: Fn(&T, &mut CallFrame<'_>) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        self.push(HostMember::Method(HostMethod {
            name: name.into(),
            is_static: false,
            params,
            return_arity: 1,
            invoker: Invoker::new(move |frame| {
                let this = frame.this::<T>()?;
                f(this, frame)
            }),
            conversion_target: None,
            markers: MemberMarkers::default(),
        }))
    }

    pub fn static_method<F>(
        &mut self,
        name: impl Into<String>,
        params: Vec<ParameterDescriptor>,
        f: F,
    ) -> MemberOptions<'_>
    where
        F: Fn(&mut CallFrame<'_>) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        self.push(HostMember::Method(HostMethod {
            name: name.into(),
            is_static: true,
            params,
            return_arity: 1,
            invoker: Invoker::new(f),
            conversion_target: None,
            markers: MemberMarkers::default(),
        }))
    }

    /// Operator method such as `op_Addition`; binds the matching metamethod.
    pub fn operator<F>(
        &mut self,
        name: impl Into<String>,
        params: Vec<ParameterDescriptor>,
        f: F,
    ) -> MemberOptions<'_>
    where
        F: Fn(&mut CallFrame<'_>) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        self.static_method(name, params, f).special_name()
    }

    /// Implicit conversion from `T` to `target`.
    pub fn conversion<F>(&mut self, target: ParamType, f: F) -> MemberOptions<'_>
    where
        F: Fn(&T) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        self.conversion_operator(IMPLICIT_CONVERSION, target, f)
    }

    /// Explicit conversion from `T` to `target`.
    pub fn explicit_conversion<F>(&mut self, target: ParamType, f: F) -> MemberOptions<'_>
    where
        F: Fn(&T) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        self.conversion_operator(EXPLICIT_CONVERSION, target, f)
    }

    fn conversion_operator<F>(&mut self, name: &str, target: ParamType, f: F) -> MemberOptions<'_>
    where
        F: Fn(&T) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        self.push(HostMember::Method(HostMethod {
            name: name.to_string(),
            is_static: true,
            params: vec![param("value", ParamType::host::<T>())],
            return_arity: 1,
            invoker: Invoker::new(move |frame| {
                let value = frame.arg(0).as_user_data();
                f(receiver_as::<T>(value)?)
            }),
            conversion_target: Some(target),
            markers: MemberMarkers {
                special_name: true,
                ..MemberMarkers::default()
            },
        }))
    }

    // ========== value members ==========

    pub fn property<G>(&mut self, name: impl Into<String>, get: G) -> MemberOptions<'_>
    where
        G: Fn(&T) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        let accessor = instance_accessor::<T, _, ReadOnly<T>>(name.into(), get, None);
        self.push(HostMember::Property(accessor))
    }

    pub fn property_rw<G, S>(&mut self, name: impl Into<String>, get: G, set: S) -> MemberOptions<'_>
    where
        G: Fn(&T) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
        S: Fn(&T, DynamicValue) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        let accessor = instance_accessor::<T, _, _>(name.into(), get, Some(set));
        self.push(HostMember::Property(accessor))
    }

    pub fn static_property<G>(&mut self, name: impl Into<String>, get: G) -> MemberOptions<'_>
    where
        G: Fn() -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        self.push(HostMember::Property(HostAccessor {
            name: name.into(),
            is_static: true,
            getter: Some(Getter::new(move |_| get())),
            setter: None,
            markers: MemberMarkers::default(),
        }))
    }

    /// Read-only field.
    pub fn field<G>(&mut self, name: impl Into<String>, get: G) -> MemberOptions<'_>
    where
        G: Fn(&T) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        let accessor = instance_accessor::<T, _, ReadOnly<T>>(name.into(), get, None);
        self.push(HostMember::Field(accessor))
    }

    pub fn field_rw<G, S>(&mut self, name: impl Into<String>, get: G, set: S) -> MemberOptions<'_>
    where
        G: Fn(&T) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
        S: Fn(&T, DynamicValue) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        let accessor = instance_accessor::<T, _, _>(name.into(), get, Some(set));
        self.push(HostMember::Field(accessor))
    }

    /// Event with add/remove handlers.
    pub fn event<A, R>(&mut self, name: impl Into<String>, add: A, remove: R) -> MemberOptions<'_>
    where
        A: Fn(&T, DynamicValue) -> RuntimeResult<()> + Send + Sync + 'static,
        R: Fn(&T, DynamicValue) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        self.push(HostMember::Event(HostEvent {
            name: name.into(),
            is_static: false,
            add: Setter::new(move |recv, handler| add(receiver_as::<T>(recv)?, handler)),
            remove: Setter::new(move |recv, handler| remove(receiver_as::<T>(recv)?, handler)),
            markers: MemberMarkers::default(),
        }))
    }

    /// Read-only indexer taking `params` as keys.
    pub fn indexer<G>(&mut self, params: Vec<ParameterDescriptor>, get: G) -> MemberOptions<'_>
    where
        G: Fn(&T, &mut CallFrame<'_>) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        let getter = indexer_method::<T, _>(crate::descriptor::INDEXER_GET_NAME, params, 1, get);
        self.push(HostMember::Indexer(HostIndexer {
            getter: Some(getter),
            setter: None,
            markers: MemberMarkers::default(),
        }))
    }

    /// Read/write indexer; the setter receives the keys then a `value` slot.
    pub fn indexer_rw<G, S>(
        &mut self,
        params: Vec<ParameterDescriptor>,
        value_ty: ParamType,
        get: G,
        set: S,
    ) -> MemberOptions<'_>
    where
        G: Fn(&T, &mut CallFrame<'_>) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
        S: Fn(&T, &mut CallFrame<'_>) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        let mut set_params = params.clone();
        set_params.push(param("value", value_ty));
        let getter = indexer_method::<T, _>(crate::descriptor::INDEXER_GET_NAME, params, 1, get);
        let setter = indexer_method::<T, _>(
            crate::descriptor::INDEXER_SET_NAME,
            set_params,
            0,
            move |this: &T, frame: &mut CallFrame<'_>| {
                set(this, frame)?;
                Ok(DynamicValue::Nil)
            },
        );
        self.push(HostMember::Indexer(HostIndexer {
            getter: Some(getter),
            setter: Some(setter),
            markers: MemberMarkers::default(),
        }))
    }

    // ========== nested types ==========

    /// Nested host type, registered lazily on first access.
    pub fn nested<N: HostType>(&mut self) -> MemberOptions<'_> {
        let index = self.shape.nested.len();
        self.shape.nested.push(NestedShape {
            name: short_type_name::<N>(),
            tag: TypeTag::of::<N>(),
            factory: ShapeFactory::new(describe_type::<N>),
            markers: MemberMarkers::default(),
        });
        MemberOptions::new(&mut self.shape.nested[index].markers)
    }
}

fn instance_accessor<T, G, S>(name: String, get: G, set: Option<S>) -> HostAccessor
where
    T: HostType,
    G: Fn(&T) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    S: Fn(&T, DynamicValue) -> RuntimeResult<()> + Send + Sync + 'static,
{
    HostAccessor {
        name,
        is_static: false,
        getter: Some(Getter::new(move |recv| get(receiver_as::<T>(recv)?))),
        setter: set.map(|set| Setter::new(move |recv, value| set(receiver_as::<T>(recv)?, value))),
        markers: MemberMarkers::default(),
    }
}

fn indexer_method<T, F>(
    name: &str,
    params: Vec<ParameterDescriptor>,
    return_arity: usize,
    f: F,
) -> HostMethod
where
    T: HostType,
    F: Fn(&T, &mut CallFrame<'_>) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
{
    HostMethod {
        name: name.to_string(),
        is_static: false,
        params,
        return_arity,
        invoker: Invoker::new(move |frame| {
            let this = frame.this::<T>()?;
            f(this, frame)
        }),
        conversion_target: None,
        markers: MemberMarkers {
            special_name: true,
            ..MemberMarkers::default()
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Point {
        x: f64,
    }

    struct Inner;

    impl HostType for Inner {
        fn describe(_ty: &mut TypeBuilder<Self>) {}
    }

    impl HostType for Point {
        fn describe(ty: &mut TypeBuilder<Self>) {
            ty.value_type().hide("Secret").implements::<dyn Any>();
            ty.property("X", |p| Ok(DynamicValue::Number(p.x)));
            ty.method("Touch", vec![], |_, _| Ok(DynamicValue::Nil))
                .no_return()
                .meta(MetaName::Call);
            ty.conversion(ParamType::Float64, |p| Ok(DynamicValue::Number(p.x)));
            ty.nested::<Inner>().visible();
        }
    }

    #[test]
    fn test_describe_collects_shape() {
        let shape = describe_type::<Point>();
        assert_eq!(shape.name, "Point");
        assert_eq!(shape.kind, TypeKind::ValueType);
        assert!(shape.default_constructor.is_some());
        assert!(shape.hide_list.contains("Secret"));
        assert_eq!(shape.members.len(), 3);
        assert_eq!(shape.nested.len(), 1);
        assert_eq!(shape.nested[0].markers.visible, Some(true));

        match &shape.members[1] {
            HostMember::Method(m) => {
                assert_eq!(m.return_arity, 0);
                assert_eq!(m.markers.meta_names, vec![MetaName::Call]);
            }
            other => panic!("unexpected member {:?}", other.name()),
        }
        match &shape.members[2] {
            HostMember::Method(m) => {
                assert!(m.markers.special_name);
                assert_eq!(m.conversion_target, Some(ParamType::Float64));
            }
            other => panic!("unexpected member {:?}", other.name()),
        }
    }

    #[test]
    fn test_property_getter_requires_instance() {
        let shape = describe_type::<Point>();
        let HostMember::Property(prop) = &shape.members[0] else {
            panic!("expected property");
        };
        let getter = prop.getter.as_ref().unwrap();
        let obj = UserData::new(Point { x: 2.5 });
        assert_eq!(getter.get(Some(&obj)).unwrap(), DynamicValue::Number(2.5));
        let facade = UserData::static_facade(TypeTag::of::<Point>());
        assert!(getter.get(Some(&facade)).is_err());
    }
}
