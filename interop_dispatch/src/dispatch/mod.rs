//! Dispatch front end.
//!
//! [`Dispatcher`] turns a script-side access (`obj:Name(args)`, `obj.Name`,
//! `obj[k]`, a metamethod) into a host invocation:
//!
//! - `call_cache`: per-descriptor-set memo of resolutions
//! - `fingerprint`: argument-shape keys for the memo
//! - `resolver`: overload selection across call styles
//!
//! Resolution never runs host code; only the selected candidate's invoker
//! does, after the cache has been updated.

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

mod call_cache;
mod fingerprint;
mod resolver;

pub use call_cache::{CacheLookup, CacheSettings, CacheStats, CallSiteCache, DEFAULT_CACHE_CAPACITY};
pub use fingerprint::CallFingerprint;
pub use resolver::{CallSite, OverloadResolver, ReceiverBinding, Resolution};

use std::sync::Arc;

use interop_dispatch_runtime::{DynamicValue, TypeTag, UserData};

use crate::descriptor::{
    AccessorDescriptor, DescriptorSet, MemberDescriptor, OverloadCandidate, CONSTRUCTOR_NAME,
    INDEXER_GET_NAME, INDEXER_SET_NAME,
};
use crate::error::{InteropError, InteropResult};
use crate::registry::TypeRegistry;
use crate::types::{CallStyle, MetaName, ReceiverKind};

/// Executes script accesses against a [`TypeRegistry`].
#[derive(Debug, Clone)]
pub struct Dispatcher {
    registry: Arc<TypeRegistry>,
}

impl Dispatcher {
    pub fn new(registry: Arc<TypeRegistry>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Arc<TypeRegistry> {
        &self.registry
    }

    // ========== methods ==========

    /// Call method `name` on `receiver` (an object or a static facade).
    ///
    /// Extension methods registered for the receiver's type take part in
    /// resolution alongside the type's own overloads.
    pub fn call(
        &self,
        receiver: &UserData,
        style: CallStyle,
        name: &str,
        args: &[DynamicValue],
    ) -> InteropResult<DynamicValue> {
        let set = self.registry.descriptor_for(receiver)?;
        self.registry.sync_extensions(&set);

        let mut candidates = match set.member(name).map(|m| &**m) {
            Some(MemberDescriptor::Method(group)) => group.candidates().to_vec(),
            Some(other) => return Err(kind_mismatch(&set, name, "method", other)),
            None => Vec::new(),
        };
        let (version, extensions) = set.extension_snapshot(name);
        candidates.extend(extensions);
        if candidates.is_empty() {
            return Err(InteropError::member_not_found(set.name(), name));
        }

        let site = CallSite::new(style, ReceiverKind::of(receiver));
        let resolution = self.resolve_at(&set, version, name, &candidates, site, args)?;
        Ok(resolution.invoke(receiver, args)?)
    }

    /// Construct an instance of `tag` through its `__new` overloads.
    pub fn construct(&self, tag: TypeTag, args: &[DynamicValue]) -> InteropResult<DynamicValue> {
        let set = self.registry.descriptor(tag)?;
        let group = match set.member(CONSTRUCTOR_NAME).map(|m| &**m) {
            Some(MemberDescriptor::Constructor(group)) => group,
            Some(other) => return Err(kind_mismatch(&set, CONSTRUCTOR_NAME, "constructor", other)),
            None => return Err(InteropError::member_not_found(set.name(), CONSTRUCTOR_NAME)),
        };
        let facade = UserData::static_facade(tag);
        let site = CallSite::new(CallStyle::Static, ReceiverKind::StaticFacade);
        let resolution = self.resolve(&set, CONSTRUCTOR_NAME, group.candidates(), site, args)?;
        Ok(resolution.invoke(&facade, args)?)
    }

    /// Invoke the metamethod `meta` of the type of `receiver`.
    ///
    /// `args` holds every operand, the receiver included; instance
    /// metamethods bind their receiver from the first operand.
    pub fn call_meta(
        &self,
        receiver: &UserData,
        meta: MetaName,
        args: &[DynamicValue],
    ) -> InteropResult<DynamicValue> {
        let set = self.registry.descriptor_for(receiver)?;
        let group = match set.meta_member(meta).and_then(|m| m.as_overloads()) {
            Some(group) => group,
            None => return Err(InteropError::member_not_found(set.name(), meta.as_str())),
        };
        let site = CallSite::new(CallStyle::Static, ReceiverKind::of(receiver));
        let resolution = self.resolve(&set, meta.as_str(), group.candidates(), site, args)?;
        Ok(resolution.invoke(receiver, args)?)
    }

    // ========== properties, fields, nested types ==========

    /// Read `obj.name`.
    ///
    /// A nested type reads as its static facade; its descriptors are built
    /// on this first access.
    pub fn get(&self, receiver: &UserData, name: &str) -> InteropResult<DynamicValue> {
        let set = self.registry.descriptor_for(receiver)?;
        match set.member(name).map(|m| &**m) {
            Some(MemberDescriptor::Property(accessor) | MemberDescriptor::Field(accessor)) => {
                let target = accessor_target(&set, accessor, receiver)?;
                let getter = accessor.getter.as_ref().ok_or_else(|| {
                    InteropError::WriteOnlyMember {
                        type_name: set.name().to_string(),
                        member: name.to_string(),
                    }
                })?;
                Ok(getter.get(target)?)
            }
            Some(MemberDescriptor::NestedType(nested)) => {
                self.registry.descriptor(nested.tag)?;
                Ok(DynamicValue::static_facade(nested.tag))
            }
            Some(other) => Err(kind_mismatch(&set, name, "property", other)),
            None => Err(InteropError::member_not_found(set.name(), name)),
        }
    }

    /// Assign `obj.name = value`.
    pub fn set(&self, receiver: &UserData, name: &str, value: DynamicValue) -> InteropResult<()> {
        let set = self.registry.descriptor_for(receiver)?;
        match set.member(name).map(|m| &**m) {
            Some(MemberDescriptor::Property(accessor) | MemberDescriptor::Field(accessor)) => {
                let target = accessor_target(&set, accessor, receiver)?;
                let setter = accessor.setter.as_ref().ok_or_else(|| InteropError::ReadOnlyMember {
                    type_name: set.name().to_string(),
                    member: name.to_string(),
                })?;
                Ok(setter.set(target, value)?)
            }
            Some(other) => Err(kind_mismatch(&set, name, "property", other)),
            None => Err(InteropError::member_not_found(set.name(), name)),
        }
    }

    // ========== indexers ==========

    /// Read `obj[keys...]`.
    pub fn index_get(&self, receiver: &UserData, keys: &[DynamicValue]) -> InteropResult<DynamicValue> {
        let set = self.registry.descriptor_for(receiver)?;
        let group = match set.member(INDEXER_GET_NAME).map(|m| &**m) {
            Some(MemberDescriptor::IndexerGet(group)) => group,
            Some(other) => return Err(kind_mismatch(&set, INDEXER_GET_NAME, "indexer getter", other)),
            None => return Err(InteropError::member_not_found(set.name(), INDEXER_GET_NAME)),
        };
        let site = CallSite::new(CallStyle::Instance, ReceiverKind::of(receiver));
        let resolution = self.resolve(&set, INDEXER_GET_NAME, group.candidates(), site, keys)?;
        Ok(resolution.invoke(receiver, keys)?)
    }

    /// Assign `obj[keys...] = value`; the setter sees the keys followed by
    /// the value.
    pub fn index_set(
        &self,
        receiver: &UserData,
        keys: &[DynamicValue],
        value: DynamicValue,
    ) -> InteropResult<()> {
        let set = self.registry.descriptor_for(receiver)?;
        let group = match set.member(INDEXER_SET_NAME).map(|m| &**m) {
            Some(MemberDescriptor::IndexerSet(group)) => group,
            Some(other) => return Err(kind_mismatch(&set, INDEXER_SET_NAME, "indexer setter", other)),
            None => return Err(InteropError::member_not_found(set.name(), INDEXER_SET_NAME)),
        };
        let mut args = Vec::with_capacity(keys.len() + 1);
        args.extend_from_slice(keys);
        args.push(value);
        let site = CallSite::new(CallStyle::Instance, ReceiverKind::of(receiver));
        let resolution = self.resolve(&set, INDEXER_SET_NAME, group.candidates(), site, &args)?;
        resolution.invoke(receiver, &args)?;
        Ok(())
    }

    // ========== events ==========

    pub fn subscribe(&self, receiver: &UserData, name: &str, handler: DynamicValue) -> InteropResult<()> {
        self.event_op(receiver, name, handler, true)
    }

    pub fn unsubscribe(&self, receiver: &UserData, name: &str, handler: DynamicValue) -> InteropResult<()> {
        self.event_op(receiver, name, handler, false)
    }

    fn event_op(
        &self,
        receiver: &UserData,
        name: &str,
        handler: DynamicValue,
        add: bool,
    ) -> InteropResult<()> {
        let set = self.registry.descriptor_for(receiver)?;
        let event = match set.member(name).map(|m| &**m) {
            Some(MemberDescriptor::Event(event)) => event,
            Some(other) => return Err(kind_mismatch(&set, name, "event", other)),
            None => return Err(InteropError::member_not_found(set.name(), name)),
        };
        let target = if event.is_static {
            None
        } else if receiver.is_static_facade() {
            return Err(not_an_instance(&set, name));
        } else {
            Some(receiver)
        };
        let op = if add { &event.add } else { &event.remove };
        Ok(op.set(target, handler)?)
    }

    // ========== resolution ==========

    /// Resolve through the set's call-site cache.
    pub fn resolve(
        &self,
        set: &DescriptorSet,
        name: &str,
        candidates: &[Arc<OverloadCandidate>],
        site: CallSite,
        args: &[DynamicValue],
    ) -> InteropResult<Resolution> {
        self.resolve_at(set, set.extension_version(), name, candidates, site, args)
    }

    /// Resolve `candidates`, gathered while extensions were at `version`.
    ///
    /// The result is cached only if no fold happened since `version`.
    fn resolve_at(
        &self,
        set: &DescriptorSet,
        version: u64,
        name: &str,
        candidates: &[Arc<OverloadCandidate>],
        site: CallSite,
        args: &[DynamicValue],
    ) -> InteropResult<Resolution> {
        let cache = set.call_cache();
        let fingerprint = CallFingerprint::compute(name, site.style, site.receiver, args);
        if let CacheLookup::Hit(resolution) = cache.lookup(fingerprint, args) {
            return Ok(resolution);
        }
        let resolver = OverloadResolver::new(
            self.registry.as_ref(),
            set.tag(),
            self.registry.config().static_fallback,
        );
        let resolution = resolver.resolve(name, candidates, site, args)?;
        // A fold or unregistration since `version` already cleared the cache.
        if set.extension_version() == version && !set.is_discarded() {
            cache.store(fingerprint, resolution.clone());
        }
        Ok(resolution)
    }
}

/// Receiver an accessor runs against: none for static members.
fn accessor_target<'a>(
    set: &DescriptorSet,
    accessor: &AccessorDescriptor,
    receiver: &'a UserData,
) -> InteropResult<Option<&'a UserData>> {
    if accessor.is_static {
        Ok(None)
    } else if receiver.is_static_facade() {
        Err(not_an_instance(set, &accessor.name))
    } else {
        Ok(Some(receiver))
    }
}

fn not_an_instance(set: &DescriptorSet, member: &str) -> InteropError {
    InteropError::NotAnInstance {
        type_name: set.name().to_string(),
        member: member.to_string(),
    }
}

fn kind_mismatch(
    set: &DescriptorSet,
    member: &str,
    expected: &'static str,
    actual: &MemberDescriptor,
) -> InteropError {
    InteropError::MemberKindMismatch {
        type_name: set.name().to_string(),
        member: member.to_string(),
        expected,
        actual: actual.kind_name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::{param, CandidateKind};
    use crate::host::{ExtensionBuilder, HostType, TypeBuilder};
    use crate::types::{ParamType, ResolveError, VisibilityPolicy};
    use interop_dispatch_runtime::RuntimeError;
    use parking_lot::Mutex;

    struct Counter {
        value: Mutex<i64>,
    }

    impl HostType for Counter {
        fn describe(ty: &mut TypeBuilder<Self>) {
            ty.constructor(vec![param("start", ParamType::Int64)], |frame| {
                Ok(Counter {
                    value: Mutex::new(frame.get(0)?),
                })
            });
            ty.method("Add", vec![param("n", ParamType::Int64)], |this, frame| {
                let mut value = this.value.lock();
                *value += frame.get::<i64>(0)?;
                Ok(DynamicValue::from(*value as f64))
            });
            ty.property("Value", |this| Ok(DynamicValue::Number(*this.value.lock() as f64)));
            ty.static_property("Kind", || Ok(DynamicValue::from("counter")));
        }
    }

    fn dispatcher() -> Dispatcher {
        let registry = Arc::new(TypeRegistry::default());
        registry
            .register::<Counter>(VisibilityPolicy::Default)
            .unwrap();
        Dispatcher::new(registry)
    }

    fn counter(d: &Dispatcher, start: f64) -> UserData {
        let value = d
            .construct(TypeTag::of::<Counter>(), &[DynamicValue::Number(start)])
            .unwrap();
        value.as_user_data().unwrap().clone()
    }

    #[test]
    fn test_call_and_property() {
        let d = dispatcher();
        let c = counter(&d, 2.0);
        let out = d
            .call(&c, CallStyle::Instance, "Add", &[DynamicValue::Number(3.0)])
            .unwrap();
        assert_eq!(out, DynamicValue::Number(5.0));
        assert_eq!(d.get(&c, "Value").unwrap(), DynamicValue::Number(5.0));
    }

    #[test]
    fn test_instance_member_through_facade() {
        let d = dispatcher();
        let facade = UserData::static_facade(TypeTag::of::<Counter>());
        assert!(matches!(
            d.get(&facade, "Value"),
            Err(InteropError::NotAnInstance { .. })
        ));
        assert_eq!(d.get(&facade, "Kind").unwrap(), DynamicValue::from("counter"));
        let err = d
            .call(&facade, CallStyle::Instance, "Add", &[DynamicValue::Number(1.0)])
            .unwrap_err();
        assert!(matches!(
            err.as_resolve(),
            Some(ResolveError::StaticInstanceMismatch { .. })
        ));
    }

    #[test]
    fn test_member_errors() {
        let d = dispatcher();
        let c = counter(&d, 0.0);
        assert!(matches!(
            d.call(&c, CallStyle::Instance, "Nope", &[]),
            Err(InteropError::MemberNotFound { .. })
        ));
        assert!(matches!(
            d.call(&c, CallStyle::Instance, "Value", &[]),
            Err(InteropError::MemberKindMismatch { actual: "property", .. })
        ));
        assert!(matches!(
            d.set(&c, "Value", DynamicValue::Number(1.0)),
            Err(InteropError::ReadOnlyMember { .. })
        ));
    }

    #[test]
    fn test_host_failure_propagates_unchanged() {
        let d = dispatcher();
        let c = counter(&d, 0.0);
        let err = d
            .call(&c, CallStyle::Instance, "Add", &[DynamicValue::Number(1.5)])
            .unwrap_err();
        assert!(matches!(err, InteropError::Runtime(RuntimeError::InexactError(_))));
    }

    #[test]
    fn test_repeated_call_hits_cache() {
        let d = dispatcher();
        let c = counter(&d, 0.0);
        for _ in 0..3 {
            d.call(&c, CallStyle::Instance, "Add", &[DynamicValue::Number(1.0)])
                .unwrap();
        }
        let set = d.registry().descriptor(TypeTag::of::<Counter>()).unwrap();
        let stats = set.call_cache().stats();
        assert_eq!(stats.hits, 2);
        // `__new` and `Add`
        assert_eq!(stats.entries, 2);
    }

    #[test]
    fn test_fold_during_resolution_skips_cache_store() {
        let d = dispatcher();
        let c = counter(&d, 0.0);
        let set = d.registry().descriptor(TypeTag::of::<Counter>()).unwrap();
        let mut candidates = match set.member("Add").map(|m| &**m) {
            Some(MemberDescriptor::Method(group)) => group.candidates().to_vec(),
            _ => panic!("Add should be a method"),
        };
        let (version, extensions) = set.extension_snapshot("Add");
        candidates.extend(extensions);

        // Another caller registers and folds an overload in the meantime.
        let mut ext = ExtensionBuilder::new("CounterFloat");
        ext.method::<Counter, _>("Add", vec![param("x", ParamType::Float64)], |_, _| {
            Ok(DynamicValue::from("float"))
        });
        d.registry().register_extension_methods("CounterFloat", ext.finish());
        d.registry().sync_extensions(&set);
        assert!(set.call_cache().is_empty());

        let site = CallSite::new(CallStyle::Instance, ReceiverKind::Instance);
        let args = [DynamicValue::Number(1.0)];
        let resolution = d
            .resolve_at(&set, version, "Add", &candidates, site, &args)
            .unwrap();
        // Resolved against the stale list; must not outlive the fold.
        assert_eq!(resolution.candidate.kind(), CandidateKind::Instance);
        assert!(set.call_cache().is_empty());

        assert_eq!(
            d.call(&c, CallStyle::Instance, "Add", &args).unwrap(),
            DynamicValue::from("float")
        );
    }
}
