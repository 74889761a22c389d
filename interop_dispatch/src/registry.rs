//! Type registry: owns one descriptor set per registered host type.
//!
//! The registry is an explicit object rather than process state; several
//! independent registries can live side by side. Each entry builds its set
//! at most once, on registration or on first lookup for lazily registered
//! nested types. Unregistration is a point-in-time cut: lookups started
//! afterwards fail with `UnregisteredType`, while callers already holding
//! the set may finish with it.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use interop_dispatch_runtime::{TypeTag, UserData};
use once_cell::sync::OnceCell;
use parking_lot::RwLock;

use crate::config::InteropConfig;
use crate::descriptor::{
    validate_parameters, Access, CandidateKind, DescriptorBuilder, DescriptorSet, ExtensionTable,
    OverloadCandidate,
};
use crate::error::{InteropError, InteropResult};
use crate::host::{
    array_base_shape, array_base_tag, array_shape, array_tag, describe_type, ExtensionBuilder,
    ExtensionMethod, ExtensionProvider, HostArray, HostType, ShapeFactory,
};
use crate::types::{ParamType, TypeRelation, VisibilityPolicy};

/// Proof of one registration; unregistering with a stale handle is a no-op.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationHandle {
    tag: TypeTag,
    generation: u64,
}

impl RegistrationHandle {
    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }
}

#[derive(Debug)]
struct RegistryEntry {
    tag: TypeTag,
    policy: VisibilityPolicy,
    factory: ShapeFactory,
    generation: u64,
    set: OnceCell<Arc<DescriptorSet>>,
}

impl RegistryEntry {
    fn handle(&self) -> RegistrationHandle {
        RegistrationHandle {
            tag: self.tag,
            generation: self.generation,
        }
    }
}

#[derive(Debug)]
pub struct TypeRegistry {
    config: InteropConfig,
    entries: RwLock<HashMap<TypeTag, Arc<RegistryEntry>>>,
    extensions: RwLock<HashMap<TypeTag, ExtensionTable>>,
    extension_version: AtomicU64,
    next_generation: AtomicU64,
}

impl Default for TypeRegistry {
    fn default() -> Self {
        Self::new(InteropConfig::default())
    }
}

impl TypeRegistry {
    pub fn new(config: InteropConfig) -> Self {
        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            extensions: RwLock::new(HashMap::new()),
            extension_version: AtomicU64::new(0),
            next_generation: AtomicU64::new(1),
        }
    }

    pub fn config(&self) -> &InteropConfig {
        &self.config
    }

    // ========== registration ==========

    /// Register `T` and build its descriptors.
    ///
    /// Registering an already registered type returns the existing handle
    /// and keeps the original policy.
    pub fn register<T: HostType>(
        &self,
        policy: VisibilityPolicy,
    ) -> InteropResult<RegistrationHandle> {
        self.register_shape(
            TypeTag::of::<T>(),
            ShapeFactory::new(describe_type::<T>),
            policy,
        )
    }

    /// Register a type from an arbitrary shape producer.
    pub fn register_shape(
        &self,
        tag: TypeTag,
        factory: ShapeFactory,
        policy: VisibilityPolicy,
    ) -> InteropResult<RegistrationHandle> {
        let entry = self.entry_or_insert(tag, factory, policy);
        match self.build_entry(&entry) {
            Ok(set) => {
                tracing::debug!(
                    target: "interop.registry",
                    type_name = %set.name(),
                    tag = %tag,
                    generation = entry.generation,
                    "registered host type"
                );
                Ok(entry.handle())
            }
            Err(e) => {
                self.remove_generation(tag, entry.generation);
                Err(e)
            }
        }
    }

    /// Register the array type with the given element type and rank.
    pub fn register_array(
        &self,
        element: ParamType,
        rank: usize,
    ) -> InteropResult<RegistrationHandle> {
        self.insert_lazy(
            array_base_tag(),
            ShapeFactory::new(array_base_shape),
            VisibilityPolicy::Standard,
        );
        let tag = array_tag(&element, rank);
        self.register_shape(
            tag,
            ShapeFactory::new(move || array_shape(element.clone(), rank)),
            VisibilityPolicy::Standard,
        )
    }

    /// Register every extension method `P` declares.
    ///
    /// Returns how many methods were accepted. Descriptor sets pick them up
    /// on their next call and drop cached resolutions.
    pub fn register_extension_provider<P: ExtensionProvider>(&self) -> usize {
        let mut builder = ExtensionBuilder::for_provider::<P>();
        P::describe(&mut builder);
        let provider = builder.provider().to_string();
        self.register_extension_methods(&provider, builder.finish())
    }

    pub fn register_extension_methods(&self, provider: &str, methods: Vec<ExtensionMethod>) -> usize {
        let mut accepted = 0;
        {
            let mut table = self.extensions.write();
            for ExtensionMethod { target, method } in methods {
                if method.markers.visible == Some(false) {
                    continue;
                }
                let problem = match &method.markers.unsupported {
                    Some(reason) => Some(reason.clone()),
                    None => validate_parameters(&method.params).err(),
                };
                if let Some(reason) = problem {
                    tracing::warn!(
                        target: "interop.build",
                        provider,
                        member = %method.name,
                        reason = %reason,
                        "extension method omitted"
                    );
                    continue;
                }
                let access = Access::from_non_public(method.markers.non_public);
                let candidate = Arc::new(
                    OverloadCandidate::new(
                        method.name.clone(),
                        CandidateKind::Extension,
                        method.params,
                        method.return_arity,
                        provider,
                        method.invoker,
                    )
                    .with_access(access),
                );
                table
                    .entry(target)
                    .or_default()
                    .entry(method.name)
                    .or_default()
                    .push(candidate);
                accepted += 1;
            }
        }
        let version = self.extension_version.fetch_add(1, Ordering::AcqRel) + 1;
        tracing::debug!(
            target: "interop.registry",
            provider,
            accepted,
            version,
            "registered extension provider"
        );
        accepted
    }

    /// Remove the registration `handle` refers to.
    ///
    /// Returns false when the handle is stale (the type was unregistered or
    /// re-registered since).
    pub fn unregister(&self, handle: RegistrationHandle) -> bool {
        self.remove_generation(handle.tag, handle.generation)
    }

    pub fn unregister_type(&self, tag: TypeTag) -> bool {
        let removed = self.entries.write().remove(&tag);
        match removed {
            Some(entry) => {
                Self::retire(&entry);
                true
            }
            None => false,
        }
    }

    /// Drop every registration and extension method.
    pub fn clear(&self) {
        let drained: Vec<_> = self.entries.write().drain().map(|(_, e)| e).collect();
        for entry in &drained {
            Self::retire(entry);
        }
        self.extensions.write().clear();
        self.extension_version.fetch_add(1, Ordering::AcqRel);
        tracing::debug!(target: "interop.registry", types = drained.len(), "registry cleared");
    }

    pub fn is_registered(&self, tag: TypeTag) -> bool {
        self.entries.read().contains_key(&tag)
    }

    pub fn registered_types(&self) -> Vec<TypeTag> {
        let mut tags: Vec<_> = self.entries.read().keys().copied().collect();
        tags.sort();
        tags
    }

    // ========== lookup ==========

    /// Descriptor set for `tag`, building it on first use.
    pub fn descriptor(&self, tag: TypeTag) -> InteropResult<Arc<DescriptorSet>> {
        let entry = self
            .entries
            .read()
            .get(&tag)
            .cloned()
            .ok_or(InteropError::UnregisteredType(tag))?;
        self.build_entry(&entry)
    }

    /// Already built descriptor set for `tag`, without building.
    pub fn built_descriptor(&self, tag: TypeTag) -> Option<Arc<DescriptorSet>> {
        let entry = self.entries.read().get(&tag).cloned()?;
        entry.set.get().cloned()
    }

    /// Descriptor set for a receiver; arrays register themselves on first
    /// use when `auto_register_arrays` is on.
    pub fn descriptor_for(&self, receiver: &UserData) -> InteropResult<Arc<DescriptorSet>> {
        match self.descriptor(receiver.tag()) {
            Err(InteropError::UnregisteredType(tag)) if self.config.auto_register_arrays => {
                match receiver.downcast_ref::<HostArray>() {
                    Some(array) => {
                        self.register_array(array.element().clone(), array.rank())?;
                        self.descriptor(tag)
                    }
                    None => Err(InteropError::UnregisteredType(tag)),
                }
            }
            other => other,
        }
    }

    pub fn extension_version(&self) -> u64 {
        self.extension_version.load(Ordering::Acquire)
    }

    /// Fold the current extension methods into `set` if it is behind.
    pub fn sync_extensions(&self, set: &DescriptorSet) {
        let version = self.extension_version();
        if set.extension_version() == version {
            return;
        }
        let table = self
            .extensions
            .read()
            .get(&set.tag())
            .cloned()
            .unwrap_or_default();
        set.fold_extensions(version, table);
    }

    // ========== internals ==========

    fn entry_or_insert(
        &self,
        tag: TypeTag,
        factory: ShapeFactory,
        policy: VisibilityPolicy,
    ) -> Arc<RegistryEntry> {
        if let Some(existing) = self.entries.read().get(&tag) {
            return Arc::clone(existing);
        }
        let mut entries = self.entries.write();
        Arc::clone(entries.entry(tag).or_insert_with(|| {
            Arc::new(RegistryEntry {
                tag,
                policy,
                factory,
                generation: self.next_generation.fetch_add(1, Ordering::Relaxed),
                set: OnceCell::new(),
            })
        }))
    }

    /// Register without building; used for nested types.
    fn insert_lazy(&self, tag: TypeTag, factory: ShapeFactory, policy: VisibilityPolicy) {
        let entry = self.entry_or_insert(tag, factory, policy);
        tracing::trace!(
            target: "interop.registry",
            tag = %tag,
            generation = entry.generation,
            "lazy registration"
        );
    }

    fn build_entry(&self, entry: &Arc<RegistryEntry>) -> InteropResult<Arc<DescriptorSet>> {
        entry
            .set
            .get_or_try_init(|| {
                let shape = entry.factory.shape();
                let policy = entry.policy.resolve(self.config.default_policy);
                let built = DescriptorBuilder::new(policy)
                    .with_cache(self.config.cache_settings())
                    .build(&shape)?;
                for nested in built.nested {
                    self.insert_lazy(nested.tag, nested.factory, entry.policy);
                }
                let mut set = built.set;
                set.set_generation(entry.generation);
                Ok::<_, InteropError>(Arc::new(set))
            })
            .cloned()
    }

    fn remove_generation(&self, tag: TypeTag, generation: u64) -> bool {
        let removed = {
            let mut entries = self.entries.write();
            match entries.get(&tag) {
                Some(entry) if entry.generation == generation => entries.remove(&tag),
                _ => None,
            }
        };
        match removed {
            Some(entry) => {
                Self::retire(&entry);
                true
            }
            None => false,
        }
    }

    fn retire(entry: &RegistryEntry) {
        if let Some(set) = entry.set.get() {
            set.discard();
        }
        tracing::debug!(
            target: "interop.registry",
            tag = %entry.tag,
            generation = entry.generation,
            "unregistered host type"
        );
    }
}

impl TypeRelation for TypeRegistry {
    fn is_assignable(&self, from: TypeTag, to: TypeTag) -> bool {
        if from == to {
            return true;
        }
        self.descriptor(from)
            .map(|set| set.supertypes().contains(&to))
            .unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::TypeBuilder;
    use interop_dispatch_runtime::DynamicValue;

    struct Plain;

    impl HostType for Plain {
        fn describe(ty: &mut TypeBuilder<Self>) {
            ty.method("Ping", vec![], |_, _| Ok(DynamicValue::from("pong")));
        }
    }

    #[test]
    fn test_register_is_idempotent() {
        let registry = TypeRegistry::default();
        let a = registry.register::<Plain>(VisibilityPolicy::Default).unwrap();
        let b = registry.register::<Plain>(VisibilityPolicy::OptIn).unwrap();
        assert_eq!(a, b);
        let set = registry.descriptor(a.tag()).unwrap();
        assert_eq!(set.policy(), VisibilityPolicy::Standard);
        assert!(Arc::ptr_eq(&set, &registry.descriptor(a.tag()).unwrap()));
    }

    #[test]
    fn test_stale_handle_does_not_unregister() {
        let registry = TypeRegistry::default();
        let first = registry.register::<Plain>(VisibilityPolicy::Default).unwrap();
        assert!(registry.unregister(first));
        let second = registry.register::<Plain>(VisibilityPolicy::Default).unwrap();
        assert_ne!(first.generation(), second.generation());
        assert!(!registry.unregister(first));
        assert!(registry.is_registered(second.tag()));
    }

    #[test]
    fn test_no_reflection_registration_fails() {
        let registry = TypeRegistry::default();
        let err = registry
            .register::<Plain>(VisibilityPolicy::NoReflection)
            .unwrap_err();
        assert!(matches!(err, InteropError::Build(_)));
        assert!(!registry.is_registered(TypeTag::of::<Plain>()));
    }

    #[test]
    fn test_default_policy_comes_from_config() {
        let config = InteropConfig {
            default_policy: VisibilityPolicy::OptIn,
            ..InteropConfig::default()
        };
        let registry = TypeRegistry::new(config);
        let handle = registry.register::<Plain>(VisibilityPolicy::Default).unwrap();
        let set = registry.descriptor(handle.tag()).unwrap();
        assert_eq!(set.policy(), VisibilityPolicy::OptIn);
        assert!(set.member("Ping").is_none());
    }
}
