//! Descriptor builder: host type shape in, descriptor set out.
//!
//! Visibility is resolved per member in a fixed precedence (opt-in policy,
//! then hide list, then class-level default visibility, then the member's
//! own markers). A member that cannot be described is omitted and recorded
//! on the set; only a policy refusal fails the whole type.

use std::collections::BTreeMap;
use std::sync::Arc;

use super::candidate::{CandidateKind, Invoker, OverloadCandidate};
use super::member::{
    Access, AccessorDescriptor, EventDescriptor, MemberDescriptor, NestedTypeDescriptor, OverloadGroup,
    Visibility,
};
use super::parameter::{validate_parameters, ParameterDescriptor};
use super::set::DescriptorSet;
use crate::dispatch::{CacheSettings, CallSiteCache};
use crate::host::{
    generic_indexer, ranked_indexer, HostAccessor, HostEvent, HostIndexer, HostMember, HostMethod,
    HostTypeShape, MemberMarkers, NestedShape, TypeKind, EXPLICIT_CONVERSION, IMPLICIT_CONVERSION,
};
use crate::types::{BuildError, MetaName, ParamType, VisibilityPolicy};

/// Script name of the constructor group.
pub const CONSTRUCTOR_NAME: &str = "__new";
/// Script name of the indexer getter group.
pub const INDEXER_GET_NAME: &str = "get_Item";
/// Script name of the indexer setter group.
pub const INDEXER_SET_NAME: &str = "set_Item";
/// Hide-list token suppressing synthesized array indexers.
pub const INDEXER_HIDE_TOKEN: &str = "[this]";

/// Synthetic member name of a conversion operator to `target`.
pub fn conversion_name(target: &ParamType) -> String {
    let clean: String = target
        .to_string()
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect();
    format!("__to{}", clean)
}

/// Output of a build: the set plus nested types to register lazily.
#[derive(Debug)]
pub struct BuiltDescriptors {
    pub set: DescriptorSet,
    pub nested: Vec<NestedShape>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum GroupKind {
    Constructor,
    Method,
    IndexerGet,
    IndexerSet,
}

impl GroupKind {
    fn wrap(self, group: OverloadGroup) -> MemberDescriptor {
        match self {
            GroupKind::Constructor => MemberDescriptor::Constructor(group),
            GroupKind::Method => MemberDescriptor::Method(group),
            GroupKind::IndexerGet => MemberDescriptor::IndexerGet(group),
            GroupKind::IndexerSet => MemberDescriptor::IndexerSet(group),
        }
    }

    fn label(self) -> &'static str {
        match self {
            GroupKind::Constructor => "constructor",
            GroupKind::Method => "method",
            GroupKind::IndexerGet => "indexer getter",
            GroupKind::IndexerSet => "indexer setter",
        }
    }
}

/// Members collected so far for one type.
struct Assembly<'s> {
    shape: &'s HostTypeShape,
    groups: BTreeMap<String, (GroupKind, OverloadGroup)>,
    plain: BTreeMap<String, MemberDescriptor>,
    meta: BTreeMap<MetaName, OverloadGroup>,
    nested: Vec<NestedShape>,
    omitted: Vec<BuildError>,
}

impl<'s> Assembly<'s> {
    fn new(shape: &'s HostTypeShape) -> Self {
        Self {
            shape,
            groups: BTreeMap::new(),
            plain: BTreeMap::new(),
            meta: BTreeMap::new(),
            nested: Vec::new(),
            omitted: Vec::new(),
        }
    }

    fn omit(&mut self, error: BuildError) {
        tracing::warn!(
            target: "interop.build",
            type_name = %self.shape.name,
            error = %error,
            "member omitted"
        );
        self.omitted.push(error);
    }

    fn duplicate(&mut self, name: &str, existing: &'static str) {
        self.omit(BuildError::DuplicateMember {
            type_name: self.shape.name.clone(),
            member: name.to_string(),
            existing,
        });
    }

    fn add_candidate(&mut self, kind: GroupKind, name: &str, candidate: Arc<OverloadCandidate>) {
        if let Some(existing) = self.plain.get(name) {
            let existing = existing.kind_name();
            self.duplicate(name, existing);
            return;
        }
        match self.groups.get_mut(name) {
            Some((existing, group)) if *existing == kind => group.push(candidate),
            Some((existing, _)) => {
                let existing = existing.label();
                self.duplicate(name, existing);
            }
            None => {
                let mut group = OverloadGroup::new(name);
                group.push(candidate);
                self.groups.insert(name.to_string(), (kind, group));
            }
        }
    }

    fn add_plain(&mut self, member: MemberDescriptor) {
        let name = member.name().to_string();
        if let Some((kind, _)) = self.groups.get(&name) {
            let existing = kind.label();
            self.duplicate(&name, existing);
        } else if let Some(existing) = self.plain.get(&name) {
            let existing = existing.kind_name();
            self.duplicate(&name, existing);
        } else {
            self.plain.insert(name, member);
        }
    }

    fn add_meta(&mut self, meta: MetaName, candidate: Arc<OverloadCandidate>) {
        self.meta
            .entry(meta)
            .or_insert_with(|| OverloadGroup::new(meta.as_str()))
            .push(candidate);
    }
}

/// Builds descriptor sets under one visibility policy.
#[derive(Debug, Clone)]
pub struct DescriptorBuilder {
    policy: VisibilityPolicy,
    cache: CacheSettings,
}

impl DescriptorBuilder {
    pub fn new(policy: VisibilityPolicy) -> Self {
        Self {
            policy: policy.resolve(VisibilityPolicy::Standard),
            cache: CacheSettings::default(),
        }
    }

    /// Call-site cache settings for the sets this builder produces.
    pub fn with_cache(mut self, cache: CacheSettings) -> Self {
        self.cache = cache;
        self
    }

    pub fn policy(&self) -> VisibilityPolicy {
        self.policy
    }

    /// Whether a member named `name` with `markers` reaches scripts.
    pub fn resolve_visibility(
        &self,
        shape: &HostTypeShape,
        name: &str,
        markers: &MemberMarkers,
    ) -> Visibility {
        let included = if self.policy == VisibilityPolicy::OptIn {
            markers.visible == Some(true)
        } else if shape.hide_list.contains(name) {
            false
        } else if shape.default_visibility == Some(false) {
            markers.visible == Some(true)
        } else {
            markers.creates_member()
        };
        if included {
            Visibility::Public
        } else {
            Visibility::Hidden
        }
    }

    pub fn build(&self, shape: &HostTypeShape) -> Result<BuiltDescriptors, BuildError> {
        if self.policy == VisibilityPolicy::NoReflection {
            return Err(BuildError::ReflectionNotAllowed {
                type_name: shape.name.clone(),
            });
        }

        let mut asm = Assembly::new(shape);

        if shape.kind != TypeKind::Delegate {
            self.add_constructors(&mut asm);
        }

        for member in &shape.members {
            match member {
                HostMember::Constructor(_) => {}
                HostMember::Method(m) => self.add_method(&mut asm, m),
                HostMember::Property(a) => self.add_accessor(&mut asm, a, false),
                HostMember::Field(a) => self.add_accessor(&mut asm, a, true),
                HostMember::Event(e) => self.add_event(&mut asm, e),
                HostMember::Indexer(ix) => self.add_indexer(&mut asm, ix),
            }
        }

        self.add_nested_types(&mut asm);
        self.add_array_indexers(&mut asm);

        Ok(self.finish(asm))
    }

    fn candidate(shape: &HostTypeShape, name: &str, m: &HostMethod) -> Arc<OverloadCandidate> {
        let kind = if m.is_static {
            CandidateKind::Static
        } else {
            CandidateKind::Instance
        };
        Arc::new(
            OverloadCandidate::new(
                name,
                kind,
                m.params.clone(),
                m.return_arity,
                shape.name.clone(),
                m.invoker.clone(),
            )
            .with_access(Access::from_non_public(m.markers.non_public)),
        )
    }

    fn check_callable(shape: &HostTypeShape, m: &HostMethod) -> Result<(), BuildError> {
        if let Some(reason) = &m.markers.unsupported {
            return Err(BuildError::unsupported(&shape.name, &m.name, reason.as_str()));
        }
        if m.markers.generic_definition {
            return Err(BuildError::unsupported(
                &shape.name,
                &m.name,
                "unbound generic method",
            ));
        }
        validate_parameters(&m.params).map_err(|reason| BuildError::InvalidParameterList {
            type_name: shape.name.clone(),
            member: m.name.clone(),
            reason,
        })
    }

    fn add_constructors(&self, asm: &mut Assembly<'_>) {
        let shape = asm.shape;
        for member in &shape.members {
            let HostMember::Constructor(ctor) = member else {
                continue;
            };
            if self.resolve_visibility(shape, CONSTRUCTOR_NAME, &ctor.markers) == Visibility::Hidden
            {
                continue;
            }
            if let Err(e) = Self::check_callable(shape, ctor) {
                asm.omit(e);
                continue;
            }
            let mut ctor = ctor.clone();
            ctor.is_static = true;
            asm.add_candidate(
                GroupKind::Constructor,
                CONSTRUCTOR_NAME,
                Self::candidate(shape, CONSTRUCTOR_NAME, &ctor),
            );
        }

        if shape.kind == TypeKind::ValueType
            && !shape.has_constructors()
            && !shape.hide_list.contains(CONSTRUCTOR_NAME)
        {
            if let Some(invoker) = &shape.default_constructor {
                asm.add_candidate(
                    GroupKind::Constructor,
                    CONSTRUCTOR_NAME,
                    Arc::new(OverloadCandidate::new(
                        CONSTRUCTOR_NAME,
                        CandidateKind::Static,
                        Vec::new(),
                        1,
                        shape.name.clone(),
                        invoker.clone(),
                    )),
                );
            }
        }
    }

    fn add_method(&self, asm: &mut Assembly<'_>, m: &HostMethod) {
        let shape = asm.shape;
        if self.resolve_visibility(shape, &m.name, &m.markers) == Visibility::Hidden {
            return;
        }
        if let Err(e) = Self::check_callable(shape, m) {
            asm.omit(e);
            return;
        }

        let candidate = Self::candidate(shape, &m.name, m);
        asm.add_candidate(GroupKind::Method, &m.name, Arc::clone(&candidate));

        if m.markers.special_name {
            let is_conversion = m.name == IMPLICIT_CONVERSION || m.name == EXPLICIT_CONVERSION;
            if let (true, Some(target)) = (is_conversion, &m.conversion_target) {
                asm.add_candidate(
                    GroupKind::Method,
                    &conversion_name(target),
                    Arc::clone(&candidate),
                );
            }
            if let Some(meta) = MetaName::from_operator_name(&m.name) {
                asm.add_meta(meta, Arc::clone(&candidate));
            }
        }
        for meta in &m.markers.meta_names {
            asm.add_meta(*meta, Arc::clone(&candidate));
        }
    }

    fn add_accessor(&self, asm: &mut Assembly<'_>, a: &HostAccessor, is_field: bool) {
        let shape = asm.shape;
        if a.markers.special_name
            || self.resolve_visibility(shape, &a.name, &a.markers) == Visibility::Hidden
        {
            return;
        }
        if let Some(reason) = &a.markers.unsupported {
            asm.omit(BuildError::unsupported(&shape.name, &a.name, reason.as_str()));
            return;
        }
        let desc = AccessorDescriptor {
            name: a.name.clone(),
            is_static: a.is_static,
            access: Access::from_non_public(a.markers.non_public),
            getter: a.getter.clone(),
            setter: a.setter.clone(),
        };
        asm.add_plain(if is_field {
            MemberDescriptor::Field(desc)
        } else {
            MemberDescriptor::Property(desc)
        });
    }

    fn add_event(&self, asm: &mut Assembly<'_>, e: &HostEvent) {
        let shape = asm.shape;
        if e.markers.special_name
            || self.resolve_visibility(shape, &e.name, &e.markers) == Visibility::Hidden
        {
            return;
        }
        if let Some(reason) = &e.markers.unsupported {
            asm.omit(BuildError::unsupported(&shape.name, &e.name, reason.as_str()));
            return;
        }
        asm.add_plain(MemberDescriptor::Event(EventDescriptor {
            name: e.name.clone(),
            is_static: e.is_static,
            add: e.add.clone(),
            remove: e.remove.clone(),
        }));
    }

    fn add_indexer(&self, asm: &mut Assembly<'_>, ix: &HostIndexer) {
        let shape = asm.shape;
        let accessors = [
            (GroupKind::IndexerGet, INDEXER_GET_NAME, &ix.getter),
            (GroupKind::IndexerSet, INDEXER_SET_NAME, &ix.setter),
        ];
        for (kind, name, method) in accessors {
            let Some(m) = method else {
                continue;
            };
            if self.resolve_visibility(shape, name, &ix.markers) == Visibility::Hidden {
                continue;
            }
            if let Err(e) = Self::check_callable(shape, m) {
                asm.omit(e);
                continue;
            }
            asm.add_candidate(kind, name, Self::candidate(shape, name, m));
        }
    }

    fn add_nested_types(&self, asm: &mut Assembly<'_>) {
        let shape = asm.shape;
        for nested in &shape.nested {
            if nested.markers.generic_definition
                || self.resolve_visibility(shape, &nested.name, &nested.markers)
                    == Visibility::Hidden
            {
                continue;
            }
            asm.add_plain(MemberDescriptor::NestedType(NestedTypeDescriptor {
                name: nested.name.clone(),
                tag: nested.tag,
            }));
            asm.nested.push(nested.clone());
        }
    }

    fn add_array_indexers(&self, asm: &mut Assembly<'_>) {
        let shape = asm.shape;
        if shape.hide_list.contains(INDEXER_HIDE_TOKEN) {
            return;
        }
        let synthesized = match &shape.kind {
            TypeKind::Array { element, rank } => ranked_indexer(element, *rank),
            TypeKind::ArrayBase => generic_indexer(),
            _ => return,
        };
        let get = synthesized_candidate(
            shape,
            INDEXER_GET_NAME,
            synthesized.get_params,
            1,
            synthesized.get,
        );
        let set = synthesized_candidate(
            shape,
            INDEXER_SET_NAME,
            synthesized.set_params,
            0,
            synthesized.set,
        );
        asm.add_candidate(GroupKind::IndexerGet, INDEXER_GET_NAME, get);
        asm.add_candidate(GroupKind::IndexerSet, INDEXER_SET_NAME, set);
    }

    fn finish(&self, asm: Assembly<'_>) -> BuiltDescriptors {
        let shape = asm.shape;
        let mut set = DescriptorSet::new(
            shape.tag,
            shape.name.clone(),
            shape.kind.clone(),
            self.policy,
            CallSiteCache::new(self.cache),
        );
        set.set_internal(shape.internal);
        set.set_access(Access::from_non_public(shape.non_public));
        set.set_supertypes(shape.supertypes.clone());

        for (_, (kind, group)) in asm.groups {
            set.insert_member(kind.wrap(group));
        }
        for (_, member) in asm.plain {
            set.insert_member(member);
        }
        for (meta, group) in asm.meta {
            set.insert_meta(meta, MemberDescriptor::Method(group));
        }
        for error in asm.omitted {
            set.record_omitted(error);
        }

        tracing::debug!(
            target: "interop.build",
            type_name = %shape.name,
            policy = self.policy.as_str(),
            members = set.member_count(),
            omitted = set.omitted().len(),
            "built descriptor set"
        );

        BuiltDescriptors {
            set,
            nested: asm.nested,
        }
    }
}

fn synthesized_candidate(
    shape: &HostTypeShape,
    name: &str,
    params: Vec<ParameterDescriptor>,
    return_arity: usize,
    invoker: Invoker,
) -> Arc<OverloadCandidate> {
    Arc::new(OverloadCandidate::new(
        name,
        CandidateKind::Instance,
        params,
        return_arity,
        shape.name.clone(),
        invoker,
    ))
}
