//! The per-type descriptor set owned by the registry.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

use interop_dispatch_runtime::TypeTag;
use parking_lot::RwLock;

use super::candidate::OverloadCandidate;
use super::member::{Access, MemberDescriptor};
use crate::dispatch::CallSiteCache;
use crate::host::TypeKind;
use crate::types::{BuildError, MetaName, VisibilityPolicy};

/// Extension version a set starts with, before any fold.
const NOT_FOLDED: u64 = u64::MAX;

pub type ExtensionTable = HashMap<String, Vec<Arc<OverloadCandidate>>>;

/// Everything scripts can reach on one host type.
///
/// Members are immutable once built; repeated lookups return the same
/// `Arc`s. Extension methods and the call-site cache are the only parts
/// that change after construction.
#[derive(Debug)]
pub struct DescriptorSet {
    tag: TypeTag,
    name: String,
    kind: TypeKind,
    policy: VisibilityPolicy,
    internal: bool,
    access: Access,
    generation: u64,
    supertypes: Vec<TypeTag>,
    members: HashMap<String, Arc<MemberDescriptor>>,
    meta_members: HashMap<MetaName, Arc<MemberDescriptor>>,
    omitted: Vec<BuildError>,
    extensions: RwLock<ExtensionTable>,
    extension_version: AtomicU64,
    cache: CallSiteCache,
    discarded: AtomicBool,
}

impl DescriptorSet {
    pub(crate) fn new(
        tag: TypeTag,
        name: impl Into<String>,
        kind: TypeKind,
        policy: VisibilityPolicy,
        cache: CallSiteCache,
    ) -> Self {
        Self {
            tag,
            name: name.into(),
            kind,
            policy,
            internal: false,
            access: Access::Public,
            generation: 0,
            supertypes: Vec::new(),
            members: HashMap::new(),
            meta_members: HashMap::new(),
            omitted: Vec::new(),
            extensions: RwLock::new(HashMap::new()),
            extension_version: AtomicU64::new(NOT_FOLDED),
            cache,
            discarded: AtomicBool::new(false),
        }
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &TypeKind {
        &self.kind
    }

    pub fn policy(&self) -> VisibilityPolicy {
        self.policy
    }

    /// Type belongs to the engine itself.
    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn access(&self) -> Access {
        self.access
    }

    /// Registration generation this set was built for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn supertypes(&self) -> &[TypeTag] {
        &self.supertypes
    }

    pub fn member(&self, name: &str) -> Option<&Arc<MemberDescriptor>> {
        self.members.get(name)
    }

    pub fn meta_member(&self, meta: MetaName) -> Option<&Arc<MemberDescriptor>> {
        self.meta_members.get(&meta)
    }

    pub fn members(&self) -> impl Iterator<Item = (&str, &Arc<MemberDescriptor>)> {
        self.members.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn meta_members(&self) -> impl Iterator<Item = (MetaName, &Arc<MemberDescriptor>)> {
        self.meta_members.iter().map(|(k, v)| (*k, v))
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// Members left out at build time, with the reason.
    pub fn omitted(&self) -> &[BuildError] {
        &self.omitted
    }

    pub fn call_cache(&self) -> &CallSiteCache {
        &self.cache
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded.load(Ordering::Acquire)
    }

    // ========== extension methods ==========

    /// Extension version currently folded into this set.
    pub fn extension_version(&self) -> u64 {
        self.extension_version.load(Ordering::Acquire)
    }

    pub fn has_extension(&self, name: &str) -> bool {
        self.extensions.read().contains_key(name)
    }

    pub fn extension_candidates(&self, name: &str) -> Vec<Arc<OverloadCandidate>> {
        self.extension_snapshot(name).1
    }

    /// Extension overloads of `name` with the version they were folded at.
    pub fn extension_snapshot(&self, name: &str) -> (u64, Vec<Arc<OverloadCandidate>>) {
        // Folds publish the version under the write lock.
        let table = self.extensions.read();
        let version = self.extension_version.load(Ordering::Acquire);
        (version, table.get(name).cloned().unwrap_or_default())
    }

    /// Replace the folded extension methods and drop cached resolutions.
    pub(crate) fn fold_extensions(&self, version: u64, table: ExtensionTable) {
        let mut guard = self.extensions.write();
        if self.extension_version.load(Ordering::Acquire) == version {
            return;
        }
        *guard = table;
        self.extension_version.store(version, Ordering::Release);
        self.cache.clear();
        tracing::debug!(
            target: "interop.build",
            type_name = %self.name,
            version,
            methods = guard.len(),
            "folded extension methods"
        );
    }

    // ========== assembly (descriptor builder / registry) ==========

    pub(crate) fn set_internal(&mut self, internal: bool) {
        self.internal = internal;
    }

    pub(crate) fn set_access(&mut self, access: Access) {
        self.access = access;
    }

    pub(crate) fn set_generation(&mut self, generation: u64) {
        self.generation = generation;
    }

    pub(crate) fn set_supertypes(&mut self, supertypes: Vec<TypeTag>) {
        self.supertypes = supertypes;
    }

    pub(crate) fn insert_member(&mut self, member: MemberDescriptor) -> Arc<MemberDescriptor> {
        let member = Arc::new(member);
        self.members
            .insert(member.name().to_string(), Arc::clone(&member));
        member
    }

    pub(crate) fn insert_meta(&mut self, meta: MetaName, member: MemberDescriptor) {
        self.meta_members.insert(meta, Arc::new(member));
    }

    pub(crate) fn record_omitted(&mut self, error: BuildError) {
        self.omitted.push(error);
    }

    /// Point-in-time invalidation on unregistration.
    pub(crate) fn discard(&self) {
        self.discarded.store(true, Ordering::Release);
        self.cache.clear();
    }
}
