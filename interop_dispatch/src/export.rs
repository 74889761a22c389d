//! Wiring exporter: a read-only snapshot of a descriptor set for tooling
//! such as debugger member browsers.
//!
//! The exporter only reads descriptors; nothing here can change how a
//! script call resolves.

use std::collections::BTreeMap;

use interop_dispatch_runtime::TypeTag;
use serde::Serialize;

use crate::descriptor::{
    AccessorDescriptor, DescriptorSet, MemberDescriptor, OverloadCandidate, OverloadGroup,
    ParameterDescriptor,
};
use crate::host::TypeKind;
use crate::registry::TypeRegistry;
use crate::types::VisibilityPolicy;

/// Script-visible tree value.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum WireNode {
    Bool(bool),
    Number(f64),
    String(String),
    Table(BTreeMap<String, WireNode>),
}

impl WireNode {
    pub fn table() -> Self {
        WireNode::Table(BTreeMap::new())
    }

    /// Set `key` on a table node; no-op on leaves.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<WireNode>) {
        if let WireNode::Table(map) = self {
            map.insert(key.into(), value.into());
        }
    }

    pub fn get(&self, key: &str) -> Option<&WireNode> {
        match self {
            WireNode::Table(map) => map.get(key),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            WireNode::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }
}

impl From<bool> for WireNode {
    fn from(v: bool) -> Self {
        WireNode::Bool(v)
    }
}

impl From<usize> for WireNode {
    fn from(v: usize) -> Self {
        WireNode::Number(v as f64)
    }
}

impl From<&str> for WireNode {
    fn from(v: &str) -> Self {
        WireNode::String(v.to_string())
    }
}

impl From<String> for WireNode {
    fn from(v: String) -> Self {
        WireNode::String(v)
    }
}

/// Export `set`. Nested types already built in `registry` are embedded.
pub fn export(set: &DescriptorSet, registry: &TypeRegistry) -> WireNode {
    let mut visiting = Vec::new();
    export_set(set, registry, &mut visiting)
}

fn export_set(set: &DescriptorSet, registry: &TypeRegistry, visiting: &mut Vec<TypeTag>) -> WireNode {
    let mut node = WireNode::table();
    if set.policy() == VisibilityPolicy::OptIn || set.is_internal() {
        node.set("skip", true);
        return node;
    }
    visiting.push(set.tag());

    node.set("class", set_class(set.kind()));
    node.set("name", set.name());
    node.set("visibility", set.access().as_str());

    let mut members = WireNode::table();
    for (name, member) in set.members() {
        members.set(name, export_member(set, member, registry, visiting));
    }
    node.set("members", members);

    let mut meta = WireNode::table();
    for (name, member) in set.meta_members() {
        meta.set(name.as_str(), export_member(set, member, registry, visiting));
    }
    node.set("metamembers", meta);

    visiting.pop();
    node
}

fn set_class(kind: &TypeKind) -> &'static str {
    match kind {
        TypeKind::Array { .. } | TypeKind::ArrayBase => "ArrayUserDataDescriptor",
        _ => "StandardUserDataDescriptor",
    }
}

fn export_member(
    set: &DescriptorSet,
    member: &MemberDescriptor,
    registry: &TypeRegistry,
    visiting: &mut Vec<TypeTag>,
) -> WireNode {
    match member {
        MemberDescriptor::Constructor(group)
        | MemberDescriptor::Method(group)
        | MemberDescriptor::IndexerGet(group)
        | MemberDescriptor::IndexerSet(group) => export_group(set, member, group),
        MemberDescriptor::Property(accessor) | MemberDescriptor::Field(accessor) => {
            export_accessor(set, member, accessor)
        }
        MemberDescriptor::NestedType(nested) => {
            if visiting.contains(&nested.tag) {
                return WireNode::from(format!("recursive nested type : {}", nested.name));
            }
            match registry.built_descriptor(nested.tag) {
                Some(nested_set) => export_set(&nested_set, registry, visiting),
                None => WireNode::from(format!("nested type not yet built : {}", nested.name)),
            }
        }
        MemberDescriptor::Event(_) => {
            WireNode::from(format!("unsupported member type : {}", member.wire_class()))
        }
    }
}

fn export_group(set: &DescriptorSet, member: &MemberDescriptor, group: &OverloadGroup) -> WireNode {
    let mut node = WireNode::table();
    node.set("class", member.wire_class());
    node.set("name", group.name());
    node.set("decltype", set.name());
    node.set("static", group.is_static());
    let mut overloads = WireNode::table();
    for candidate in group.candidates() {
        overloads.set(candidate.signature(), export_candidate(candidate));
    }
    node.set("overloads", overloads);
    node
}

fn export_candidate(candidate: &OverloadCandidate) -> WireNode {
    let mut node = WireNode::table();
    node.set("class", "MethodMemberDescriptor");
    node.set("name", candidate.name());
    node.set("static", candidate.is_static());
    node.set("visibility", candidate.access().as_str());
    node.set("decltype", candidate.declaring_type());
    node.set("ret", candidate.return_arity());
    let mut params = WireNode::table();
    for (i, p) in candidate.params().iter().enumerate() {
        params.set(format!("{:02}", i + 1), export_param(p));
    }
    node.set("params", params);
    node
}

fn export_param(p: &ParameterDescriptor) -> WireNode {
    let mut node = WireNode::table();
    node.set("name", p.name.as_str());
    node.set("type", p.ty.to_string());
    node.set("ref", p.is_by_ref);
    node.set("varargs", p.is_variadic);
    if let Some(default) = &p.default {
        node.set("default", default.to_string());
    }
    node
}

fn export_accessor(set: &DescriptorSet, member: &MemberDescriptor, a: &AccessorDescriptor) -> WireNode {
    let mut node = WireNode::table();
    node.set("class", member.wire_class());
    node.set("name", a.name.as_str());
    node.set("decltype", set.name());
    node.set("static", a.is_static);
    node.set("visibility", a.access.as_str());
    node.set("read", a.can_read());
    node.set("write", a.can_write());
    node
}
