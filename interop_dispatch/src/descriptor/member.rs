//! Member descriptors exposed on a descriptor set.

use std::sync::Arc;

use interop_dispatch_runtime::TypeTag;

use super::candidate::{Getter, OverloadCandidate, Setter};

/// Whether a member reaches scripts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Visibility {
    Public,
    Hidden,
}

/// Declared host access of a type or member, as shown to tooling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Access {
    #[default]
    Public,
    /// Not public on the host side; reachable only through a visibility marker
    NonPublic,
}

impl Access {
    pub fn from_non_public(non_public: bool) -> Self {
        if non_public {
            Access::NonPublic
        } else {
            Access::Public
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Access::Public => "public",
            Access::NonPublic => "internal",
        }
    }
}

/// Candidates sharing one callable name.
#[derive(Debug, Clone)]
pub struct OverloadGroup {
    name: String,
    candidates: Vec<Arc<OverloadCandidate>>,
}

impl OverloadGroup {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            candidates: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn candidates(&self) -> &[Arc<OverloadCandidate>] {
        &self.candidates
    }

    pub fn push(&mut self, candidate: Arc<OverloadCandidate>) {
        self.candidates.push(candidate);
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }

    /// True when every candidate is static.
    pub fn is_static(&self) -> bool {
        self.candidates.iter().all(|c| c.is_static())
    }
}

/// Property or field: a single, non-overloaded accessor pair.
#[derive(Debug, Clone)]
pub struct AccessorDescriptor {
    pub name: String,
    pub is_static: bool,
    pub access: Access,
    pub getter: Option<Getter>,
    pub setter: Option<Setter>,
}

impl AccessorDescriptor {
    pub fn can_read(&self) -> bool {
        self.getter.is_some()
    }

    pub fn can_write(&self) -> bool {
        self.setter.is_some()
    }
}

#[derive(Debug, Clone)]
pub struct EventDescriptor {
    pub name: String,
    pub is_static: bool,
    pub add: Setter,
    pub remove: Setter,
}

/// Nested host type, reachable as a static facade.
#[derive(Debug, Clone)]
pub struct NestedTypeDescriptor {
    pub name: String,
    pub tag: TypeTag,
}

#[derive(Debug, Clone)]
pub enum MemberDescriptor {
    Constructor(OverloadGroup),
    Method(OverloadGroup),
    Property(AccessorDescriptor),
    Field(AccessorDescriptor),
    Event(EventDescriptor),
    NestedType(NestedTypeDescriptor),
    IndexerGet(OverloadGroup),
    IndexerSet(OverloadGroup),
}

impl MemberDescriptor {
    pub fn name(&self) -> &str {
        match self {
            MemberDescriptor::Constructor(g)
            | MemberDescriptor::Method(g)
            | MemberDescriptor::IndexerGet(g)
            | MemberDescriptor::IndexerSet(g) => g.name(),
            MemberDescriptor::Property(a) | MemberDescriptor::Field(a) => &a.name,
            MemberDescriptor::Event(e) => &e.name,
            MemberDescriptor::NestedType(n) => &n.name,
        }
    }

    pub fn is_static(&self) -> bool {
        match self {
            MemberDescriptor::Constructor(_) | MemberDescriptor::NestedType(_) => true,
            MemberDescriptor::Method(g)
            | MemberDescriptor::IndexerGet(g)
            | MemberDescriptor::IndexerSet(g) => g.is_static(),
            MemberDescriptor::Property(a) | MemberDescriptor::Field(a) => a.is_static,
            MemberDescriptor::Event(e) => e.is_static,
        }
    }

    /// Members stored on a set have already passed visibility resolution.
    pub fn visibility(&self) -> Visibility {
        Visibility::Public
    }

    /// Overload group behind callable members.
    pub fn as_overloads(&self) -> Option<&OverloadGroup> {
        match self {
            MemberDescriptor::Constructor(g)
            | MemberDescriptor::Method(g)
            | MemberDescriptor::IndexerGet(g)
            | MemberDescriptor::IndexerSet(g) => Some(g),
            _ => None,
        }
    }

    /// Kind label used in diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            MemberDescriptor::Constructor(_) => "constructor",
            MemberDescriptor::Method(_) => "method",
            MemberDescriptor::Property(_) => "property",
            MemberDescriptor::Field(_) => "field",
            MemberDescriptor::Event(_) => "event",
            MemberDescriptor::NestedType(_) => "nested type",
            MemberDescriptor::IndexerGet(_) => "indexer getter",
            MemberDescriptor::IndexerSet(_) => "indexer setter",
        }
    }

    /// Descriptor class name used by the wiring exporter.
    pub fn wire_class(&self) -> &'static str {
        match self {
            MemberDescriptor::Constructor(_)
            | MemberDescriptor::Method(_)
            | MemberDescriptor::IndexerGet(_)
            | MemberDescriptor::IndexerSet(_) => "OverloadedMethodMemberDescriptor",
            MemberDescriptor::Property(_) => "PropertyMemberDescriptor",
            MemberDescriptor::Field(_) => "FieldMemberDescriptor",
            MemberDescriptor::Event(_) => "EventDescriptor",
            MemberDescriptor::NestedType(_) => "NestedTypeDescriptor",
        }
    }
}
