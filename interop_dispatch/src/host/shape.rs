//! Introspection contract consumed by the descriptor builder.
//!
//! A `HostTypeShape` is the enumerable member set of one host type, with
//! every visibility, hide and meta-name marker attached. Embedding code
//! usually produces it through [`TypeBuilder`](super::TypeBuilder), but any
//! producer works: the builder depends only on this data.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use interop_dispatch_runtime::TypeTag;

use crate::descriptor::{Getter, Invoker, ParameterDescriptor, Setter};
use crate::types::{MetaName, ParamType};

/// Broad category of a host type.
#[derive(Debug, Clone, PartialEq)]
pub enum TypeKind {
    Class,
    /// Gets a synthesized default constructor when none is declared
    ValueType,
    /// Never exposes constructors
    Delegate,
    /// N-dimensional array; indexers are synthesized
    Array { element: ParamType, rank: usize },
    /// Supertype of every array; gets rank-agnostic indexers
    ArrayBase,
}

impl TypeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TypeKind::Class => "class",
            TypeKind::ValueType => "value type",
            TypeKind::Delegate => "delegate",
            TypeKind::Array { .. } => "array",
            TypeKind::ArrayBase => "array base",
        }
    }
}

/// Markers attached to one member.
#[derive(Debug, Clone, Default)]
pub struct MemberMarkers {
    /// Explicit visibility override: `Some(true)` visible, `Some(false)` hidden
    pub visible: Option<bool>,
    pub non_public: bool,
    pub meta_names: Vec<MetaName>,
    /// Compiler-generated or operator name
    pub special_name: bool,
    /// Reason the member cannot be called, if any
    pub unsupported: Option<String>,
    /// Unbound generic definition
    pub generic_definition: bool,
}

impl MemberMarkers {
    /// Whether the member would be created, ignoring type-level rules.
    pub fn creates_member(&self) -> bool {
        self.visible.unwrap_or(!self.non_public)
    }
}

#[derive(Debug, Clone)]
pub struct HostMethod {
    pub name: String,
    pub is_static: bool,
    pub params: Vec<ParameterDescriptor>,
    pub return_arity: usize,
    pub invoker: Invoker,
    /// Target type of a conversion operator
    pub conversion_target: Option<ParamType>,
    pub markers: MemberMarkers,
}

#[derive(Debug, Clone)]
pub struct HostAccessor {
    pub name: String,
    pub is_static: bool,
    pub getter: Option<Getter>,
    pub setter: Option<Setter>,
    pub markers: MemberMarkers,
}

#[derive(Debug, Clone)]
pub struct HostEvent {
    pub name: String,
    pub is_static: bool,
    pub add: Setter,
    pub remove: Setter,
    pub markers: MemberMarkers,
}

/// Property with index parameters.
#[derive(Debug, Clone)]
pub struct HostIndexer {
    pub getter: Option<HostMethod>,
    pub setter: Option<HostMethod>,
    pub markers: MemberMarkers,
}

#[derive(Debug, Clone)]
pub enum HostMember {
    Constructor(HostMethod),
    Method(HostMethod),
    Property(HostAccessor),
    Field(HostAccessor),
    Event(HostEvent),
    Indexer(HostIndexer),
}

impl HostMember {
    pub fn name(&self) -> &str {
        match self {
            HostMember::Constructor(m) | HostMember::Method(m) => &m.name,
            HostMember::Property(a) | HostMember::Field(a) => &a.name,
            HostMember::Event(e) => &e.name,
            HostMember::Indexer(_) => "[this]",
        }
    }

    pub fn markers(&self) -> &MemberMarkers {
        match self {
            HostMember::Constructor(m) | HostMember::Method(m) => &m.markers,
            HostMember::Property(a) | HostMember::Field(a) => &a.markers,
            HostMember::Event(e) => &e.markers,
            HostMember::Indexer(i) => &i.markers,
        }
    }
}

/// Produces a shape on demand; used for lazy (nested) registration.
#[derive(Clone)]
pub struct ShapeFactory(Arc<dyn Fn() -> HostTypeShape + Send + Sync>);

impl ShapeFactory {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn() -> HostTypeShape + Send + Sync + 'static,
    {
        ShapeFactory(Arc::new(f))
    }

    pub fn shape(&self) -> HostTypeShape {
        (self.0)()
    }
}

impl fmt::Debug for ShapeFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ShapeFactory")
    }
}

#[derive(Debug, Clone)]
pub struct NestedShape {
    pub name: String,
    pub tag: TypeTag,
    pub factory: ShapeFactory,
    pub markers: MemberMarkers,
}

/// Enumerable member set of one host type.
#[derive(Debug, Clone)]
pub struct HostTypeShape {
    pub tag: TypeTag,
    pub name: String,
    pub kind: TypeKind,
    /// Class-level default visibility marker, if present
    pub default_visibility: Option<bool>,
    pub hide_list: BTreeSet<String>,
    /// Base types and interfaces values of this type may be passed as
    pub supertypes: Vec<TypeTag>,
    /// Engine-owned type; excluded from wiring
    pub internal: bool,
    /// Not public on the host side
    pub non_public: bool,
    pub members: Vec<HostMember>,
    pub nested: Vec<NestedShape>,
    /// Zero-argument constructor for value types
    pub default_constructor: Option<Invoker>,
}

impl HostTypeShape {
    pub fn new(tag: TypeTag, name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            tag,
            name: name.into(),
            kind,
            default_visibility: None,
            hide_list: BTreeSet::new(),
            supertypes: Vec::new(),
            internal: false,
            non_public: false,
            members: Vec::new(),
            nested: Vec::new(),
            default_constructor: None,
        }
    }

    pub fn has_constructors(&self) -> bool {
        self.members
            .iter()
            .any(|m| matches!(m, HostMember::Constructor(_)))
    }
}
