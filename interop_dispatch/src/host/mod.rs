//! Host-side capability descriptors.
//!
//! Embedding code describes host types here instead of relying on runtime
//! reflection: [`HostType`] for types, [`ExtensionProvider`] for extension
//! methods, [`HostArray`] for N-dimensional arrays.

mod array;
mod extension;
mod shape;
mod type_builder;

pub use array::{
    array_base_shape, array_base_tag, array_shape, array_tag, array_type_name, ArrayBase,
    HostArray,
};
pub(crate) use array::{generic_indexer, ranked_indexer, SynthesizedIndexer};
pub use extension::{ExtensionBuilder, ExtensionMethod, ExtensionProvider};
pub use shape::{
    HostAccessor, HostEvent, HostIndexer, HostMember, HostMethod, HostTypeShape, MemberMarkers,
    NestedShape, ShapeFactory, TypeKind,
};
pub use type_builder::{
    describe_type, HostType, MemberOptions, TypeBuilder, EXPLICIT_CONVERSION, IMPLICIT_CONVERSION,
};
