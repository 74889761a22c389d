//! Member descriptors and the builder that produces them.
//!
//! A [`DescriptorSet`] is the capability table of one host type: its
//! members by script name, its meta-name bindings, and the call-site cache
//! used when resolving its overload groups.

mod build;
mod candidate;
mod member;
mod parameter;
mod set;

pub use build::{
    conversion_name, BuiltDescriptors, DescriptorBuilder, CONSTRUCTOR_NAME, INDEXER_GET_NAME,
    INDEXER_HIDE_TOKEN, INDEXER_SET_NAME,
};
pub use candidate::{CallFrame, CandidateKind, Getter, Invoker, OverloadCandidate, Setter};
pub use member::{
    Access, AccessorDescriptor, EventDescriptor, MemberDescriptor, NestedTypeDescriptor, OverloadGroup,
    Visibility,
};
pub use parameter::{param, validate_parameters, ParameterDescriptor};
pub use set::{DescriptorSet, ExtensionTable};
