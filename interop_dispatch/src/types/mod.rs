//! Core types shared by the descriptor builder and the dispatcher.

mod build_error;
mod call_site;
mod dispatch_error;
mod meta_name;
mod param_type;
mod policy;

pub use build_error::BuildError;
pub use call_site::{ArgShape, ArgumentShape, CallDescription, CallStyle, ReceiverKind};
pub use dispatch_error::ResolveError;
pub use meta_name::MetaName;
pub use param_type::{
    short_type_name, IdentityRelation, ParamType, TypeRelation, RANK_EXACT, RANK_NUMERIC,
    RANK_REFERENCE,
};
pub use policy::{StaticFallback, VisibilityPolicy};
