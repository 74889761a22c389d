//! Top-level error type of the dispatcher.

use interop_dispatch_runtime::{RuntimeError, TypeTag};
use thiserror::Error;

use crate::config::ConfigError;
use crate::types::{BuildError, ResolveError};

#[derive(Debug, Error)]
pub enum InteropError {
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("UnregisteredType: no descriptors registered for type {0}")]
    UnregisteredType(TypeTag),

    #[error("MemberNotFound: {type_name} has no member '{member}'")]
    MemberNotFound { type_name: String, member: String },

    #[error("MemberKindMismatch: {type_name}.{member} is a {actual}, expected a {expected}")]
    MemberKindMismatch {
        type_name: String,
        member: String,
        expected: &'static str,
        actual: &'static str,
    },

    #[error("ReadOnlyMember: {type_name}.{member} cannot be assigned")]
    ReadOnlyMember { type_name: String, member: String },

    #[error("WriteOnlyMember: {type_name}.{member} cannot be read")]
    WriteOnlyMember { type_name: String, member: String },

    #[error("NotAnInstance: {type_name}.{member} needs an instance receiver")]
    NotAnInstance { type_name: String, member: String },
}

pub type InteropResult<T> = Result<T, InteropError>;

impl InteropError {
    pub(crate) fn member_not_found(type_name: &str, member: &str) -> Self {
        InteropError::MemberNotFound {
            type_name: type_name.to_string(),
            member: member.to_string(),
        }
    }

    /// Resolver failure, if this is one.
    pub fn as_resolve(&self) -> Option<&ResolveError> {
        match self {
            InteropError::Resolve(e) => Some(e),
            _ => None,
        }
    }
}
