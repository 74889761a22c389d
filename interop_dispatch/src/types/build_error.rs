//! Errors raised while turning a host type shape into descriptors.

use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    /// A member uses a construct the dispatcher cannot call.
    /// The member is omitted; the rest of the type still builds.
    #[error("UnsupportedMemberShape: {type_name}.{member}: {reason}")]
    UnsupportedMemberShape {
        type_name: String,
        member: String,
        reason: String,
    },

    /// Parameter list breaks the variadic/default/by-ref rules.
    #[error("InvalidParameterList: {type_name}.{member}: {reason}")]
    InvalidParameterList {
        type_name: String,
        member: String,
        reason: String,
    },

    /// Two non-overloadable members share a script name.
    #[error("DuplicateMember: {type_name}.{member} is already defined as a {existing}")]
    DuplicateMember {
        type_name: String,
        member: String,
        existing: &'static str,
    },

    /// The registration policy forbids building descriptors for this type.
    #[error("ReflectionNotAllowed: {type_name} is registered with the no-reflection policy")]
    ReflectionNotAllowed { type_name: String },
}

impl BuildError {
    pub fn unsupported(
        type_name: impl Into<String>,
        member: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        BuildError::UnsupportedMemberShape {
            type_name: type_name.into(),
            member: member.into(),
            reason: reason.into(),
        }
    }
}
