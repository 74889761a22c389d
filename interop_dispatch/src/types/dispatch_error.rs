//! Error types for overload resolution.

use super::call_site::CallDescription;

/// Why a call could not be bound to a single candidate.
#[derive(Debug, Clone, PartialEq)]
pub enum ResolveError {
    /// No candidate accepts the arguments.
    NoViableCandidate { call: CallDescription },
    /// Several candidates tie on every tie-breaker.
    AmbiguousCandidates {
        call: CallDescription,
        candidates: Vec<String>,
    },
    /// A candidate would accept the arguments, but only with the other call
    /// style (instance member through a static facade or the reverse).
    StaticInstanceMismatch {
        call: CallDescription,
        candidate: String,
    },
}

impl ResolveError {
    pub fn call(&self) -> &CallDescription {
        match self {
            ResolveError::NoViableCandidate { call }
            | ResolveError::AmbiguousCandidates { call, .. }
            | ResolveError::StaticInstanceMismatch { call, .. } => call,
        }
    }
}

impl std::fmt::Display for ResolveError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResolveError::NoViableCandidate { call } => {
                write!(f, "NoViableCandidate: no overload matches {}", call)
            }
            ResolveError::AmbiguousCandidates { call, candidates } => {
                let mut msg = format!("AmbiguousCandidates: {} is ambiguous. Candidates:\n", call);
                for sig in candidates {
                    msg.push_str(&format!("  {}\n", sig));
                }
                write!(f, "{}", msg)
            }
            ResolveError::StaticInstanceMismatch { call, candidate } => write!(
                f,
                "StaticInstanceMismatch: {} only matches {} with the other call style",
                call, candidate
            ),
        }
    }
}

impl std::error::Error for ResolveError {}
