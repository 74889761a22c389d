//! Overload resolution.
//!
//! Candidates are split into classes by call style first. The primary
//! class is scored; static candidates reached through an instance-style call
//! on an object form a fallback class tried according to
//! [`StaticFallback`]. Candidates that could only be reached with the other
//! call style are kept aside to tell a style mismatch apart from a plain
//! type mismatch.

use std::fmt;
use std::sync::Arc;

use interop_dispatch_runtime::{DynamicValue, RuntimeResult, TypeTag, UserData};

use crate::descriptor::{CandidateKind, OverloadCandidate};
use crate::types::{
    ArgumentShape, CallDescription, CallStyle, ReceiverKind, ResolveError, StaticFallback,
    TypeRelation, RANK_NUMERIC,
};

/// Where the selected candidate takes its receiver from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverBinding {
    /// Static candidate: no receiver
    None,
    /// Instance-style call: the call's receiver
    Receiver,
    /// Dot-style call through an object: the first argument
    FirstArgument,
}

/// A selected candidate and how to bind it.
#[derive(Debug, Clone)]
pub struct Resolution {
    pub candidate: Arc<OverloadCandidate>,
    pub binding: ReceiverBinding,
}

impl Resolution {
    /// Arguments the candidate's parameters bind to.
    pub fn effective_args<'a>(&self, args: &'a [DynamicValue]) -> &'a [DynamicValue] {
        match self.binding {
            ReceiverBinding::FirstArgument => args.get(1..).unwrap_or(&[]),
            _ => args,
        }
    }

    /// Cheap re-check used on cache hits.
    pub(crate) fn revalidate(&self, args: &[DynamicValue]) -> bool {
        match self.binding {
            ReceiverBinding::FirstArgument => {
                first_instance(args).is_some() && self.candidate.accepts_arity(args.len() - 1)
            }
            _ => self.candidate.accepts_arity(args.len()),
        }
    }

    pub fn invoke(&self, receiver: &UserData, args: &[DynamicValue]) -> RuntimeResult<DynamicValue> {
        match self.binding {
            ReceiverBinding::None => self.candidate.invoke(None, args),
            ReceiverBinding::Receiver => self.candidate.invoke(Some(receiver), args),
            ReceiverBinding::FirstArgument => self
                .candidate
                .invoke(first_instance(args), self.effective_args(args)),
        }
    }
}

fn first_instance(args: &[DynamicValue]) -> Option<&UserData> {
    args.first()
        .and_then(|a| a.scalar().as_user_data())
        .filter(|ud| !ud.is_static_facade())
}

/// Call style and receiver of one invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallSite {
    pub style: CallStyle,
    pub receiver: ReceiverKind,
}

impl CallSite {
    pub fn new(style: CallStyle, receiver: ReceiverKind) -> Self {
        Self { style, receiver }
    }
}

/// Ordering key of a viable candidate; lower is better.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct MatchKey {
    total_rank: u32,
    /// Needed defaults or a variadic tail to fit the argument count
    inexact_arity: bool,
    variadic: bool,
    numeric_conversions: u32,
    by_ref: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Class {
    Primary(ReceiverBinding),
    Fallback,
    Mismatch,
}

/// Selects one candidate for a call.
pub struct OverloadResolver<'r> {
    relation: &'r dyn TypeRelation,
    declaring: TypeTag,
    static_fallback: StaticFallback,
}

impl fmt::Debug for OverloadResolver<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OverloadResolver")
            .field("declaring", &self.declaring)
            .field("static_fallback", &self.static_fallback)
            .finish()
    }
}

impl<'r> OverloadResolver<'r> {
    /// `declaring` is the type whose members are being resolved.
    pub fn new(
        relation: &'r dyn TypeRelation,
        declaring: TypeTag,
        static_fallback: StaticFallback,
    ) -> Self {
        Self {
            relation,
            declaring,
            static_fallback,
        }
    }

    fn classify(
        &self,
        candidate: &OverloadCandidate,
        site: CallSite,
        args: &[DynamicValue],
    ) -> Class {
        match candidate.kind() {
            CandidateKind::Static => match (site.style, site.receiver) {
                (CallStyle::Instance, ReceiverKind::Instance) => match self.static_fallback {
                    StaticFallback::Never => Class::Mismatch,
                    StaticFallback::WhenNoInstanceViable => Class::Fallback,
                    StaticFallback::Always => Class::Primary(ReceiverBinding::None),
                },
                _ => Class::Primary(ReceiverBinding::None),
            },
            CandidateKind::Instance | CandidateKind::Extension => match (site.style, site.receiver) {
                // A facade has no object, whatever the arguments hold.
                (_, ReceiverKind::StaticFacade) => Class::Mismatch,
                (CallStyle::Instance, ReceiverKind::Instance) => {
                    Class::Primary(ReceiverBinding::Receiver)
                }
                (CallStyle::Static, ReceiverKind::Instance) => match first_instance(args) {
                    Some(ud)
                        if ud.tag() == self.declaring
                            || self.relation.is_assignable(ud.tag(), self.declaring) =>
                    {
                        Class::Primary(ReceiverBinding::FirstArgument)
                    }
                    _ => Class::Mismatch,
                },
            },
        }
    }

    /// Score `candidate` against `args`; `None` when not viable.
    fn score(&self, candidate: &OverloadCandidate, args: &[DynamicValue]) -> Option<MatchKey> {
        let argc = args.len();
        if !candidate.accepts_arity(argc) {
            return None;
        }
        let params = candidate.params();
        let fixed = candidate.fixed_arity();
        let mut total_rank = 0u32;
        let mut numeric_conversions = 0u32;
        for (i, arg) in args.iter().enumerate() {
            // Past the fixed parameters only a variadic tail can be left.
            let param = &params[i.min(params.len() - 1)];
            let rank = param.ty.conversion_rank(arg, self.relation)?;
            total_rank += u32::from(rank);
            if rank == RANK_NUMERIC {
                numeric_conversions += 1;
            }
        }
        Some(MatchKey {
            total_rank,
            inexact_arity: argc != fixed,
            variadic: candidate.is_variadic(),
            numeric_conversions,
            by_ref: candidate.by_ref_count(),
        })
    }

    /// Pick the best viable candidate among `class`; `Ok(None)` if none.
    fn select(
        &self,
        candidates: &[(&Arc<OverloadCandidate>, ReceiverBinding)],
        args: &[DynamicValue],
        call: impl FnOnce() -> CallDescription,
    ) -> Result<Option<Resolution>, ResolveError> {
        let mut best: Option<MatchKey> = None;
        let mut tied: Vec<(&Arc<OverloadCandidate>, ReceiverBinding)> = Vec::new();
        for &(candidate, binding) in candidates {
            let effective = match binding {
                ReceiverBinding::FirstArgument => args.get(1..).unwrap_or(&[]),
                _ => args,
            };
            let Some(key) = self.score(candidate, effective) else {
                continue;
            };
            match best {
                Some(b) if key > b => {}
                Some(b) if key == b => tied.push((candidate, binding)),
                _ => {
                    best = Some(key);
                    tied.clear();
                    tied.push((candidate, binding));
                }
            }
        }
        match tied.as_slice() {
            [] => Ok(None),
            [(candidate, binding)] => Ok(Some(Resolution {
                candidate: Arc::clone(candidate),
                binding: *binding,
            })),
            many => Err(ResolveError::AmbiguousCandidates {
                call: call(),
                candidates: many.iter().map(|(c, _)| c.signature()).collect(),
            }),
        }
    }

    pub fn resolve(
        &self,
        name: &str,
        candidates: &[Arc<OverloadCandidate>],
        site: CallSite,
        args: &[DynamicValue],
    ) -> Result<Resolution, ResolveError> {
        let describe = || CallDescription {
            member: name.to_string(),
            style: site.style,
            receiver: site.receiver,
            args: ArgumentShape::of(args),
        };

        let mut primary = Vec::new();
        let mut fallback = Vec::new();
        let mut mismatched = Vec::new();
        for candidate in candidates {
            match self.classify(candidate, site, args) {
                Class::Primary(binding) => primary.push((candidate, binding)),
                Class::Fallback => fallback.push((candidate, ReceiverBinding::None)),
                Class::Mismatch => mismatched.push(candidate),
            }
        }

        let resolved = match self.select(&primary, args, describe)? {
            Some(resolution) => Some(resolution),
            None => self.select(&fallback, args, describe)?,
        };
        if let Some(resolution) = resolved {
            tracing::trace!(
                target: "interop.dispatch",
                member = name,
                candidate = %resolution.candidate.signature(),
                "resolved overload"
            );
            return Ok(resolution);
        }

        // Would a candidate have accepted the arguments with the other style?
        let reachable_otherwise = mismatched.iter().find(|c| {
            let effective = match (site.style, first_instance(args)) {
                (CallStyle::Static, Some(_)) if !c.is_static() => args.get(1..).unwrap_or(&[]),
                _ => args,
            };
            self.score(c, effective).is_some()
        });
        match reachable_otherwise {
            Some(candidate) => Err(ResolveError::StaticInstanceMismatch {
                call: describe(),
                candidate: candidate.signature(),
            }),
            None => Err(ResolveError::NoViableCandidate { call: describe() }),
        }
    }
}
