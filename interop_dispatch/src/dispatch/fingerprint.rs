//! Argument-shape fingerprints keying the call-site cache.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use interop_dispatch_runtime::DynamicValue;

use crate::types::{ArgShape, CallStyle, ReceiverKind};

/// Coarse summary of a call: member, style, receiver kind, argument count,
/// and each argument's kind (plus tag and facade flag for userdata).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CallFingerprint(u64);

impl CallFingerprint {
    pub fn compute(
        member: &str,
        style: CallStyle,
        receiver: ReceiverKind,
        args: &[DynamicValue],
    ) -> Self {
        let mut hasher = DefaultHasher::new();
        member.hash(&mut hasher);
        style.hash(&mut hasher);
        receiver.hash(&mut hasher);
        args.len().hash(&mut hasher);
        for arg in args {
            ArgShape::of(arg).hash(&mut hasher);
        }
        CallFingerprint(hasher.finish())
    }

    pub fn raw(self) -> u64 {
        self.0
    }
}
