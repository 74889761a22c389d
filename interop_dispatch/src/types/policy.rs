//! Registration and resolution policies.

use serde::{Deserialize, Serialize};

/// Which host members become script-visible.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VisibilityPolicy {
    /// Use the registry's configured default
    #[default]
    Default,
    /// Public members, adjusted by visibility markers
    Standard,
    /// Only members explicitly marked visible
    OptIn,
    /// The type may be registered but never introspected
    NoReflection,
}

impl VisibilityPolicy {
    /// Replace `Default` with `fallback` (itself falling back to `Standard`).
    pub fn resolve(self, fallback: VisibilityPolicy) -> VisibilityPolicy {
        match (self, fallback) {
            (VisibilityPolicy::Default, VisibilityPolicy::Default) => VisibilityPolicy::Standard,
            (VisibilityPolicy::Default, other) => other,
            (policy, _) => policy,
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "default" => Some(VisibilityPolicy::Default),
            "standard" => Some(VisibilityPolicy::Standard),
            "opt-in" | "optin" => Some(VisibilityPolicy::OptIn),
            "no-reflection" => Some(VisibilityPolicy::NoReflection),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            VisibilityPolicy::Default => "default",
            VisibilityPolicy::Standard => "standard",
            VisibilityPolicy::OptIn => "opt-in",
            VisibilityPolicy::NoReflection => "no-reflection",
        }
    }
}

/// When static overloads may answer an instance-style call on an object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StaticFallback {
    /// Static overloads never answer instance-style calls on objects
    Never,
    /// Only when no instance or extension overload is viable
    #[default]
    #[serde(rename = "no-instance")]
    WhenNoInstanceViable,
    /// Static overloads compete with instance overloads on equal terms
    Always,
}

impl StaticFallback {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "never" => Some(StaticFallback::Never),
            "no-instance" => Some(StaticFallback::WhenNoInstanceViable),
            "always" => Some(StaticFallback::Always),
            _ => None,
        }
    }
}
