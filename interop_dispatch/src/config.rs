//! Dispatcher configuration.
//!
//! Loaded from defaults, a TOML document, or environment variables:
//!
//! - `INTEROP_DISABLE_CALL_CACHE`: any value disables the call-site cache
//! - `INTEROP_STATIC_FALLBACK`: `never`, `no-instance` or `always`
//! - `INTEROP_DEFAULT_POLICY`: `standard` or `opt-in`

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::dispatch::{CacheSettings, DEFAULT_CACHE_CAPACITY};
use crate::types::{StaticFallback, VisibilityPolicy};

pub const ENV_DISABLE_CALL_CACHE: &str = "INTEROP_DISABLE_CALL_CACHE";
pub const ENV_STATIC_FALLBACK: &str = "INTEROP_STATIC_FALLBACK";
pub const ENV_DEFAULT_POLICY: &str = "INTEROP_DEFAULT_POLICY";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid interop config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid value {value:?} for {key}")]
    InvalidValue { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InteropConfig {
    /// Policy applied to registrations that pass `VisibilityPolicy::Default`
    pub default_policy: VisibilityPolicy,
    pub static_fallback: StaticFallback,
    pub call_cache: bool,
    pub call_cache_capacity: usize,
    /// Register array receivers on first use
    pub auto_register_arrays: bool,
}

impl Default for InteropConfig {
    fn default() -> Self {
        Self {
            default_policy: VisibilityPolicy::Standard,
            static_fallback: StaticFallback::WhenNoInstanceViable,
            call_cache: true,
            call_cache_capacity: DEFAULT_CACHE_CAPACITY,
            auto_register_arrays: true,
        }
    }
}

impl InteropConfig {
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(s)?)
    }

    /// Defaults overridden by `INTEROP_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from a key lookup (the environment, in `from_env`).
    pub fn with_overrides<F>(mut self, lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if lookup(ENV_DISABLE_CALL_CACHE).is_some() {
            self.call_cache = false;
        }
        if let Some(value) = lookup(ENV_STATIC_FALLBACK) {
            self.static_fallback =
                StaticFallback::parse(&value).ok_or(ConfigError::InvalidValue {
                    key: ENV_STATIC_FALLBACK,
                    value,
                })?;
        }
        if let Some(value) = lookup(ENV_DEFAULT_POLICY) {
            self.default_policy = match VisibilityPolicy::parse(&value) {
                Some(policy @ (VisibilityPolicy::Standard | VisibilityPolicy::OptIn)) => policy,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        key: ENV_DEFAULT_POLICY,
                        value,
                    })
                }
            };
        }
        Ok(self)
    }

    pub fn cache_settings(&self) -> CacheSettings {
        CacheSettings {
            enabled: self.call_cache,
            capacity: self.call_cache_capacity.max(1),
        }
    }
}
