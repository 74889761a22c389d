//! Host-interop dispatch engine
//!
//! Lets script code call into statically typed host objects. Host types
//! describe their members through [`host::HostType`]; the
//! [`descriptor::DescriptorBuilder`] turns that description into a
//! [`descriptor::DescriptorSet`], and the [`dispatch::Dispatcher`] maps each
//! dynamically typed call onto exactly one host member, remembering the
//! decision per argument shape.
//!
//! - `types`: parameter types, call-site description, error taxonomy
//! - `descriptor`: member descriptors and the descriptor builder
//! - `host`: capability description of host types, extension methods, arrays
//! - `dispatch`: overload resolver, call-site cache, dispatcher
//! - `registry`: per-type descriptor ownership and lifetime
//! - `export`: wiring snapshot for tooling
//! - `config`: engine configuration
//!
//! # Example
//! ```
//! use std::sync::Arc;
//! use interop_dispatch::prelude::*;
//!
//! struct Greeter;
//!
//! impl HostType for Greeter {
//!     fn describe(ty: &mut TypeBuilder<Self>) {
//!         ty.method("Greet", vec![param("who", ParamType::String)], |_, frame| {
//!             let who: String = frame.get(0)?;
//!             Ok(DynamicValue::from(format!("hello, {}", who)))
//!         });
//!     }
//! }
//!
//! let registry = Arc::new(TypeRegistry::default());
//! registry.register::<Greeter>(VisibilityPolicy::Default).unwrap();
//! let dispatcher = Dispatcher::new(registry);
//!
//! let greeter = UserData::new(Greeter);
//! let out = dispatcher
//!     .call(&greeter, CallStyle::Instance, "Greet", &[DynamicValue::from("moon")])
//!     .unwrap();
//! assert_eq!(out, DynamicValue::from("hello, moon"));
//! ```

// Prevent accidental debug output in library code.
#![deny(clippy::print_stderr)]
#![deny(clippy::print_stdout)]

pub mod config;
pub mod descriptor;
pub mod dispatch;
pub mod error;
pub mod export;
pub mod host;
pub mod registry;
pub mod types;

pub use config::{ConfigError, InteropConfig};
pub use dispatch::Dispatcher;
pub use error::{InteropError, InteropResult};
pub use export::{export, WireNode};
pub use registry::{RegistrationHandle, TypeRegistry};

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::InteropConfig;
    pub use crate::descriptor::{param, CallFrame, ParameterDescriptor};
    pub use crate::dispatch::Dispatcher;
    pub use crate::error::{InteropError, InteropResult};
    pub use crate::host::{
        ExtensionBuilder, ExtensionProvider, HostArray, HostType, TypeBuilder,
    };
    pub use crate::registry::{RegistrationHandle, TypeRegistry};
    pub use crate::types::{CallStyle, MetaName, ParamType, StaticFallback, VisibilityPolicy};
    pub use interop_dispatch_runtime::prelude::*;
}
