//! Dynamic value model for host interop dispatch
//!
//! This crate holds the types shared between a script runtime and the
//! host-interop dispatcher. It includes:
//!
//! - `DynamicValue` enum for script-side values
//! - `TypeTag` and `UserData` for host object handles
//! - `RuntimeError` for errors raised by host invokers
//! - Dense N-dimensional array storage
//! - Conversions between dynamic values and host primitives

pub mod array;
pub mod convert;
pub mod error;
pub mod value;

/// Prelude module for convenient imports
///
/// # Example
/// ```
/// use interop_dispatch_runtime::prelude::*;
/// ```
pub mod prelude {
    pub use super::array::DenseArray;
    pub use super::convert::{FromDynamic, IntoDynamic};
    pub use super::error::{RuntimeError, RuntimeResult};
    pub use super::value::{DynamicValue, HostRef, OpaqueRef, TypeTag, UserData, ValueKind};
}

pub use prelude::*;
