//! Type conversion utilities between dynamic values and host primitives
//!
//! The free functions mirror the conversions the dispatcher's rank table
//! promises: a `Number` converts to any host numeric type as long as the
//! value is integral and in range for integer targets.

// SAFETY: f64→i64 casts are guarded by integral and range checks beforehand.
#![allow(clippy::cast_possible_truncation)]

use crate::error::{RuntimeError, RuntimeResult};
use crate::value::{DynamicValue, UserData};

/// Convert a DynamicValue to i64
pub fn to_i64(value: &DynamicValue) -> RuntimeResult<i64> {
    match value.scalar() {
        DynamicValue::Number(v) => {
            if v.fract() != 0.0 || !v.is_finite() {
                Err(RuntimeError::inexact_error(format!(
                    "cannot convert {} to Int64",
                    v
                )))
            } else if *v < i64::MIN as f64 || *v >= i64::MAX as f64 {
                Err(RuntimeError::overflow_error(format!(
                    "{} is out of range for Int64",
                    v
                )))
            } else {
                Ok(*v as i64)
            }
        }
        other => Err(RuntimeError::type_error(format!(
            "cannot convert {} to Int64",
            other.type_name()
        ))),
    }
}

/// Convert a DynamicValue to i32
pub fn to_i32(value: &DynamicValue) -> RuntimeResult<i32> {
    narrow(to_i64(value)?, "Int32")
}

/// Convert a DynamicValue to f64
pub fn to_f64(value: &DynamicValue) -> RuntimeResult<f64> {
    match value.scalar() {
        DynamicValue::Number(v) => Ok(*v),
        other => Err(RuntimeError::type_error(format!(
            "cannot convert {} to Float64",
            other.type_name()
        ))),
    }
}

/// Convert a DynamicValue to f32
pub fn to_f32(value: &DynamicValue) -> RuntimeResult<f32> {
    to_f64(value).map(|v| v as f32)
}

/// Convert a DynamicValue to bool
pub fn to_bool(value: &DynamicValue) -> RuntimeResult<bool> {
    match value.scalar() {
        DynamicValue::Boolean(v) => Ok(*v),
        other => Err(RuntimeError::type_error(format!(
            "cannot convert {} to Bool",
            other.type_name()
        ))),
    }
}

/// Convert a DynamicValue to a host string.
///
/// Numbers are accepted and formatted the way scripts print them; nil is
/// rejected (use `Option<String>` to accept it).
pub fn to_string(value: &DynamicValue) -> RuntimeResult<String> {
    match value.scalar() {
        DynamicValue::String(s) => Ok(s.clone()),
        n @ DynamicValue::Number(_) => Ok(format!("{}", n)),
        other => Err(RuntimeError::type_error(format!(
            "cannot convert {} to String",
            other.type_name()
        ))),
    }
}

fn narrow<T: TryFrom<i64>>(v: i64, target: &str) -> RuntimeResult<T> {
    T::try_from(v)
        .map_err(|_| RuntimeError::overflow_error(format!("{} is out of range for {}", v, target)))
}

/// Conversion from a dynamic value into a host type.
pub trait FromDynamic: Sized {
    fn from_dynamic(value: &DynamicValue) -> RuntimeResult<Self>;
}

/// Conversion from a host type into a dynamic value.
pub trait IntoDynamic {
    fn into_dynamic(self) -> DynamicValue;
}

macro_rules! impl_from_dynamic_int {
    ($($ty:ty => $name:literal),* $(,)?) => {
        $(
            impl FromDynamic for $ty {
                fn from_dynamic(value: &DynamicValue) -> RuntimeResult<Self> {
                    narrow(to_i64(value)?, $name)
                }
            }

            impl IntoDynamic for $ty {
                fn into_dynamic(self) -> DynamicValue {
                    DynamicValue::Number(self as f64)
                }
            }
        )*
    };
}

impl_from_dynamic_int!(
    i8 => "Int8",
    i16 => "Int16",
    i32 => "Int32",
    u8 => "UInt8",
    u16 => "UInt16",
    u32 => "UInt32",
    u64 => "UInt64",
);

impl FromDynamic for i64 {
    fn from_dynamic(value: &DynamicValue) -> RuntimeResult<Self> {
        to_i64(value)
    }
}

impl IntoDynamic for i64 {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::Number(self as f64)
    }
}

impl FromDynamic for f64 {
    fn from_dynamic(value: &DynamicValue) -> RuntimeResult<Self> {
        to_f64(value)
    }
}

impl IntoDynamic for f64 {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::Number(self)
    }
}

impl FromDynamic for f32 {
    fn from_dynamic(value: &DynamicValue) -> RuntimeResult<Self> {
        to_f32(value)
    }
}

impl IntoDynamic for f32 {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::Number(self as f64)
    }
}

impl FromDynamic for bool {
    fn from_dynamic(value: &DynamicValue) -> RuntimeResult<Self> {
        to_bool(value)
    }
}

impl IntoDynamic for bool {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::Boolean(self)
    }
}

impl FromDynamic for String {
    fn from_dynamic(value: &DynamicValue) -> RuntimeResult<Self> {
        to_string(value)
    }
}

impl IntoDynamic for String {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::String(self)
    }
}

impl IntoDynamic for &str {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::String(self.to_string())
    }
}

impl FromDynamic for DynamicValue {
    fn from_dynamic(value: &DynamicValue) -> RuntimeResult<Self> {
        Ok(value.clone())
    }
}

impl IntoDynamic for DynamicValue {
    fn into_dynamic(self) -> DynamicValue {
        self
    }
}

impl FromDynamic for UserData {
    fn from_dynamic(value: &DynamicValue) -> RuntimeResult<Self> {
        match value.scalar() {
            DynamicValue::UserData(ud) => Ok(ud.clone()),
            other => Err(RuntimeError::type_error(format!(
                "cannot convert {} to userdata",
                other.type_name()
            ))),
        }
    }
}

impl IntoDynamic for UserData {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::UserData(self)
    }
}

impl IntoDynamic for () {
    fn into_dynamic(self) -> DynamicValue {
        DynamicValue::Nil
    }
}

impl<T: FromDynamic> FromDynamic for Option<T> {
    fn from_dynamic(value: &DynamicValue) -> RuntimeResult<Self> {
        if value.scalar().is_nil() {
            Ok(None)
        } else {
            T::from_dynamic(value).map(Some)
        }
    }
}

impl<T: IntoDynamic> IntoDynamic for Option<T> {
    fn into_dynamic(self) -> DynamicValue {
        self.map(IntoDynamic::into_dynamic)
            .unwrap_or(DynamicValue::Nil)
    }
}
