//! Formal parameter model.

use std::fmt;

use interop_dispatch_runtime::DynamicValue;

use crate::types::ParamType;

/// One formal parameter of a host member.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterDescriptor {
    pub name: String,
    pub ty: ParamType,
    /// Value used when the caller omits this parameter
    pub default: Option<DynamicValue>,
    /// Rest parameter; collects all remaining arguments
    pub is_variadic: bool,
    /// Final value is returned to the caller as an extra result
    pub is_by_ref: bool,
}

/// Shorthand for a required positional parameter.
pub fn param(name: impl Into<String>, ty: ParamType) -> ParameterDescriptor {
    ParameterDescriptor::new(name, ty)
}

impl ParameterDescriptor {
    pub fn new(name: impl Into<String>, ty: ParamType) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
            is_variadic: false,
            is_by_ref: false,
        }
    }

    pub fn with_default(mut self, value: impl Into<DynamicValue>) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Optional parameter defaulting to nil.
    pub fn optional(self) -> Self {
        self.with_default(DynamicValue::Nil)
    }

    /// Rest parameter; `ty` is the element type of each extra argument.
    pub fn variadic(mut self) -> Self {
        self.is_variadic = true;
        self
    }

    pub fn by_ref(mut self) -> Self {
        self.is_by_ref = true;
        self
    }

    pub fn has_default(&self) -> bool {
        self.default.is_some()
    }
}

impl fmt::Display for ParameterDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_by_ref {
            write!(f, "ref ")?;
        }
        write!(f, "{} {}", self.ty, self.name)?;
        if self.is_variadic {
            write!(f, "...")?;
        }
        if let Some(default) = &self.default {
            match default {
                DynamicValue::Nil => write!(f, " = nil")?,
                DynamicValue::String(s) => write!(f, " = {:?}", s)?,
                other => write!(f, " = {}", other)?,
            }
        }
        Ok(())
    }
}

/// Check the structural rules of a parameter list.
///
/// Only the last parameter may be variadic, and it may neither have a
/// default nor be by-ref. Once a parameter has a default every following
/// fixed parameter needs one too.
pub fn validate_parameters(params: &[ParameterDescriptor]) -> Result<(), String> {
    let mut seen_default = false;
    for (i, p) in params.iter().enumerate() {
        if p.is_variadic {
            if i + 1 != params.len() {
                return Err(format!("variadic parameter '{}' is not last", p.name));
            }
            if p.has_default() {
                return Err(format!("variadic parameter '{}' has a default", p.name));
            }
            if p.is_by_ref {
                return Err(format!("variadic parameter '{}' is by-ref", p.name));
            }
            continue;
        }
        if p.has_default() {
            seen_default = true;
        } else if seen_default {
            return Err(format!(
                "required parameter '{}' follows an optional one",
                p.name
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_variadic_rules() {
        let ok = vec![param("fmt", ParamType::String), param("args", ParamType::Any).variadic()];
        assert!(validate_parameters(&ok).is_ok());

        let not_last = vec![param("args", ParamType::Any).variadic(), param("x", ParamType::Int32)];
        assert!(validate_parameters(&not_last).is_err());

        let defaulted = vec![param("args", ParamType::Any).variadic().optional()];
        assert!(validate_parameters(&defaulted).is_err());

        let by_ref = vec![param("args", ParamType::Any).variadic().by_ref()];
        assert!(validate_parameters(&by_ref).is_err());
    }

    #[test]
    fn test_validate_default_ordering() {
        let ok = vec![
            param("d", ParamType::Float64),
            param("s", ParamType::String).optional(),
            param("n", ParamType::Int32).with_default(5),
        ];
        assert!(validate_parameters(&ok).is_ok());

        let bad = vec![param("s", ParamType::String).optional(), param("d", ParamType::Float64)];
        assert!(validate_parameters(&bad).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(
            param("n", ParamType::Int32).with_default(5).to_string(),
            "Int32 n = 5"
        );
        assert_eq!(
            param("out", ParamType::String).by_ref().to_string(),
            "ref String out"
        );
        assert_eq!(param("rest", ParamType::Any).variadic().to_string(), "Object rest...");
    }
}
