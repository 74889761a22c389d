//! Declared parameter types and the conversion rank table.
//!
//! A `ParamType` is what a host member declares for one of its parameters.
//! `conversion_rank` scores how well a dynamic argument fits it: lower is
//! better and `None` means the argument cannot be converted at all.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use interop_dispatch_runtime::{DynamicValue, TypeTag};

/// Argument already has the declared type.
pub const RANK_EXACT: u8 = 0;
/// Script number converted to a narrower host numeric type.
pub const RANK_NUMERIC: u8 = 1;
/// Widening to a base type, `Any`, or number-to-string formatting.
pub const RANK_REFERENCE: u8 = 2;

/// Answers "is a value of `from` usable where `to` is expected".
///
/// Implemented by the type registry, which knows every registered type's
/// supertypes.
pub trait TypeRelation {
    fn is_assignable(&self, from: TypeTag, to: TypeTag) -> bool;
}

/// Relation that only knows identity. Useful when no registry is around.
#[derive(Debug, Clone, Copy, Default)]
pub struct IdentityRelation;

impl TypeRelation for IdentityRelation {
    fn is_assignable(&self, from: TypeTag, to: TypeTag) -> bool {
        from == to
    }
}

/// Declared type of a host parameter.
#[derive(Debug, Clone)]
pub enum ParamType {
    /// Receives the raw dynamic value, whatever it is
    Dynamic,
    /// Any host object (the root reference type)
    Any,
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float32,
    Float64,
    String,
    Table,
    Function,
    /// Registered host type
    Host { tag: TypeTag, name: Arc<str> },
    /// Nullable wrapper around a value type
    Optional(Box<ParamType>),
}

impl PartialEq for ParamType {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            // Names are display-only; identity is the tag.
            (ParamType::Host { tag: a, .. }, ParamType::Host { tag: b, .. }) => a == b,
            (ParamType::Optional(a), ParamType::Optional(b)) => a == b,
            _ => std::mem::discriminant(self) == std::mem::discriminant(other),
        }
    }
}

impl Eq for ParamType {}

impl ParamType {
    /// Parameter type for a Rust host type.
    pub fn host<T: Any + ?Sized>() -> Self {
        ParamType::Host {
            tag: TypeTag::of::<T>(),
            name: short_type_name::<T>().into(),
        }
    }

    /// Parameter type for a host type known only by tag.
    pub fn host_tag(tag: TypeTag, name: impl Into<Arc<str>>) -> Self {
        ParamType::Host {
            tag,
            name: name.into(),
        }
    }

    /// Wrap in `Optional`, accepting nil.
    pub fn optional(self) -> Self {
        ParamType::Optional(Box::new(self))
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            ParamType::Int8
                | ParamType::Int16
                | ParamType::Int32
                | ParamType::Int64
                | ParamType::UInt8
                | ParamType::UInt16
                | ParamType::UInt32
                | ParamType::UInt64
                | ParamType::Float32
                | ParamType::Float64
        )
    }

    /// Value types cannot hold nil.
    pub fn is_value_type(&self) -> bool {
        self.is_numeric() || matches!(self, ParamType::Bool)
    }

    /// Host tag, if this is a host type (looking through `Optional`).
    pub fn host_tag_of(&self) -> Option<TypeTag> {
        match self {
            ParamType::Host { tag, .. } => Some(*tag),
            ParamType::Optional(inner) => inner.host_tag_of(),
            _ => None,
        }
    }

    /// Rank of converting `arg` to this type, or `None` if not convertible.
    ///
    /// Tuples are ranked by their first value. Nil fits every non-value
    /// type exactly.
    pub fn conversion_rank(&self, arg: &DynamicValue, relation: &dyn TypeRelation) -> Option<u8> {
        let arg = arg.scalar();
        match (self, arg) {
            (ParamType::Dynamic, _) => Some(RANK_EXACT),
            (ParamType::Optional(_), DynamicValue::Nil) => Some(RANK_EXACT),
            (ParamType::Optional(inner), _) => inner.conversion_rank(arg, relation),
            (ty, DynamicValue::Nil) => {
                if ty.is_value_type() {
                    None
                } else {
                    Some(RANK_EXACT)
                }
            }
            (ParamType::Any, _) => Some(RANK_REFERENCE),
            (ParamType::Bool, DynamicValue::Boolean(_)) => Some(RANK_EXACT),
            (ParamType::Float64, DynamicValue::Number(_)) => Some(RANK_EXACT),
            (ty, DynamicValue::Number(_)) if ty.is_numeric() => Some(RANK_NUMERIC),
            (ParamType::String, DynamicValue::String(_)) => Some(RANK_EXACT),
            (ParamType::String, DynamicValue::Number(_)) => Some(RANK_REFERENCE),
            (ParamType::Table, DynamicValue::Table(_)) => Some(RANK_EXACT),
            (ParamType::Function, DynamicValue::Function(_)) => Some(RANK_EXACT),
            (ParamType::Host { tag, .. }, DynamicValue::UserData(ud)) => {
                if ud.tag() == *tag {
                    Some(RANK_EXACT)
                } else if relation.is_assignable(ud.tag(), *tag) {
                    Some(RANK_REFERENCE)
                } else {
                    None
                }
            }
            _ => None,
        }
    }

    /// Zero value used to pre-fill storage of this type.
    pub fn zero_value(&self) -> DynamicValue {
        match self {
            ty if ty.is_numeric() => DynamicValue::Number(0.0),
            ParamType::Bool => DynamicValue::Boolean(false),
            _ => DynamicValue::Nil,
        }
    }
}

impl fmt::Display for ParamType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamType::Dynamic => write!(f, "Dynamic"),
            ParamType::Any => write!(f, "Object"),
            ParamType::Bool => write!(f, "Bool"),
            ParamType::Int8 => write!(f, "Int8"),
            ParamType::Int16 => write!(f, "Int16"),
            ParamType::Int32 => write!(f, "Int32"),
            ParamType::Int64 => write!(f, "Int64"),
            ParamType::UInt8 => write!(f, "UInt8"),
            ParamType::UInt16 => write!(f, "UInt16"),
            ParamType::UInt32 => write!(f, "UInt32"),
            ParamType::UInt64 => write!(f, "UInt64"),
            ParamType::Float32 => write!(f, "Float32"),
            ParamType::Float64 => write!(f, "Float64"),
            ParamType::String => write!(f, "String"),
            ParamType::Table => write!(f, "Table"),
            ParamType::Function => write!(f, "Function"),
            ParamType::Host { name, .. } => write!(f, "{}", name),
            ParamType::Optional(inner) => write!(f, "{}?", inner),
        }
    }
}

/// Last path segment of a Rust type name, keeping generic arguments.
///
/// `my_crate::shapes::Circle` becomes `Circle`.
pub fn short_type_name<T: ?Sized>() -> String {
    let full = std::any::type_name::<T>();
    let (base, generics) = match full.find('<') {
        Some(pos) => full.split_at(pos),
        None => (full, ""),
    };
    let short = base.rsplit("::").next().unwrap_or(base);
    format!("{}{}", short, generics)
}

#[cfg(test)]
mod tests {
    use super::*;
    use interop_dispatch_runtime::UserData;

    struct Widget;
    struct Gadget;

    struct GadgetIsWidget;

    impl TypeRelation for GadgetIsWidget {
        fn is_assignable(&self, from: TypeTag, to: TypeTag) -> bool {
            from == to || (from == TypeTag::of::<Gadget>() && to == TypeTag::of::<Widget>())
        }
    }

    #[test]
    fn test_number_ranks() {
        let n = DynamicValue::Number(5.0);
        let rel = IdentityRelation;
        assert_eq!(ParamType::Float64.conversion_rank(&n, &rel), Some(RANK_EXACT));
        assert_eq!(ParamType::Int32.conversion_rank(&n, &rel), Some(RANK_NUMERIC));
        assert_eq!(ParamType::Float32.conversion_rank(&n, &rel), Some(RANK_NUMERIC));
        assert_eq!(ParamType::String.conversion_rank(&n, &rel), Some(RANK_REFERENCE));
        assert_eq!(ParamType::Any.conversion_rank(&n, &rel), Some(RANK_REFERENCE));
        assert_eq!(ParamType::Bool.conversion_rank(&n, &rel), None);
    }

    #[test]
    fn test_nil_against_value_types() {
        let rel = IdentityRelation;
        assert_eq!(ParamType::Int32.conversion_rank(&DynamicValue::Nil, &rel), None);
        assert_eq!(ParamType::Bool.conversion_rank(&DynamicValue::Nil, &rel), None);
        assert_eq!(
            ParamType::String.conversion_rank(&DynamicValue::Nil, &rel),
            Some(RANK_EXACT)
        );
        assert_eq!(
            ParamType::Int32
                .optional()
                .conversion_rank(&DynamicValue::Nil, &rel),
            Some(RANK_EXACT)
        );
        assert_eq!(
            ParamType::host::<Widget>().conversion_rank(&DynamicValue::Nil, &rel),
            Some(RANK_EXACT)
        );
    }

    #[test]
    fn test_host_ranks_use_relation() {
        let gadget = DynamicValue::UserData(UserData::new(Gadget));
        let widget_param = ParamType::host::<Widget>();
        assert_eq!(widget_param.conversion_rank(&gadget, &IdentityRelation), None);
        assert_eq!(
            widget_param.conversion_rank(&gadget, &GadgetIsWidget),
            Some(RANK_REFERENCE)
        );
        assert_eq!(
            ParamType::host::<Gadget>().conversion_rank(&gadget, &GadgetIsWidget),
            Some(RANK_EXACT)
        );
    }

    #[test]
    fn test_tuple_ranked_by_first_value() {
        let t = DynamicValue::Tuple(vec![DynamicValue::from("a"), DynamicValue::Number(1.0)]);
        assert_eq!(
            ParamType::String.conversion_rank(&t, &IdentityRelation),
            Some(RANK_EXACT)
        );
        let empty = DynamicValue::Tuple(vec![]);
        assert_eq!(ParamType::Int32.conversion_rank(&empty, &IdentityRelation), None);
    }

    #[test]
    fn test_display_and_equality() {
        assert_eq!(ParamType::Int32.optional().to_string(), "Int32?");
        assert_eq!(ParamType::host::<Widget>().to_string(), "Widget");
        assert_eq!(
            ParamType::host_tag(TypeTag::of::<Widget>(), "Other"),
            ParamType::host::<Widget>()
        );
        assert_ne!(ParamType::Int32, ParamType::Int64);
    }

    #[test]
    fn test_short_type_name() {
        assert_eq!(short_type_name::<Widget>(), "Widget");
        assert_eq!(short_type_name::<Vec<i32>>(), "Vec<i32>");
    }
}
