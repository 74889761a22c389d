//! Dynamic Value type for script/host interop
//!
//! This module provides the `DynamicValue` enum exchanged between the script
//! runtime and host members, plus the handles used to refer to host objects.

use std::any::{Any, TypeId};
use std::collections::hash_map::DefaultHasher;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// Shared handle to a host object.
pub type HostRef = Arc<dyn Any + Send + Sync>;

/// Identity of a host type.
///
/// Tags are cheap to copy and hash; they key the descriptor registry and
/// take part in call-site fingerprints.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TypeTag(u64);

impl TypeTag {
    /// Tag for a Rust host type.
    pub fn of<T: Any + ?Sized>() -> Self {
        let mut hasher = DefaultHasher::new();
        TypeId::of::<T>().hash(&mut hasher);
        TypeTag(hasher.finish())
    }

    /// Tag for an N-dimensional array of the named element type.
    ///
    /// Arrays of the same element type but different rank are distinct types.
    pub fn array(element_name: &str, rank: usize) -> Self {
        let mut hasher = DefaultHasher::new();
        "array".hash(&mut hasher);
        element_name.hash(&mut hasher);
        rank.hash(&mut hasher);
        TypeTag(hasher.finish())
    }

    /// Rebuild a tag from its raw value.
    pub const fn from_raw(raw: u64) -> Self {
        TypeTag(raw)
    }

    /// Raw value of this tag.
    pub const fn raw(self) -> u64 {
        self.0
    }
}

impl fmt::Display for TypeTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:016x}", self.0)
    }
}

/// Script-visible handle to a host object or to a type's static facade.
///
/// A static facade carries only the tag: it lets scripts reach static
/// members and constructors without an instance.
#[derive(Clone)]
pub struct UserData {
    tag: TypeTag,
    object: Option<HostRef>,
}

impl UserData {
    /// Wrap a host object, tagging it with its Rust type.
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self {
            tag: TypeTag::of::<T>(),
            object: Some(Arc::new(value)),
        }
    }

    /// Wrap an already shared host object under an explicit tag.
    pub fn from_shared(tag: TypeTag, object: HostRef) -> Self {
        Self {
            tag,
            object: Some(object),
        }
    }

    /// Static facade for a host type.
    pub fn static_facade(tag: TypeTag) -> Self {
        Self { tag, object: None }
    }

    pub fn tag(&self) -> TypeTag {
        self.tag
    }

    pub fn is_static_facade(&self) -> bool {
        self.object.is_none()
    }

    pub fn object(&self) -> Option<&HostRef> {
        self.object.as_ref()
    }

    /// Borrow the host object as `T`, if this is an instance of `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.as_ref().and_then(|obj| obj.downcast_ref::<T>())
    }
}

impl fmt::Debug for UserData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UserData")
            .field("tag", &self.tag)
            .field("static_facade", &self.is_static_facade())
            .finish()
    }
}

impl PartialEq for UserData {
    fn eq(&self, other: &Self) -> bool {
        self.tag == other.tag
            && match (&self.object, &other.object) {
                (None, None) => true,
                (Some(a), Some(b)) => Arc::ptr_eq(a, b),
                _ => false,
            }
    }
}

/// Opaque handle to a script-runtime object (table or function).
///
/// The dispatcher never looks inside; it only forwards these to host code.
#[derive(Clone)]
pub struct OpaqueRef(Arc<dyn Any + Send + Sync>);

impl OpaqueRef {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        OpaqueRef(Arc::new(value))
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.0.downcast_ref::<T>()
    }

    pub fn ptr_eq(&self, other: &OpaqueRef) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    fn addr(&self) -> usize {
        Arc::as_ptr(&self.0) as *const () as usize
    }
}

impl fmt::Debug for OpaqueRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "OpaqueRef(0x{:x})", self.addr())
    }
}

/// Coarse kind of a dynamic value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Nil,
    Boolean,
    Number,
    String,
    Table,
    Function,
    UserData,
    Tuple,
}

impl ValueKind {
    /// Script-facing name of the kind
    pub fn name(&self) -> &'static str {
        match self {
            ValueKind::Nil => "nil",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Table => "table",
            ValueKind::Function => "function",
            ValueKind::UserData => "userdata",
            ValueKind::Tuple => "tuple",
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Dynamic value exchanged with the script runtime
///
/// Immutable from the dispatcher's point of view: it only inspects and
/// constructs these.
#[derive(Debug, Clone, Default)]
pub enum DynamicValue {
    /// Absence of a value
    #[default]
    Nil,
    /// Boolean
    Boolean(bool),
    /// Number (always a 64-bit float on the script side)
    Number(f64),
    /// String
    String(String),
    /// Script table handle
    Table(OpaqueRef),
    /// Script function handle
    Function(OpaqueRef),
    /// Host object or static facade
    UserData(UserData),
    /// Multiple values (multiple return, by-ref outputs)
    Tuple(Vec<DynamicValue>),
}

impl DynamicValue {
    /// Wrap a host object.
    pub fn user_data<T: Any + Send + Sync>(value: T) -> Self {
        DynamicValue::UserData(UserData::new(value))
    }

    /// Static facade value for a host type.
    pub fn static_facade(tag: TypeTag) -> Self {
        DynamicValue::UserData(UserData::static_facade(tag))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            DynamicValue::Nil => ValueKind::Nil,
            DynamicValue::Boolean(_) => ValueKind::Boolean,
            DynamicValue::Number(_) => ValueKind::Number,
            DynamicValue::String(_) => ValueKind::String,
            DynamicValue::Table(_) => ValueKind::Table,
            DynamicValue::Function(_) => ValueKind::Function,
            DynamicValue::UserData(_) => ValueKind::UserData,
            DynamicValue::Tuple(_) => ValueKind::Tuple,
        }
    }

    /// Script type name of this value
    pub fn type_name(&self) -> &'static str {
        self.kind().name()
    }

    /// Collapse a tuple to its first element (nil when empty).
    ///
    /// Non-tuple values are returned unchanged.
    pub fn scalar(&self) -> &DynamicValue {
        static NIL: DynamicValue = DynamicValue::Nil;
        match self {
            DynamicValue::Tuple(items) => items.first().map(|v| v.scalar()).unwrap_or(&NIL),
            other => other,
        }
    }

    pub fn is_nil(&self) -> bool {
        matches!(self, DynamicValue::Nil)
    }

    /// Script truthiness: only nil and false are false
    pub fn is_truthy(&self) -> bool {
        !matches!(
            self.scalar(),
            DynamicValue::Nil | DynamicValue::Boolean(false)
        )
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            DynamicValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            DynamicValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            DynamicValue::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_user_data(&self) -> Option<&UserData> {
        match self {
            DynamicValue::UserData(ud) => Some(ud),
            _ => None,
        }
    }

    pub fn as_tuple(&self) -> Option<&[DynamicValue]> {
        match self {
            DynamicValue::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Borrow the wrapped host object as `T`.
    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.as_user_data().and_then(|ud| ud.downcast_ref::<T>())
    }
}

// ========== From implementations ==========

impl From<bool> for DynamicValue {
    fn from(v: bool) -> Self {
        DynamicValue::Boolean(v)
    }
}

impl From<f64> for DynamicValue {
    fn from(v: f64) -> Self {
        DynamicValue::Number(v)
    }
}

impl From<i32> for DynamicValue {
    fn from(v: i32) -> Self {
        DynamicValue::Number(v as f64)
    }
}

impl From<String> for DynamicValue {
    fn from(v: String) -> Self {
        DynamicValue::String(v)
    }
}

impl From<&str> for DynamicValue {
    fn from(v: &str) -> Self {
        DynamicValue::String(v.to_string())
    }
}

impl From<UserData> for DynamicValue {
    fn from(v: UserData) -> Self {
        DynamicValue::UserData(v)
    }
}

impl From<()> for DynamicValue {
    fn from(_: ()) -> Self {
        DynamicValue::Nil
    }
}

impl<T: Into<DynamicValue>> From<Option<T>> for DynamicValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(DynamicValue::Nil)
    }
}

// ========== Display implementation ==========

impl fmt::Display for DynamicValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DynamicValue::Nil => write!(f, "nil"),
            DynamicValue::Boolean(v) => write!(f, "{}", v),
            DynamicValue::Number(v) => {
                if v.fract() == 0.0 && v.abs() < 1e15 {
                    write!(f, "{}", *v as i64)
                } else {
                    write!(f, "{}", v)
                }
            }
            DynamicValue::String(s) => write!(f, "{}", s),
            DynamicValue::Table(r) => write!(f, "table: 0x{:x}", r.addr()),
            DynamicValue::Function(r) => write!(f, "function: 0x{:x}", r.addr()),
            DynamicValue::UserData(ud) => {
                if ud.is_static_facade() {
                    write!(f, "userdata: static {}", ud.tag())
                } else {
                    write!(f, "userdata: {}", ud.tag())
                }
            }
            DynamicValue::Tuple(items) => {
                for (i, v) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, "\t")?;
                    }
                    write!(f, "{}", v)?;
                }
                Ok(())
            }
        }
    }
}

// ========== PartialEq implementation ==========

impl PartialEq for DynamicValue {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (DynamicValue::Nil, DynamicValue::Nil) => true,
            (DynamicValue::Boolean(a), DynamicValue::Boolean(b)) => a == b,
            (DynamicValue::Number(a), DynamicValue::Number(b)) => a == b,
            (DynamicValue::String(a), DynamicValue::String(b)) => a == b,
            (DynamicValue::Table(a), DynamicValue::Table(b)) => a.ptr_eq(b),
            (DynamicValue::Function(a), DynamicValue::Function(b)) => a.ptr_eq(b),
            (DynamicValue::UserData(a), DynamicValue::UserData(b)) => a == b,
            (DynamicValue::Tuple(a), DynamicValue::Tuple(b)) => a == b,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Probe;

    #[test]
    fn test_value_from_primitives() {
        assert!(matches!(DynamicValue::from(42), DynamicValue::Number(n) if n == 42.0));
        assert!(matches!(DynamicValue::from(true), DynamicValue::Boolean(true)));
        assert!(matches!(DynamicValue::from("hello"), DynamicValue::String(_)));
        assert!(DynamicValue::from(None::<bool>).is_nil());
    }

    #[test]
    fn test_value_kind_names() {
        assert_eq!(DynamicValue::Nil.type_name(), "nil");
        assert_eq!(DynamicValue::Number(1.5).type_name(), "number");
        assert_eq!(DynamicValue::user_data(Probe).type_name(), "userdata");
        assert_eq!(DynamicValue::Tuple(vec![]).type_name(), "tuple");
    }

    #[test]
    fn test_scalar_collapses_tuples() {
        let t = DynamicValue::Tuple(vec![DynamicValue::from("a"), DynamicValue::from(2)]);
        assert_eq!(t.scalar(), &DynamicValue::from("a"));
        assert!(DynamicValue::Tuple(vec![]).scalar().is_nil());
        assert_eq!(DynamicValue::from(3).scalar(), &DynamicValue::from(3));
    }

    #[test]
    fn test_user_data_identity() {
        let a = UserData::new(Probe);
        let b = a.clone();
        let c = UserData::new(Probe);
        assert_eq!(a, b);
        assert_ne!(a, c);
        assert_eq!(a.tag(), TypeTag::of::<Probe>());
        assert!(a.downcast_ref::<Probe>().is_some());
        assert!(a.downcast_ref::<String>().is_none());

        let facade = UserData::static_facade(TypeTag::of::<Probe>());
        assert!(facade.is_static_facade());
        assert!(facade.downcast_ref::<Probe>().is_none());
    }

    #[test]
    fn test_array_tags_depend_on_rank() {
        assert_ne!(TypeTag::array("Int32", 1), TypeTag::array("Int32", 2));
        assert_eq!(TypeTag::array("Int32", 2), TypeTag::array("Int32", 2));
        assert_ne!(TypeTag::array("Int32", 1), TypeTag::array("Float64", 1));
    }

    #[test]
    fn test_value_display() {
        assert_eq!(format!("{}", DynamicValue::from(42)), "42");
        assert_eq!(format!("{}", DynamicValue::Number(2.5)), "2.5");
        assert_eq!(format!("{}", DynamicValue::from(true)), "true");
        assert_eq!(format!("{}", DynamicValue::Nil), "nil");
        assert_eq!(
            format!(
                "{}",
                DynamicValue::Tuple(vec![DynamicValue::from("R"), DynamicValue::from("y")])
            ),
            "R\ty"
        );
    }

    #[test]
    fn test_truthiness() {
        assert!(!DynamicValue::Nil.is_truthy());
        assert!(!DynamicValue::from(false).is_truthy());
        assert!(DynamicValue::from(0).is_truthy());
        assert!(DynamicValue::from("").is_truthy());
    }
}
