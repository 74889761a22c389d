//! Script metamethod names and the host operator names that map to them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// A script metamethod slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetaName {
    ToString,
    Index,
    NewIndex,
    Call,
    Concat,
    Len,
    Eq,
    Lt,
    Le,
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Pow,
    Unm,
    Iterator,
    ToNumber,
    ToBool,
}

impl MetaName {
    pub const ALL: [MetaName; 19] = [
        MetaName::ToString,
        MetaName::Index,
        MetaName::NewIndex,
        MetaName::Call,
        MetaName::Concat,
        MetaName::Len,
        MetaName::Eq,
        MetaName::Lt,
        MetaName::Le,
        MetaName::Add,
        MetaName::Sub,
        MetaName::Mul,
        MetaName::Div,
        MetaName::Mod,
        MetaName::Pow,
        MetaName::Unm,
        MetaName::Iterator,
        MetaName::ToNumber,
        MetaName::ToBool,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            MetaName::ToString => "__tostring",
            MetaName::Index => "__index",
            MetaName::NewIndex => "__newindex",
            MetaName::Call => "__call",
            MetaName::Concat => "__concat",
            MetaName::Len => "__len",
            MetaName::Eq => "__eq",
            MetaName::Lt => "__lt",
            MetaName::Le => "__le",
            MetaName::Add => "__add",
            MetaName::Sub => "__sub",
            MetaName::Mul => "__mul",
            MetaName::Div => "__div",
            MetaName::Mod => "__mod",
            MetaName::Pow => "__pow",
            MetaName::Unm => "__unm",
            MetaName::Iterator => "__iterator",
            MetaName::ToNumber => "__tonumber",
            MetaName::ToBool => "__tobool",
        }
    }

    /// Parse a metamethod name such as `__add`.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.as_str() == name)
    }

    /// Metamethod bound by a host operator method name.
    pub fn from_operator_name(name: &str) -> Option<Self> {
        match name {
            "op_Addition" => Some(MetaName::Add),
            "op_Subtraction" => Some(MetaName::Sub),
            "op_Multiply" => Some(MetaName::Mul),
            "op_Division" => Some(MetaName::Div),
            "op_Modulus" => Some(MetaName::Mod),
            "op_UnaryNegation" => Some(MetaName::Unm),
            "op_Equality" => Some(MetaName::Eq),
            "op_LessThan" => Some(MetaName::Lt),
            "op_LessThanOrEqual" => Some(MetaName::Le),
            _ => None,
        }
    }
}

impl fmt::Display for MetaName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
