//! Call-site description: how a member was invoked and with what.

use std::fmt;

use interop_dispatch_runtime::{DynamicValue, TypeTag, UserData, ValueKind};

/// Whether the invocation supplied the receiver implicitly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CallStyle {
    /// `obj:Name(args)`: the receiver is passed as self
    Instance,
    /// `obj.Name(args)`: no implicit receiver
    Static,
}

/// What the script is calling through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReceiverKind {
    /// A host object
    Instance,
    /// A type's static facade (no object)
    StaticFacade,
}

impl ReceiverKind {
    pub fn of(receiver: &UserData) -> Self {
        if receiver.is_static_facade() {
            ReceiverKind::StaticFacade
        } else {
            ReceiverKind::Instance
        }
    }
}

/// One argument's observable shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ArgShape {
    pub kind: ValueKind,
    /// Tag and facade flag, for userdata arguments
    pub user_data: Option<(TypeTag, bool)>,
}

impl ArgShape {
    pub fn of(value: &DynamicValue) -> Self {
        let value = value.scalar();
        ArgShape {
            kind: value.kind(),
            user_data: value
                .as_user_data()
                .map(|ud| (ud.tag(), ud.is_static_facade())),
        }
    }
}

impl fmt::Display for ArgShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.user_data {
            Some((tag, true)) => write!(f, "static {}", tag),
            Some((tag, false)) => write!(f, "userdata {}", tag),
            None => write!(f, "{}", self.kind),
        }
    }
}

/// Argument shapes of a whole call, used in diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArgumentShape(pub Vec<ArgShape>);

impl ArgumentShape {
    pub fn of(args: &[DynamicValue]) -> Self {
        ArgumentShape(args.iter().map(ArgShape::of).collect())
    }
}

impl fmt::Display for ArgumentShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<_> = self.0.iter().map(|s| s.to_string()).collect();
        write!(f, "{}", parts.join(", "))
    }
}

/// Rendered call expression, e.g. `obj:Method1(number, nil)`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallDescription {
    pub member: String,
    pub style: CallStyle,
    pub receiver: ReceiverKind,
    pub args: ArgumentShape,
}

impl fmt::Display for CallDescription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let target = match self.receiver {
            ReceiverKind::Instance => "obj",
            ReceiverKind::StaticFacade => "static",
        };
        let sep = match self.style {
            CallStyle::Instance => ':',
            CallStyle::Static => '.',
        };
        write!(f, "{}{}{}({})", target, sep, self.member, self.args)
    }
}
