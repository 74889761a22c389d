//! Overload candidates and the closures that invoke host code.
//!
//! Signature-specific glue is wrapped once, at registration, into an
//! [`Invoker`]. The dispatch path only hands it a [`CallFrame`] whose
//! argument slots line up with the candidate's declared parameters.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use interop_dispatch_runtime::{
    DynamicValue, FromDynamic, RuntimeError, RuntimeResult, UserData,
};

use super::member::Access;
use super::parameter::ParameterDescriptor;

/// Arguments and receiver handed to an invoker.
///
/// Holds one slot per declared parameter: omitted trailing parameters carry
/// their defaults and a variadic tail is packed into a single tuple slot.
#[derive(Debug)]
pub struct CallFrame<'a> {
    receiver: Option<&'a UserData>,
    args: Vec<DynamicValue>,
}

impl<'a> CallFrame<'a> {
    pub fn new(receiver: Option<&'a UserData>, args: Vec<DynamicValue>) -> Self {
        Self { receiver, args }
    }

    pub fn receiver(&self) -> Option<&'a UserData> {
        self.receiver
    }

    /// Borrow the receiver as `T`.
    pub fn this<T: Any>(&self) -> RuntimeResult<&'a T> {
        match self.receiver {
            Some(ud) if ud.is_static_facade() => Err(RuntimeError::type_error(
                "instance member called without an instance",
            )),
            Some(ud) => ud.downcast_ref::<T>().ok_or_else(|| {
                RuntimeError::type_error(format!(
                    "receiver is not a {}",
                    std::any::type_name::<T>()
                ))
            }),
            None => Err(RuntimeError::type_error(
                "instance member called without a receiver",
            )),
        }
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }

    pub fn args(&self) -> &[DynamicValue] {
        &self.args
    }

    /// Raw argument slot; nil past the end.
    pub fn arg(&self, index: usize) -> &DynamicValue {
        static NIL: DynamicValue = DynamicValue::Nil;
        self.args.get(index).unwrap_or(&NIL)
    }

    /// Convert an argument slot to a host value.
    pub fn get<T: FromDynamic>(&self, index: usize) -> RuntimeResult<T> {
        T::from_dynamic(self.arg(index))
    }

    /// Values collected by a variadic parameter at `index`.
    pub fn rest(&self, index: usize) -> &[DynamicValue] {
        match self.args.get(index) {
            Some(DynamicValue::Tuple(items)) => items,
            Some(single) => std::slice::from_ref(single),
            None => &[],
        }
    }

    /// Write the final value of a by-ref parameter.
    pub fn set_ref(&mut self, index: usize, value: impl Into<DynamicValue>) {
        if let Some(slot) = self.args.get_mut(index) {
            *slot = value.into();
        }
    }

    pub fn into_args(self) -> Vec<DynamicValue> {
        self.args
    }
}

type InvokeFn = dyn Fn(&mut CallFrame<'_>) -> RuntimeResult<DynamicValue> + Send + Sync;

/// Opaque callable behind an overload candidate.
#[derive(Clone)]
pub struct Invoker(Arc<InvokeFn>);

impl Invoker {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(&mut CallFrame<'_>) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        Invoker(Arc::new(f))
    }

    pub fn invoke(&self, frame: &mut CallFrame<'_>) -> RuntimeResult<DynamicValue> {
        (self.0)(frame)
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Invoker")
    }
}

type GetFn = dyn Fn(Option<&UserData>) -> RuntimeResult<DynamicValue> + Send + Sync;
type SetFn = dyn Fn(Option<&UserData>, DynamicValue) -> RuntimeResult<()> + Send + Sync;

/// Read accessor; receives `None` for static members.
#[derive(Clone)]
pub struct Getter(Arc<GetFn>);

impl Getter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&UserData>) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        Getter(Arc::new(f))
    }

    pub fn get(&self, receiver: Option<&UserData>) -> RuntimeResult<DynamicValue> {
        (self.0)(receiver)
    }
}

impl fmt::Debug for Getter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Getter")
    }
}

/// Write accessor (also used for event add/remove).
#[derive(Clone)]
pub struct Setter(Arc<SetFn>);

impl Setter {
    pub fn new<F>(f: F) -> Self
    where
        F: Fn(Option<&UserData>, DynamicValue) -> RuntimeResult<()> + Send + Sync + 'static,
    {
        Setter(Arc::new(f))
    }

    pub fn set(&self, receiver: Option<&UserData>, value: DynamicValue) -> RuntimeResult<()> {
        (self.0)(receiver, value)
    }
}

impl fmt::Debug for Setter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Setter")
    }
}

/// How a candidate receives its receiver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CandidateKind {
    /// No receiver
    Static,
    /// Receiver is the object the member is declared on
    Instance,
    /// Declared by an extension provider; receives the receiver like an
    /// instance member
    Extension,
}

/// One callable overload.
#[derive(Debug)]
pub struct OverloadCandidate {
    name: String,
    kind: CandidateKind,
    params: Vec<ParameterDescriptor>,
    return_arity: usize,
    declaring_type: String,
    invoker: Invoker,
    access: Access,
    min_arity: usize,
    fixed_arity: usize,
    variadic: bool,
    by_ref_count: usize,
}

impl OverloadCandidate {
    pub fn new(
        name: impl Into<String>,
        kind: CandidateKind,
        params: Vec<ParameterDescriptor>,
        return_arity: usize,
        declaring_type: impl Into<String>,
        invoker: Invoker,
    ) -> Self {
        let variadic = params.last().is_some_and(|p| p.is_variadic);
        let fixed_arity = params.len() - usize::from(variadic);
        let min_arity = params[..fixed_arity]
            .iter()
            .filter(|p| !p.has_default())
            .count();
        let by_ref_count = params.iter().filter(|p| p.is_by_ref).count();
        Self {
            name: name.into(),
            kind,
            params,
            return_arity,
            declaring_type: declaring_type.into(),
            invoker,
            access: Access::Public,
            min_arity,
            fixed_arity,
            variadic,
            by_ref_count,
        }
    }

    pub fn with_access(mut self, access: Access) -> Self {
        self.access = access;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn access(&self) -> Access {
        self.access
    }

    pub fn kind(&self) -> CandidateKind {
        self.kind
    }

    pub fn is_static(&self) -> bool {
        self.kind == CandidateKind::Static
    }

    pub fn params(&self) -> &[ParameterDescriptor] {
        &self.params
    }

    pub fn return_arity(&self) -> usize {
        self.return_arity
    }

    pub fn declaring_type(&self) -> &str {
        &self.declaring_type
    }

    /// Parameters without a default, excluding the variadic one
    pub fn min_arity(&self) -> usize {
        self.min_arity
    }

    /// Parameters excluding the variadic one
    pub fn fixed_arity(&self) -> usize {
        self.fixed_arity
    }

    /// Upper bound on argument count; `None` when variadic.
    pub fn max_arity(&self) -> Option<usize> {
        if self.variadic {
            None
        } else {
            Some(self.fixed_arity)
        }
    }

    pub fn is_variadic(&self) -> bool {
        self.variadic
    }

    pub fn by_ref_count(&self) -> usize {
        self.by_ref_count
    }

    pub fn accepts_arity(&self, argc: usize) -> bool {
        self.min_arity <= argc && (self.variadic || argc <= self.fixed_arity)
    }

    /// Human-readable signature, e.g. `Method1(Float64 d, String s = nil)`.
    pub fn signature(&self) -> String {
        let params: Vec<_> = self.params.iter().map(|p| p.to_string()).collect();
        let prefix = match self.kind {
            CandidateKind::Static => "static ",
            CandidateKind::Instance => "",
            CandidateKind::Extension => "extension ",
        };
        format!("{}{}({})", prefix, self.name, params.join(", "))
    }

    /// Lay out `args` into one slot per declared parameter.
    pub fn bind(&self, args: &[DynamicValue]) -> Vec<DynamicValue> {
        let mut slots = Vec::with_capacity(self.params.len());
        for (i, p) in self.params[..self.fixed_arity].iter().enumerate() {
            let value = match args.get(i) {
                Some(arg) => arg.clone(),
                None => p.default.clone().unwrap_or_default(),
            };
            slots.push(value);
        }
        if self.variadic {
            let rest = args.get(self.fixed_arity..).unwrap_or(&[]);
            slots.push(DynamicValue::Tuple(rest.to_vec()));
        }
        slots
    }

    /// Run the candidate and shape its result.
    ///
    /// With by-ref parameters the result is a tuple: the return value (if the
    /// candidate returns one) followed by every by-ref slot's final value in
    /// declaration order.
    pub fn invoke(
        &self,
        receiver: Option<&UserData>,
        args: &[DynamicValue],
    ) -> RuntimeResult<DynamicValue> {
        let mut frame = CallFrame::new(receiver, self.bind(args));
        let ret = self.invoker.invoke(&mut frame)?;
        if self.by_ref_count == 0 {
            return Ok(if self.return_arity == 0 {
                DynamicValue::Nil
            } else {
                ret
            });
        }
        let mut out = Vec::with_capacity(self.by_ref_count + 1);
        if self.return_arity > 0 {
            out.push(ret);
        }
        let slots = frame.into_args();
        for (p, value) in self.params.iter().zip(slots) {
            if p.is_by_ref {
                out.push(value);
            }
        }
        Ok(DynamicValue::Tuple(out))
    }
}
