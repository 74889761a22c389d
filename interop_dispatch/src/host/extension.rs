//! Extension methods: methods declared outside a host type that scripts
//! call as if they were instance methods of it.

use interop_dispatch_runtime::{DynamicValue, RuntimeResult, TypeTag};

use super::shape::{HostMethod, MemberMarkers};
use super::type_builder::{HostType, MemberOptions};
use crate::descriptor::{CallFrame, Invoker, ParameterDescriptor};
use crate::types::short_type_name;

/// A set of extension methods registered as one unit.
pub trait ExtensionProvider: 'static {
    fn describe(ext: &mut ExtensionBuilder);
}

#[derive(Debug, Clone)]
pub struct ExtensionMethod {
    /// Type the method extends
    pub target: TypeTag,
    pub method: HostMethod,
}

#[derive(Debug)]
pub struct ExtensionBuilder {
    provider: String,
    methods: Vec<ExtensionMethod>,
}

impl ExtensionBuilder {
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            methods: Vec::new(),
        }
    }

    /// Builder for provider `P`.
    pub fn for_provider<P: ExtensionProvider>() -> Self {
        Self::new(short_type_name::<P>())
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    /// Extension method on `T`; the receiver arrives as `&T`.
    pub fn method<T, F>(
        &mut self,
        name: impl Into<String>,
        params: Vec<ParameterDescriptor>,
        f: F,
    ) -> MemberOptions<'_>
    where
        T: HostType,
        F: Fn(&T, &mut CallFrame<'_>) -> RuntimeResult<DynamicValue> + Send + Sync + 'static,
    {
        let index = self.methods.len();
        self.methods.push(ExtensionMethod {
            target: TypeTag::of::<T>(),
            method: HostMethod {
                name: name.into(),
                is_static: false,
                params,
                return_arity: 1,
                invoker: Invoker::new(move |frame| {
                    let this = frame.this::<T>()?;
                    f(this, frame)
                }),
                conversion_target: None,
                markers: MemberMarkers::default(),
            },
        });
        MemberOptions::for_method(&mut self.methods[index].method)
    }

    pub fn finish(self) -> Vec<ExtensionMethod> {
        self.methods
    }
}
