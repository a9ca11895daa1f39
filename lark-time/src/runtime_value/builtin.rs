use std::{fmt, sync::Arc};

use crate::error::RuntimeError;

use super::RuntimeValue;

/// The arguments of a call, in the order the caller wrote them.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Arguments {
    pub positional: Vec<RuntimeValue>,
    /// Pairs of keyword name and value.
    ///
    /// Names are usually strings, but nothing in the calling convention guarantees it.
    pub keywords: Vec<(RuntimeValue, RuntimeValue)>,
}

pub type DynFunction = dyn Fn(&Arguments) -> Result<RuntimeValue, RuntimeError> + Send + Sync;

/// A named function implemented in Rust that scripts can call.
#[derive(Clone)]
pub struct Builtin {
    name: Arc<str>,
    function: Arc<DynFunction>,
}

impl Builtin {
    pub fn new(
        name: impl Into<Arc<str>>,
        function: impl Fn(&Arguments) -> Result<RuntimeValue, RuntimeError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            name: name.into(),
            function: Arc::new(function),
        }
    }

    pub fn name(&self) -> &Arc<str> {
        &self.name
    }

    pub fn call(&self, arguments: &Arguments) -> Result<RuntimeValue, RuntimeError> {
        tracing::trace!(builtin = %self.name, ?arguments, "calling builtin");
        (self.function)(arguments)
    }
}

impl fmt::Debug for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Builtin")
            .field("name", &self.name)
            .field("function", &(Arc::as_ptr(&self.function) as *const ()))
            .finish()
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "<built-in function {}>", self.name)
    }
}

impl PartialEq for Builtin {
    fn eq(&self, other: &Self) -> bool {
        // strip metadata to compare the functions only
        Arc::as_ptr(&self.function) as *const () == Arc::as_ptr(&other.function) as *const ()
    }
}

impl Eq for Builtin {}
