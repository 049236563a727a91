//! Native function values.

use std::rc::Rc;

use super::Value;
use crate::error::Result;

/// Signature of a native function: `(this, args) -> result`.
pub type NativeFn = dyn Fn(&Value, &[Value]) -> Result<Value>;

/// A function implemented in Rust.
#[derive(Clone)]
pub struct NativeFunction {
    name: Rc<str>,
    call: Rc<NativeFn>,
}

impl NativeFunction {
    pub fn new<F>(name: &str, call: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + 'static,
    {
        Self {
            name: Rc::from(name),
            call: Rc::new(call),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
        (self.call)(this, args)
    }
}

impl std::fmt::Debug for NativeFunction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "NativeFunction({})", self.name)
    }
}
