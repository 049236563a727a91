//! Structural Values
//!
//! The proxy layer operates on a small dynamic object model: primitives plus
//! reference-counted heap objects (records, arrays, maps, sets, functions,
//! boxed references and proxies). Objects are compared by identity, which is
//! what the variant registry and the dependency runtime key on.
//!
//! # Ownership
//!
//! An [`Obj`] is an `Rc` handle. Cloning a [`Value`] never copies the object
//! it refers to; wrapping a value in a proxy only adds another handle.
//!
//! # Operations
//!
//! Every object answers the same structural operations (`get`, `set`, `has`,
//! `delete`, `own_keys`). On a proxy these go through its handler; on any
//! other object they run the ordinary behavior for its kind.

mod builtins;
mod function;
mod json;
mod key;
mod object;

pub use function::NativeFunction;
pub use key::{KeyIdentity, MapKey, PropertyKey, Symbol, WellKnownSymbol};
pub use object::{ObjectKind, WeakObj};

pub(crate) use builtins::collection;
pub(crate) use object::{ObjectBody, ProxyData};

use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::error::{ReactiveError, Result};

/// Unique identifier for a heap object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(u64);

impl ObjectId {
    /// Generate a new unique object ID.
    pub(crate) fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// A handle to a heap object.
#[derive(Clone)]
pub struct Obj(Rc<object::ObjectData>);

/// A runtime value.
#[derive(Clone)]
pub enum Value {
    Undefined,
    Null,
    Bool(bool),
    Number(f64),
    String(Rc<str>),
    Symbol(Symbol),
    Object(Obj),
}

impl Value {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// A new empty record.
    pub fn object() -> Self {
        Value::Object(Obj::new(ObjectBody::record(None)))
    }

    /// A new record from `(key, value)` pairs, in insertion order.
    pub fn record<K, V, I>(entries: I) -> Self
    where
        K: Into<PropertyKey>,
        V: Into<Value>,
        I: IntoIterator<Item = (K, V)>,
    {
        let obj = Obj::new(ObjectBody::record(None));
        for (key, value) in entries {
            obj.define_own_property(&key.into(), value.into());
        }
        Value::Object(obj)
    }

    /// A new empty record whose prototype is `proto`.
    ///
    /// Reads of missing keys continue on the prototype; writes of keys found
    /// only on the prototype define an own property on the receiver.
    pub fn object_with_proto(proto: &Value) -> Self {
        Value::Object(Obj::new(ObjectBody::record(proto.as_object().cloned())))
    }

    /// A new array holding `items`.
    pub fn array<I>(items: I) -> Self
    where
        I: IntoIterator,
        I::Item: Into<Value>,
    {
        let slots = items.into_iter().map(|item| Some(item.into())).collect();
        Value::Object(Obj::new(ObjectBody::array(slots)))
    }

    /// A new map from `(key, value)` pairs.
    pub fn map<I>(entries: I) -> Self
    where
        I: IntoIterator<Item = (Value, Value)>,
    {
        Value::Object(Obj::new(ObjectBody::map(entries, false)))
    }

    /// A new set from `items`.
    pub fn set_of<I>(items: I) -> Self
    where
        I: IntoIterator<Item = Value>,
    {
        Value::Object(Obj::new(ObjectBody::set(items, false)))
    }

    /// A new empty weak map. Only object keys are accepted.
    pub fn weak_map() -> Self {
        Value::Object(Obj::new(ObjectBody::map(std::iter::empty(), true)))
    }

    /// A new empty weak set. Only object members are accepted.
    pub fn weak_set() -> Self {
        Value::Object(Obj::new(ObjectBody::set(std::iter::empty(), true)))
    }

    /// An opaque date holding milliseconds since the epoch.
    pub fn date(millis: f64) -> Self {
        Value::Object(Obj::new(ObjectBody::Date(millis)))
    }

    /// A native function value.
    pub fn function<F>(name: &str, call: F) -> Self
    where
        F: Fn(&Value, &[Value]) -> Result<Value> + 'static,
    {
        Value::Object(Obj::new(ObjectBody::Function(NativeFunction::new(name, call))))
    }

    // ------------------------------------------------------------------
    // Inspection
    // ------------------------------------------------------------------

    /// Whether this value is a heap object.
    pub fn is_object(&self) -> bool {
        matches!(self, Value::Object(_))
    }

    pub fn as_object(&self) -> Option<&Obj> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_undefined(&self) -> bool {
        matches!(self, Value::Undefined)
    }

    /// Truthiness: `undefined`, `null`, `false`, `0`, `NaN` and `""` are falsy.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::Undefined | Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => *n != 0.0 && !n.is_nan(),
            Value::String(s) => !s.is_empty(),
            Value::Symbol(_) | Value::Object(_) => true,
        }
    }

    /// Whether both values refer to the same heap object.
    pub fn ptr_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Equality
    // ------------------------------------------------------------------

    /// SameValue: `NaN` equals itself, `+0` and `-0` differ.
    pub fn same_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => {
                if a.is_nan() && b.is_nan() {
                    true
                } else {
                    a == b && a.is_sign_negative() == b.is_sign_negative()
                }
            }
            _ => self.loose_identity_eq(other),
        }
    }

    /// SameValueZero: `NaN` equals itself, `+0` equals `-0`.
    pub fn same_value_zero(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => (a.is_nan() && b.is_nan()) || a == b,
            _ => self.loose_identity_eq(other),
        }
    }

    /// Strict equality: `NaN` never equals anything.
    pub fn strict_equals(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            _ => self.loose_identity_eq(other),
        }
    }

    fn loose_identity_eq(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Bool(a), Value::Bool(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Symbol(a), Value::Symbol(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => a.ptr_eq(b),
            _ => false,
        }
    }

    // ------------------------------------------------------------------
    // Structural operations
    // ------------------------------------------------------------------

    /// Read a property. Non-objects read as `undefined`.
    pub fn get(&self, key: impl Into<PropertyKey>) -> Value {
        match self {
            Value::Object(obj) => obj.get(&key.into(), self),
            _ => Value::Undefined,
        }
    }

    /// Write a property, returning whether the write was accepted.
    pub fn set(&self, key: impl Into<PropertyKey>, value: impl Into<Value>) -> bool {
        match self {
            Value::Object(obj) => obj.set(&key.into(), value.into(), self),
            _ => false,
        }
    }

    /// Whether the property is present, including on the prototype chain.
    pub fn has(&self, key: impl Into<PropertyKey>) -> bool {
        match self {
            Value::Object(obj) => obj.has(&key.into()),
            _ => false,
        }
    }

    /// Delete a property, returning whether the delete was accepted.
    pub fn delete(&self, key: impl Into<PropertyKey>) -> bool {
        match self {
            Value::Object(obj) => obj.delete(&key.into()),
            _ => false,
        }
    }

    /// The own keys of the value.
    pub fn own_keys(&self) -> Vec<PropertyKey> {
        match self {
            Value::Object(obj) => obj.own_keys(),
            _ => Vec::new(),
        }
    }

    /// Invoke this value as a function.
    pub fn call(&self, this: &Value, args: &[Value]) -> Result<Value> {
        match self {
            Value::Object(obj) => obj.call(this, args),
            other => Err(ReactiveError::NotCallable {
                name: format!("{:?}", other),
            }),
        }
    }

    /// Resolve `name` on this value and invoke it with `this` bound to it.
    pub fn call_method(&self, name: &str, args: &[Value]) -> Result<Value> {
        let function = self.get(name);
        match &function {
            Value::Object(obj) if obj.kind() == ObjectKind::Function => obj.call(self, args),
            _ => Err(ReactiveError::NotCallable {
                name: name.to_string(),
            }),
        }
    }

    /// Shorthand for reading `length` as an index bound.
    pub fn len(&self) -> usize {
        to_length(&self.get("length"))
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Clamp a value to a non-negative integer length.
pub(crate) fn to_length(value: &Value) -> usize {
    match value {
        Value::Number(n) if n.is_finite() && *n > 0.0 => n.trunc() as usize,
        Value::Number(n) if *n == f64::INFINITY => usize::MAX,
        _ => 0,
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.same_value(other)
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => f.write_str("undefined"),
            Value::Null => f.write_str("null"),
            Value::Bool(b) => write!(f, "{}", b),
            Value::Number(n) => write!(f, "{}", n),
            Value::String(s) => write!(f, "{:?}", s),
            Value::Symbol(symbol) => write!(f, "{:?}", symbol),
            Value::Object(obj) => write!(f, "{:?}", obj),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Bool(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<u32> for Value {
    fn from(n: u32) -> Self {
        Value::Number(f64::from(n))
    }
}

impl From<i64> for Value {
    fn from(n: i64) -> Self {
        Value::Number(n as f64)
    }
}

impl From<usize> for Value {
    fn from(n: usize) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<String> for Value {
    fn from(s: String) -> Self {
        Value::String(Rc::from(s))
    }
}

impl From<Symbol> for Value {
    fn from(symbol: Symbol) -> Self {
        Value::Symbol(symbol)
    }
}

impl From<Obj> for Value {
    fn from(obj: Obj) -> Self {
        Value::Object(obj)
    }
}

impl From<&Value> for Value {
    fn from(value: &Value) -> Self {
        value.clone()
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(value: Option<T>) -> Self {
        value.map_or(Value::Undefined, Into::into)
    }
}
