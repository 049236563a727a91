//! Property keys, symbols and collection key identities.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use super::{ObjectId, Value};
use crate::reactive::ReactiveFlag;

/// Symbols the runtime defines itself.
///
/// Reads keyed by these are never tracked: they are looked up by language
/// machinery (iteration, coercion), not by user code depending on data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WellKnownSymbol {
    AsyncIterator,
    HasInstance,
    IsConcatSpreadable,
    Iterator,
    Match,
    MatchAll,
    Replace,
    Search,
    Species,
    Split,
    ToPrimitive,
    ToStringTag,
    Unscopables,
}

/// A symbol key.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum Symbol {
    /// A runtime builtin symbol.
    WellKnown(WellKnownSymbol),
    /// A symbol created by user code; unique per creation.
    User {
        id: u64,
        description: Option<Rc<str>>,
    },
}

impl Symbol {
    /// Create a fresh user symbol.
    pub fn new(description: Option<&str>) -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Symbol::User {
            id: COUNTER.fetch_add(1, Ordering::Relaxed),
            description: description.map(Rc::from),
        }
    }

    /// Whether this is one of the runtime builtin symbols.
    pub fn is_well_known(&self) -> bool {
        matches!(self, Symbol::WellKnown(_))
    }
}

impl From<WellKnownSymbol> for Symbol {
    fn from(symbol: WellKnownSymbol) -> Self {
        Symbol::WellKnown(symbol)
    }
}

impl fmt::Debug for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Symbol::WellKnown(symbol) => write!(f, "Symbol.{:?}", symbol),
            Symbol::User { description, .. } => {
                write!(f, "Symbol({})", description.as_deref().unwrap_or(""))
            }
        }
    }
}

/// A key addressing a property of a record or array.
#[derive(Clone, PartialEq, Eq, Hash)]
pub enum PropertyKey {
    /// Canonical array index.
    Index(u32),
    /// Any string key that is not a canonical index.
    String(Rc<str>),
    Symbol(Symbol),
    /// Reserved sentinel key; never stored as data.
    Flag(ReactiveFlag),
}

impl PropertyKey {
    /// Whether the key is a canonical integer index.
    pub fn is_integer_key(&self) -> bool {
        matches!(self, PropertyKey::Index(_))
    }

    /// The index, for integer keys.
    pub fn as_index(&self) -> Option<u32> {
        match self {
            PropertyKey::Index(index) => Some(*index),
            _ => None,
        }
    }

    /// The string, for non-index string keys.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            PropertyKey::String(s) => Some(s),
            _ => None,
        }
    }

    /// Whether this key is the string `name`.
    pub fn is(&self, name: &str) -> bool {
        self.as_str() == Some(name)
    }

    /// Convert the key to the value it would have as a collection entry.
    pub fn to_value(&self) -> Value {
        match self {
            PropertyKey::Index(index) => Value::Number(f64::from(*index)),
            PropertyKey::String(s) => Value::String(s.clone()),
            PropertyKey::Symbol(symbol) => Value::Symbol(symbol.clone()),
            PropertyKey::Flag(_) => Value::Undefined,
        }
    }
}

/// Parse a canonical array index: `"0"` or digits without a leading zero,
/// strictly below `u32::MAX`.
fn parse_index(s: &str) -> Option<u32> {
    if s.is_empty() || (s.len() > 1 && s.starts_with('0')) {
        return None;
    }
    if !s.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    s.parse::<u32>().ok().filter(|index| *index != u32::MAX)
}

impl From<&str> for PropertyKey {
    fn from(s: &str) -> Self {
        match parse_index(s) {
            Some(index) => PropertyKey::Index(index),
            None => PropertyKey::String(Rc::from(s)),
        }
    }
}

impl From<String> for PropertyKey {
    fn from(s: String) -> Self {
        PropertyKey::from(s.as_str())
    }
}

impl From<Rc<str>> for PropertyKey {
    fn from(s: Rc<str>) -> Self {
        match parse_index(&s) {
            Some(index) => PropertyKey::Index(index),
            None => PropertyKey::String(s),
        }
    }
}

impl From<u32> for PropertyKey {
    fn from(index: u32) -> Self {
        if index == u32::MAX {
            PropertyKey::String(Rc::from(index.to_string()))
        } else {
            PropertyKey::Index(index)
        }
    }
}

impl From<usize> for PropertyKey {
    fn from(index: usize) -> Self {
        match u32::try_from(index) {
            Ok(index) => PropertyKey::from(index),
            Err(_) => PropertyKey::String(Rc::from(index.to_string())),
        }
    }
}

impl From<Symbol> for PropertyKey {
    fn from(symbol: Symbol) -> Self {
        PropertyKey::Symbol(symbol)
    }
}

impl From<WellKnownSymbol> for PropertyKey {
    fn from(symbol: WellKnownSymbol) -> Self {
        PropertyKey::Symbol(Symbol::WellKnown(symbol))
    }
}

impl From<ReactiveFlag> for PropertyKey {
    fn from(flag: ReactiveFlag) -> Self {
        PropertyKey::Flag(flag)
    }
}

impl From<&PropertyKey> for PropertyKey {
    fn from(key: &PropertyKey) -> Self {
        key.clone()
    }
}

impl fmt::Debug for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Index(index) => write!(f, "{}", index),
            PropertyKey::String(s) => write!(f, "{:?}", s),
            PropertyKey::Symbol(symbol) => write!(f, "{:?}", symbol),
            PropertyKey::Flag(flag) => write!(f, "<{:?}>", flag),
        }
    }
}

impl fmt::Display for PropertyKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyKey::Index(index) => write!(f, "{}", index),
            PropertyKey::String(s) => f.write_str(s),
            other => write!(f, "{:?}", other),
        }
    }
}

/// Identity of a value under SameValueZero.
///
/// Used to key collection entries and dependency edges. Objects are keyed by
/// their id so that an identity never keeps an object alive.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyIdentity {
    Undefined,
    Null,
    Bool(bool),
    /// Bits of the number with `-0` folded into `0` and every NaN canonical.
    Number(u64),
    String(Rc<str>),
    Symbol(Symbol),
    Object(ObjectId),
}

impl KeyIdentity {
    pub fn of(value: &Value) -> Self {
        match value {
            Value::Undefined => KeyIdentity::Undefined,
            Value::Null => KeyIdentity::Null,
            Value::Bool(b) => KeyIdentity::Bool(*b),
            Value::Number(n) => {
                let n = if n.is_nan() {
                    f64::NAN
                } else if *n == 0.0 {
                    0.0
                } else {
                    *n
                };
                KeyIdentity::Number(n.to_bits())
            }
            Value::String(s) => KeyIdentity::String(s.clone()),
            Value::Symbol(symbol) => KeyIdentity::Symbol(symbol.clone()),
            Value::Object(obj) => KeyIdentity::Object(obj.id()),
        }
    }
}

/// A key stored in a map or set: owns the value, hashes by identity.
#[derive(Clone)]
pub struct MapKey {
    identity: KeyIdentity,
    value: Value,
}

impl MapKey {
    pub fn new(value: Value) -> Self {
        Self {
            identity: KeyIdentity::of(&value),
            value,
        }
    }

    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn identity(&self) -> &KeyIdentity {
        &self.identity
    }
}

impl PartialEq for MapKey {
    fn eq(&self, other: &Self) -> bool {
        self.identity == other.identity
    }
}

impl Eq for MapKey {}

impl Hash for MapKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.identity.hash(state);
    }
}

impl fmt::Debug for MapKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.value, f)
    }
}
