//! Error types for builtin invocation and JSON snapshots.
//!
//! Proxy traps never fail: malformed requests degrade to a passthrough or a
//! `false` result. The fallible surfaces are calling a function value and
//! taking a JSON snapshot.

use thiserror::Error;

/// Errors raised while invoking a builtin or user function.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ReactiveError {
    /// The resolved property is not a function.
    #[error("{name} is not a function")]
    NotCallable {
        /// Property name that was looked up
        name: String,
    },

    /// A builtin was called with a `this` of the wrong kind.
    #[error("method {method} called on incompatible receiver, expected {expected}")]
    IncompatibleReceiver {
        /// Builtin method name
        method: &'static str,
        /// Object kind the method operates on
        expected: &'static str,
    },

    /// A weak collection was given a primitive key or member.
    #[error("invalid value used as weak collection key: {0}")]
    InvalidWeakKey(String),

    /// An array length write with a value that is not a valid length.
    #[error("invalid array length: {0}")]
    InvalidArrayLength(f64),

    /// A JSON snapshot reached an object that contains itself.
    #[error("cannot convert cyclic value to JSON: {0}")]
    CyclicValue(String),
}

/// Result type alias for invocation.
pub type Result<T> = std::result::Result<T, ReactiveError>;
