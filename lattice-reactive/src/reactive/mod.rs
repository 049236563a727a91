//! Reactive Proxies
//!
//! This module implements transparent dependency tracking over plain data:
//! records, arrays, maps and sets are wrapped in proxies whose traps report
//! reads to [`track`](crate::tracking::track) and writes to
//! [`trigger`](crate::tracking::trigger).
//!
//! # Concepts
//!
//! ## Variants
//!
//! Every wrapper is one of four [`Variant`]s. Deep variants wrap nested
//! objects lazily, on the read that reaches them; shallow variants wrap only
//! the root. Readonly variants never track and reject every write.
//!
//! ## Identity
//!
//! There is exactly one live wrapper per `(raw value, variant)`. Wrapping a
//! wrapper returns it unchanged, except that a readonly wrapper may be layered
//! over a mutable one. [`to_raw`] always peels back to the original value.
//!
//! ## Boxes
//!
//! A boxed reference stored in a deep wrapper reads as its contents, and
//! writing a plain value to that key updates the box in place. Array elements
//! are the exception: they hand out the box itself.
//!
//! # Implementation Notes
//!
//! Handlers are `'static` trait objects chosen when the wrapper is built, so
//! dispatching a trap is a single virtual call. Flag keys (`__v_raw` and
//! friends) are a separate key variant that cannot be stored as data.

mod array_shims;
mod base_handlers;
mod boxed;
mod collection_handlers;
mod factory;
mod flags;
mod handler;
pub(crate) mod registry;
mod target;

pub use boxed::{boxed, is_boxed, readonly_boxed, shallow_boxed, unbox};
pub use factory::{reactive, readonly, shallow_reactive, shallow_readonly, to_reactive, to_readonly, wrap, Variant};
pub use flags::{is_proxy, is_reactive, is_readonly, is_shallow, mark_raw, to_raw, ReactiveFlag};
pub use handler::ProxyHandler;
pub use target::{classify, TargetType};

pub(crate) use boxed::BoxedRef;
