//! Lattice Reactive
//!
//! This crate provides the transparent dependency-tracking layer of the
//! Lattice runtime. It implements:
//!
//! - A small structural value model (records, arrays, maps, sets, boxes)
//! - Reactive, shallow and readonly proxies over those values
//! - A single-threaded tracking runtime with effects as readers
//!
//! Reads through a proxy are recorded as dependencies of the running reader;
//! writes through a proxy re-run the readers that depend on what changed. No
//! manual subscription is involved.
//!
//! # Architecture
//!
//! The crate is organized into several modules:
//!
//! - `value`: the dynamic object model the proxies operate on
//! - `reactive`: proxy construction, the variant registry and trap handlers
//! - `tracking`: `track` / `trigger`, the should-track stack and effects
//! - `config`: per-thread settings for diagnostics
//!
//! # Example
//!
//! ```rust,ignore
//! use lattice_reactive::{reactive, Effect, Value};
//!
//! // Wrap a plain record
//! let state = reactive(&Value::record([("count", 0)]));
//!
//! // Create an effect that reads from it
//! let observed = state.clone();
//! let _effect = Effect::new(move || {
//!     println!("Count: {:?}", observed.get("count"));
//! });
//!
//! // Write through the proxy
//! state.set("count", 5);
//! // Effect automatically runs, prints: "Count: 5"
//! ```

pub mod config;
pub mod error;
pub mod reactive;
pub mod tracking;
pub mod value;

pub use config::ReactiveConfig;
pub use error::{ReactiveError, Result};
pub use reactive::{
    boxed, is_boxed, is_proxy, is_reactive, is_readonly, is_shallow, mark_raw, reactive, readonly,
    readonly_boxed, shallow_boxed, shallow_reactive, shallow_readonly, to_raw, to_reactive,
    to_readonly, unbox, wrap, ReactiveFlag, Variant,
};
pub use tracking::{pause_tracking, track, trigger, Effect, EffectOptions, TrackOpType, TriggerOpType};
pub use value::{Obj, PropertyKey, Symbol, Value, WellKnownSymbol};
