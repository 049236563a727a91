//! Reactive Context
//!
//! The reactive context tracks which reader is currently running, and whether
//! reads should be tracked at all.
//!
//! # Implementation
//!
//! Two thread-local stacks:
//!
//! - the context stack: the running reader is on top. Entering a reader pushes
//!   it, and the returned guard pops it. Nested readers (an effect that runs
//!   another effect synchronously) nest naturally.
//!
//! - the should-track stack: pausing or enabling tracking pushes the previous
//!   state and the guard restores it. A nested pause therefore never re-enables
//!   tracking for an enclosing paused caller, and every exit path (including
//!   unwinding) restores the state.

use std::cell::{Cell, RefCell};

use super::{DepLocation, SubscriberId};

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<ContextEntry>> = const { RefCell::new(Vec::new()) };
    static SHOULD_TRACK: Cell<bool> = const { Cell::new(true) };
    static TRACK_STACK: RefCell<Vec<bool>> = const { RefCell::new(Vec::new()) };
}

/// An entry in the reactive context stack.
#[derive(Debug, Clone)]
struct ContextEntry {
    /// The subscriber ID of the running reader.
    subscriber_id: SubscriberId,
    /// Locations newly tracked during this run.
    dependencies: Vec<DepLocation>,
}

/// Guard that pops the context when dropped.
pub struct ReactiveContext {
    subscriber_id: SubscriberId,
}

impl ReactiveContext {
    /// Enter a new reactive context for the given subscriber.
    ///
    /// The context is exited when the returned guard is dropped.
    pub fn enter(subscriber_id: SubscriberId) -> Self {
        CONTEXT_STACK.with(|stack| {
            stack.borrow_mut().push(ContextEntry {
                subscriber_id,
                dependencies: Vec::new(),
            });
        });

        Self { subscriber_id }
    }

    /// Check if there is an active reactive context.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| !stack.borrow().is_empty())
    }

    /// Get the current subscriber ID, if any.
    pub fn current_subscriber() -> Option<SubscriberId> {
        CONTEXT_STACK.with(|stack| stack.borrow().last().map(|entry| entry.subscriber_id))
    }

    /// Whether `subscriber_id` is running anywhere on the stack.
    pub fn is_running(subscriber_id: SubscriberId) -> bool {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .iter()
                .any(|entry| entry.subscriber_id == subscriber_id)
        })
    }

    /// Record a dependency of the current context.
    pub fn track_dependency(location: DepLocation) {
        CONTEXT_STACK.with(|stack| {
            if let Some(entry) = stack.borrow_mut().last_mut() {
                entry.dependencies.push(location);
            }
        });
    }

    /// Get the dependencies collected in the current context.
    pub fn get_dependencies() -> Vec<DepLocation> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|entry| entry.dependencies.clone())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        let _ = CONTEXT_STACK.try_with(|stack| {
            let popped = stack.borrow_mut().pop();

            if let Some(entry) = popped {
                debug_assert_eq!(
                    entry.subscriber_id, self.subscriber_id,
                    "ReactiveContext mismatch: expected {:?}, got {:?}",
                    self.subscriber_id, entry.subscriber_id
                );
            }
        });
    }
}

/// Restores the previous should-track state when dropped.
#[must_use = "tracking is restored as soon as the guard is dropped"]
pub struct TrackingGuard {
    _private: (),
}

fn push_tracking(enabled: bool) -> TrackingGuard {
    let previous = SHOULD_TRACK.with(|flag| flag.replace(enabled));
    TRACK_STACK.with(|stack| stack.borrow_mut().push(previous));
    TrackingGuard { _private: () }
}

/// Suppress tracking until the guard is dropped.
pub fn pause_tracking() -> TrackingGuard {
    push_tracking(false)
}

/// Force tracking on until the guard is dropped.
pub fn enable_tracking() -> TrackingGuard {
    push_tracking(true)
}

impl Drop for TrackingGuard {
    fn drop(&mut self) {
        let previous = TRACK_STACK
            .try_with(|stack| stack.borrow_mut().pop())
            .ok()
            .flatten()
            .unwrap_or(true);
        let _ = SHOULD_TRACK.try_with(|flag| flag.set(previous));
    }
}

/// Whether reads are currently being tracked (ignoring the context stack).
pub fn should_track() -> bool {
    SHOULD_TRACK.with(Cell::get)
}

/// Whether a read right now would record a dependency.
pub fn is_tracking() -> bool {
    should_track() && ReactiveContext::is_active()
}
