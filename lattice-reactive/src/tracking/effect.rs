//! Effect Implementation
//!
//! An Effect is a reader context: a side-effecting computation that re-runs
//! whenever a structural read it performed is invalidated by a write.
//!
//! # How Effects Work
//!
//! 1. When created, the effect runs its function immediately to establish
//!    initial dependencies (unless created lazily).
//!
//! 2. When any dependency changes, the effect is scheduled: its scheduler is
//!    called if it has one, otherwise it re-runs synchronously.
//!
//! 3. Before re-running, the effect drops its old edges and records new ones
//!    during execution, so branches no longer taken stop notifying it.
//!
//! An effect never triggers itself: writes it performs to slots it reads do
//! not re-enter it while it is running.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use super::context::{enable_tracking, ReactiveContext};
use super::runtime::{Reactive, ReactiveHandle, Runtime};
use super::{DebuggerEvent, DepLocation, SubscriberId};

/// Callback receiving debugger events.
pub type DebuggerHook = Rc<dyn Fn(&DebuggerEvent)>;

/// Options for creating an [`Effect`].
#[derive(Clone, Default)]
pub struct EffectOptions {
    /// Do not run on creation.
    pub lazy: bool,

    /// Let the effect be triggered by its own writes.
    pub allow_recurse: bool,

    /// Called instead of re-running when a dependency changes.
    pub scheduler: Option<Rc<dyn Fn()>>,

    /// Called for every new dependency edge.
    pub on_track: Option<DebuggerHook>,

    /// Called for every write that schedules the effect.
    pub on_trigger: Option<DebuggerHook>,
}

struct EffectInner {
    /// The subscriber ID used for dependency tracking.
    subscriber_id: SubscriberId,

    /// The effect function.
    run: Box<dyn Fn()>,

    options: EffectOptions,

    /// Edges recorded during the last run.
    dependencies: RefCell<Vec<DepLocation>>,

    /// Whether the effect has been disposed.
    disposed: Cell<bool>,

    /// Number of times the effect has run.
    run_count: Cell<usize>,
}

impl EffectInner {
    fn execute(&self) {
        if self.disposed.get() || ReactiveContext::is_running(self.subscriber_id) {
            return;
        }

        self.cleanup();

        let _ctx = ReactiveContext::enter(self.subscriber_id);
        let _tracking = enable_tracking();

        (self.run)();

        *self.dependencies.borrow_mut() = ReactiveContext::get_dependencies();
        self.run_count.set(self.run_count.get() + 1);
    }

    fn cleanup(&self) {
        let stale = std::mem::take(&mut *self.dependencies.borrow_mut());
        Runtime::remove_dependencies(self.subscriber_id, &stale);
    }
}

impl Reactive for EffectInner {
    fn subscriber_id(&self) -> SubscriberId {
        self.subscriber_id
    }

    fn schedule(&self) {
        if self.disposed.get() {
            return;
        }
        match &self.options.scheduler {
            Some(scheduler) => scheduler(),
            None => self.execute(),
        }
    }

    fn allow_recurse(&self) -> bool {
        self.options.allow_recurse
    }

    fn on_track(&self, event: &DebuggerEvent) {
        if let Some(hook) = &self.options.on_track {
            hook(event);
        }
    }

    fn on_trigger(&self, event: &DebuggerEvent) {
        if let Some(hook) = &self.options.on_trigger {
            hook(event);
        }
    }
}

/// A side-effecting computation that runs when dependencies change.
///
/// # Example
///
/// ```rust,ignore
/// let state = reactive(Value::record([("count", 0)]));
///
/// let observed = state.clone();
/// let effect = Effect::new(move || {
///     println!("count is {:?}", observed.get("count"));
/// });
///
/// state.set("count", 5);  // Prints: "count is 5"
/// ```
#[derive(Clone)]
pub struct Effect {
    inner: Rc<EffectInner>,
    _handle: Rc<ReactiveHandle>,
}

impl Effect {
    /// Create a new effect with the given function.
    ///
    /// The function runs immediately to establish initial dependencies.
    pub fn new<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::with_options(run, EffectOptions::default())
    }

    /// Create a new effect without running it immediately.
    pub fn new_lazy<F>(run: F) -> Self
    where
        F: Fn() + 'static,
    {
        Self::with_options(
            run,
            EffectOptions {
                lazy: true,
                ..EffectOptions::default()
            },
        )
    }

    /// Create a new effect with explicit options.
    pub fn with_options<F>(run: F, options: EffectOptions) -> Self
    where
        F: Fn() + 'static,
    {
        let lazy = options.lazy;
        let inner = Rc::new(EffectInner {
            subscriber_id: SubscriberId::new(),
            run: Box::new(run),
            options,
            dependencies: RefCell::new(Vec::new()),
            disposed: Cell::new(false),
            run_count: Cell::new(0),
        });
        let handle = Runtime::register(inner.clone());

        let effect = Self {
            inner,
            _handle: Rc::new(handle),
        };

        if !lazy {
            effect.execute();
        }

        effect
    }

    /// Get the subscriber ID for this effect.
    pub fn subscriber_id(&self) -> SubscriberId {
        self.inner.subscriber_id
    }

    /// Execute the effect function, tracking its reads.
    pub fn execute(&self) {
        self.inner.execute();
    }

    /// Schedule the effect as if a dependency had changed.
    pub fn schedule(&self) {
        self.inner.schedule();
    }

    /// Dispose of the effect.
    ///
    /// After disposal, the effect will not run again and holds no edges.
    pub fn dispose(&self) {
        self.inner.disposed.set(true);
        self.inner.cleanup();
    }

    /// Check if the effect has been disposed.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// Get the number of times the effect has run.
    pub fn run_count(&self) -> usize {
        self.inner.run_count.get()
    }

    /// Get the number of dependency edges recorded by the last run.
    pub fn dependency_count(&self) -> usize {
        self.inner.dependencies.borrow().len()
    }

    /// The edges recorded by the last run.
    pub fn dependencies(&self) -> Vec<DepLocation> {
        self.inner.dependencies.borrow().clone()
    }
}

impl std::fmt::Debug for Effect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Effect")
            .field("subscriber_id", &self.inner.subscriber_id)
            .field("run_count", &self.run_count())
            .field("dependency_count", &self.dependency_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effect_runs_on_creation() {
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        let _effect = Effect::new(move || {
            run_count_clone.set(run_count_clone.get() + 1);
        });

        // Effect should have run once on creation
        assert_eq!(run_count.get(), 1);
    }

    #[test]
    fn effect_lazy_does_not_run_on_creation() {
        let run_count = Rc::new(Cell::new(0));
        let run_count_clone = run_count.clone();

        let effect = Effect::new_lazy(move || {
            run_count_clone.set(run_count_clone.get() + 1);
        });

        assert_eq!(run_count.get(), 0);
        assert_eq!(effect.run_count(), 0);

        effect.execute();
        assert_eq!(run_count.get(), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_uses_scheduler_when_scheduled() {
        let scheduled = Rc::new(Cell::new(0));
        let scheduled_clone = scheduled.clone();

        let effect = Effect::with_options(
            || {},
            EffectOptions {
                scheduler: Some(Rc::new(move || scheduled_clone.set(scheduled_clone.get() + 1))),
                ..EffectOptions::default()
            },
        );

        assert_eq!(effect.run_count(), 1);
        effect.schedule();
        assert_eq!(scheduled.get(), 1);
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_does_not_run_after_disposal() {
        let effect = Effect::new(|| {});
        assert_eq!(effect.run_count(), 1);

        effect.dispose();
        assert!(effect.is_disposed());

        effect.schedule();
        effect.execute();
        assert_eq!(effect.run_count(), 1);
    }

    #[test]
    fn effect_clone_shares_state() {
        let effect1 = Effect::new(|| {});
        let effect2 = effect1.clone();

        assert_eq!(effect1.subscriber_id(), effect2.subscriber_id());

        effect1.execute();
        assert_eq!(effect2.run_count(), 2);

        effect1.dispose();
        assert!(effect2.is_disposed());
    }

    #[test]
    fn dropping_all_clones_unregisters() {
        let effect = Effect::new(|| {});
        let id = effect.subscriber_id();
        assert!(Runtime::lookup(id).is_some());

        drop(effect);
        assert!(Runtime::lookup(id).is_none());
    }
}
