#![forbid(unsafe_code)]

//! Lazy computed values that auto-update from [`Observable`] dependencies.
//!
//! # Design
//!
//! [`Computed<T>`] wraps a compute function and its cached result in shared,
//! reference-counted storage. When any dependency changes, the cached value is
//! invalidated (marked dirty) and an internal change counter is bumped. The
//! next call to [`get()`](Computed::get) recomputes and caches the result.
//!
//! Reads of a `Computed` are tracked through that change counter, so a
//! watcher that reads a computed value re-runs when the computed goes dirty,
//! even though a cached read never touches the underlying observables.
//!
//! # Invariants
//!
//! 1. `get()` always returns a value consistent with the current state of all
//!    dependencies.
//! 2. The compute function is called at most once per dependency change cycle.
//! 3. Version increments by exactly 1 per recomputation.
//!
//! # Failure Modes
//!
//! - **Compute function panics**: the dirty flag stays set so the next
//!   `get()` retries.
//! - **Dependency dropped**: the subscription becomes inert and the computed
//!   keeps its last cached result.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::observable::{Observable, Subscription};

struct ComputedInner<T> {
    compute: Box<dyn Fn() -> T>,
    cached: Option<T>,
    dirty: Cell<bool>,
    version: u64,
    _subscriptions: Vec<Subscription>,
}

/// A lazily-evaluated, memoized value derived from [`Observable`]
/// dependencies.
///
/// Cloning a `Computed` creates a new handle to the **same** inner state.
pub struct Computed<T> {
    inner: Rc<RefCell<ComputedInner<T>>>,
    changed: Observable<u64>,
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
            changed: self.changed.clone(),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Computed<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Computed")
            .field("cached", &inner.cached)
            .field("dirty", &inner.dirty.get())
            .field("version", &inner.version)
            .finish()
    }
}

fn mark_dirty<T>(weak: &Weak<RefCell<ComputedInner<T>>>, changed: &Observable<u64>) {
    let Some(strong) = weak.upgrade() else {
        return;
    };
    let was_dirty = strong.borrow().dirty.replace(true);
    if !was_dirty {
        changed.update(|n| *n = n.wrapping_add(1));
    }
}

impl<T: Clone + 'static> Computed<T> {
    fn with_compute(compute: Box<dyn Fn() -> T>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ComputedInner {
                compute,
                cached: None,
                dirty: Cell::new(true),
                version: 0,
                _subscriptions: Vec::new(),
            })),
            changed: Observable::new(0),
        }
    }

    fn watch_source<S: Clone + PartialEq + 'static>(&self, source: &Observable<S>) {
        let weak = Rc::downgrade(&self.inner);
        let changed = self.changed.clone();
        let sub = source.subscribe(move |_| mark_dirty(&weak, &changed));
        self.inner.borrow_mut()._subscriptions.push(sub);
    }

    /// Create a computed value derived from a single observable.
    pub fn from_observable<S: Clone + PartialEq + 'static>(
        source: &Observable<S>,
        map: impl Fn(&S) -> T + 'static,
    ) -> Self {
        let source_clone = source.clone();
        let this = Self::with_compute(Box::new(move || source_clone.with(|v| map(v))));
        this.watch_source(source);
        this
    }

    /// Create a computed value derived from two observables.
    pub fn from2<S1, S2>(
        s1: &Observable<S1>,
        s2: &Observable<S2>,
        map: impl Fn(&S1, &S2) -> T + 'static,
    ) -> Self
    where
        S1: Clone + PartialEq + 'static,
        S2: Clone + PartialEq + 'static,
    {
        let s1_clone = s1.clone();
        let s2_clone = s2.clone();
        let this = Self::with_compute(Box::new(move || {
            s1_clone.with(|v1| s2_clone.with(|v2| map(v1, v2)))
        }));
        this.watch_source(s1);
        this.watch_source(s2);
        this
    }

    /// Create a computed value from a standalone compute function and
    /// pre-built subscriptions.
    ///
    /// The caller wires invalidation; see [`invalidate`](Self::invalidate).
    pub fn from_fn(compute: impl Fn() -> T + 'static, subscriptions: Vec<Subscription>) -> Self {
        let this = Self::with_compute(Box::new(compute));
        this.inner.borrow_mut()._subscriptions = subscriptions;
        this
    }

    fn refresh(&self) {
        let mut inner = self.inner.borrow_mut();
        if inner.dirty.get() || inner.cached.is_none() {
            let value = super::tracking::untracked(|| (inner.compute)());
            inner.cached = Some(value);
            inner.dirty.set(false);
            inner.version += 1;
        }
    }

    /// Current value, recomputing if a dependency changed (tracked read).
    #[must_use]
    pub fn get(&self) -> T {
        self.with(T::clone)
    }

    /// Access the current value by reference without cloning.
    ///
    /// # Panics
    ///
    /// Panics if `f` re-enters `get()` on the same `Computed`.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        let _ = self.changed.get();
        loop {
            self.refresh();
            let inner = self.inner.borrow();
            if let Some(value) = inner.cached.as_ref() {
                return f(value);
            }
        }
    }

    /// Whether the cached value is stale.
    #[must_use]
    pub fn is_dirty(&self) -> bool {
        self.inner.borrow().dirty.get()
    }

    /// Force invalidation of the cached value.
    pub fn invalidate(&self) {
        mark_dirty(&Rc::downgrade(&self.inner), &self.changed);
    }

    /// Current version number. Increments by 1 on each recomputation.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }
}
