#![forbid(unsafe_code)]

//! Dependency-tracked watchers.
//!
//! [`watch`] runs a getter under dependency tracking, subscribes to every
//! source it read, and invokes a callback with the new and previous getter
//! results whenever one of those sources changes. Dependencies are
//! re-collected on every run, so a getter that reads different observables
//! depending on state always watches exactly what it last read.
//!
//! # Flush timing
//!
//! - [`Flush::Post`] (default): the run is queued to the post-flush phase of
//!   the update cycle (see [`batch`](super::batch)). Several triggers inside
//!   one cycle produce one run that sees the settled state.
//! - [`Flush::Sync`]: the run happens inside the triggering notification.
//!
//! # Invariants
//!
//! 1. After `stop()` the callback never runs again.
//! 2. A trigger that arrives while the watcher is running schedules exactly
//!    one extra run after the current one finishes.
//! 3. A watcher created inside an [`EffectScope`](super::EffectScope) is
//!    stopped when the scope stops.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::batch::{self, PostJob};
use super::observable::Subscription;
use super::scope::on_scope_dispose;
use super::tracking;
use crate::config;

/// When a triggered watcher runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Flush {
    /// Inline, inside the notification that triggered it.
    Sync,
    /// After every notification of the current update cycle has run.
    #[default]
    Post,
}

/// Options for [`watch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchOptions {
    /// Invoke the callback once at creation with no previous value.
    pub immediate: bool,
    pub flush: Flush,
}

impl Default for WatchOptions {
    fn default() -> Self {
        Self {
            immediate: false,
            flush: config::defaults().watch_flush,
        }
    }
}

impl WatchOptions {
    #[must_use]
    pub fn immediate(mut self, on: bool) -> Self {
        self.immediate = on;
        self
    }

    #[must_use]
    pub fn flush(mut self, flush: Flush) -> Self {
        self.flush = flush;
        self
    }
}

type WatchCallback<S> = Box<dyn FnMut(&S, Option<&S>)>;

struct WatcherInner<S> {
    getter: Box<dyn Fn() -> S>,
    callback: RefCell<WatchCallback<S>>,
    last: RefCell<Option<S>>,
    deps: RefCell<Vec<Subscription>>,
    flush: Flush,
    active: Cell<bool>,
    queued: Cell<bool>,
    running: Cell<bool>,
    rerun: Cell<bool>,
    runs: Cell<u64>,
}

struct RunningGuard<'a>(&'a Cell<bool>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl<S: 'static> WatcherInner<S> {
    fn run(self: &Rc<Self>, mut invoke: bool) {
        if !self.active.get() {
            return;
        }
        if self.running.replace(true) {
            self.rerun.set(true);
            return;
        }
        let _running = RunningGuard(&self.running);

        loop {
            self.rerun.set(false);
            let (value, sources) = tracking::collect(|| (self.getter)());
            self.resubscribe(sources);

            if invoke {
                let previous = self.last.borrow_mut().take();
                (self.callback.borrow_mut())(&value, previous.as_ref());
                self.runs.set(self.runs.get() + 1);
            }
            *self.last.borrow_mut() = Some(value);
            invoke = true;

            if !self.rerun.get() || !self.active.get() {
                break;
            }
        }
    }

    fn resubscribe(self: &Rc<Self>, sources: Vec<Rc<dyn tracking::TrackedSource>>) {
        // Release the previous run's entries first so `subscribe` can prune them.
        let stale = std::mem::take(&mut *self.deps.borrow_mut());
        drop(stale);
        let fresh: Vec<Subscription> = sources
            .iter()
            .map(|source| {
                let weak: Weak<Self> = Rc::downgrade(self);
                source.subscribe_change(Rc::new(move || {
                    if let Some(watcher) = weak.upgrade() {
                        watcher.schedule();
                    }
                }))
            })
            .collect();
        *self.deps.borrow_mut() = fresh;
    }

    fn schedule(self: &Rc<Self>) {
        if !self.active.get() {
            return;
        }
        match self.flush {
            Flush::Sync => self.run(true),
            Flush::Post => {
                if !self.queued.replace(true) {
                    let job: Weak<dyn PostJob> = Rc::downgrade(self) as Weak<dyn PostJob>;
                    batch::queue_post_job(job);
                }
            }
        }
    }
}

impl<S: 'static> PostJob for WatcherInner<S> {
    fn run_post(self: Rc<Self>) {
        self.queued.set(false);
        self.run(true);
    }
}

trait WatchControl {
    fn stop(&self);
    fn is_active(&self) -> bool;
    fn run_count(&self) -> u64;
}

impl<S> WatchControl for WatcherInner<S> {
    fn stop(&self) {
        if self.active.replace(false) {
            self.deps.borrow_mut().clear();
        }
    }

    fn is_active(&self) -> bool {
        self.active.get()
    }

    fn run_count(&self) -> u64 {
        self.runs.get()
    }
}

/// Handle to a running watcher.
///
/// Dropping the last handle outside of a scope stops the watcher, since
/// nothing else keeps it alive.
#[must_use = "dropping the handle of an unscoped watcher stops it"]
#[derive(Clone)]
pub struct WatchHandle {
    inner: Rc<dyn WatchControl>,
}

impl WatchHandle {
    /// Stop the watcher. Idempotent.
    pub fn stop(&self) {
        self.inner.stop();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.is_active()
    }

    /// Number of callback invocations so far.
    #[must_use]
    pub fn run_count(&self) -> u64 {
        self.inner.run_count()
    }
}

impl std::fmt::Debug for WatchHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WatchHandle")
            .field("active", &self.inner.is_active())
            .field("runs", &self.inner.run_count())
            .finish()
    }
}

/// Watch `getter` and call `callback(new, previous)` when its dependencies
/// change.
///
/// The getter runs once immediately to collect dependencies; with
/// `options.immediate` the callback also runs then, with `previous == None`.
pub fn watch<S: 'static>(
    getter: impl Fn() -> S + 'static,
    callback: impl FnMut(&S, Option<&S>) + 'static,
    options: WatchOptions,
) -> WatchHandle {
    let inner = Rc::new(WatcherInner {
        getter: Box::new(getter),
        callback: RefCell::new(Box::new(callback)),
        last: RefCell::new(None),
        deps: RefCell::new(Vec::new()),
        flush: options.flush,
        active: Cell::new(true),
        queued: Cell::new(false),
        running: Cell::new(false),
        rerun: Cell::new(false),
        runs: Cell::new(0),
    });

    let scoped = Rc::clone(&inner);
    on_scope_dispose(move || scoped.stop());

    inner.run(options.immediate);
    WatchHandle { inner }
}
