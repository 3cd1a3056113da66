#![forbid(unsafe_code)]

//! Pausable intervals.
//!
//! [`use_interval_fn`] runs a callback every `interval` on the current
//! [`TimerQueue`](crate::timer::TimerQueue). The interval may be reactive:
//! when it changes while the timer is active, the timer restarts with the
//! new period. A zero interval never starts.
//!
//! [`use_interval`] counts ticks into an observable.

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use crate::config;
use crate::reactive::{Observable, WatchHandle, WatchOptions, on_scope_dispose, untracked, watch};
use crate::source::Reactive;
use crate::timer::{self, TimerId, TimerQueue};

/// Options for [`use_interval_fn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IntervalFnOptions {
    /// Start the timer on creation.
    pub immediate: bool,
    /// Run the callback right away on every `resume`.
    pub immediate_callback: bool,
}

impl Default for IntervalFnOptions {
    fn default() -> Self {
        Self {
            immediate: true,
            immediate_callback: false,
        }
    }
}

struct IntervalInner {
    queue: TimerQueue,
    callback: Rc<dyn Fn()>,
    interval: Reactive<Duration>,
    immediate_callback: bool,
    timer: Cell<Option<TimerId>>,
    active: Observable<bool>,
    watcher: RefCell<Option<WatchHandle>>,
}

impl IntervalInner {
    fn clean(&self) {
        if let Some(id) = self.timer.take() {
            self.queue.clear(id);
        }
    }

    fn pause(&self) {
        self.active.set(false);
        self.clean();
    }

    fn resume(&self) {
        let period = untracked(|| self.interval.get());
        if period.is_zero() {
            return;
        }
        self.active.set(true);
        if self.immediate_callback {
            (self.callback)();
        }
        self.clean();
        if self.active.get_untracked() {
            let callback = Rc::clone(&self.callback);
            self.timer
                .set(Some(self.queue.set_interval(period, move || callback())));
        }
    }
}

impl Drop for IntervalInner {
    fn drop(&mut self) {
        self.clean();
        if let Some(watcher) = self.watcher.get_mut().take() {
            watcher.stop();
        }
    }
}

/// Controls for a running interval.
///
/// Outside an effect scope, dropping the last clone stops the interval.
#[must_use = "dropping the controls of an unscoped interval stops it"]
#[derive(Clone)]
pub struct Pausable {
    inner: Rc<IntervalInner>,
}

impl Pausable {
    /// Whether the timer is running (tracked read).
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Observable view of [`is_active`](Self::is_active).
    #[must_use]
    pub fn active(&self) -> Observable<bool> {
        self.inner.active.clone()
    }

    pub fn pause(&self) {
        self.inner.pause();
    }

    /// Restart the timer with the current interval.
    pub fn resume(&self) {
        self.inner.resume();
    }
}

impl std::fmt::Debug for Pausable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pausable")
            .field("active", &self.inner.active.get_untracked())
            .finish()
    }
}

/// Call `callback` every `interval`.
pub fn use_interval_fn(
    callback: impl Fn() + 'static,
    interval: impl Into<Reactive<Duration>>,
    options: IntervalFnOptions,
) -> Pausable {
    let inner = Rc::new(IntervalInner {
        queue: timer::current(),
        callback: Rc::new(callback),
        interval: interval.into(),
        immediate_callback: options.immediate_callback,
        timer: Cell::new(None),
        active: Observable::new(false),
        watcher: RefCell::new(None),
    });

    if options.immediate {
        inner.resume();
    }

    if !inner.interval.is_static() {
        let weak = Rc::downgrade(&inner);
        let source = inner.interval.clone();
        let watcher = watch(
            move || source.get(),
            move |_, _| {
                if let Some(inner) = weak.upgrade() {
                    if inner.active.get_untracked() {
                        inner.resume();
                    }
                }
            },
            WatchOptions::default(),
        );
        *inner.watcher.borrow_mut() = Some(watcher);
    }

    let scoped = Rc::clone(&inner);
    on_scope_dispose(move || scoped.pause());

    Pausable { inner }
}

/// Options for [`use_interval`].
#[derive(Clone, Default)]
pub struct IntervalOptions {
    /// Start counting on creation. Defaults to `true`.
    pub immediate: Option<bool>,
    /// Called with the new count after every tick.
    pub callback: Option<Rc<dyn Fn(u64)>>,
}

impl std::fmt::Debug for IntervalOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IntervalOptions")
            .field("immediate", &self.immediate)
            .field("callback", &self.callback.is_some())
            .finish()
    }
}

/// A tick counter driven by an interval.
#[must_use = "dropping the counter of an unscoped interval stops it"]
#[derive(Clone, Debug)]
pub struct IntervalCounter {
    counter: Observable<u64>,
    controls: Pausable,
}

impl IntervalCounter {
    /// Ticks so far (tracked read).
    #[must_use]
    pub fn count(&self) -> u64 {
        self.counter.get()
    }

    #[must_use]
    pub fn counter(&self) -> Observable<u64> {
        self.counter.clone()
    }

    pub fn reset(&self) {
        self.counter.set(0);
    }

    #[must_use]
    pub fn controls(&self) -> &Pausable {
        &self.controls
    }

    pub fn pause(&self) {
        self.controls.pause();
    }

    pub fn resume(&self) {
        self.controls.resume();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.controls.is_active()
    }
}

/// Count ticks of an interval. `None` uses the configured default interval.
pub fn use_interval(
    interval: Option<Reactive<Duration>>,
    options: IntervalOptions,
) -> IntervalCounter {
    let interval = interval.unwrap_or_else(|| Reactive::Static(config::defaults().interval));
    let counter = Observable::new(0_u64);
    let tick = {
        let counter = counter.clone();
        let callback = options.callback.clone();
        move || {
            counter.update(|n| *n += 1);
            if let Some(callback) = &callback {
                callback(counter.get_untracked());
            }
        }
    };
    let controls = use_interval_fn(
        tick,
        interval,
        IntervalFnOptions {
            immediate: options.immediate.unwrap_or(true),
            immediate_callback: false,
        },
    );
    IntervalCounter { counter, controls }
}
