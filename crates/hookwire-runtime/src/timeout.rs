#![forbid(unsafe_code)]

//! One-shot timeouts with a reactive pending flag.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use crate::config;
use crate::reactive::{Computed, Observable, on_scope_dispose, untracked};
use crate::source::Reactive;
use crate::timer::{self, TimerId, TimerQueue};

/// Options for [`use_timeout_fn`] and [`use_timeout`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutFnOptions {
    /// Start the timer on creation.
    pub immediate: bool,
    /// Also run the callback once on creation.
    pub immediate_callback: bool,
}

impl Default for TimeoutFnOptions {
    fn default() -> Self {
        Self {
            immediate: true,
            immediate_callback: false,
        }
    }
}

struct TimeoutInner {
    queue: TimerQueue,
    callback: Rc<dyn Fn()>,
    interval: Reactive<Duration>,
    timer: Rc<Cell<Option<TimerId>>>,
    pending: Observable<bool>,
}

impl TimeoutInner {
    fn clear(&self) {
        if let Some(id) = self.timer.take() {
            self.queue.clear(id);
        }
    }

    fn stop(&self) {
        self.pending.set(false);
        self.clear();
    }

    fn start(&self) {
        self.clear();
        self.pending.set(true);
        let delay = untracked(|| self.interval.get());
        let (pending, slot, callback) = (
            self.pending.clone(),
            Rc::clone(&self.timer),
            Rc::clone(&self.callback),
        );
        let id = self.queue.set_timeout(delay, move || {
            pending.set(false);
            slot.set(None);
            callback();
        });
        self.timer.set(Some(id));
    }
}

impl Drop for TimeoutInner {
    fn drop(&mut self) {
        self.clear();
    }
}

/// Controls for a one-shot timeout.
///
/// Outside an effect scope, dropping the last clone cancels the timeout.
#[must_use = "dropping the controls of an unscoped timeout cancels it"]
#[derive(Clone)]
pub struct TimeoutFn {
    inner: Rc<TimeoutInner>,
}

impl TimeoutFn {
    /// Whether the timeout is armed (tracked read).
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.pending.get()
    }

    #[must_use]
    pub fn pending(&self) -> Observable<bool> {
        self.inner.pending.clone()
    }

    /// (Re)arm the timeout with the current interval.
    pub fn start(&self) {
        self.inner.start();
    }

    /// Cancel without running the callback.
    pub fn stop(&self) {
        self.inner.stop();
    }
}

impl std::fmt::Debug for TimeoutFn {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimeoutFn")
            .field("pending", &self.inner.pending.get_untracked())
            .finish()
    }
}

/// Run `callback` once after `interval`.
pub fn use_timeout_fn(
    callback: impl Fn() + 'static,
    interval: impl Into<Reactive<Duration>>,
    options: TimeoutFnOptions,
) -> TimeoutFn {
    let inner = Rc::new(TimeoutInner {
        queue: timer::current(),
        callback: Rc::new(callback),
        interval: interval.into(),
        timer: Rc::new(Cell::new(None)),
        pending: Observable::new(false),
    });

    if options.immediate {
        inner.start();
    }
    if options.immediate_callback {
        (inner.callback)();
    }

    let scoped = Rc::clone(&inner);
    on_scope_dispose(move || scoped.stop());

    TimeoutFn { inner }
}

/// A timeout exposed as a `ready` flag.
#[must_use = "dropping an unscoped timeout cancels it"]
#[derive(Clone)]
pub struct Timeout {
    ready: Computed<bool>,
    controls: TimeoutFn,
}

impl Timeout {
    /// `true` once the timeout has elapsed or was stopped (tracked read).
    #[must_use]
    pub fn is_ready(&self) -> bool {
        self.ready.get()
    }

    #[must_use]
    pub fn ready(&self) -> Computed<bool> {
        self.ready.clone()
    }

    pub fn start(&self) {
        self.controls.start();
    }

    pub fn stop(&self) {
        self.controls.stop();
    }

    #[must_use]
    pub fn controls(&self) -> &TimeoutFn {
        &self.controls
    }
}

impl std::fmt::Debug for Timeout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Timeout")
            .field("controls", &self.controls)
            .finish()
    }
}

/// A `ready` flag that turns true after `interval`. `None` uses the
/// configured default timeout.
pub fn use_timeout(interval: Option<Reactive<Duration>>, options: TimeoutFnOptions) -> Timeout {
    let interval = interval.unwrap_or_else(|| Reactive::Static(config::defaults().timeout));
    let controls = use_timeout_fn(|| {}, interval, options);
    let ready = Computed::from_observable(&controls.inner.pending, |pending| !pending);
    Timeout { ready, controls }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::EffectScope;
    use crate::timer::install;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[test]
    fn fires_once_after_interval() {
        let q = TimerQueue::manual();
        let _guard = install(q.clone());
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let t = use_timeout_fn(move || h.set(h.get() + 1), ms(20), TimeoutFnOptions::default());
        assert!(t.is_pending());

        q.advance(ms(19));
        assert_eq!(hits.get(), 0);
        q.advance(ms(1));
        assert_eq!(hits.get(), 1);
        assert!(!t.is_pending());
        q.advance(ms(100));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn stop_cancels_and_start_rearms() {
        let q = TimerQueue::manual();
        let _guard = install(q.clone());
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let t = use_timeout_fn(move || h.set(h.get() + 1), ms(10), TimeoutFnOptions::default());
        t.stop();
        q.advance(ms(20));
        assert_eq!(hits.get(), 0);

        t.start();
        q.advance(ms(5));
        t.start();
        q.advance(ms(5));
        assert_eq!(hits.get(), 0, "restart pushed the deadline");
        q.advance(ms(5));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn immediate_callback_runs_now() {
        let q = TimerQueue::manual();
        let _guard = install(q.clone());
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        let t = use_timeout_fn(
            move || h.set(h.get() + 1),
            ms(10),
            TimeoutFnOptions {
                immediate: false,
                immediate_callback: true,
            },
        );
        assert_eq!(hits.get(), 1);
        assert!(!t.is_pending());
    }

    #[test]
    fn ready_flag_follows_pending() {
        let q = TimerQueue::manual();
        let _guard = install(q.clone());
        let t = use_timeout(Some(ms(10).into()), TimeoutFnOptions::default());
        assert!(!t.is_ready());
        q.advance(ms(10));
        assert!(t.is_ready());
        t.start();
        assert!(!t.is_ready());
    }

    #[test]
    fn scope_disposal_stops() {
        let q = TimerQueue::manual();
        let _guard = install(q.clone());
        let scope = EffectScope::new();
        let t = scope
            .run(|| use_timeout(Some(ms(10).into()), TimeoutFnOptions::default()))
            .unwrap();
        scope.stop();
        assert!(t.is_ready());
        assert_eq!(q.pending(), 0);
    }
}
