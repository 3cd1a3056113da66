#![forbid(unsafe_code)]

//! Debounced and throttled callbacks.
//!
//! Both wrappers take the argument of the most recent call: when several
//! calls collapse into one invocation, the last arguments win.
//!
//! # Debounce
//!
//! Every call restarts a `wait` timer; the callback runs when the timer
//! elapses. With `max_wait`, the callback also runs at most `max_wait` after
//! the first call of a burst, however long the burst lasts. A zero `wait`
//! runs the callback synchronously.
//!
//! # Throttle
//!
//! At most one invocation per `wait` window. `leading` runs the first call
//! of a window immediately; `trailing` runs the last suppressed call when
//! the window closes.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};
use std::time::Duration;

use crate::config;
use crate::reactive::{on_scope_dispose, untracked};
use crate::source::Reactive;
use crate::timer::{self, TimerId, TimerQueue};

/// Options for [`use_debounce_fn`].
#[derive(Debug, Clone, Default)]
pub struct DebounceOptions {
    /// Upper bound on how long a burst of calls can delay the callback.
    pub max_wait: Option<Reactive<Duration>>,
}

struct DebounceInner<A> {
    queue: TimerQueue,
    callback: Box<dyn Fn(A)>,
    wait: Reactive<Duration>,
    max_wait: Option<Reactive<Duration>>,
    timer: Cell<Option<TimerId>>,
    max_timer: Cell<Option<TimerId>>,
    args: RefCell<Option<A>>,
}

impl<A: 'static> DebounceInner<A> {
    fn clear_timer(&self, slot: &Cell<Option<TimerId>>) {
        if let Some(id) = slot.take() {
            self.queue.clear(id);
        }
    }

    fn cancel(&self) {
        self.clear_timer(&self.timer);
        self.clear_timer(&self.max_timer);
        self.args.borrow_mut().take();
    }

    fn invoke(&self) {
        self.clear_timer(&self.timer);
        self.clear_timer(&self.max_timer);
        let args = self.args.borrow_mut().take();
        if let Some(args) = args {
            (self.callback)(args);
        }
    }

    fn arm(self: &Rc<Self>, delay: Duration) -> TimerId {
        let weak: Weak<Self> = Rc::downgrade(self);
        self.queue.set_timeout(delay, move || {
            if let Some(inner) = weak.upgrade() {
                inner.invoke();
            }
        })
    }

    fn call(self: &Rc<Self>, args: A) {
        let (wait, max_wait) = untracked(|| {
            (
                self.wait.get(),
                self.max_wait.as_ref().map(Reactive::get),
            )
        });
        self.clear_timer(&self.timer);
        *self.args.borrow_mut() = Some(args);

        if wait.is_zero() || max_wait.is_some_and(|max| max.is_zero()) {
            self.invoke();
            return;
        }
        if let Some(max) = max_wait {
            if self.max_timer.get().is_none() {
                self.max_timer.set(Some(self.arm(max)));
            }
        }
        self.timer.set(Some(self.arm(wait)));
    }
}

/// A debounced callback.
#[must_use = "dropping an unscoped debounced function cancels pending calls"]
pub struct DebouncedFn<A> {
    inner: Rc<DebounceInner<A>>,
}

impl<A> Clone for DebouncedFn<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: 'static> DebouncedFn<A> {
    /// Schedule the callback with `args`.
    pub fn call(&self, args: A) {
        self.inner.call(args);
    }

    /// Drop the pending invocation, if any.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.args.borrow().is_some()
    }
}

impl<A> std::fmt::Debug for DebouncedFn<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebouncedFn")
            .field("pending", &self.inner.timer.get().is_some())
            .finish()
    }
}

impl<A> Drop for DebounceInner<A> {
    fn drop(&mut self) {
        for slot in [&self.timer, &self.max_timer] {
            if let Some(id) = slot.take() {
                self.queue.clear(id);
            }
        }
    }
}

/// Debounce `callback` by `wait`. `None` uses the configured default wait.
pub fn use_debounce_fn<A: 'static>(
    callback: impl Fn(A) + 'static,
    wait: Option<Reactive<Duration>>,
    options: DebounceOptions,
) -> DebouncedFn<A> {
    let wait = wait.unwrap_or_else(|| Reactive::Static(config::defaults().debounce_wait));
    let inner = Rc::new(DebounceInner {
        queue: timer::current(),
        callback: Box::new(callback),
        wait,
        max_wait: options.max_wait,
        timer: Cell::new(None),
        max_timer: Cell::new(None),
        args: RefCell::new(None),
    });
    let scoped = Rc::clone(&inner);
    on_scope_dispose(move || scoped.cancel());
    DebouncedFn { inner }
}

/// Options for [`use_throttle_fn`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThrottleOptions {
    pub leading: bool,
    pub trailing: bool,
}

impl Default for ThrottleOptions {
    fn default() -> Self {
        Self {
            leading: true,
            trailing: false,
        }
    }
}

struct ThrottleInner<A> {
    queue: TimerQueue,
    callback: Box<dyn Fn(A)>,
    wait: Reactive<Duration>,
    options: ThrottleOptions,
    last_exec: Cell<Option<Duration>>,
    leading_edge: Cell<bool>,
    timer: Cell<Option<TimerId>>,
    args: RefCell<Option<A>>,
}

impl<A: 'static> ThrottleInner<A> {
    fn clear(&self) {
        if let Some(id) = self.timer.take() {
            self.queue.clear(id);
        }
    }

    fn cancel(&self) {
        self.clear();
        self.args.borrow_mut().take();
    }

    fn run_now(&self, args: A) {
        self.last_exec.set(Some(self.queue.now()));
        (self.callback)(args);
    }

    fn run_trailing(&self) {
        self.timer.set(None);
        self.leading_edge.set(true);
        let args = self.args.borrow_mut().take();
        if let Some(args) = args {
            self.run_now(args);
        }
    }

    fn call(self: &Rc<Self>, args: A) {
        let wait = untracked(|| self.wait.get());
        let now = self.queue.now();
        let elapsed = self.last_exec.get().map(|at| now.saturating_sub(at));
        self.clear();

        if wait.is_zero() {
            self.args.borrow_mut().take();
            self.run_now(args);
            return;
        }

        let window_open = elapsed.is_none_or(|e| e > wait);
        let ThrottleOptions { leading, trailing } = self.options;
        if window_open && (leading || !self.leading_edge.get()) {
            self.args.borrow_mut().take();
            self.run_now(args);
        } else if trailing {
            *self.args.borrow_mut() = Some(args);
            let delay = wait.saturating_sub(elapsed.unwrap_or_default());
            let weak: Weak<Self> = Rc::downgrade(self);
            self.timer.set(Some(self.queue.set_timeout(delay, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.run_trailing();
                }
            })));
        }

        if !leading && self.timer.get().is_none() {
            let weak: Weak<Self> = Rc::downgrade(self);
            self.timer.set(Some(self.queue.set_timeout(wait, move || {
                if let Some(inner) = weak.upgrade() {
                    inner.timer.set(None);
                    inner.leading_edge.set(true);
                }
            })));
        }
        self.leading_edge.set(false);
    }
}

impl<A> Drop for ThrottleInner<A> {
    fn drop(&mut self) {
        if let Some(id) = self.timer.take() {
            self.queue.clear(id);
        }
    }
}

/// A throttled callback.
#[must_use = "dropping an unscoped throttled function cancels its trailing call"]
pub struct ThrottledFn<A> {
    inner: Rc<ThrottleInner<A>>,
}

impl<A> Clone for ThrottledFn<A> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<A: 'static> ThrottledFn<A> {
    pub fn call(&self, args: A) {
        self.inner.call(args);
    }

    /// Drop the pending trailing invocation, if any.
    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Whether a trailing invocation is scheduled.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.inner.args.borrow().is_some()
    }
}

impl<A> std::fmt::Debug for ThrottledFn<A> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ThrottledFn")
            .field("options", &self.inner.options)
            .finish()
    }
}

/// Throttle `callback` to once per `wait`. `None` uses the configured
/// default wait.
pub fn use_throttle_fn<A: 'static>(
    callback: impl Fn(A) + 'static,
    wait: Option<Reactive<Duration>>,
    options: ThrottleOptions,
) -> ThrottledFn<A> {
    let wait = wait.unwrap_or_else(|| Reactive::Static(config::defaults().throttle_wait));
    let inner = Rc::new(ThrottleInner {
        queue: timer::current(),
        callback: Box::new(callback),
        wait,
        options,
        last_exec: Cell::new(None),
        leading_edge: Cell::new(true),
        timer: Cell::new(None),
        args: RefCell::new(None),
    });
    let scoped = Rc::clone(&inner);
    on_scope_dispose(move || scoped.cancel());
    ThrottledFn { inner }
}
