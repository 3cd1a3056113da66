#![forbid(unsafe_code)]

//! Lifecycle scopes for reactive resources.
//!
//! An [`EffectScope`] collects cleanup callbacks and subscriptions for a
//! logical owner (a component, a widget, a task). While
//! [`run`](EffectScope::run) executes, the scope is *current*: composables
//! called inside it register their teardown with
//! [`on_scope_dispose`] and are torn down when the scope stops.
//!
//! # Usage
//!
//! ```ignore
//! let scope = EffectScope::new();
//! let handle = scope.run(|| use_event_listener(&button, "click", on_click, false));
//! // ...
//! drop(scope); // every listener registered inside `run` is removed
//! ```
//!
//! # Invariants
//!
//! 1. Cleanups run in reverse registration order, exactly once.
//! 2. `stop()` is idempotent; `Drop` calls it.
//! 3. A scope created while another is current is stopped with its parent.
//! 4. Registering a cleanup on a stopped scope runs it immediately.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use super::observable::Subscription;

enum Entry {
    Cleanup(Box<dyn FnOnce()>),
    Hold(Subscription),
}

struct ScopeInner {
    active: Cell<bool>,
    entries: RefCell<Vec<Entry>>,
}

impl ScopeInner {
    fn push(&self, entry: Entry) {
        if self.active.get() {
            self.entries.borrow_mut().push(entry);
        } else if let Entry::Cleanup(cleanup) = entry {
            cleanup();
        }
    }

    fn stop(&self) {
        if !self.active.replace(false) {
            return;
        }
        let entries = std::mem::take(&mut *self.entries.borrow_mut());
        tracing::trace!(entries = entries.len(), "effect scope stopping");
        for entry in entries.into_iter().rev() {
            match entry {
                Entry::Cleanup(cleanup) => cleanup(),
                Entry::Hold(sub) => drop(sub),
            }
        }
    }
}

thread_local! {
    static CURRENT: RefCell<Vec<Rc<ScopeInner>>> = const { RefCell::new(Vec::new()) };
}

struct CurrentGuard;

impl Drop for CurrentGuard {
    fn drop(&mut self) {
        CURRENT.with(|stack| {
            stack.borrow_mut().pop();
        });
    }
}

fn current() -> Option<Rc<ScopeInner>> {
    CURRENT.with(|stack| stack.borrow().last().cloned())
}

/// Owner of cleanups for reactive resources created inside it.
pub struct EffectScope {
    inner: Rc<ScopeInner>,
}

impl EffectScope {
    /// Create a scope. If another scope is current, the new one becomes its
    /// child and stops with it.
    #[must_use]
    pub fn new() -> Self {
        let scope = Self::detached();
        if let Some(parent) = current() {
            let child: Weak<ScopeInner> = Rc::downgrade(&scope.inner);
            parent.push(Entry::Cleanup(Box::new(move || {
                if let Some(child) = child.upgrade() {
                    child.stop();
                }
            })));
        }
        scope
    }

    /// Create a scope that is never attached to the current one.
    #[must_use]
    pub fn detached() -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                active: Cell::new(true),
                entries: RefCell::new(Vec::new()),
            }),
        }
    }

    /// Run `f` with this scope as the current scope.
    ///
    /// Returns `None` without calling `f` if the scope is stopped.
    pub fn run<R>(&self, f: impl FnOnce() -> R) -> Option<R> {
        if !self.inner.active.get() {
            return None;
        }
        CURRENT.with(|stack| stack.borrow_mut().push(Rc::clone(&self.inner)));
        let _guard = CurrentGuard;
        Some(f())
    }

    /// Register a cleanup to run when the scope stops.
    pub fn on_dispose(&self, cleanup: impl FnOnce() + 'static) {
        self.inner.push(Entry::Cleanup(Box::new(cleanup)));
    }

    /// Keep `sub` alive until the scope stops.
    pub fn hold(&self, sub: Subscription) {
        self.inner.push(Entry::Hold(sub));
    }

    /// Run every cleanup (reverse order) and deactivate the scope.
    pub fn stop(&self) {
        self.inner.stop();
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.inner.active.get()
    }

    /// Number of registered cleanups and held subscriptions.
    #[must_use]
    pub fn cleanup_count(&self) -> usize {
        self.inner.entries.borrow().len()
    }
}

impl Default for EffectScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for EffectScope {
    fn drop(&mut self) {
        self.inner.stop();
    }
}

impl std::fmt::Debug for EffectScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EffectScope")
            .field("active", &self.inner.active.get())
            .field("cleanup_count", &self.inner.entries.borrow().len())
            .finish()
    }
}

/// Register `cleanup` with the current scope.
///
/// Returns `false` (and drops `cleanup` without running it) when no scope is
/// current.
pub fn on_scope_dispose(cleanup: impl FnOnce() + 'static) -> bool {
    match current() {
        Some(scope) => {
            scope.push(Entry::Cleanup(Box::new(cleanup)));
            true
        }
        None => false,
    }
}

struct SuspendGuard(Vec<Rc<ScopeInner>>);

impl Drop for SuspendGuard {
    fn drop(&mut self) {
        let saved = std::mem::take(&mut self.0);
        CURRENT.with(|stack| *stack.borrow_mut() = saved);
    }
}

/// Run `f` with no current scope. Resources created inside are owned only by
/// their handles.
pub(crate) fn outside_scope<R>(f: impl FnOnce() -> R) -> R {
    let saved = CURRENT.with(|stack| std::mem::take(&mut *stack.borrow_mut()));
    let _restore = SuspendGuard(saved);
    f()
}

/// Whether a scope is current on this thread.
#[must_use]
pub fn has_current_scope() -> bool {
    CURRENT.with(|stack| !stack.borrow().is_empty())
}
