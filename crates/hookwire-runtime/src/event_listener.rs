#![forbid(unsafe_code)]

//! Event-listener subscription manager.
//!
//! [`use_event_listener`] registers every combination of the current
//! targets, event names, and listeners with the targets, and keeps that set
//! in step with its inputs. Any input may be static or reactive (see
//! [`Selector`] and [`Reactive`]); whenever a reactive input changes, the
//! manager tears down every registration it owns and registers the new
//! cross-product.
//!
//! # Design
//!
//! The manager is a post-flush [`watch`] over the resolved inputs. The
//! watcher's getter resolves targets, events, listeners, and options under
//! dependency tracking; its callback performs one *bind cycle*:
//!
//! 1. Remove every active registration, in registration order.
//! 2. If the manager is live and all three lists are non-empty, register the
//!    cross-product target-major, then event, then listener, each with its
//!    own copy of the options.
//!
//! Because the watcher runs in the post-flush phase, any number of input
//! changes inside one update cycle produce exactly one bind cycle, and it
//! sees the settled inputs.
//!
//! # Invariants
//!
//! 1. After a successful cycle, the active set is exactly the cross-product
//!    of the inputs resolved for that cycle.
//! 2. A cycle never overlaps registrations: teardown completes before the
//!    first new registration.
//! 3. `stop()` is idempotent; after it no registration is ever made again.
//! 4. A manager created inside an [`EffectScope`](crate::reactive::EffectScope)
//!    stops when the scope stops.
//!
//! # Failure Modes
//!
//! - **Registration rejected during creation**: the registrations made so
//!   far in that cycle are removed, the manager stops, and the error is
//!   returned from [`use_event_listener`].
//! - **Registration rejected during a later cycle**: the cycle is abandoned
//!   with nothing registered, the error is logged with `tracing::warn!` and
//!   published through [`EventListenerHandle::error`]. The next input change
//!   retries.

use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

use hookwire_core::{Listener, ListenerOptions, TargetError, TargetRef, default_target};

use crate::reactive::scope::outside_scope;
use crate::reactive::{Flush, Observable, WatchHandle, WatchOptions, on_scope_dispose, watch};
use crate::source::{Reactive, Selector};

/// One registration owned by a manager.
struct ActiveBinding {
    target: TargetRef,
    event: String,
    listener: Listener,
    options: ListenerOptions,
}

impl ActiveBinding {
    fn register(
        target: &TargetRef,
        event: &str,
        listener: &Listener,
        options: ListenerOptions,
    ) -> Result<Self, TargetError> {
        target.add_event_listener(event, listener, options)?;
        Ok(Self {
            target: target.clone(),
            event: event.to_owned(),
            listener: listener.clone(),
            options,
        })
    }

    fn dispose(self) {
        self.target
            .remove_event_listener(&self.event, &self.listener, self.options);
    }
}

/// Description of an active registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BindingInfo {
    /// The target's label.
    pub target: String,
    pub event: String,
    pub options: ListenerOptions,
}

/// Inputs resolved for one bind cycle.
struct Resolved {
    targets: Vec<TargetRef>,
    events: Vec<String>,
    listeners: Vec<Listener>,
    options: ListenerOptions,
}

impl Resolved {
    fn is_empty(&self) -> bool {
        self.targets.is_empty() || self.events.is_empty() || self.listeners.is_empty()
    }
}

struct ManagerInner {
    bindings: RefCell<Vec<ActiveBinding>>,
    stopped: Cell<bool>,
    watcher: RefCell<Option<WatchHandle>>,
    error: Observable<Option<TargetError>>,
    cycles: Cell<u64>,
}

impl ManagerInner {
    fn teardown(&self) {
        let bindings = std::mem::take(&mut *self.bindings.borrow_mut());
        for binding in bindings {
            binding.dispose();
        }
    }

    fn rebind(&self, inputs: &Resolved) -> Result<(), TargetError> {
        self.teardown();
        if self.stopped.get() {
            return Ok(());
        }
        let cycle = self.cycles.get() + 1;
        self.cycles.set(cycle);

        #[cfg(feature = "tracing")]
        let _span = tracing::debug_span!(
            "hookwire.event_listener.rebind",
            cycle,
            targets = inputs.targets.len(),
            events = inputs.events.len(),
            listeners = inputs.listeners.len(),
        )
        .entered();

        if inputs.is_empty() {
            tracing::trace!(cycle, "event listener inputs empty; nothing to bind");
            self.error.set(None);
            return Ok(());
        }

        let mut fresh = Vec::with_capacity(
            inputs.targets.len() * inputs.events.len() * inputs.listeners.len(),
        );
        for target in &inputs.targets {
            for event in &inputs.events {
                for listener in &inputs.listeners {
                    match ActiveBinding::register(target, event, listener, inputs.options) {
                        Ok(binding) => fresh.push(binding),
                        Err(err) => {
                            for binding in fresh {
                                binding.dispose();
                            }
                            tracing::warn!(
                                cycle,
                                error = %err,
                                "event listener registration failed"
                            );
                            self.error.set(Some(err.clone()));
                            return Err(err);
                        }
                    }
                }
            }
        }

        tracing::debug!(cycle, bindings = fresh.len(), "event listeners bound");
        *self.bindings.borrow_mut() = fresh;
        self.error.set(None);
        Ok(())
    }

    fn stop(&self) {
        if self.stopped.replace(true) {
            return;
        }
        if let Some(watcher) = self.watcher.borrow_mut().take() {
            watcher.stop();
        }
        let count = self.bindings.borrow().len();
        self.teardown();
        tracing::debug!(bindings = count, "event listener manager stopped");
    }
}

impl Drop for ManagerInner {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Handle to a running subscription manager.
///
/// Outside an [`EffectScope`](crate::reactive::EffectScope) the handle owns
/// the manager: dropping it removes every registration. Inside a scope the
/// scope also owns it and the manager lives until the scope stops.
#[must_use = "dropping the handle of an unscoped manager removes its listeners"]
#[derive(Clone)]
pub struct EventListenerHandle {
    inner: Rc<ManagerInner>,
}

impl EventListenerHandle {
    /// Remove every registration and stop reacting to input changes.
    /// Idempotent.
    pub fn stop(&self) {
        self.inner.stop();
    }

    #[must_use]
    pub fn is_stopped(&self) -> bool {
        self.inner.stopped.get()
    }

    /// Number of active registrations.
    #[must_use]
    pub fn binding_count(&self) -> usize {
        self.inner.bindings.borrow().len()
    }

    /// Active registrations in registration order.
    #[must_use]
    pub fn bindings(&self) -> Vec<BindingInfo> {
        self.inner
            .bindings
            .borrow()
            .iter()
            .map(|b| BindingInfo {
                target: b.target.label().into_owned(),
                event: b.event.clone(),
                options: b.options,
            })
            .collect()
    }

    /// Error of the most recent cycle, if it failed.
    #[must_use]
    pub fn last_error(&self) -> Option<TargetError> {
        self.inner.error.get_untracked()
    }

    /// Observable view of [`last_error`](Self::last_error).
    #[must_use]
    pub fn error(&self) -> Observable<Option<TargetError>> {
        self.inner.error.clone()
    }

    /// Number of bind cycles run so far, including the initial one.
    #[must_use]
    pub fn cycle_count(&self) -> u64 {
        self.inner.cycles.get()
    }
}

impl std::fmt::Debug for EventListenerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventListenerHandle")
            .field("stopped", &self.inner.stopped.get())
            .field("bindings", &self.inner.bindings.borrow().len())
            .field("cycles", &self.inner.cycles.get())
            .finish()
    }
}

/// Register `listeners` for `events` on `targets`, keeping registrations in
/// step with reactive inputs.
///
/// # Errors
///
/// Returns the first [`TargetError`] raised while making the initial
/// registrations. Nothing stays registered in that case.
///
/// # Example
///
/// ```ignore
/// let button = MemoryTarget::new("button");
/// let clicks = Rc::new(Cell::new(0));
/// let c = Rc::clone(&clicks);
/// let handle = use_event_listener(
///     &button,
///     "click",
///     Listener::new(move |_| c.set(c.get() + 1)),
///     ListenerOptions::new(),
/// )?;
/// button.emit("click");
/// assert_eq!(clicks.get(), 1);
/// handle.stop();
/// ```
pub fn use_event_listener(
    targets: impl Into<Selector<TargetRef>>,
    events: impl Into<Selector<String>>,
    listeners: impl Into<Selector<Listener>>,
    options: impl Into<Reactive<ListenerOptions>>,
) -> Result<EventListenerHandle, TargetError> {
    let (targets, events, listeners, options) =
        (targets.into(), events.into(), listeners.into(), options.into());

    let inner = Rc::new(ManagerInner {
        bindings: RefCell::new(Vec::new()),
        stopped: Cell::new(false),
        watcher: RefCell::new(None),
        error: Observable::new(None),
        cycles: Cell::new(0),
    });

    let weak: Weak<ManagerInner> = Rc::downgrade(&inner);
    let first_error: Rc<RefCell<Option<TargetError>>> = Rc::new(RefCell::new(None));
    let first = Rc::clone(&first_error);
    // The manager owns its watcher; only the manager registers with the scope.
    let watcher = outside_scope(|| {
        watch(
            move || Resolved {
                targets: targets.resolve(),
                events: events.resolve(),
                listeners: listeners.resolve(),
                options: options.get(),
            },
            move |inputs: &Resolved, _| {
                let Some(manager) = weak.upgrade() else {
                    return;
                };
                let first_cycle = manager.cycles.get() == 0;
                if let Err(err) = manager.rebind(inputs) {
                    if first_cycle {
                        *first.borrow_mut() = Some(err);
                    }
                }
            },
            WatchOptions {
                immediate: true,
                flush: Flush::Post,
            },
        )
    });

    if let Some(err) = first_error.borrow_mut().take() {
        watcher.stop();
        inner.stopped.set(true);
        return Err(err);
    }
    *inner.watcher.borrow_mut() = Some(watcher);

    let scoped = Rc::clone(&inner);
    on_scope_dispose(move || scoped.stop());

    Ok(EventListenerHandle { inner })
}

/// [`use_event_listener`] on the thread's default target.
///
/// With no default target installed the returned manager binds nothing.
///
/// # Errors
///
/// See [`use_event_listener`].
pub fn use_default_listener(
    events: impl Into<Selector<String>>,
    listeners: impl Into<Selector<Listener>>,
    options: impl Into<Reactive<ListenerOptions>>,
) -> Result<EventListenerHandle, TargetError> {
    let targets = Selector::with_holes([default_target()]);
    use_event_listener(targets, events, listeners, options)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::element::ElementRef;
    use crate::reactive::{EffectScope, batch};
    use hookwire_core::{Event, JournalEntry, MemoryTarget, set_default_target};

    fn counting_listener() -> (Rc<Cell<u32>>, Listener) {
        let hits = Rc::new(Cell::new(0));
        let h = Rc::clone(&hits);
        (hits, Listener::new(move |_| h.set(h.get() + 1)))
    }

    #[test]
    fn registers_single_binding() {
        let button = MemoryTarget::new("button");
        let (hits, listener) = counting_listener();
        let handle =
            use_event_listener(&button, "click", listener, ListenerOptions::new()).unwrap();

        assert_eq!(handle.binding_count(), 1);
        assert_eq!(handle.cycle_count(), 1);
        assert_eq!(button.emit("click"), 1);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn cross_product_is_target_major() {
        let a = MemoryTarget::new("a");
        let b = MemoryTarget::new("b");
        let (_, f) = counting_listener();
        let (_, g) = counting_listener();
        let handle = use_event_listener(
            vec![a.target_ref(), b.target_ref()],
            ["focus", "blur"],
            vec![f, g],
            ListenerOptions::new(),
        )
        .unwrap();

        let order: Vec<(String, String)> = handle
            .bindings()
            .into_iter()
            .map(|info| (info.target, info.event))
            .collect();
        let expected: Vec<(String, String)> = [
            ("a", "focus"),
            ("a", "focus"),
            ("a", "blur"),
            ("a", "blur"),
            ("b", "focus"),
            ("b", "focus"),
            ("b", "blur"),
            ("b", "blur"),
        ]
        .iter()
        .map(|(t, e)| ((*t).to_owned(), (*e).to_owned()))
        .collect();
        assert_eq!(order, expected);
        assert_eq!(a.listener_count(), 4);
        assert_eq!(b.listener_count(), 4);
    }

    #[test]
    fn options_are_copied_per_binding() {
        let target = MemoryTarget::new("t");
        let (_, f) = counting_listener();
        let options = Observable::new(ListenerOptions::new().capture(true));
        let handle = use_event_listener(&target, "scroll", f, options.clone()).unwrap();
        assert!(handle.bindings()[0].options.is_capture());

        options.set(ListenerOptions::new().passive(true));
        let info = &handle.bindings()[0];
        assert!(!info.options.is_capture());
        assert!(info.options.is_passive());
        assert_eq!(target.listener_count(), 1);
        // Removal used the capture flag the listener was added with.
        assert_eq!(
            target.registered_options(),
            vec![("scroll".to_owned(), ListenerOptions::new().passive(true))]
        );
    }

    #[test]
    fn rebind_tears_down_before_rebuilding() {
        let target = MemoryTarget::new("t");
        let (_, f) = counting_listener();
        let events = Observable::new(vec!["a".to_owned()]);
        let _handle =
            use_event_listener(&target, events.clone(), f, ListenerOptions::new()).unwrap();
        target.clear_journal();

        events.set(vec!["b".to_owned(), "c".to_owned()]);
        let journal = target.journal();
        let kinds: Vec<(bool, &str)> = journal.iter().map(|e| (e.is_add(), e.event())).collect();
        assert_eq!(kinds, vec![(false, "a"), (true, "b"), (true, "c")]);
    }

    #[test]
    fn several_changes_in_one_cycle_rebind_once() {
        let target = MemoryTarget::new("t");
        let (_, f) = counting_listener();
        let events = Observable::new(vec!["a".to_owned()]);
        let enabled = Observable::new(true);
        let (ev, en) = (events.clone(), enabled.clone());
        let handle = use_event_listener(
            &target,
            Selector::from_fn(move || {
                if en.get() {
                    ev.get().into_iter().map(Some).collect()
                } else {
                    Vec::new()
                }
            }),
            f,
            ListenerOptions::new(),
        )
        .unwrap();

        batch(|| {
            events.set(vec!["x".to_owned()]);
            enabled.set(false);
            enabled.set(true);
        });
        assert_eq!(handle.cycle_count(), 2);
        assert_eq!(target.listener_count_for("x"), 1);
        assert_eq!(target.listener_count(), 1);
    }

    #[test]
    fn empty_inputs_bind_nothing() {
        let target = MemoryTarget::new("t");
        let (_, f) = counting_listener();
        let no_events: Vec<&str> = Vec::new();
        let handle = use_event_listener(&target, no_events, f.clone(), false).unwrap();
        assert_eq!(handle.binding_count(), 0);

        let none: Option<TargetRef> = None;
        let handle = use_event_listener(none, "click", f, false).unwrap();
        assert_eq!(handle.binding_count(), 0);
        assert!(handle.last_error().is_none());
    }

    #[test]
    fn stop_is_idempotent_and_final() {
        let target = MemoryTarget::new("t");
        let (_, f) = counting_listener();
        let events = Observable::new(vec!["a".to_owned()]);
        let handle =
            use_event_listener(&target, events.clone(), f, ListenerOptions::new()).unwrap();

        handle.stop();
        handle.stop();
        assert!(handle.is_stopped());
        assert_eq!(target.listener_count(), 0);

        events.set(vec!["b".to_owned()]);
        assert_eq!(target.listener_count(), 0);
        assert_eq!(handle.cycle_count(), 1);
    }

    #[test]
    fn dropping_unscoped_handle_removes_listeners() {
        let target = MemoryTarget::new("t");
        let (_, f) = counting_listener();
        drop(use_event_listener(&target, "click", f, false).unwrap());
        assert_eq!(target.listener_count(), 0);
    }

    #[test]
    fn scope_owns_manager() {
        let target = MemoryTarget::new("t");
        let (hits, f) = counting_listener();
        let scope = EffectScope::new();
        scope.run(|| {
            let _ = use_event_listener(&target, "click", f, false).unwrap();
        });
        assert_eq!(target.listener_count(), 1, "scope keeps the manager alive");
        assert_eq!(scope.cleanup_count(), 1);
        target.emit("click");
        assert_eq!(hits.get(), 1);

        drop(scope);
        assert_eq!(target.listener_count(), 0);
    }

    #[test]
    fn element_ref_binds_on_mount() {
        let target = MemoryTarget::new("late");
        let el = ElementRef::new();
        let (_, f) = counting_listener();
        let handle = use_event_listener(&el, "click", f, false).unwrap();
        assert_eq!(handle.binding_count(), 0);

        el.mount(&target);
        assert_eq!(target.listener_count(), 1);
        el.unmount();
        assert_eq!(target.listener_count(), 0);
    }

    #[test]
    fn initial_failure_returns_err_and_registers_nothing() {
        let target = MemoryTarget::new("t");
        target.reject_event("blur", "blocked");
        let (_, f) = counting_listener();
        let err = use_event_listener(&target, ["focus", "blur"], f, false).unwrap_err();
        assert!(matches!(err, TargetError::Rejected { .. }));
        assert_eq!(target.listener_count(), 0);
    }

    #[test]
    fn initial_failure_inside_scope_leaves_nothing_behind() {
        let target = MemoryTarget::new("t");
        target.reject_event("click", "blocked");
        let (_, f) = counting_listener();
        let scope = EffectScope::new();
        let result = scope.run(|| use_event_listener(&target, "click", f, false)).unwrap();
        assert!(result.is_err());
        assert_eq!(scope.cleanup_count(), 0);
        assert_eq!(target.listener_count(), 0);
    }

    #[test]
    fn rebinding_on_one_input_keeps_other_subscriptions_flat() {
        let target = MemoryTarget::new("t");
        let (_, f) = counting_listener();
        let events = Observable::new(vec!["click".to_owned()]);
        let options = Observable::new(ListenerOptions::new());
        let handle = use_event_listener(&target, events.clone(), f, options.clone()).unwrap();

        for i in 0..200 {
            options.set(ListenerOptions::new().capture(i % 2 == 0));
        }
        assert_eq!(handle.cycle_count(), 201);
        assert_eq!(events.subscriber_slots(), 1);
        assert_eq!(options.subscriber_slots(), 1);
        assert_eq!(target.listener_count(), 1);
    }

    #[test]
    fn later_failure_is_published() {
        let target = MemoryTarget::new("t");
        let (_, f) = counting_listener();
        let events = Observable::new(vec!["focus".to_owned()]);
        let handle = use_event_listener(&target, events.clone(), f, false).unwrap();

        target.reject_event("blur", "blocked");
        events.set(vec!["focus".to_owned(), "blur".to_owned()]);
        assert_eq!(target.listener_count(), 0);
        assert!(handle.last_error().is_some());
        assert!(handle.error().get_untracked().is_some());

        target.accept_event("blur");
        events.set(vec!["blur".to_owned()]);
        assert_eq!(target.listener_count(), 1);
        assert!(handle.last_error().is_none());
    }

    #[test]
    fn detached_target_fails_fast() {
        let target = MemoryTarget::new("gone");
        target.close();
        let (_, f) = counting_listener();
        let err = use_event_listener(&target, "click", f, false).unwrap_err();
        assert_eq!(err, TargetError::Detached { target: "gone".into() });
    }

    #[test]
    fn default_target_is_used() {
        let window = MemoryTarget::new("window");
        let _guard = set_default_target(Some(window.target_ref()));
        let (hits, f) = counting_listener();
        let handle = use_default_listener("resize", f, false).unwrap();
        assert_eq!(handle.binding_count(), 1);
        window.dispatch(&Event::new("resize"));
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn missing_default_target_is_noop() {
        let _guard = set_default_target(None);
        let (_, f) = counting_listener();
        let handle = use_default_listener("resize", f, false).unwrap();
        assert_eq!(handle.binding_count(), 0);
        handle.stop();
        assert!(handle.is_stopped());
    }

    #[test]
    fn independent_managers_share_a_target() {
        let target = MemoryTarget::new("shared");
        let (_, f) = counting_listener();
        let (_, g) = counting_listener();
        let first = use_event_listener(&target, "click", f, false).unwrap();
        let second = use_event_listener(&target, "click", g, false).unwrap();
        assert_eq!(target.listener_count(), 2);

        first.stop();
        assert_eq!(target.listener_count(), 1);
        assert_eq!(second.binding_count(), 1);
        assert!(
            target
                .journal()
                .iter()
                .any(|e| matches!(e, JournalEntry::Removed { .. }))
        );
    }

    #[test]
    fn listener_may_stop_its_own_manager() {
        let target = MemoryTarget::new("t");
        let slot: Rc<RefCell<Option<EventListenerHandle>>> = Rc::new(RefCell::new(None));
        let s = Rc::clone(&slot);
        let listener = Listener::new(move |_| {
            if let Some(handle) = s.borrow().as_ref() {
                handle.stop();
            }
        });
        let handle = use_event_listener(&target, "click", listener, false).unwrap();
        *slot.borrow_mut() = Some(handle.clone());

        target.emit("click");
        assert!(handle.is_stopped());
        assert_eq!(target.listener_count(), 0);
        slot.borrow_mut().take();
    }
}
