#![forbid(unsafe_code)]

//! Shared, version-tracked values with change notification.
//!
//! # Design
//!
//! [`Observable<T>`] stores its value, a version counter, and a list of weak
//! subscriber callbacks behind `Rc<RefCell<..>>`. The strong side of each
//! callback lives in the [`Subscription`] returned by
//! [`subscribe`](Observable::subscribe); dropping the guard makes the weak
//! entry dead, and dead entries are pruned on the next notification or the
//! next `subscribe`, whichever comes first.
//!
//! Notifications always go through the update-cycle queue in
//! [`batch`](super::batch), so subscribers observe a `set` only once the
//! surrounding cycle ends.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per `set` that changes the value.
//! 2. Setting a value equal to the current one is a no-op.
//! 3. Subscribers are notified in registration order, with the value current
//!    at notification time.
//! 4. A callback whose `Subscription` was dropped is never invoked again,
//!    even if the drop happens mid-notification.

use std::any::Any;
use std::cell::RefCell;
use std::rc::{Rc, Weak};

use super::batch;
use super::tracking::{self, TrackedSource};

type Callback<T> = Box<dyn Fn(&T)>;

struct ObservableInner<T> {
    value: T,
    version: u64,
    subscribers: Vec<Weak<Callback<T>>>,
}

/// A shared value that notifies subscribers when it changes.
///
/// Cloning an `Observable` creates a new handle to the **same** value.
pub struct Observable<T> {
    inner: Rc<RefCell<ObservableInner<T>>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Observable<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let inner = self.inner.borrow();
        f.debug_struct("Observable")
            .field("value", &inner.value)
            .field("version", &inner.version)
            .finish()
    }
}

impl<T: Default + Clone + PartialEq + 'static> Default for Observable<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: Clone + PartialEq + 'static> Observable<T> {
    /// Create a new observable holding `value`.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ObservableInner {
                value,
                version: 0,
                subscribers: Vec::new(),
            })),
        }
    }

    /// Current value (tracked read).
    #[must_use]
    pub fn get(&self) -> T {
        self.track();
        self.inner.borrow().value.clone()
    }

    /// Current value without registering a dependency.
    #[must_use]
    pub fn get_untracked(&self) -> T {
        self.inner.borrow().value.clone()
    }

    /// Borrow the current value (tracked read).
    ///
    /// # Panics
    ///
    /// Panics if `f` calls [`set`](Self::set) on the same observable.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.borrow().value)
    }

    /// Replace the value. Equal values are ignored.
    pub fn set(&self, value: T) {
        let changed = {
            let mut inner = self.inner.borrow_mut();
            if inner.value == value {
                false
            } else {
                inner.value = value;
                inner.version += 1;
                true
            }
        };
        if changed {
            let this = self.clone();
            batch::defer_notification(self.source_id(), Box::new(move || this.notify_now()));
        }
    }

    /// Mutate a copy of the value and store it back through [`set`](Self::set).
    pub fn update(&self, f: impl FnOnce(&mut T)) {
        let mut next = self.get_untracked();
        f(&mut next);
        self.set(next);
    }

    /// Register `callback` to run after every change.
    ///
    /// The callback stays registered for as long as the returned
    /// [`Subscription`] is alive.
    pub fn subscribe(&self, callback: impl Fn(&T) + 'static) -> Subscription {
        let strong: Rc<Callback<T>> = Rc::new(Box::new(callback));
        let mut inner = self.inner.borrow_mut();
        inner.subscribers.retain(|w| w.strong_count() > 0);
        inner.subscribers.push(Rc::downgrade(&strong));
        Subscription { _callback: strong }
    }

    /// Version counter, bumped once per effective `set`.
    #[must_use]
    pub fn version(&self) -> u64 {
        self.inner.borrow().version
    }

    /// Number of live subscribers.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.inner
            .borrow()
            .subscribers
            .iter()
            .filter(|w| w.strong_count() > 0)
            .count()
    }

    /// Stored subscriber entries, dead or alive.
    #[cfg(test)]
    pub(crate) fn subscriber_slots(&self) -> usize {
        self.inner.borrow().subscribers.len()
    }

    pub(crate) fn source_id(&self) -> usize {
        Rc::as_ptr(&self.inner).cast::<()>() as usize
    }

    fn track(&self) {
        tracking::track(self.source_id(), || -> Rc<dyn TrackedSource> {
            Rc::new(self.clone())
        });
    }

    fn notify_now(&self) {
        let (value, subscribers) = {
            let mut inner = self.inner.borrow_mut();
            inner.subscribers.retain(|w| w.strong_count() > 0);
            (inner.value.clone(), inner.subscribers.clone())
        };
        for weak in subscribers {
            if let Some(callback) = weak.upgrade() {
                callback(&value);
            }
        }
    }
}

impl<T: Clone + PartialEq + 'static> TrackedSource for Observable<T> {
    fn source_id(&self) -> usize {
        Observable::source_id(self)
    }

    fn subscribe_change(&self, callback: Rc<dyn Fn()>) -> Subscription {
        self.subscribe(move |_| callback())
    }
}

/// RAII guard for an observable callback. Drop it to unsubscribe.
#[must_use = "dropping a Subscription unsubscribes immediately"]
pub struct Subscription {
    _callback: Rc<dyn Any>,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn get_set_version() {
        let obs = Observable::new(1);
        assert_eq!(obs.get(), 1);
        assert_eq!(obs.version(), 0);

        obs.set(2);
        assert_eq!(obs.get(), 2);
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn equal_set_is_noop() {
        let obs = Observable::new(7);
        let calls = Rc::new(Cell::new(0));
        let c = Rc::clone(&calls);
        let _sub = obs.subscribe(move |_| c.set(c.get() + 1));

        obs.set(7);
        assert_eq!(obs.version(), 0);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn subscribers_notified_in_order() {
        let obs = Observable::new(0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let l1 = Rc::clone(&log);
        let l2 = Rc::clone(&log);
        let _a = obs.subscribe(move |v| l1.borrow_mut().push(("a", *v)));
        let _b = obs.subscribe(move |v| l2.borrow_mut().push(("b", *v)));

        obs.set(3);
        assert_eq!(*log.borrow(), vec![("a", 3), ("b", 3)]);
    }

    #[test]
    fn dropped_subscription_stops_callbacks() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let sub = obs.subscribe(move |v| s.set(*v));
        assert_eq!(obs.subscriber_count(), 1);

        obs.set(1);
        drop(sub);
        obs.set(2);
        assert_eq!(seen.get(), 1);
        assert_eq!(obs.subscriber_count(), 0);
    }

    #[test]
    fn unsubscribe_mid_notification_skips_later_callback() {
        let obs = Observable::new(0);
        let victim_calls = Rc::new(Cell::new(0));

        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let slot_clone = Rc::clone(&slot);
        let _killer = obs.subscribe(move |_| {
            slot_clone.borrow_mut().take();
        });
        let vc = Rc::clone(&victim_calls);
        *slot.borrow_mut() = Some(obs.subscribe(move |_| vc.set(vc.get() + 1)));

        obs.set(1);
        assert_eq!(victim_calls.get(), 0);
    }

    #[test]
    fn resubscribing_prunes_dead_entries() {
        let obs = Observable::new(0);
        let _keep = obs.subscribe(|_| {});
        for _ in 0..100 {
            let sub = obs.subscribe(|_| {});
            drop(sub);
        }
        let _last = obs.subscribe(|_| {});
        assert_eq!(obs.subscriber_count(), 2);
        assert_eq!(obs.subscriber_slots(), 2);
    }

    #[test]
    fn update_applies_mutation() {
        let obs = Observable::new(vec![1, 2]);
        obs.update(|v| v.push(3));
        assert_eq!(obs.get(), vec![1, 2, 3]);
        assert_eq!(obs.version(), 1);
    }

    #[test]
    fn clone_shares_value() {
        let a = Observable::new(String::from("x"));
        let b = a.clone();
        b.set("y".into());
        assert_eq!(a.get(), "y");
        assert_eq!(a.source_id(), b.source_id());
    }

    #[test]
    fn subscriber_may_read_and_set_other_observables() {
        let src = Observable::new(1);
        let dst = Observable::new(0);
        let (src_c, dst_c) = (src.clone(), dst.clone());
        let _sub = src.subscribe(move |v| dst_c.set(*v + src_c.get()));
        src.set(4);
        assert_eq!(dst.get(), 8);
    }

    #[test]
    fn debug_format() {
        let obs = Observable::new(42);
        let dbg = format!("{obs:?}");
        assert!(dbg.contains("Observable"));
        assert!(dbg.contains("42"));
    }
}
