#![forbid(unsafe_code)]

//! In-process event target.
//!
//! [`MemoryTarget`] is a complete host-side target: it stores registrations,
//! dispatches events, and keeps a journal of every add/remove it accepted.
//! Hosts without a platform event system (headless runtimes, tests, embedded
//! UIs) use it directly; the journal makes registration ordering observable.
//!
//! # Semantics
//!
//! - Registrations are keyed by `(event, listener, capture)`. Registering the
//!   same key twice is a no-op, and removal matches on the same key.
//! - `once` listeners are removed before they are invoked.
//! - Dispatch snapshots the matching listeners first. A listener removed by an
//!   earlier listener in the same dispatch is skipped.
//! - Passive listeners run with [`Event::set_passive`] raised, so their
//!   `prevent_default` calls are ignored.
//! - After [`close`](MemoryTarget::close), registrations fail with
//!   [`TargetError::Detached`] and existing listeners are dropped.

use std::borrow::Cow;
use std::cell::RefCell;
use std::rc::Rc;

use ahash::AHashMap;

use crate::error::TargetError;
use crate::event::Event;
use crate::target::{EventTarget, Listener, ListenerOptions, TargetRef};

/// One accepted add or remove, in the order the target saw them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JournalEntry {
    /// A listener was registered.
    Added { event: String, listener: usize },
    /// A listener was removed, explicitly or through `once`.
    Removed { event: String, listener: usize },
}

impl JournalEntry {
    /// Event name the entry refers to.
    #[must_use]
    pub fn event(&self) -> &str {
        match self {
            Self::Added { event, .. } | Self::Removed { event, .. } => event,
        }
    }

    #[must_use]
    pub fn is_add(&self) -> bool {
        matches!(self, Self::Added { .. })
    }
}

#[derive(Clone)]
struct Registration {
    event: String,
    listener: Listener,
    options: ListenerOptions,
}

impl Registration {
    fn matches(&self, event: &str, listener: &Listener, options: ListenerOptions) -> bool {
        self.event == event
            && self.listener.ptr_eq(listener)
            && self.options.is_capture() == options.is_capture()
    }
}

#[derive(Default)]
struct State {
    registrations: Vec<Registration>,
    journal: Vec<JournalEntry>,
    rejected: AHashMap<String, String>,
    closed: bool,
    dispatched: u64,
}

struct Inner {
    label: String,
    state: RefCell<State>,
}

impl EventTarget for Inner {
    fn add_event_listener(
        &self,
        event: &str,
        listener: &Listener,
        options: ListenerOptions,
    ) -> Result<(), TargetError> {
        let mut state = self.state.borrow_mut();
        if state.closed {
            return Err(TargetError::Detached {
                target: self.label.clone(),
            });
        }
        if let Some(reason) = state.rejected.get(event) {
            return Err(TargetError::Rejected {
                target: self.label.clone(),
                event: event.to_owned(),
                reason: reason.clone(),
            });
        }
        if state
            .registrations
            .iter()
            .any(|r| r.matches(event, listener, options))
        {
            return Ok(());
        }
        state.registrations.push(Registration {
            event: event.to_owned(),
            listener: listener.clone(),
            options,
        });
        state.journal.push(JournalEntry::Added {
            event: event.to_owned(),
            listener: listener.id(),
        });
        Ok(())
    }

    fn remove_event_listener(&self, event: &str, listener: &Listener, options: ListenerOptions) {
        let mut state = self.state.borrow_mut();
        let Some(pos) = state
            .registrations
            .iter()
            .position(|r| r.matches(event, listener, options))
        else {
            return;
        };
        state.registrations.remove(pos);
        state.journal.push(JournalEntry::Removed {
            event: event.to_owned(),
            listener: listener.id(),
        });
    }

    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed(&self.label)
    }
}

/// Shared handle to an in-process event target.
///
/// Cloning shares the same registrations. [`target_ref`](Self::target_ref)
/// always yields handles with the same identity.
#[derive(Clone)]
pub struct MemoryTarget {
    inner: Rc<Inner>,
}

impl MemoryTarget {
    /// Create an empty target with a label used in logs and errors.
    #[must_use]
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            inner: Rc::new(Inner {
                label: label.into(),
                state: RefCell::new(State::default()),
            }),
        }
    }

    /// Identity-stable [`TargetRef`] for this target.
    #[must_use]
    pub fn target_ref(&self) -> TargetRef {
        let shared: Rc<dyn EventTarget> = self.inner.clone();
        TargetRef::from_rc(shared)
    }

    #[must_use]
    pub fn label(&self) -> &str {
        &self.inner.label
    }

    /// Dispatch `event` to every matching listener. Returns how many ran.
    pub fn dispatch(&self, event: &Event) -> usize {
        #[cfg(feature = "tracing")]
        let _span = tracing::trace_span!(
            "memory_target_dispatch",
            target = %self.inner.label,
            event = event.name()
        )
        .entered();

        let snapshot: Vec<Registration> = {
            let mut state = self.inner.state.borrow_mut();
            state.dispatched += 1;
            let snapshot: Vec<Registration> = state
                .registrations
                .iter()
                .filter(|r| r.event == event.name())
                .cloned()
                .collect();
            for reg in snapshot.iter().filter(|r| r.options.is_once()) {
                if let Some(pos) = state
                    .registrations
                    .iter()
                    .position(|r| r.matches(&reg.event, &reg.listener, reg.options))
                {
                    state.registrations.remove(pos);
                    state.journal.push(JournalEntry::Removed {
                        event: reg.event.clone(),
                        listener: reg.listener.id(),
                    });
                }
            }
            snapshot
        };

        let mut invoked = 0;
        for reg in snapshot {
            if !reg.options.is_once() && !self.is_registered(&reg) {
                continue;
            }
            event.set_passive(reg.options.is_passive());
            reg.listener.call(event);
            event.set_passive(false);
            invoked += 1;
        }
        invoked
    }

    /// Convenience: dispatch a fresh event by name.
    pub fn emit(&self, name: &str) -> usize {
        self.dispatch(&Event::new(name))
    }

    fn is_registered(&self, reg: &Registration) -> bool {
        self.inner
            .state
            .borrow()
            .registrations
            .iter()
            .any(|r| r.matches(&reg.event, &reg.listener, reg.options))
    }

    /// Total live registrations.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.inner.state.borrow().registrations.len()
    }

    /// Live registrations for one event name.
    #[must_use]
    pub fn listener_count_for(&self, event: &str) -> usize {
        self.inner
            .state
            .borrow()
            .registrations
            .iter()
            .filter(|r| r.event == event)
            .count()
    }

    /// Whether `listener` is registered for `event`, in either phase.
    #[must_use]
    pub fn has_listener(&self, event: &str, listener: &Listener) -> bool {
        self.inner
            .state
            .borrow()
            .registrations
            .iter()
            .any(|r| r.event == event && r.listener.ptr_eq(listener))
    }

    /// Options recorded for each live registration, in registration order.
    #[must_use]
    pub fn registered_options(&self) -> Vec<(String, ListenerOptions)> {
        self.inner
            .state
            .borrow()
            .registrations
            .iter()
            .map(|r| (r.event.clone(), r.options))
            .collect()
    }

    /// Every add/remove accepted so far.
    #[must_use]
    pub fn journal(&self) -> Vec<JournalEntry> {
        self.inner.state.borrow().journal.clone()
    }

    pub fn clear_journal(&self) {
        self.inner.state.borrow_mut().journal.clear();
    }

    /// Number of `dispatch` calls made on this target.
    #[must_use]
    pub fn dispatch_count(&self) -> u64 {
        self.inner.state.borrow().dispatched
    }

    /// Refuse future registrations for `event` with `reason`.
    pub fn reject_event(&self, event: impl Into<String>, reason: impl Into<String>) {
        self.inner
            .state
            .borrow_mut()
            .rejected
            .insert(event.into(), reason.into());
    }

    /// Accept registrations for `event` again.
    pub fn accept_event(&self, event: &str) {
        self.inner.state.borrow_mut().rejected.remove(event);
    }

    /// Detach the target: drop all listeners, journaling each removal, and
    /// refuse new ones.
    pub fn close(&self) {
        let mut state = self.inner.state.borrow_mut();
        state.closed = true;
        let dropped = std::mem::take(&mut state.registrations);
        state
            .journal
            .extend(dropped.into_iter().map(|reg| JournalEntry::Removed {
                event: reg.event,
                listener: reg.listener.id(),
            }));
    }

    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.state.borrow().closed
    }
}

impl From<&MemoryTarget> for TargetRef {
    fn from(target: &MemoryTarget) -> Self {
        target.target_ref()
    }
}

impl std::fmt::Debug for MemoryTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.inner.state.borrow();
        f.debug_struct("MemoryTarget")
            .field("label", &self.inner.label)
            .field("listeners", &state.registrations.len())
            .field("closed", &state.closed)
            .finish()
    }
}
