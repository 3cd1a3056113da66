#![forbid(unsafe_code)]

//! Events delivered to listeners.
//!
//! An [`Event`] carries a name, an optional text detail, and a
//! cancellation flag. Targets mark the event as passive while invoking a
//! passive listener so that [`Event::prevent_default`] is ignored there.

use std::cell::Cell;

/// A dispatched event.
#[derive(Debug, Clone)]
pub struct Event {
    name: String,
    detail: Option<String>,
    default_prevented: Cell<bool>,
    in_passive_listener: Cell<bool>,
}

impl Event {
    /// Create an event with the given name and no detail.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            detail: None,
            default_prevented: Cell::new(false),
            in_passive_listener: Cell::new(false),
        }
    }

    /// Attach a detail payload.
    #[must_use]
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Event name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Optional detail payload.
    #[must_use]
    pub fn detail(&self) -> Option<&str> {
        self.detail.as_deref()
    }

    /// Request cancellation of the default action.
    ///
    /// No-op while a passive listener is running.
    pub fn prevent_default(&self) {
        if !self.in_passive_listener.get() {
            self.default_prevented.set(true);
        }
    }

    /// Whether any non-passive listener called [`prevent_default`](Self::prevent_default).
    #[must_use]
    pub fn default_prevented(&self) -> bool {
        self.default_prevented.get()
    }

    /// Mark the event as being handled by a passive listener.
    ///
    /// Called by targets around each listener invocation.
    pub fn set_passive(&self, passive: bool) {
        self.in_passive_listener.set(passive);
    }
}
