#![forbid(unsafe_code)]

//! Lazily resolved target slots.
//!
//! An [`ElementRef`] is a reactive slot that may hold a target later: a
//! widget that has not mounted yet, a connection that is not open. Passing
//! it as a target selector makes the subscription manager bind when the
//! slot fills and unbind when it empties.

use hookwire_core::TargetRef;

use crate::reactive::Observable;

/// A reactive, optionally-filled target slot.
///
/// Clones share the slot.
#[derive(Clone, Default, Debug)]
pub struct ElementRef {
    slot: Observable<Option<TargetRef>>,
}

impl ElementRef {
    /// An empty slot.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A slot that starts filled.
    #[must_use]
    pub fn mounted(target: impl Into<TargetRef>) -> Self {
        let this = Self::new();
        this.mount(target);
        this
    }

    /// Fill (or replace) the slot.
    pub fn mount(&self, target: impl Into<TargetRef>) {
        self.slot.set(Some(target.into()));
    }

    /// Empty the slot.
    pub fn unmount(&self) {
        self.slot.set(None);
    }

    /// Current target (tracked read).
    #[must_use]
    pub fn get(&self) -> Option<TargetRef> {
        self.slot.get()
    }

    #[must_use]
    pub fn is_mounted(&self) -> bool {
        self.slot.with(Option::is_some)
    }

    /// The underlying observable slot.
    #[must_use]
    pub fn observable(&self) -> &Observable<Option<TargetRef>> {
        &self.slot
    }
}
