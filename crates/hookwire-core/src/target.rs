#![forbid(unsafe_code)]

//! The event-target boundary.
//!
//! Anything that can register and unregister listeners implements
//! [`EventTarget`]. The runtime only ever talks to targets through
//! [`TargetRef`], a shared handle compared by pointer identity, so the same
//! target can be placed in reactive collections and diffed cheaply.
//!
//! # Invariants
//!
//! 1. Two [`TargetRef`]s are equal iff they point at the same allocation.
//! 2. Two [`Listener`]s are equal iff they share the same callback allocation;
//!    cloning a listener preserves identity, wrapping the same closure twice
//!    does not.
//! 3. `remove_event_listener` must accept exactly the `(event, listener,
//!    options)` triple that was passed to `add_event_listener`.

use std::borrow::Cow;
use std::fmt;
use std::rc::Rc;

use crate::error::TargetError;
use crate::event::Event;

bitflags::bitflags! {
    /// Raw listener registration flags.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ListenerFlags: u8 {
        /// Deliver during the capture phase.
        const CAPTURE = 1 << 0;
        /// The listener promises not to cancel the event.
        const PASSIVE = 1 << 1;
        /// Remove the listener after its first invocation.
        const ONCE = 1 << 2;
    }
}

/// Options passed alongside a listener registration.
///
/// `ListenerOptions` is `Copy`: every registration receives its own snapshot,
/// so mutating a shared options source later never reaches bindings that are
/// already live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct ListenerOptions {
    flags: ListenerFlags,
}

impl ListenerOptions {
    /// No flags set.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            flags: ListenerFlags::empty(),
        }
    }

    /// Build from raw flags.
    #[must_use]
    pub const fn from_flags(flags: ListenerFlags) -> Self {
        Self { flags }
    }

    #[must_use]
    pub fn capture(mut self, on: bool) -> Self {
        self.flags.set(ListenerFlags::CAPTURE, on);
        self
    }

    #[must_use]
    pub fn passive(mut self, on: bool) -> Self {
        self.flags.set(ListenerFlags::PASSIVE, on);
        self
    }

    #[must_use]
    pub fn once(mut self, on: bool) -> Self {
        self.flags.set(ListenerFlags::ONCE, on);
        self
    }

    #[must_use]
    pub const fn flags(self) -> ListenerFlags {
        self.flags
    }

    #[must_use]
    pub const fn is_capture(self) -> bool {
        self.flags.contains(ListenerFlags::CAPTURE)
    }

    #[must_use]
    pub const fn is_passive(self) -> bool {
        self.flags.contains(ListenerFlags::PASSIVE)
    }

    #[must_use]
    pub const fn is_once(self) -> bool {
        self.flags.contains(ListenerFlags::ONCE)
    }
}

/// A bare `bool` means "capture", mirroring the DOM shorthand.
impl From<bool> for ListenerOptions {
    fn from(capture: bool) -> Self {
        Self::new().capture(capture)
    }
}

impl From<ListenerFlags> for ListenerOptions {
    fn from(flags: ListenerFlags) -> Self {
        Self::from_flags(flags)
    }
}

/// A shared event callback with pointer identity.
#[derive(Clone)]
pub struct Listener {
    callback: Rc<dyn Fn(&Event)>,
}

impl Listener {
    /// Wrap a callback. Each call produces a distinct identity.
    pub fn new(f: impl Fn(&Event) + 'static) -> Self {
        Self {
            callback: Rc::new(f),
        }
    }

    /// Invoke the callback.
    pub fn call(&self, event: &Event) {
        (self.callback)(event);
    }

    /// Stable identity of the underlying callback allocation.
    #[must_use]
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.callback).cast::<()>() as usize
    }

    /// Whether both handles refer to the same callback.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl PartialEq for Listener {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for Listener {}

impl fmt::Debug for Listener {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Listener")
            .field("id", &format_args!("{:#x}", self.id()))
            .finish()
    }
}

/// Something that accepts listener registrations.
///
/// Implementations are externally owned and may be shared by any number of
/// independent managers; each registration is reversed only by the exact
/// matching `remove_event_listener` call.
pub trait EventTarget {
    /// Register `listener` for `event`.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] when the host refuses the registration.
    fn add_event_listener(
        &self,
        event: &str,
        listener: &Listener,
        options: ListenerOptions,
    ) -> Result<(), TargetError>;

    /// Reverse a prior registration. Unknown triples are ignored.
    fn remove_event_listener(&self, event: &str, listener: &Listener, options: ListenerOptions);

    /// Human-readable label used in logs and errors.
    fn label(&self) -> Cow<'_, str> {
        Cow::Borrowed("target")
    }
}

/// Shared, identity-compared handle to an [`EventTarget`].
#[derive(Clone)]
pub struct TargetRef {
    inner: Rc<dyn EventTarget>,
}

impl TargetRef {
    /// Wrap a target.
    pub fn new(target: impl EventTarget + 'static) -> Self {
        Self {
            inner: Rc::new(target),
        }
    }

    /// Wrap an already-shared target.
    #[must_use]
    pub fn from_rc(inner: Rc<dyn EventTarget>) -> Self {
        Self { inner }
    }

    /// Stable identity of the target allocation.
    #[must_use]
    pub fn id(&self) -> usize {
        Rc::as_ptr(&self.inner).cast::<()>() as usize
    }

    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        self.id() == other.id()
    }
}

impl std::ops::Deref for TargetRef {
    type Target = dyn EventTarget;

    fn deref(&self) -> &Self::Target {
        &*self.inner
    }
}

impl PartialEq for TargetRef {
    fn eq(&self, other: &Self) -> bool {
        self.ptr_eq(other)
    }
}

impl Eq for TargetRef {}

impl fmt::Debug for TargetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("TargetRef").field(&self.inner.label()).finish()
    }
}
