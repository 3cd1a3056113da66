#![forbid(unsafe_code)]

//! Event targets, listeners, and the host-platform boundary for hookwire.
//!
//! Everything the runtime needs from a host lives here:
//!
//! - [`EventTarget`] / [`TargetRef`]: registration and removal of listeners.
//! - [`Listener`] and [`ListenerOptions`]: identity-compared callbacks and
//!   their capture/passive/once flags.
//! - [`Event`]: the dispatched value.
//! - [`MemoryTarget`]: an in-process target for headless hosts and tests.
//! - [`default_target`]: the thread-local "window" used when callers omit a
//!   target.

pub mod default_target;
pub mod error;
pub mod event;
#[cfg(feature = "tracing-json")]
pub mod logging;
pub mod memory_target;
pub mod target;

pub use default_target::{
    DefaultTargetGuard, default_target, has_default_target, set_default_target,
};
pub use error::TargetError;
pub use event::Event;
pub use memory_target::{JournalEntry, MemoryTarget};
pub use target::{EventTarget, Listener, ListenerFlags, ListenerOptions, TargetRef};
