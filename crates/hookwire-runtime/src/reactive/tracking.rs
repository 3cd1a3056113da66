#![forbid(unsafe_code)]

//! Dependency tracking for tracked reads.
//!
//! While [`collect`] runs a closure, every tracked read (`Observable::get`,
//! `Observable::with`, `Computed::get`) records its source in the innermost
//! frame. Watchers use the collected list to decide what to subscribe to.
//! [`untracked`] pushes an opaque frame that swallows reads.

use std::cell::RefCell;
use std::rc::Rc;

use super::observable::Subscription;

/// A source that tracked reads can record.
pub(crate) trait TrackedSource {
    /// Identity used for deduplication within one frame.
    fn source_id(&self) -> usize;

    /// Subscribe to change notifications without caring about the value.
    fn subscribe_change(&self, callback: Rc<dyn Fn()>) -> Subscription;
}

thread_local! {
    static FRAMES: RefCell<Vec<Option<Vec<Rc<dyn TrackedSource>>>>> =
        const { RefCell::new(Vec::new()) };
}

struct FrameGuard;

impl FrameGuard {
    fn push(frame: Option<Vec<Rc<dyn TrackedSource>>>) -> Self {
        FRAMES.with(|frames| frames.borrow_mut().push(frame));
        Self
    }

    fn finish(self) -> Vec<Rc<dyn TrackedSource>> {
        let frame = FRAMES.with(|frames| frames.borrow_mut().pop());
        std::mem::forget(self);
        frame.flatten().unwrap_or_default()
    }
}

impl Drop for FrameGuard {
    fn drop(&mut self) {
        // Only reached on unwind; keep the stack balanced.
        FRAMES.with(|frames| {
            frames.borrow_mut().pop();
        });
    }
}

/// Record a read of the source built by `make`.
///
/// `make` only runs when a collecting frame is active.
pub(crate) fn track(id: usize, make: impl FnOnce() -> Rc<dyn TrackedSource>) {
    FRAMES.with(|frames| {
        let mut frames = frames.borrow_mut();
        if let Some(Some(frame)) = frames.last_mut() {
            if !frame.iter().any(|s| s.source_id() == id) {
                frame.push(make());
            }
        }
    });
}

/// Run `f`, returning its result and the sources it read.
pub(crate) fn collect<R>(f: impl FnOnce() -> R) -> (R, Vec<Rc<dyn TrackedSource>>) {
    let guard = FrameGuard::push(Some(Vec::new()));
    let value = f();
    (value, guard.finish())
}

/// Run `f` without recording any dependencies.
pub fn untracked<R>(f: impl FnOnce() -> R) -> R {
    let guard = FrameGuard::push(None);
    let value = f();
    guard.finish();
    value
}

/// Whether a tracked read right now would be recorded.
#[must_use]
pub fn is_tracking() -> bool {
    FRAMES.with(|frames| matches!(frames.borrow().last(), Some(Some(_))))
}
