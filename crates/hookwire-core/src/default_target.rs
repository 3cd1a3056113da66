#![forbid(unsafe_code)]

//! Thread-local default event target.
//!
//! Browser hosts expose a global window object; other hosts may expose
//! nothing. The default target is `None` until a host installs one with
//! [`set_default_target`]. Installing returns a guard that restores the
//! previous default when dropped, so overrides nest LIFO.

use std::cell::RefCell;

use crate::target::TargetRef;

thread_local! {
    static DEFAULT_TARGET: RefCell<Option<TargetRef>> = const { RefCell::new(None) };
}

/// The current default target, if the host installed one.
#[must_use]
pub fn default_target() -> Option<TargetRef> {
    DEFAULT_TARGET.with(|slot| slot.borrow().clone())
}

/// Whether a default target is installed on this thread.
#[must_use]
pub fn has_default_target() -> bool {
    DEFAULT_TARGET.with(|slot| slot.borrow().is_some())
}

/// Install `target` as the default. Dropping the guard restores the prior value.
#[must_use = "dropping this guard restores the previous default target"]
pub fn set_default_target(target: Option<TargetRef>) -> DefaultTargetGuard {
    let previous = DEFAULT_TARGET.with(|slot| slot.replace(target));
    DefaultTargetGuard { previous }
}

/// RAII guard for a default-target override.
#[must_use = "dropping this guard restores the previous default target"]
pub struct DefaultTargetGuard {
    previous: Option<TargetRef>,
}

impl Drop for DefaultTargetGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        DEFAULT_TARGET.with(|slot| {
            *slot.borrow_mut() = previous;
        });
    }
}

impl std::fmt::Debug for DefaultTargetGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultTargetGuard")
            .field("previous", &self.previous)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory_target::MemoryTarget;

    #[test]
    fn no_default_until_installed() {
        assert!(default_target().is_none());
        assert!(!has_default_target());
    }

    #[test]
    fn guard_restores_previous() {
        let window = MemoryTarget::new("window");
        let frame = MemoryTarget::new("frame");

        let outer = set_default_target(Some(window.target_ref()));
        assert_eq!(default_target(), Some(window.target_ref()));
        {
            let _inner = set_default_target(Some(frame.target_ref()));
            assert_eq!(default_target(), Some(frame.target_ref()));
        }
        assert_eq!(default_target(), Some(window.target_ref()));
        drop(outer);
        assert!(default_target().is_none());
    }

    #[test]
    fn override_with_none_hides_default() {
        let window = MemoryTarget::new("window");
        let _outer = set_default_target(Some(window.target_ref()));
        let inner = set_default_target(None);
        assert!(!has_default_target());
        drop(inner);
        assert!(has_default_target());
    }
}
