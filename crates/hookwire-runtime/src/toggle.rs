#![forbid(unsafe_code)]

//! Two-state toggles.

use crate::reactive::Observable;
use crate::source::Reactive;

/// A value that flips between a truthy and a falsy state.
#[derive(Clone, Debug)]
pub struct Toggle<T> {
    value: Observable<T>,
    truthy: Reactive<T>,
    falsy: Reactive<T>,
}

impl<T: Clone + PartialEq + 'static> Toggle<T> {
    /// A toggle over custom values. The truthy and falsy values may be
    /// reactive; they are read when [`toggle`](Self::toggle) runs.
    pub fn with_values(
        initial: T,
        truthy: impl Into<Reactive<T>>,
        falsy: impl Into<Reactive<T>>,
    ) -> Self {
        Self {
            value: Observable::new(initial),
            truthy: truthy.into(),
            falsy: falsy.into(),
        }
    }

    /// Flip the value and return the new state.
    pub fn toggle(&self) -> T {
        let truthy = self.truthy.get();
        let next = if self.value.get_untracked() == truthy {
            self.falsy.get()
        } else {
            truthy
        };
        self.value.set(next.clone());
        next
    }

    /// Force a value and return it.
    pub fn set(&self, value: T) -> T {
        self.value.set(value.clone());
        value
    }

    /// Current value (tracked read).
    #[must_use]
    pub fn value(&self) -> T {
        self.value.get()
    }

    #[must_use]
    pub fn observable(&self) -> &Observable<T> {
        &self.value
    }
}

/// A boolean toggle.
#[must_use]
pub fn use_toggle(initial: bool) -> Toggle<bool> {
    Toggle::with_values(initial, true, false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boolean_toggle() {
        let t = use_toggle(false);
        assert!(t.toggle());
        assert!(!t.toggle());
        assert!(t.set(true));
        assert!(t.value());
    }

    #[test]
    fn custom_values() {
        let t = Toggle::with_values(
            "off".to_owned(),
            Reactive::Static("on".to_owned()),
            Reactive::Static("off".to_owned()),
        );
        assert_eq!(t.toggle(), "on");
        assert_eq!(t.toggle(), "off");
    }

    #[test]
    fn unknown_value_toggles_to_truthy() {
        let t = Toggle::with_values(7, Reactive::Static(1), Reactive::Static(0));
        assert_eq!(t.toggle(), 1);
        assert_eq!(t.toggle(), 0);
    }

    #[test]
    fn reactive_truthy_value() {
        let on = Observable::new("light".to_owned());
        let t = Toggle::with_values(
            "dark".to_owned(),
            on.clone(),
            Reactive::Static("dark".to_owned()),
        );
        on.set("sepia".to_owned());
        assert_eq!(t.toggle(), "sepia");
    }
}
