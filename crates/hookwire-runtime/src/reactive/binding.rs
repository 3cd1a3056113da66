#![forbid(unsafe_code)]

//! Getter bindings: zero-argument functions over reactive state.
//!
//! A [`Binding<T>`] is the "function producing the current value" flavor of
//! a reactive input. It evaluates on every [`get`](Binding::get) and does not
//! cache; any observable it reads is tracked by whoever calls `get`, so a
//! watcher reading a binding depends on everything the binding read.
//!
//! # Usage
//!
//! ```ignore
//! use hookwire_runtime::reactive::{Observable, bind_mapped};
//!
//! let enabled = Observable::new(true);
//! let events = bind_mapped(&enabled, |on| if *on { vec!["keydown"] } else { vec![] });
//! assert_eq!(events.get(), vec!["keydown"]);
//! ```
//!
//! # Invariants
//!
//! 1. `get()` always reflects the current value of everything it reads.
//! 2. Cloning shares the evaluation closure.
//!
//! Use [`Computed`](super::Computed) when memoization is needed.

use std::rc::Rc;

use super::observable::Observable;

/// A read-only getter over reactive state.
pub struct Binding<T> {
    eval: Rc<dyn Fn() -> T>,
}

impl<T> Clone for Binding<T> {
    fn clone(&self) -> Self {
        Self {
            eval: Rc::clone(&self.eval),
        }
    }
}

impl<T> std::fmt::Debug for Binding<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Binding").finish_non_exhaustive()
    }
}

impl<T: 'static> Binding<T> {
    /// Create a binding that evaluates `f` on each `get()` call.
    pub fn new(f: impl Fn() -> T + 'static) -> Self {
        Self { eval: Rc::new(f) }
    }

    /// Evaluate the binding.
    #[must_use]
    pub fn get(&self) -> T {
        (self.eval)()
    }

    /// Apply a further transform, returning a new `Binding`.
    pub fn then<U: 'static>(self, f: impl Fn(T) -> U + 'static) -> Binding<U> {
        Binding {
            eval: Rc::new(move || f((self.eval)())),
        }
    }
}

/// Binding that returns the observable's value.
pub fn bind_observable<T: Clone + PartialEq + 'static>(source: &Observable<T>) -> Binding<T> {
    let src = source.clone();
    Binding::new(move || src.get())
}

/// Binding over `source` transformed by `map`.
pub fn bind_mapped<S: Clone + PartialEq + 'static, T: 'static>(
    source: &Observable<S>,
    map: impl Fn(&S) -> T + 'static,
) -> Binding<T> {
    let src = source.clone();
    Binding::new(move || src.with(|v| map(v)))
}

/// Binding over two observables combined by `map`.
pub fn bind_mapped2<
    S1: Clone + PartialEq + 'static,
    S2: Clone + PartialEq + 'static,
    T: 'static,
>(
    s1: &Observable<S1>,
    s2: &Observable<S2>,
    map: impl Fn(&S1, &S2) -> T + 'static,
) -> Binding<T> {
    let src1 = s1.clone();
    let src2 = s2.clone();
    Binding::new(move || src1.with(|v1| src2.with(|v2| map(v1, v2))))
}
