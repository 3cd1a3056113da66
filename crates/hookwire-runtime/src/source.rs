#![forbid(unsafe_code)]

//! Normalized reactive inputs.
//!
//! Composables accept their inputs in several shapes: a plain value, a list,
//! a list with holes, an [`Observable`], a [`Binding`], or a closure.
//! [`Selector<T>`] folds all of them into "a function returning the current
//! `Vec<T>`", and [`Reactive<T>`] does the same for a single value.
//!
//! Resolution is a tracked read, so a watcher that resolves a selector
//! re-runs when any observable behind it changes.
//!
//! # Invariants
//!
//! 1. A single value resolves to a one-element list.
//! 2. `None` entries are dropped at resolution time, never at construction.
//! 3. Order of the resolved list matches the order of the input.

use std::rc::Rc;
use std::time::Duration;

use hookwire_core::{Listener, ListenerFlags, ListenerOptions, MemoryTarget, TargetRef};

use crate::element::ElementRef;
use crate::reactive::{Binding, Computed, Observable};

/// A static or reactive list of inputs, resolved on demand.
pub struct Selector<T> {
    resolve: Rc<dyn Fn() -> Vec<Option<T>>>,
}

impl<T> Clone for Selector<T> {
    fn clone(&self) -> Self {
        Self {
            resolve: Rc::clone(&self.resolve),
        }
    }
}

impl<T> std::fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Selector").finish_non_exhaustive()
    }
}

impl<T: Clone + 'static> Selector<T> {
    /// A selector that always resolves to nothing.
    #[must_use]
    pub fn empty() -> Self {
        Self::from_fn(Vec::new)
    }

    /// A single static value.
    pub fn one(value: T) -> Self {
        Self::from_fn(move || vec![Some(value.clone())])
    }

    /// A static list.
    pub fn many(values: impl IntoIterator<Item = T>) -> Self {
        let values: Vec<Option<T>> = values.into_iter().map(Some).collect();
        Self::from_fn(move || values.clone())
    }

    /// A static list that may contain holes.
    pub fn with_holes(values: impl IntoIterator<Item = Option<T>>) -> Self {
        let values: Vec<Option<T>> = values.into_iter().collect();
        Self::from_fn(move || values.clone())
    }

    /// A closure producing the current entries.
    pub fn from_fn(f: impl Fn() -> Vec<Option<T>> + 'static) -> Self {
        Self { resolve: Rc::new(f) }
    }

    /// Current entries with holes removed (tracked read).
    #[must_use]
    pub fn resolve(&self) -> Vec<T> {
        (self.resolve)().into_iter().flatten().collect()
    }
}

impl<T: Clone + PartialEq + 'static> Selector<T> {
    /// A reactive single value.
    #[must_use]
    pub fn observable(source: &Observable<T>) -> Self {
        let source = source.clone();
        Self::from_fn(move || vec![Some(source.get())])
    }

    /// A reactive single value that may be absent.
    #[must_use]
    pub fn observable_opt(source: &Observable<Option<T>>) -> Self {
        let source = source.clone();
        Self::from_fn(move || vec![source.get()])
    }

    /// A reactive list.
    #[must_use]
    pub fn observable_list(source: &Observable<Vec<T>>) -> Self {
        let source = source.clone();
        Self::from_fn(move || source.with(|values| values.iter().cloned().map(Some).collect()))
    }

    /// A reactive list that may contain holes.
    #[must_use]
    pub fn observable_holes(source: &Observable<Vec<Option<T>>>) -> Self {
        let source = source.clone();
        Self::from_fn(move || source.get())
    }
}

impl<T: Clone + 'static> From<Binding<Vec<T>>> for Selector<T> {
    fn from(binding: Binding<Vec<T>>) -> Self {
        Self::from_fn(move || binding.get().into_iter().map(Some).collect())
    }
}

impl<T: Clone + 'static> From<Computed<Vec<T>>> for Selector<T> {
    fn from(computed: Computed<Vec<T>>) -> Self {
        Self::from_fn(move || computed.with(|values| values.iter().cloned().map(Some).collect()))
    }
}

impl<T: Clone + PartialEq + 'static> From<Observable<Vec<T>>> for Selector<T> {
    fn from(source: Observable<Vec<T>>) -> Self {
        Self::observable_list(&source)
    }
}

// Event names.

impl From<&str> for Selector<String> {
    fn from(name: &str) -> Self {
        Self::one(name.to_owned())
    }
}

impl From<String> for Selector<String> {
    fn from(name: String) -> Self {
        Self::one(name)
    }
}

impl From<Vec<&str>> for Selector<String> {
    fn from(names: Vec<&str>) -> Self {
        Self::many(names.into_iter().map(str::to_owned))
    }
}

impl From<Vec<String>> for Selector<String> {
    fn from(names: Vec<String>) -> Self {
        Self::many(names)
    }
}

impl<const N: usize> From<[&str; N]> for Selector<String> {
    fn from(names: [&str; N]) -> Self {
        Self::many(names.into_iter().map(str::to_owned))
    }
}

impl From<&[&str]> for Selector<String> {
    fn from(names: &[&str]) -> Self {
        Self::many(names.iter().map(|s| (*s).to_owned()))
    }
}

impl From<Observable<String>> for Selector<String> {
    fn from(source: Observable<String>) -> Self {
        Self::observable(&source)
    }
}

impl From<Binding<Vec<&'static str>>> for Selector<String> {
    fn from(binding: Binding<Vec<&'static str>>) -> Self {
        Self::from_fn(move || binding.get().into_iter().map(|s| Some(s.to_owned())).collect())
    }
}

// Listeners.

impl From<Listener> for Selector<Listener> {
    fn from(listener: Listener) -> Self {
        Self::one(listener)
    }
}

impl From<Vec<Listener>> for Selector<Listener> {
    fn from(listeners: Vec<Listener>) -> Self {
        Self::many(listeners)
    }
}

impl From<Observable<Listener>> for Selector<Listener> {
    fn from(source: Observable<Listener>) -> Self {
        Self::observable(&source)
    }
}

// Targets.

impl From<TargetRef> for Selector<TargetRef> {
    fn from(target: TargetRef) -> Self {
        Self::one(target)
    }
}

impl From<&TargetRef> for Selector<TargetRef> {
    fn from(target: &TargetRef) -> Self {
        Self::one(target.clone())
    }
}

impl From<Option<TargetRef>> for Selector<TargetRef> {
    fn from(target: Option<TargetRef>) -> Self {
        Self::with_holes([target])
    }
}

impl From<&MemoryTarget> for Selector<TargetRef> {
    fn from(target: &MemoryTarget) -> Self {
        Self::one(target.target_ref())
    }
}

impl From<Vec<TargetRef>> for Selector<TargetRef> {
    fn from(targets: Vec<TargetRef>) -> Self {
        Self::many(targets)
    }
}

impl From<Vec<Option<TargetRef>>> for Selector<TargetRef> {
    fn from(targets: Vec<Option<TargetRef>>) -> Self {
        Self::with_holes(targets)
    }
}

impl From<&[&MemoryTarget]> for Selector<TargetRef> {
    fn from(targets: &[&MemoryTarget]) -> Self {
        Self::many(targets.iter().map(|t| t.target_ref()))
    }
}

impl From<Observable<Option<TargetRef>>> for Selector<TargetRef> {
    fn from(source: Observable<Option<TargetRef>>) -> Self {
        Self::observable_opt(&source)
    }
}

impl From<Observable<Vec<Option<TargetRef>>>> for Selector<TargetRef> {
    fn from(source: Observable<Vec<Option<TargetRef>>>) -> Self {
        Self::observable_holes(&source)
    }
}

impl From<Binding<Vec<Option<TargetRef>>>> for Selector<TargetRef> {
    fn from(binding: Binding<Vec<Option<TargetRef>>>) -> Self {
        Self::from_fn(move || binding.get())
    }
}

impl From<&ElementRef> for Selector<TargetRef> {
    fn from(element: &ElementRef) -> Self {
        Self::observable_opt(element.observable())
    }
}

impl From<ElementRef> for Selector<TargetRef> {
    fn from(element: ElementRef) -> Self {
        Self::from(&element)
    }
}

impl From<Vec<ElementRef>> for Selector<TargetRef> {
    fn from(elements: Vec<ElementRef>) -> Self {
        Self::from_fn(move || elements.iter().map(ElementRef::get).collect())
    }
}

/// A static or reactive single value.
pub enum Reactive<T> {
    Static(T),
    Observable(Observable<T>),
    Computed(Computed<T>),
    Binding(Binding<T>),
}

impl<T: Clone> Clone for Reactive<T> {
    fn clone(&self) -> Self {
        match self {
            Self::Static(v) => Self::Static(v.clone()),
            Self::Observable(o) => Self::Observable(o.clone()),
            Self::Computed(c) => Self::Computed(c.clone()),
            Self::Binding(b) => Self::Binding(b.clone()),
        }
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for Reactive<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Static(v) => f.debug_tuple("Static").field(v).finish(),
            Self::Observable(o) => f.debug_tuple("Observable").field(o).finish(),
            Self::Computed(_) => f.write_str("Computed(..)"),
            Self::Binding(_) => f.write_str("Binding(..)"),
        }
    }
}

impl<T: Clone + PartialEq + 'static> Reactive<T> {
    /// Current value (tracked read for reactive variants).
    #[must_use]
    pub fn get(&self) -> T {
        match self {
            Self::Static(v) => v.clone(),
            Self::Observable(o) => o.get(),
            Self::Computed(c) => c.get(),
            Self::Binding(b) => b.get(),
        }
    }

    /// Whether the value can never change.
    #[must_use]
    pub fn is_static(&self) -> bool {
        matches!(self, Self::Static(_))
    }
}

impl<T: Default> Default for Reactive<T> {
    fn default() -> Self {
        Self::Static(T::default())
    }
}

impl<T> From<Observable<T>> for Reactive<T> {
    fn from(source: Observable<T>) -> Self {
        Self::Observable(source)
    }
}

impl<T> From<Computed<T>> for Reactive<T> {
    fn from(source: Computed<T>) -> Self {
        Self::Computed(source)
    }
}

impl<T> From<Binding<T>> for Reactive<T> {
    fn from(source: Binding<T>) -> Self {
        Self::Binding(source)
    }
}

impl From<ListenerOptions> for Reactive<ListenerOptions> {
    fn from(options: ListenerOptions) -> Self {
        Self::Static(options)
    }
}

impl From<ListenerFlags> for Reactive<ListenerOptions> {
    fn from(flags: ListenerFlags) -> Self {
        Self::Static(flags.into())
    }
}

/// `true` means capture.
impl From<bool> for Reactive<ListenerOptions> {
    fn from(capture: bool) -> Self {
        Self::Static(capture.into())
    }
}

impl From<bool> for Reactive<bool> {
    fn from(value: bool) -> Self {
        Self::Static(value)
    }
}

impl From<Duration> for Reactive<Duration> {
    fn from(value: Duration) -> Self {
        Self::Static(value)
    }
}

impl From<i64> for Reactive<i64> {
    fn from(value: i64) -> Self {
        Self::Static(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{bind_mapped, tracking};

    #[test]
    fn single_value_is_one_element() {
        let sel: Selector<String> = "click".into();
        assert_eq!(sel.resolve(), vec!["click".to_owned()]);
    }

    #[test]
    fn holes_are_filtered_in_order() {
        let a = MemoryTarget::new("a");
        let b = MemoryTarget::new("b");
        let sel: Selector<TargetRef> =
            vec![None, Some(a.target_ref()), None, Some(b.target_ref())].into();
        assert_eq!(sel.resolve(), vec![a.target_ref(), b.target_ref()]);
    }

    #[test]
    fn array_of_names() {
        let sel: Selector<String> = ["focus", "blur"].into();
        assert_eq!(sel.resolve(), vec!["focus".to_owned(), "blur".to_owned()]);
    }

    #[test]
    fn observable_list_is_tracked() {
        let names = Observable::new(vec!["a".to_owned()]);
        let sel: Selector<String> = names.clone().into();
        let (resolved, sources) = tracking::collect(|| sel.resolve());
        assert_eq!(resolved, vec!["a".to_owned()]);
        assert_eq!(sources.len(), 1);

        names.set(vec!["b".to_owned(), "c".to_owned()]);
        assert_eq!(sel.resolve().len(), 2);
    }

    #[test]
    fn element_ref_resolves_lazily() {
        let target = MemoryTarget::new("lazy");
        let el = ElementRef::new();
        let sel: Selector<TargetRef> = (&el).into();
        assert!(sel.resolve().is_empty());
        el.mount(&target);
        assert_eq!(sel.resolve(), vec![target.target_ref()]);
    }

    #[test]
    fn binding_selector() {
        let enabled = Observable::new(true);
        let sel: Selector<String> = bind_mapped(&enabled, |on| {
            if *on { vec!["keydown".to_owned()] } else { vec![] }
        })
        .into();
        assert_eq!(sel.resolve().len(), 1);
        enabled.set(false);
        assert!(sel.resolve().is_empty());
    }

    #[test]
    fn reactive_options() {
        let capture: Reactive<ListenerOptions> = true.into();
        assert!(capture.get().is_capture());
        assert!(capture.is_static());

        let obs = Observable::new(ListenerOptions::new());
        let dynamic: Reactive<ListenerOptions> = obs.clone().into();
        obs.set(ListenerOptions::new().passive(true));
        assert!(dynamic.get().is_passive());
    }

    #[test]
    fn reactive_read_is_tracked() {
        let wait = Observable::new(Duration::from_millis(5));
        let r: Reactive<Duration> = wait.into();
        let (_, sources) = tracking::collect(|| r.get());
        assert_eq!(sources.len(), 1);
    }
}
