#![forbid(unsafe_code)]

//! Cycling through a list of values.
//!
//! [`use_cycle_list`] keeps a current value and moves it forward or backward
//! through a list, wrapping at both ends. The index is derived from the
//! current value, so it follows the list when items are inserted or removed.
//!
//! # Invariants
//!
//! 1. `go(i)` selects `list[i mod len]` for any `i`, negative included.
//! 2. When the current value is not in the list, the index is the fallback
//!    index.
//! 3. When the list changes, the state snaps to the list entry at the
//!    current index.
//! 4. An empty list never changes the state.

use std::rc::Rc;

use crate::reactive::{Observable, WatchHandle, WatchOptions, watch};
use crate::source::Selector;

type IndexOf<T> = Rc<dyn Fn(&T, &[T]) -> Option<usize>>;

/// Options for [`use_cycle_list`].
pub struct CycleListOptions<T> {
    /// Starting value. Defaults to the first list entry.
    pub initial_value: Option<T>,
    /// Index reported when the current value is not in the list.
    pub fallback_index: usize,
    /// Locate the current value in the list. Defaults to the first equal
    /// entry.
    pub index_of: Option<IndexOf<T>>,
}

impl<T> Default for CycleListOptions<T> {
    fn default() -> Self {
        Self {
            initial_value: None,
            fallback_index: 0,
            index_of: None,
        }
    }
}

impl<T> CycleListOptions<T> {
    #[must_use]
    pub fn initial_value(mut self, value: T) -> Self {
        self.initial_value = Some(value);
        self
    }

    #[must_use]
    pub fn fallback_index(mut self, index: usize) -> Self {
        self.fallback_index = index;
        self
    }

    #[must_use]
    pub fn index_of(mut self, f: impl Fn(&T, &[T]) -> Option<usize> + 'static) -> Self {
        self.index_of = Some(Rc::new(f));
        self
    }
}

struct Cursor<T> {
    list: Selector<T>,
    state: Observable<Option<T>>,
    fallback_index: usize,
    index_of: Option<IndexOf<T>>,
}

impl<T: Clone + PartialEq + 'static> Cursor<T> {
    fn index_in(&self, list: &[T]) -> usize {
        self.state
            .with(|state| {
                let current = state.as_ref()?;
                match &self.index_of {
                    Some(index_of) => index_of(current, list),
                    None => list.iter().position(|item| item == current),
                }
            })
            .unwrap_or(self.fallback_index)
    }

    fn index(&self) -> usize {
        let list = self.list.resolve();
        self.index_in(&list)
    }

    fn go(&self, i: i64) -> Option<T> {
        let list = self.list.resolve();
        let len = i64::try_from(list.len()).ok().filter(|len| *len > 0)?;
        let at = usize::try_from(i.rem_euclid(len)).ok()?;
        let value = list.get(at).cloned();
        self.state.set(value.clone());
        value
    }

    fn shift(&self, delta: i64) -> Option<T> {
        let index = i64::try_from(self.index()).unwrap_or(i64::MAX);
        self.go(index.saturating_add(delta))
    }
}

/// A value cycling through a list.
///
/// Outside an effect scope, dropping the last clone stops following list
/// changes.
#[must_use = "dropping an unscoped cycle list stops it from following the list"]
pub struct CycleList<T> {
    cursor: Rc<Cursor<T>>,
    _watcher: WatchHandle,
}

impl<T> Clone for CycleList<T> {
    fn clone(&self) -> Self {
        Self {
            cursor: Rc::clone(&self.cursor),
            _watcher: self._watcher.clone(),
        }
    }
}

impl<T: Clone + PartialEq + 'static> CycleList<T> {
    /// Current value (tracked read). `None` only while the list is empty and
    /// no initial value was given.
    #[must_use]
    pub fn state(&self) -> Option<T> {
        self.cursor.state.get()
    }

    #[must_use]
    pub fn observable(&self) -> &Observable<Option<T>> {
        &self.cursor.state
    }

    /// Index of the current value (tracked read).
    #[must_use]
    pub fn index(&self) -> usize {
        self.cursor.index()
    }

    /// Select `list[i mod len]`. Returns `None` for an empty list.
    pub fn go(&self, i: i64) -> Option<T> {
        self.cursor.go(i)
    }

    pub fn next(&self, n: i64) -> Option<T> {
        self.cursor.shift(n)
    }

    pub fn prev(&self, n: i64) -> Option<T> {
        self.cursor.shift(n.saturating_neg())
    }
}

impl<T: std::fmt::Debug> std::fmt::Debug for CycleList<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CycleList")
            .field("state", &self.cursor.state)
            .finish()
    }
}

/// Cycle through `list`.
pub fn use_cycle_list<T: Clone + PartialEq + 'static>(
    list: impl Into<Selector<T>>,
    options: CycleListOptions<T>,
) -> CycleList<T> {
    let list = list.into();
    let initial = options
        .initial_value
        .or_else(|| list.resolve().into_iter().next());
    let cursor = Rc::new(Cursor {
        list,
        state: Observable::new(initial),
        fallback_index: options.fallback_index,
        index_of: options.index_of,
    });

    let weak = Rc::downgrade(&cursor);
    let source = cursor.list.clone();
    let watcher = watch(
        move || source.resolve(),
        move |list: &Vec<T>, _| {
            if let Some(cursor) = weak.upgrade() {
                let index = cursor.index_in(list);
                if let Some(value) = list.get(index % list.len().max(1)) {
                    cursor.state.set(Some(value.clone()));
                }
            }
        },
        WatchOptions::default(),
    );

    CycleList {
        cursor,
        _watcher: watcher,
    }
}
