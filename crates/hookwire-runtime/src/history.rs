#![forbid(unsafe_code)]

//! Manually committed undo/redo history for an observable.
//!
//! [`use_manual_history`] snapshots its source only on
//! [`commit`](ManualHistory::commit). Snapshots pass through a `dump`
//! function on the way in and a `parse` function on the way out, so the
//! stored form may differ from the source type (a serialized string, a
//! diff, a cheaper representation).
//!
//! # Design
//!
//! `last` holds the snapshot the source was last committed or restored
//! from. The undo and redo stacks hold older and newer snapshots, newest
//! first. Every operation runs in one [`batch`], so observers of the stacks
//! and of the source see a single consistent change.
//!
//! # Invariants
//!
//! 1. `commit` pushes `last` onto the undo stack and clears the redo stack.
//! 2. `undo` followed by `redo` restores the source and both stacks.
//! 3. The undo stack never exceeds `capacity`; the oldest records are
//!    dropped first.

use std::rc::Rc;
use std::time::Duration;

use web_time::SystemTime;

use crate::reactive::{Computed, Observable, batch};

/// One committed snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryRecord<S> {
    pub snapshot: S,
    /// Wall-clock time of the commit, since the Unix epoch.
    pub timestamp: Duration,
}

/// Options for [`use_manual_history_with`].
pub struct HistoryOptions<T, S> {
    /// Maximum undo records kept. `None` keeps every record.
    pub capacity: Option<usize>,
    pub dump: Rc<dyn Fn(&T) -> S>,
    pub parse: Rc<dyn Fn(&S) -> T>,
}

impl<T: Clone + 'static> Default for HistoryOptions<T, T> {
    fn default() -> Self {
        Self {
            capacity: None,
            dump: Rc::new(T::clone),
            parse: Rc::new(T::clone),
        }
    }
}

impl<T, S> HistoryOptions<T, S> {
    /// Store snapshots through `dump` and restore them through `parse`.
    pub fn with_codec(
        dump: impl Fn(&T) -> S + 'static,
        parse: impl Fn(&S) -> T + 'static,
    ) -> Self {
        Self {
            capacity: None,
            dump: Rc::new(dump),
            parse: Rc::new(parse),
        }
    }

    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = Some(capacity);
        self
    }
}

fn now() -> Duration {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
}

type Stack<S> = Observable<Vec<HistoryRecord<S>>>;

/// Undo/redo history over an observable.
pub struct ManualHistory<T, S = T> {
    source: Observable<T>,
    last: Observable<HistoryRecord<S>>,
    undo_stack: Stack<S>,
    redo_stack: Stack<S>,
    can_undo: Computed<bool>,
    can_redo: Computed<bool>,
    capacity: Option<usize>,
    dump: Rc<dyn Fn(&T) -> S>,
    parse: Rc<dyn Fn(&S) -> T>,
}

impl<T, S> Clone for ManualHistory<T, S> {
    fn clone(&self) -> Self {
        Self {
            source: self.source.clone(),
            last: self.last.clone(),
            undo_stack: self.undo_stack.clone(),
            redo_stack: self.redo_stack.clone(),
            can_undo: self.can_undo.clone(),
            can_redo: self.can_redo.clone(),
            capacity: self.capacity,
            dump: Rc::clone(&self.dump),
            parse: Rc::clone(&self.parse),
        }
    }
}

impl<T, S> ManualHistory<T, S>
where
    T: Clone + PartialEq + 'static,
    S: Clone + PartialEq + 'static,
{
    fn record(&self) -> HistoryRecord<S> {
        let snapshot = self.source.with(|value| (self.dump)(value));
        HistoryRecord {
            snapshot,
            timestamp: now(),
        }
    }

    fn restore(&self, record: HistoryRecord<S>) {
        self.source.set((self.parse)(&record.snapshot));
        self.last.set(record);
    }

    #[must_use]
    pub fn source(&self) -> &Observable<T> {
        &self.source
    }

    /// The most recent commit (tracked read). The source may have moved on
    /// since.
    #[must_use]
    pub fn last(&self) -> HistoryRecord<S> {
        self.last.get()
    }

    /// `last` followed by the undo stack, newest first (tracked read).
    #[must_use]
    pub fn history(&self) -> Vec<HistoryRecord<S>> {
        let mut records = vec![self.last.get()];
        self.undo_stack.with(|stack| records.extend(stack.iter().cloned()));
        records
    }

    /// Records `undo` steps back through, newest first (tracked read).
    #[must_use]
    pub fn undo_stack(&self) -> Vec<HistoryRecord<S>> {
        self.undo_stack.get()
    }

    /// Records `redo` steps forward through, newest first (tracked read).
    #[must_use]
    pub fn redo_stack(&self) -> Vec<HistoryRecord<S>> {
        self.redo_stack.get()
    }

    #[must_use]
    pub fn can_undo(&self) -> bool {
        self.can_undo.get()
    }

    #[must_use]
    pub fn can_redo(&self) -> bool {
        self.can_redo.get()
    }

    /// Snapshot the source as the newest history point.
    pub fn commit(&self) {
        batch(|| {
            let previous = self.last.get_untracked();
            let capacity = self.capacity;
            self.undo_stack.update(|stack| {
                stack.insert(0, previous);
                if let Some(capacity) = capacity {
                    stack.truncate(capacity);
                }
            });
            self.last.set(self.record());
            self.redo_stack.update(Vec::clear);
        });
    }

    /// Step back one commit. No-op with an empty undo stack.
    pub fn undo(&self) {
        batch(|| {
            let mut stack = self.undo_stack.get_untracked();
            if stack.is_empty() {
                return;
            }
            let record = stack.remove(0);
            self.undo_stack.set(stack);
            let current = self.last.get_untracked();
            self.redo_stack.update(|redo| redo.insert(0, current));
            self.restore(record);
        });
    }

    /// Step forward one undone commit. No-op with an empty redo stack.
    pub fn redo(&self) {
        batch(|| {
            let mut stack = self.redo_stack.get_untracked();
            if stack.is_empty() {
                return;
            }
            let record = stack.remove(0);
            self.redo_stack.set(stack);
            let current = self.last.get_untracked();
            self.undo_stack.update(|undo| undo.insert(0, current));
            self.restore(record);
        });
    }

    /// Put the source back to the last commit, discarding uncommitted
    /// changes.
    pub fn reset(&self) {
        let last = self.last.get_untracked();
        batch(|| self.restore(last));
    }

    /// Drop both stacks. `last` is kept.
    pub fn clear(&self) {
        batch(|| {
            self.undo_stack.update(Vec::clear);
            self.redo_stack.update(Vec::clear);
        });
    }
}

impl<T, S> std::fmt::Debug for ManualHistory<T, S> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualHistory")
            .field("capacity", &self.capacity)
            .finish_non_exhaustive()
    }
}

/// Track `source` with snapshots stored as clones.
#[must_use]
pub fn use_manual_history<T: Clone + PartialEq + 'static>(
    source: &Observable<T>,
    capacity: Option<usize>,
) -> ManualHistory<T> {
    let options = HistoryOptions {
        capacity,
        ..HistoryOptions::default()
    };
    use_manual_history_with(source, options)
}

/// Track `source` with a custom snapshot codec.
#[must_use]
pub fn use_manual_history_with<T, S>(
    source: &Observable<T>,
    options: HistoryOptions<T, S>,
) -> ManualHistory<T, S>
where
    T: Clone + PartialEq + 'static,
    S: Clone + PartialEq + 'static,
{
    let snapshot = source.with(|value| (options.dump)(value));
    let last = Observable::new(HistoryRecord {
        snapshot,
        timestamp: now(),
    });
    let undo_stack: Stack<S> = Observable::new(Vec::new());
    let redo_stack: Stack<S> = Observable::new(Vec::new());
    let can_undo = Computed::from_observable(&undo_stack, |stack| !stack.is_empty());
    let can_redo = Computed::from_observable(&redo_stack, |stack| !stack.is_empty());
    ManualHistory {
        source: source.clone(),
        last,
        undo_stack,
        redo_stack,
        can_undo,
        can_redo,
        capacity: options.capacity,
        dump: options.dump,
        parse: options.parse,
    }
}
