#![forbid(unsafe_code)]

//! Bounded counter.
//!
//! `inc` clamps to the maximum only and `dec` to the minimum only; `set` and
//! `reset` clamp to both. Every method accepts per-call bounds that override
//! the counter's own.

use crate::reactive::Observable;

/// Counter bounds. `None` means unbounded at creation, or "use the
/// counter's bound" when passed to a single call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CounterOptions {
    pub min: Option<i64>,
    pub max: Option<i64>,
}

impl CounterOptions {
    #[must_use]
    pub fn min(mut self, min: i64) -> Self {
        self.min = Some(min);
        self
    }

    #[must_use]
    pub fn max(mut self, max: i64) -> Self {
        self.max = Some(max);
        self
    }
}

/// A reactive integer counter.
#[derive(Clone, Debug)]
pub struct Counter {
    count: Observable<i64>,
    min: i64,
    max: i64,
}

impl Counter {
    fn bounds(&self, overrides: CounterOptions) -> (i64, i64) {
        (
            overrides.min.unwrap_or(self.min),
            overrides.max.unwrap_or(self.max),
        )
    }

    fn clamp(value: i64, min: i64, max: i64) -> i64 {
        value.max(min).min(max)
    }

    /// The underlying observable.
    #[must_use]
    pub fn count(&self) -> &Observable<i64> {
        &self.count
    }

    /// Current value (tracked read).
    #[must_use]
    pub fn get(&self) -> i64 {
        self.count.get()
    }

    pub fn inc(&self, delta: i64) {
        self.inc_with(delta, CounterOptions::default());
    }

    pub fn inc_with(&self, delta: i64, overrides: CounterOptions) {
        let (_, max) = self.bounds(overrides);
        self.count.update(|n| *n = n.saturating_add(delta).min(max));
    }

    pub fn dec(&self, delta: i64) {
        self.dec_with(delta, CounterOptions::default());
    }

    pub fn dec_with(&self, delta: i64, overrides: CounterOptions) {
        let (min, _) = self.bounds(overrides);
        self.count.update(|n| *n = n.saturating_sub(delta).max(min));
    }

    pub fn set(&self, value: i64) {
        self.set_with(value, CounterOptions::default());
    }

    pub fn set_with(&self, value: i64, overrides: CounterOptions) {
        let (min, max) = self.bounds(overrides);
        self.count.set(Self::clamp(value, min, max));
    }

    /// Reset to `value`, or to zero when `None`, clamped to the bounds.
    pub fn reset(&self, value: Option<i64>) {
        self.reset_with(value, CounterOptions::default());
    }

    pub fn reset_with(&self, value: Option<i64>, overrides: CounterOptions) {
        let (min, max) = self.bounds(overrides);
        self.count.set(Self::clamp(value.unwrap_or(0), min, max));
    }
}

/// Create a counter starting at `initial`, clamped to the bounds.
#[must_use]
pub fn use_counter(initial: i64, options: CounterOptions) -> Counter {
    let min = options.min.unwrap_or(i64::MIN);
    let max = options.max.unwrap_or(i64::MAX);
    let start = if initial < min {
        min
    } else if initial > max {
        max
    } else {
        initial
    };
    Counter {
        count: Observable::new(start),
        min,
        max,
    }
}
