#![forbid(unsafe_code)]

//! Timer host for time-based composables.
//!
//! hookwire does not own an event loop. A [`TimerQueue`] stores timeouts and
//! intervals; the host drives it by calling [`poll`](TimerQueue::poll) from
//! its own loop (or [`advance`](TimerQueue::advance) under a manual clock).
//! Due callbacks run synchronously, in deadline order, each inside its own
//! update cycle.
//!
//! # Time source
//!
//! - [`TimerQueue::new`]: real monotonic time via `web_time::Instant`, so the
//!   same code runs natively and on `wasm32`.
//! - [`TimerQueue::manual`]: time only moves through `advance`, which makes
//!   timer-driven behavior fully deterministic in tests.
//!
//! Composables capture the thread's current queue ([`current`]) when they
//! are created; [`install`] swaps it for the lifetime of a guard.
//!
//! # Invariants
//!
//! 1. Timers fire in deadline order; ties fire in creation order.
//! 2. An interval is re-armed before its callback runs, so clearing it from
//!    inside the callback cancels the next occurrence.
//! 3. A cleared timer never fires.
//! 4. An interval fires at most once per [`poll`](TimerQueue::poll) after a
//!    stall; the periods it missed are dropped.

use std::cell::RefCell;
use std::collections::BTreeMap;
use std::rc::Rc;

use ahash::AHashMap;
use web_time::{Duration, Instant};

use crate::reactive::batch;

/// Identifier of a scheduled timer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

#[derive(Debug, Clone, Copy)]
enum Clock {
    Real { epoch: Instant },
    Manual { now: Duration },
}

impl Clock {
    fn now(&self) -> Duration {
        match self {
            Self::Real { epoch } => epoch.elapsed(),
            Self::Manual { now } => *now,
        }
    }
}

struct Timer {
    key: (Duration, u64),
    period: Option<Duration>,
    callback: Rc<dyn Fn()>,
}

struct QueueState {
    clock: Clock,
    next_id: u64,
    next_seq: u64,
    order: BTreeMap<(Duration, u64), TimerId>,
    timers: AHashMap<TimerId, Timer>,
}

impl QueueState {
    fn schedule(
        &mut self,
        id: TimerId,
        deadline: Duration,
        period: Option<Duration>,
        callback: Rc<dyn Fn()>,
    ) {
        let key = (deadline, self.next_seq);
        self.next_seq += 1;
        self.order.insert(key, id);
        self.timers.insert(id, Timer { key, period, callback });
    }

    /// Remove the earliest timer due at or before `limit`, re-arming
    /// intervals.
    fn pop_due(&mut self, limit: Duration) -> Option<(Duration, Rc<dyn Fn()>)> {
        let (&key, &id) = self.order.iter().next()?;
        if key.0 > limit {
            return None;
        }
        self.order.remove(&key);
        let timer = self.timers.remove(&id)?;
        let callback = Rc::clone(&timer.callback);
        if let Some(period) = timer.period {
            let next = next_occurrence(key.0, period, self.clock.now());
            self.schedule(id, next, Some(period), timer.callback);
        }
        Some((key.0, callback))
    }
}

/// First occurrence of an interval after `deadline` that is still ahead of
/// `now`. Periods missed during a stall are skipped, not replayed.
fn next_occurrence(deadline: Duration, period: Duration, now: Duration) -> Duration {
    let behind = now.saturating_sub(deadline);
    let missed = behind.as_nanos() / period.as_nanos().max(1);
    let steps = u32::try_from(missed + 1).unwrap_or(u32::MAX);
    deadline.saturating_add(period.saturating_mul(steps))
}

/// A queue of timeouts and intervals driven by the host.
///
/// Clones share the queue.
#[derive(Clone)]
pub struct TimerQueue {
    state: Rc<RefCell<QueueState>>,
}

impl TimerQueue {
    /// A queue on the real monotonic clock.
    #[must_use]
    pub fn new() -> Self {
        Self::with_clock(Clock::Real {
            epoch: Instant::now(),
        })
    }

    /// A queue whose clock only moves through [`advance`](Self::advance).
    #[must_use]
    pub fn manual() -> Self {
        Self::with_clock(Clock::Manual {
            now: Duration::ZERO,
        })
    }

    fn with_clock(clock: Clock) -> Self {
        Self {
            state: Rc::new(RefCell::new(QueueState {
                clock,
                next_id: 0,
                next_seq: 0,
                order: BTreeMap::new(),
                timers: AHashMap::new(),
            })),
        }
    }

    #[must_use]
    pub fn is_manual(&self) -> bool {
        matches!(self.state.borrow().clock, Clock::Manual { .. })
    }

    /// Time elapsed since the queue was created.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.state.borrow().clock.now()
    }

    /// Run `callback` once, `delay` from now.
    pub fn set_timeout(&self, delay: Duration, callback: impl Fn() + 'static) -> TimerId {
        self.insert(delay, None, Rc::new(callback))
    }

    /// Run `callback` every `period`, first `period` from now.
    ///
    /// A zero period is treated as one millisecond.
    pub fn set_interval(&self, period: Duration, callback: impl Fn() + 'static) -> TimerId {
        let period = period.max(Duration::from_millis(1));
        self.insert(period, Some(period), Rc::new(callback))
    }

    fn insert(&self, delay: Duration, period: Option<Duration>, callback: Rc<dyn Fn()>) -> TimerId {
        let mut state = self.state.borrow_mut();
        let id = TimerId(state.next_id);
        state.next_id += 1;
        let deadline = state.clock.now() + delay;
        state.schedule(id, deadline, period, callback);
        id
    }

    /// Cancel a timer. Returns whether it was still scheduled.
    pub fn clear(&self, id: TimerId) -> bool {
        let mut state = self.state.borrow_mut();
        match state.timers.remove(&id) {
            Some(timer) => {
                state.order.remove(&timer.key);
                true
            }
            None => false,
        }
    }

    /// Number of scheduled timers.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.state.borrow().timers.len()
    }

    #[must_use]
    pub fn is_scheduled(&self, id: TimerId) -> bool {
        self.state.borrow().timers.contains_key(&id)
    }

    /// Deadline of the earliest timer, relative to the queue's creation.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.state.borrow().order.keys().next().map(|key| key.0)
    }

    /// Fire every timer due now. Returns the number of callbacks run.
    pub fn poll(&self) -> usize {
        let limit = self.now();
        self.fire_until(limit)
    }

    /// Move a manual clock forward by `by`, firing timers as their deadlines
    /// pass. On a real clock this is equivalent to [`poll`](Self::poll).
    pub fn advance(&self, by: Duration) -> usize {
        let clock = self.state.borrow().clock;
        let limit = match clock {
            Clock::Manual { now } => now + by,
            Clock::Real { .. } => return self.poll(),
        };
        let fired = self.fire_until(limit);
        self.set_manual_now(limit);
        fired
    }

    fn set_manual_now(&self, to: Duration) {
        if let Clock::Manual { now } = &mut self.state.borrow_mut().clock {
            *now = (*now).max(to);
        }
    }

    fn fire_until(&self, limit: Duration) -> usize {
        let mut fired = 0;
        loop {
            let due = self.state.borrow_mut().pop_due(limit);
            let Some((deadline, callback)) = due else {
                break;
            };
            self.set_manual_now(deadline);
            batch::batch(|| callback());
            fired += 1;
        }
        if fired > 0 {
            tracing::trace!(fired, "timers fired");
        }
        fired
    }
}

impl Default for TimerQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for TimerQueue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.borrow();
        f.debug_struct("TimerQueue")
            .field("clock", &state.clock)
            .field("pending", &state.timers.len())
            .finish()
    }
}

thread_local! {
    static CURRENT: RefCell<Option<TimerQueue>> = const { RefCell::new(None) };
}

/// The thread's current timer queue, created on first use with a real clock.
#[must_use]
pub fn current() -> TimerQueue {
    CURRENT.with(|slot| slot.borrow_mut().get_or_insert_with(TimerQueue::new).clone())
}

/// Make `queue` the thread's current queue until the guard drops.
#[must_use = "dropping the guard restores the previous timer queue"]
pub fn install(queue: TimerQueue) -> TimerQueueGuard {
    let previous = CURRENT.with(|slot| slot.borrow_mut().replace(queue));
    TimerQueueGuard { previous }
}

/// Restores the previously installed timer queue on drop.
pub struct TimerQueueGuard {
    previous: Option<TimerQueue>,
}

impl Drop for TimerQueueGuard {
    fn drop(&mut self) {
        let previous = self.previous.take();
        CURRENT.with(|slot| *slot.borrow_mut() = previous);
    }
}

impl std::fmt::Debug for TimerQueueGuard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TimerQueueGuard").finish_non_exhaustive()
    }
}
