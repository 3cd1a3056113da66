#![forbid(unsafe_code)]

//! Update cycles: batched notifications and the post-flush queue.
//!
//! Every [`Observable::set`](super::Observable::set) runs inside an update
//! cycle. Outside an explicit [`BatchScope`] the cycle is just that one
//! `set`; inside one, the cycle lasts until the outermost scope drops.
//! Values change immediately, but subscriber notifications are queued and
//! run when the cycle ends.
//!
//! After all queued notifications have run, the **post-flush queue** drains.
//! Post-flush watchers land there, which is what lets a watcher observe
//! the settled state of a cycle instead of an intermediate one.
//!
//! # Invariants
//!
//! 1. Each observable is notified at most once per pending entry; setting it
//!    several times inside one scope yields a single notification carrying
//!    the final value.
//! 2. A post-flush job never runs while notifications are still queued.
//! 3. Nested scopes never flush; only the outermost one does.
//! 4. Work queued during a flush joins the running flush rather than
//!    starting a nested one.

use std::cell::RefCell;
use std::collections::VecDeque;
use std::marker::PhantomData;
use std::rc::{Rc, Weak};

use ahash::AHashSet;

/// Work that runs after the notifications of an update cycle.
pub(crate) trait PostJob {
    fn run_post(self: Rc<Self>);
}

#[derive(Default)]
struct BatchContext {
    depth: usize,
    flushing: bool,
    pending: VecDeque<(usize, Box<dyn FnOnce()>)>,
    pending_ids: AHashSet<usize>,
    post: VecDeque<Weak<dyn PostJob>>,
}

thread_local! {
    static CONTEXT: RefCell<BatchContext> = RefCell::new(BatchContext::default());
}

enum Task {
    Notify(Box<dyn FnOnce()>),
    Post(Weak<dyn PostJob>),
}

/// RAII guard that defers observable notifications until it drops.
///
/// # Usage
///
/// ```ignore
/// let width = Observable::new(0);
/// let height = Observable::new(0);
/// {
///     let _batch = BatchScope::new();
///     width.set(80);
///     height.set(24);
///     // Subscribers have not run yet.
/// }
/// // Both notifications and any post-flush watchers have run.
/// ```
#[must_use = "notifications flush when the scope is dropped"]
pub struct BatchScope {
    _not_send: PhantomData<Rc<()>>,
}

impl BatchScope {
    /// Enter a batch.
    pub fn new() -> Self {
        CONTEXT.with(|ctx| ctx.borrow_mut().depth += 1);
        Self {
            _not_send: PhantomData,
        }
    }
}

impl Default for BatchScope {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for BatchScope {
    fn drop(&mut self) {
        let outermost = CONTEXT.with(|ctx| {
            let mut ctx = ctx.borrow_mut();
            ctx.depth = ctx.depth.saturating_sub(1);
            ctx.depth == 0 && !ctx.flushing
        });
        if outermost {
            run_flush();
        }
    }
}

impl std::fmt::Debug for BatchScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchScope")
            .field("depth", &CONTEXT.with(|ctx| ctx.borrow().depth))
            .finish()
    }
}

struct FlushingGuard;

impl Drop for FlushingGuard {
    fn drop(&mut self) {
        CONTEXT.with(|ctx| ctx.borrow_mut().flushing = false);
    }
}

fn run_flush() {
    CONTEXT.with(|ctx| ctx.borrow_mut().flushing = true);
    let _reset = FlushingGuard;

    loop {
        let task = CONTEXT.with(|ctx| {
            let mut ctx = ctx.borrow_mut();
            if let Some((id, notify)) = ctx.pending.pop_front() {
                ctx.pending_ids.remove(&id);
                Some(Task::Notify(notify))
            } else {
                ctx.post.pop_front().map(Task::Post)
            }
        });
        match task {
            Some(Task::Notify(notify)) => notify(),
            Some(Task::Post(job)) => {
                if let Some(job) = job.upgrade() {
                    job.run_post();
                }
            }
            None => break,
        }
    }
}

/// Queue a notification for the source `id`, collapsing duplicates.
pub(crate) fn defer_notification(id: usize, notify: Box<dyn FnOnce()>) {
    let _cycle = BatchScope::new();
    CONTEXT.with(|ctx| {
        let mut ctx = ctx.borrow_mut();
        if ctx.pending_ids.insert(id) {
            ctx.pending.push_back((id, notify));
        }
    });
}

/// Queue a job for the post-flush phase of the current cycle.
///
/// Callers are responsible for not queueing the same job twice.
pub(crate) fn queue_post_job(job: Weak<dyn PostJob>) {
    let _cycle = BatchScope::new();
    CONTEXT.with(|ctx| ctx.borrow_mut().post.push_back(job));
}

/// Run `f` inside a [`BatchScope`].
pub fn batch<R>(f: impl FnOnce() -> R) -> R {
    let _scope = BatchScope::new();
    f()
}

/// Whether an explicit or implicit update cycle is open.
#[must_use]
pub fn is_batching() -> bool {
    CONTEXT.with(|ctx| ctx.borrow().depth > 0)
}

/// Number of post-flush jobs waiting to run.
#[must_use]
pub fn pending_post_jobs() -> usize {
    CONTEXT.with(|ctx| ctx.borrow().post.len())
}

/// Drain queued notifications and post-flush jobs now.
///
/// Only needed when a previous flush was cut short by a panicking
/// subscriber; inside an open cycle or a running flush this is a no-op.
pub fn flush_post_jobs() {
    let idle = CONTEXT.with(|ctx| {
        let ctx = ctx.borrow();
        ctx.depth == 0 && !ctx.flushing
    });
    if idle {
        run_flush();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::Observable;
    use std::cell::Cell;

    #[test]
    fn notifications_deferred_until_scope_exit() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let _sub = obs.subscribe(move |v| s.set(*v));

        {
            let _batch = BatchScope::new();
            obs.set(1);
            assert_eq!(obs.get(), 1, "value updates immediately");
            assert_eq!(seen.get(), 0, "notification deferred");
            assert!(is_batching());
        }
        assert_eq!(seen.get(), 1);
        assert!(!is_batching());
    }

    #[test]
    fn repeated_sets_collapse_to_one_notification() {
        let obs = Observable::new(0);
        let calls = Rc::new(Cell::new(0u32));
        let last = Rc::new(Cell::new(0));
        let (c, l) = (Rc::clone(&calls), Rc::clone(&last));
        let _sub = obs.subscribe(move |v| {
            c.set(c.get() + 1);
            l.set(*v);
        });

        batch(|| {
            obs.set(1);
            obs.set(2);
            obs.set(3);
        });
        assert_eq!(calls.get(), 1);
        assert_eq!(last.get(), 3);
    }

    #[test]
    fn nested_scopes_flush_once_at_outermost() {
        let obs = Observable::new(0);
        let seen = Rc::new(Cell::new(0));
        let s = Rc::clone(&seen);
        let _sub = obs.subscribe(move |v| s.set(*v));

        let outer = BatchScope::new();
        {
            let _inner = BatchScope::new();
            obs.set(5);
        }
        assert_eq!(seen.get(), 0, "inner scope must not flush");
        drop(outer);
        assert_eq!(seen.get(), 5);
    }

    #[test]
    fn set_inside_subscriber_joins_running_flush() {
        let a = Observable::new(0);
        let b = Observable::new(0);
        let b_seen = Rc::new(Cell::new(0));

        let b_clone = b.clone();
        let _sub_a = a.subscribe(move |v| b_clone.set(*v * 10));
        let bs = Rc::clone(&b_seen);
        let _sub_b = b.subscribe(move |v| bs.set(*v));

        a.set(2);
        assert_eq!(b.get(), 20);
        assert_eq!(b_seen.get(), 20);
    }

    #[test]
    fn flush_post_jobs_is_noop_when_idle() {
        flush_post_jobs();
        assert_eq!(pending_post_jobs(), 0);
    }

    #[test]
    fn debug_reports_depth() {
        let scope = BatchScope::new();
        assert!(format!("{scope:?}").contains("depth: 1"));
    }
}
