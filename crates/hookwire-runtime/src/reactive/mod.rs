#![forbid(unsafe_code)]

//! Reactive primitives for hookwire composables.
//!
//! This module provides the change-tracking layer every composable is built
//! on:
//!
//! - [`Observable`]: a shared, version-tracked value with change
//!   notification via subscriber callbacks.
//! - [`Subscription`]: RAII guard that unsubscribes on drop.
//! - [`Computed`]: a lazily-evaluated, memoized value derived from
//!   observables.
//! - [`Binding`]: an uncached getter over reactive state.
//! - [`BatchScope`]: RAII guard that defers notifications until the scope
//!   exits, then drains the post-flush queue.
//! - [`watch`]: re-run a callback when the tracked reads of a getter change.
//! - [`EffectScope`]: owner of cleanups for everything created inside it.
//!
//! # Architecture
//!
//! `Observable<T>` uses `Rc<RefCell<..>>` for single-threaded shared
//! ownership. Subscribers are stored as `Weak` callbacks and cleaned up
//! lazily during notification.
//!
//! Tracked reads record their source in a thread-local frame stack
//! ([`tracking`]); watchers subscribe to whatever the last run of their
//! getter read.
//!
//! Every `set` belongs to an update cycle ([`batch`]). Notifications run
//! when the outermost cycle ends, followed by post-flush watchers.
//!
//! # Invariants
//!
//! 1. Version increments exactly once per mutation that changes the value.
//! 2. Subscribers are notified in registration order.
//! 3. Setting a value equal to the current value is a no-op (no version bump,
//!    no notifications).
//! 4. Dropping a [`Subscription`] removes the callback before the next
//!    notification.
//! 5. `Computed::get()` never returns a stale value.
//! 6. Post-flush watchers run only after every queued notification of their
//!    cycle has run.

pub mod batch;
pub mod binding;
pub mod computed;
pub mod observable;
pub mod scope;
pub mod tracking;
pub mod watch;

pub use batch::{BatchScope, batch, flush_post_jobs, is_batching, pending_post_jobs};
pub use binding::{Binding, bind_mapped, bind_mapped2, bind_observable};
pub use computed::Computed;
pub use observable::{Observable, Subscription};
pub use scope::{EffectScope, has_current_scope, on_scope_dispose};
pub use tracking::{is_tracking, untracked};
pub use watch::{Flush, WatchHandle, WatchOptions, watch};
