#![forbid(unsafe_code)]

//! Reactive runtime for hookwire.
//!
//! - [`reactive`]: observables, computed values, batching, watchers, and
//!   effect scopes.
//! - [`event_listener`]: the subscription manager that keeps listener
//!   registrations in step with reactive targets, events, and listeners.
//! - [`source`] and [`element`]: normalized reactive inputs.
//! - Composables built on the same primitives: [`event_bus`], [`counter`],
//!   [`toggle`], [`cycle_list`], [`history`] (manual undo/redo),
//!   [`interval`], [`timeout`], and [`filters`] (debounce and throttle).
//!   Timing composables are driven by the host-polled [`timer`] queue.
//! - [`config`]: process-wide composable defaults.
//!
//! Everything here is single-threaded: handles are `!Send` and all state is
//! thread-local or `Rc`-shared.

pub mod config;
pub mod counter;
pub mod cycle_list;
pub mod element;
pub mod event_bus;
pub mod event_listener;
pub mod filters;
pub mod history;
pub mod interval;
pub mod reactive;
pub mod source;
pub mod timeout;
pub mod timer;
pub mod toggle;

pub use config::{ComposableDefaults, ConfigError, defaults, set_defaults};
pub use counter::{Counter, CounterOptions, use_counter};
pub use cycle_list::{CycleList, CycleListOptions, use_cycle_list};
pub use element::ElementRef;
pub use event_bus::{BusKey, BusListenerId, EventBus, use_event_bus};
pub use event_listener::{
    BindingInfo, EventListenerHandle, use_default_listener, use_event_listener,
};
pub use filters::{
    DebounceOptions, DebouncedFn, ThrottleOptions, ThrottledFn, use_debounce_fn, use_throttle_fn,
};
pub use history::{
    HistoryOptions, HistoryRecord, ManualHistory, use_manual_history, use_manual_history_with,
};
pub use interval::{
    IntervalCounter, IntervalFnOptions, IntervalOptions, Pausable, use_interval, use_interval_fn,
};
pub use reactive::{
    BatchScope, Binding, Computed, EffectScope, Flush, Observable, Subscription, WatchHandle,
    WatchOptions, batch, on_scope_dispose, untracked, watch,
};
pub use source::{Reactive, Selector};
pub use timeout::{Timeout, TimeoutFn, TimeoutFnOptions, use_timeout, use_timeout_fn};
pub use timer::{TimerId, TimerQueue};
pub use toggle::{Toggle, use_toggle};
