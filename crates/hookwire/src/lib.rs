#![forbid(unsafe_code)]

//! hookwire public facade crate.
//!
//! This crate provides the stable, ergonomic surface area for users:
//! `hookwire::core` for the event model and `hookwire::runtime` for the
//! reactive layer and composables. Most programs only need the prelude.
//!
//! ```ignore
//! use hookwire::prelude::*;
//!
//! let button = MemoryTarget::new("button");
//! let scope = EffectScope::new();
//! scope.run(|| {
//!     use_event_listener(&button, "click", Listener::new(|_| println!("clicked")), false)
//! });
//! button.emit("click");
//! ```

pub use hookwire_core as core;
#[cfg(feature = "runtime")]
pub use hookwire_runtime as runtime;

pub mod prelude {
    pub use hookwire_core::{
        Event, EventTarget, Listener, ListenerFlags, ListenerOptions, MemoryTarget, TargetError,
        TargetRef, default_target, set_default_target,
    };

    #[cfg(feature = "runtime")]
    pub use hookwire_runtime::{
        Computed, EffectScope, ElementRef, EventListenerHandle, Observable, Reactive, Selector,
        TimerQueue, WatchOptions, batch, on_scope_dispose, use_counter, use_cycle_list,
        use_debounce_fn, use_default_listener, use_event_bus, use_event_listener, use_interval,
        use_interval_fn, use_manual_history, use_throttle_fn, use_timeout, use_timeout_fn,
        use_toggle, watch,
    };
}
