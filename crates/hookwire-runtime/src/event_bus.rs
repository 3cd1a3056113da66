#![forbid(unsafe_code)]

//! Keyed, thread-local event bus.
//!
//! Every [`EventBus`] created with the same [`BusKey`] on a thread shares
//! one listener list, so unrelated parts of a program can talk through a
//! well-known key without passing handles around.
//!
//! # Invariants
//!
//! 1. Listeners run in registration order.
//! 2. A listener removed during `emit` is not called later in that emit.
//! 3. A key with no listeners left is removed from the registry.
//! 4. `on` inside an effect scope unregisters when the scope stops.
//!
//! Buses sharing a key must agree on the event and payload types; a
//! listener registered with different types is skipped by `emit`.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;

use crate::reactive::on_scope_dispose;

/// Identifier of a bus.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum BusKey {
    Name(String),
    Id(u64),
}

static NEXT_UNIQUE: AtomicU64 = AtomicU64::new(1 << 63);

impl BusKey {
    /// A key distinct from every other key, including numeric ones below
    /// `2^63`.
    #[must_use]
    pub fn unique() -> Self {
        Self::Id(NEXT_UNIQUE.fetch_add(1, Ordering::Relaxed))
    }
}

impl From<&str> for BusKey {
    fn from(name: &str) -> Self {
        Self::Name(name.to_owned())
    }
}

impl From<String> for BusKey {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<u64> for BusKey {
    fn from(id: u64) -> Self {
        Self::Id(id)
    }
}

/// Identifier of a registered bus listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BusListenerId(u64);

type BusCallback<T, P> = Rc<dyn Fn(&T, Option<&P>)>;

struct Entry {
    id: BusListenerId,
    callback: Rc<dyn Any>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    buses: AHashMap<BusKey, Vec<Entry>>,
}

thread_local! {
    static REGISTRY: RefCell<Registry> = RefCell::new(Registry::default());
}

fn remove(key: &BusKey, id: BusListenerId) -> bool {
    REGISTRY.with(|registry| {
        let mut registry = registry.borrow_mut();
        let Some(entries) = registry.buses.get_mut(key) else {
            return false;
        };
        let before = entries.len();
        entries.retain(|entry| entry.id != id);
        let removed = entries.len() != before;
        if entries.is_empty() {
            registry.buses.remove(key);
        }
        removed
    })
}

fn is_registered(key: &BusKey, id: BusListenerId) -> bool {
    REGISTRY.with(|registry| {
        registry
            .borrow()
            .buses
            .get(key)
            .is_some_and(|entries| entries.iter().any(|entry| entry.id == id))
    })
}

/// Typed handle to a keyed bus.
pub struct EventBus<T, P = ()> {
    key: BusKey,
    _types: PhantomData<fn(&T, Option<&P>)>,
}

impl<T, P> Clone for EventBus<T, P> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            _types: PhantomData,
        }
    }
}

impl<T, P> std::fmt::Debug for EventBus<T, P> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus").field("key", &self.key).finish()
    }
}

impl<T: 'static, P: 'static> EventBus<T, P> {
    #[must_use]
    pub fn key(&self) -> &BusKey {
        &self.key
    }

    /// Register `listener`. Inside an effect scope it is removed when the
    /// scope stops.
    pub fn on(&self, listener: impl Fn(&T, Option<&P>) + 'static) -> BusListenerId {
        let callback: BusCallback<T, P> = Rc::new(listener);
        let id = REGISTRY.with(|registry| {
            let mut registry = registry.borrow_mut();
            let id = BusListenerId(registry.next_id);
            registry.next_id += 1;
            registry
                .buses
                .entry(self.key.clone())
                .or_default()
                .push(Entry {
                    id,
                    callback: Rc::new(callback),
                });
            id
        });
        let key = self.key.clone();
        on_scope_dispose(move || {
            remove(&key, id);
        });
        id
    }

    /// Register `listener` for a single emit.
    pub fn once(&self, listener: impl Fn(&T, Option<&P>) + 'static) -> BusListenerId {
        let key = self.key.clone();
        let slot: Rc<Cell<Option<BusListenerId>>> = Rc::new(Cell::new(None));
        let own = Rc::clone(&slot);
        let id = self.on(move |event, payload| {
            if let Some(id) = own.get() {
                remove(&key, id);
            }
            listener(event, payload);
        });
        slot.set(Some(id));
        id
    }

    /// Remove a listener. Returns whether it was registered.
    pub fn off(&self, id: BusListenerId) -> bool {
        remove(&self.key, id)
    }

    /// Call every listener with `event` and `payload`.
    pub fn emit(&self, event: T, payload: Option<P>) {
        let snapshot: Vec<(BusListenerId, Rc<dyn Any>)> = REGISTRY.with(|registry| {
            registry
                .borrow()
                .buses
                .get(&self.key)
                .map(|entries| {
                    entries
                        .iter()
                        .map(|entry| (entry.id, Rc::clone(&entry.callback)))
                        .collect()
                })
                .unwrap_or_default()
        });
        for (id, callback) in snapshot {
            if !is_registered(&self.key, id) {
                continue;
            }
            match callback.downcast_ref::<BusCallback<T, P>>() {
                Some(callback) => callback(&event, payload.as_ref()),
                None => tracing::trace!(key = ?self.key, "bus listener type mismatch; skipped"),
            }
        }
    }

    /// Remove every listener for this key.
    pub fn reset(&self) {
        REGISTRY.with(|registry| registry.borrow_mut().buses.remove(&self.key));
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        REGISTRY.with(|registry| registry.borrow().buses.get(&self.key).map_or(0, Vec::len))
    }
}

/// A handle to the bus named by `key`.
pub fn use_event_bus<T: 'static, P: 'static>(key: impl Into<BusKey>) -> EventBus<T, P> {
    EventBus {
        key: key.into(),
        _types: PhantomData,
    }
}
