//! Property-based invariant tests for `MemoryTarget`.
//!
//! A random sequence of add / remove / dispatch operations is applied both to
//! a `MemoryTarget` and to a plain model of its registration set:
//!
//! 1. Registrations are unique on (event, listener, capture).
//! 2. `remove` only matches the capture phase the listener was added with.
//! 3. `dispatch` invokes exactly the registrations for that event, in
//!    registration order.
//! 4. `once` registrations are gone after their first dispatch.
//! 5. The journal records exactly the accepted adds and removes.
//! 6. No panics on arbitrary operation sequences.

use std::cell::RefCell;
use std::rc::Rc;

use hookwire_core::{EventTarget, JournalEntry, Listener, ListenerOptions, MemoryTarget};
use proptest::prelude::*;

// ── Helpers ─────────────────────────────────────────────────────────────

const EVENTS: [&str; 3] = ["click", "focus", "blur"];
const LISTENERS: usize = 3;

#[derive(Debug, Clone)]
enum Op {
    Add {
        event: usize,
        listener: usize,
        capture: bool,
        once: bool,
    },
    Remove {
        event: usize,
        listener: usize,
        capture: bool,
    },
    Dispatch {
        event: usize,
    },
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        (0..EVENTS.len(), 0..LISTENERS, any::<bool>(), any::<bool>()).prop_map(
            |(event, listener, capture, once)| Op::Add {
                event,
                listener,
                capture,
                once,
            }
        ),
        (0..EVENTS.len(), 0..LISTENERS, any::<bool>()).prop_map(|(event, listener, capture)| {
            Op::Remove {
                event,
                listener,
                capture,
            }
        }),
        (0..EVENTS.len()).prop_map(|event| Op::Dispatch { event }),
    ]
}

/// (event, listener, capture, once)
type ModelEntry = (usize, usize, bool, bool);

fn fixture() -> (MemoryTarget, Vec<Listener>, Rc<RefCell<Vec<usize>>>) {
    let calls = Rc::new(RefCell::new(Vec::new()));
    let listeners = (0..LISTENERS)
        .map(|i| {
            let calls = Rc::clone(&calls);
            Listener::new(move |_| calls.borrow_mut().push(i))
        })
        .collect();
    (MemoryTarget::new("model"), listeners, calls)
}

// ═════════════════════════════════════════════════════════════════════════
// Model agreement
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn memory_target_agrees_with_model(ops in proptest::collection::vec(op_strategy(), 0..64)) {
        let (target, listeners, calls) = fixture();
        let handle = target.target_ref();
        let mut model: Vec<ModelEntry> = Vec::new();
        let mut accepted = 0usize;

        for op in ops {
            match op {
                Op::Add { event, listener, capture, once } => {
                    let options = ListenerOptions::new().capture(capture).once(once);
                    handle
                        .add_event_listener(EVENTS[event], &listeners[listener], options)
                        .unwrap();
                    let exists = model
                        .iter()
                        .any(|&(e, l, c, _)| e == event && l == listener && c == capture);
                    if !exists {
                        model.push((event, listener, capture, once));
                        accepted += 1;
                    }
                }
                Op::Remove { event, listener, capture } => {
                    let options = ListenerOptions::new().capture(capture);
                    handle.remove_event_listener(EVENTS[event], &listeners[listener], options);
                    if let Some(pos) = model
                        .iter()
                        .position(|&(e, l, c, _)| e == event && l == listener && c == capture)
                    {
                        model.remove(pos);
                        accepted += 1;
                    }
                }
                Op::Dispatch { event } => {
                    calls.borrow_mut().clear();
                    let expected: Vec<usize> = model
                        .iter()
                        .filter(|&&(e, ..)| e == event)
                        .map(|&(_, l, ..)| l)
                        .collect();
                    let once_removed = model
                        .iter()
                        .filter(|&&(e, _, _, once)| e == event && once)
                        .count();
                    let invoked = target.emit(EVENTS[event]);
                    prop_assert_eq!(invoked, expected.len());
                    prop_assert_eq!(&*calls.borrow(), &expected);
                    model.retain(|&(e, _, _, once)| !(e == event && once));
                    accepted += once_removed;
                }
            }

            prop_assert_eq!(target.listener_count(), model.len());
            for (i, name) in EVENTS.iter().enumerate() {
                let n = model.iter().filter(|&&(e, ..)| e == i).count();
                prop_assert_eq!(target.listener_count_for(name), n);
            }
        }

        prop_assert_eq!(target.journal().len(), accepted);
    }
}

// ═════════════════════════════════════════════════════════════════════════
// Journal ordering
// ═════════════════════════════════════════════════════════════════════════

proptest! {
    #[test]
    fn journal_adds_then_removes_balance(n in 1usize..8) {
        let target = MemoryTarget::new("journal");
        let listeners: Vec<Listener> = (0..n).map(|_| Listener::new(|_| {})).collect();
        let handle = target.target_ref();
        for l in &listeners {
            handle.add_event_listener("click", l, ListenerOptions::new()).unwrap();
        }
        for l in &listeners {
            handle.remove_event_listener("click", l, ListenerOptions::new());
        }
        let journal = target.journal();
        prop_assert_eq!(journal.len(), 2 * n);
        prop_assert!(journal[..n].iter().all(JournalEntry::is_add));
        prop_assert!(!journal[n..].iter().any(JournalEntry::is_add));
        prop_assert_eq!(target.listener_count(), 0);
    }
}
