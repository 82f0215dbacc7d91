//! The state store: holds the current [`Snapshot`], runs named reducers and
//! notifies observers.
//!
//! Dispatch is synchronous. When a reducer produces a snapshot equal to the
//! current one nothing is replaced and nobody is notified. A dispatch issued
//! from inside an observer callback is queued and processed once the
//! current notification round has finished, so observers always see
//! snapshots in the order they were produced.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::rc::{Rc, Weak};

use super::{Mode, Snapshot, ToastKind};
use crate::logging::EventLog;

const COMPONENT: &str = "store";

/// Arguments handed to a reducer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    None,
    HostModeAndPort {
        mode: Mode,
        port: u16,
    },
    SelectedHost(String),
    Message {
        text: String,
        kind: ToastKind,
        timeout_ms: u64,
    },
}

/// A pure state transition.
pub type Reducer = fn(&Snapshot, &Payload) -> Snapshot;

type Observer = Rc<dyn Fn(&Snapshot, &Snapshot)>;

/// Outcome of [`Store::dispatch`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// A new snapshot was installed and observers were notified.
    Applied,
    /// The reducer returned an equal snapshot.
    Unchanged,
    /// Issued during a notification round; will run after it.
    Queued,
    /// No reducer is registered under that name.
    UnknownReducer,
}

struct StoreInner {
    state: RefCell<Rc<Snapshot>>,
    reducers: RefCell<HashMap<String, Reducer>>,
    observers: RefCell<Vec<(u64, Observer)>>,
    next_observer: Cell<u64>,
    queue: RefCell<VecDeque<(String, Payload)>>,
    notifying: Cell<bool>,
    log: EventLog,
}

/// Cloneable handle to the one store of a dashboard instance.
#[derive(Clone)]
pub struct Store {
    inner: Rc<StoreInner>,
}

impl std::fmt::Debug for Store {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Store")
            .field("state", &self.state())
            .field("observers", &self.inner.observers.borrow().len())
            .finish()
    }
}

impl Store {
    pub fn new(initial: Snapshot, log: EventLog) -> Self {
        Self {
            inner: Rc::new(StoreInner {
                state: RefCell::new(Rc::new(initial)),
                reducers: RefCell::new(HashMap::new()),
                observers: RefCell::new(Vec::new()),
                next_observer: Cell::new(1),
                queue: RefCell::new(VecDeque::new()),
                notifying: Cell::new(false),
                log,
            }),
        }
    }

    /// A store with the default snapshot and every reducer registered.
    pub fn with_defaults(log: EventLog) -> Self {
        let store = Self::new(Snapshot::default(), log);
        super::reducers::register_all(&store);
        store
    }

    /// Register (or replace) the reducer for `name`.
    pub fn register(&self, name: &str, reducer: Reducer) {
        self.inner
            .reducers
            .borrow_mut()
            .insert(name.to_string(), reducer);
    }

    /// Current snapshot.
    pub fn state(&self) -> Rc<Snapshot> {
        self.inner.state.borrow().clone()
    }

    /// Register an observer called with `(new, old)` after every change.
    pub fn subscribe(&self, observer: impl Fn(&Snapshot, &Snapshot) + 'static) -> Subscription {
        let id = self.inner.next_observer.get();
        self.inner.next_observer.set(id + 1);
        self.inner
            .observers
            .borrow_mut()
            .push((id, Rc::new(observer)));
        Subscription {
            store: Rc::downgrade(&self.inner),
            id,
        }
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.inner.observers.borrow().len()
    }

    /// Run the reducer registered as `name` against the current snapshot.
    pub fn dispatch(&self, name: &str, payload: Payload) -> Dispatch {
        if !self.inner.reducers.borrow().contains_key(name) {
            self.inner
                .log
                .error(COMPONENT, format!("no reducer registered as '{name}'"));
            return Dispatch::UnknownReducer;
        }

        if self.inner.notifying.get() {
            self.inner
                .queue
                .borrow_mut()
                .push_back((name.to_string(), payload));
            return Dispatch::Queued;
        }

        let outcome = self.apply(name, &payload);

        // Drain whatever observers queued while we were notifying.
        loop {
            let next = self.inner.queue.borrow_mut().pop_front();
            let Some((queued_name, queued_payload)) = next else {
                break;
            };
            self.apply(&queued_name, &queued_payload);
        }

        outcome
    }

    // -- Internal --

    fn apply(&self, name: &str, payload: &Payload) -> Dispatch {
        let Some(reducer) = self.inner.reducers.borrow().get(name).copied() else {
            return Dispatch::UnknownReducer;
        };

        let old = self.state();
        let new = reducer(&old, payload);
        if new == *old {
            return Dispatch::Unchanged;
        }

        let new = Rc::new(new);
        *self.inner.state.borrow_mut() = new.clone();
        self.inner.log.info(
            COMPONENT,
            format!("{name}: {} -> {}", old.summary(), new.summary()),
        );

        self.inner.notifying.set(true);
        let observers: Vec<(u64, Observer)> = self.inner.observers.borrow().clone();
        for (id, observer) in observers {
            // Skip observers removed earlier in this round.
            let still_subscribed = self
                .inner
                .observers
                .borrow()
                .iter()
                .any(|(live, _)| *live == id);
            if still_subscribed {
                observer(&new, &old);
            }
        }
        self.inner.notifying.set(false);

        Dispatch::Applied
    }
}

/// Registration handle returned by [`Store::subscribe`].
#[derive(Debug)]
pub struct Subscription {
    store: Weak<StoreInner>,
    id: u64,
}

impl Subscription {
    /// Stop receiving notifications. A no-op once the store is gone.
    pub fn unsubscribe(self) {
        if let Some(store) = self.store.upgrade() {
            store.observers.borrow_mut().retain(|(id, _)| *id != self.id);
        }
    }
}
