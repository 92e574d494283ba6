//! Signal Implementation
//!
//! A Signal is the fundamental reactive primitive: a mutable cell that holds
//! a value and notifies its listeners when that value changes.
//!
//! # How Signals Work
//!
//! 1. `set` compares the new value with the current one. Equal values are
//!    dropped silently; nothing is notified.
//!
//! 2. A different value is stored, the version is bumped, and every listener
//!    is called synchronously, in subscription order, with the new value.
//!
//! 3. `subscribe` replays the current value to the new listener right away,
//!    so a late subscriber is never out of sync.
//!
//! # Failure Policy
//!
//! Notification is fail-fast. If a listener panics, the panic unwinds out of
//! `set` and the remaining listeners of that mutation are skipped. The new
//! value has already been stored at that point.
//!
//! # Threading
//!
//! Signals are `Rc` based and therefore neither `Send` nor `Sync`. All
//! notification runs on the caller's stack. No borrow of the cell is held
//! while a listener runs, so listeners may read the cell, set it again,
//! subscribe, or dispose subscriptions.

use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::{Rc, Weak};

use indexmap::IndexMap;
use smallvec::SmallVec;

use super::context::ReactiveContext;
use super::source::{Observable, Source};
use super::subscription::{CellId, Subscription, SubscriptionId};

/// Listener callback stored by a cell.
type Listener<T> = Rc<dyn Fn(&T)>;

/// Shared state behind every clone of a signal.
struct SignalInner<T> {
    id: CellId,
    value: RefCell<T>,
    /// Bumped once per stored change.
    version: Cell<u64>,
    /// Insertion order is notification order.
    listeners: RefCell<IndexMap<SubscriptionId, Listener<T>>>,
}

/// A reactive cell holding a value of type T.
///
/// Cloning a `Signal` creates another handle to the same cell.
///
/// # Example
///
/// ```rust
/// use ripple_core::reactive::Signal;
///
/// let count = Signal::new(0);
/// let seen = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
///
/// let log = seen.clone();
/// let _sub = count.subscribe(move |v| log.borrow_mut().push(*v));
///
/// count.set(10);
/// count.set(10);
/// count.set(20);
/// assert_eq!(*seen.borrow(), vec![0, 10, 20]);
/// ```
pub struct Signal<T> {
    inner: Rc<SignalInner<T>>,
}

impl<T> Signal<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a new signal with the given initial value.
    pub fn new(value: T) -> Self {
        Self::with_id(CellId::new(), value)
    }

    /// Create a signal under an id reserved earlier.
    pub(crate) fn with_id(id: CellId, value: T) -> Self {
        Self {
            inner: Rc::new(SignalInner {
                id,
                value: RefCell::new(value),
                version: Cell::new(0),
                listeners: RefCell::new(IndexMap::new()),
            }),
        }
    }

    /// Get the signal's unique ID.
    pub fn id(&self) -> CellId {
        self.inner.id
    }

    /// Get the current value.
    ///
    /// If called within a tracking context, this also records the signal as
    /// a dependency of the running computation.
    pub fn get(&self) -> T {
        self.track();
        self.get_untracked()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Read the value by reference without tracking.
    pub(crate) fn with_untracked<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Read the value by reference.
    ///
    /// # Panics
    ///
    /// Panics if `f` sets this same signal.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        f(&self.inner.value.borrow())
    }

    /// Set a new value and notify listeners if it differs from the current one.
    pub fn set(&self, value: T) {
        {
            let mut current = self.inner.value.borrow_mut();
            if *current == value {
                return;
            }
            *current = value.clone();
        }

        let version = self.inner.version.get() + 1;
        self.inner.version.set(version);
        tracing::trace!(cell = %self.inner.id, version, "value changed");

        self.notify(&value);
    }

    /// Update the value using a function of the current one.
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&T) -> T,
    {
        let next = f(&self.inner.value.borrow());
        self.set(next);
    }

    /// Register a listener.
    ///
    /// The listener is called immediately with the current value, then once
    /// per change. Dispose (or drop) the returned handle to remove it.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.subscribe_rc(Rc::new(listener))
    }

    fn subscribe_rc(&self, listener: Listener<T>) -> Subscription {
        // The handle exists before the replay, so a panicking replay unwinds
        // through its Drop and unregisters the listener.
        let subscription = self.register(Rc::clone(&listener));
        let current = self.get_untracked();
        listener(&current);
        subscription
    }

    /// Register a listener without replaying the current value.
    fn register(&self, listener: Listener<T>) -> Subscription {
        let id = SubscriptionId::new();
        self.inner.listeners.borrow_mut().insert(id, listener);

        let weak: Weak<SignalInner<T>> = Rc::downgrade(&self.inner);
        Subscription::new(id, self.inner.id, move || {
            if let Some(inner) = weak.upgrade() {
                // Drop the listener after the borrow ends; its captures may
                // hold subscriptions on this same cell.
                let removed = inner.listeners.borrow_mut().shift_remove(&id);
                drop(removed);
            }
        })
    }

    /// Call every listener registered at the start of this pass.
    ///
    /// A nested `set` from a listener runs its own pass to completion
    /// first, so listeners after that one see the newer value before the
    /// outer one.
    fn notify(&self, value: &T) {
        let snapshot: SmallVec<[(SubscriptionId, Listener<T>); 4]> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(id, listener)| (*id, Rc::clone(listener)))
            .collect();

        for (id, listener) in snapshot {
            // Disposed earlier in this pass.
            if !self.inner.listeners.borrow().contains_key(&id) {
                continue;
            }
            listener(value);
        }
    }

    /// Number of changes stored so far.
    pub fn version(&self) -> u64 {
        self.inner.version.get()
    }

    /// Get the number of registered listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.listeners.borrow().len()
    }

    fn track(&self) {
        if ReactiveContext::is_active() {
            ReactiveContext::track(self.inner.id, || Rc::new(self.clone()) as Rc<dyn Source>);
        }
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Source for Signal<T>
where
    T: Clone + PartialEq + 'static,
{
    fn cell_id(&self) -> CellId {
        self.inner.id
    }

    fn observe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.register(Rc::new(move |_: &T| listener()))
    }
}

impl<T> Observable<T> for Signal<T>
where
    T: Clone + PartialEq + 'static,
{
    fn get(&self) -> T {
        Signal::get(self)
    }

    fn get_untracked(&self) -> T {
        Signal::get_untracked(self)
    }

    fn subscribe_dyn(&self, listener: Rc<dyn Fn(&T)>) -> Subscription {
        self.subscribe_rc(listener)
    }
}

impl<T> Default for Signal<T>
where
    T: Clone + PartialEq + Default + 'static,
{
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T> Debug for Signal<T>
where
    T: Clone + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signal")
            .field("id", &self.inner.id)
            .field("value", &*self.inner.value.borrow())
            .field("version", &self.version())
            .field("listener_count", &self.listener_count())
            .finish()
    }
}

#[cfg(feature = "serde")]
impl<T> serde::Serialize for Signal<T>
where
    T: Clone + PartialEq + serde::Serialize + 'static,
{
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&*self.inner.value.borrow(), serializer)
    }
}

#[cfg(feature = "serde")]
impl<'de, T> serde::Deserialize<'de> for Signal<T>
where
    T: Clone + PartialEq + serde::Deserialize<'de> + 'static,
{
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        T::deserialize(deserializer).map(Signal::new)
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn recorder<T: Clone + 'static>() -> (Rc<RefCell<Vec<T>>>, impl Fn(&T) + 'static) {
        let seen = Rc::new(RefCell::new(Vec::new()));
        let log = seen.clone();
        (seen, move |v: &T| log.borrow_mut().push(v.clone()))
    }

    #[test]
    fn signal_get_and_set() {
        let signal = Signal::new(0);
        assert_eq!(signal.get(), 0);

        signal.set(42);
        assert_eq!(signal.get(), 42);
    }

    #[test]
    fn signal_update() {
        let signal = Signal::new(10);
        signal.update(|v| v + 5);
        assert_eq!(signal.get(), 15);
    }

    #[test]
    fn subscribe_replays_current_value() {
        let signal = Signal::new(7);
        let (seen, listener) = recorder();

        let _sub = signal.subscribe(listener);
        assert_eq!(*seen.borrow(), vec![7]);
    }

    #[test]
    fn change_counting_skips_equal_values() {
        let signal = Signal::new(0);
        let (seen, listener) = recorder();
        let _sub = signal.subscribe(listener);

        signal.set(10);
        signal.set(10);
        signal.set(20);

        // First entry is the replay.
        assert_eq!(seen.borrow()[1..], [10, 20]);
        assert_eq!(signal.version(), 2);
    }

    #[test]
    fn listeners_run_in_subscription_order() {
        let signal = Signal::new(0);
        let order = Rc::new(RefCell::new(Vec::new()));

        let subs: Vec<_> = (0..3)
            .map(|n| {
                let order = order.clone();
                signal.subscribe(move |_| order.borrow_mut().push(n))
            })
            .collect();
        order.borrow_mut().clear();

        signal.set(1);
        assert_eq!(*order.borrow(), vec![0, 1, 2]);
        drop(subs);
    }

    #[test]
    fn signal_unsubscribe() {
        let signal = Signal::new(0);
        let (first, listener) = recorder();
        let (second, other) = recorder();

        let sub = signal.subscribe(listener);
        let _keep = signal.subscribe(other);

        signal.set(1);
        sub.dispose();
        signal.set(2);

        assert_eq!(*first.borrow(), vec![0, 1]);
        assert_eq!(*second.borrow(), vec![0, 1, 2]);
        assert_eq!(signal.listener_count(), 1);
    }

    #[test]
    fn dispose_during_notification_skips_listener() {
        let signal = Signal::new(0);
        let slot: Rc<RefCell<Option<Subscription>>> = Rc::new(RefCell::new(None));
        let (seen, listener) = recorder();

        let slot_clone = slot.clone();
        let _first = signal.subscribe(move |v| {
            if *v == 1 {
                if let Some(sub) = slot_clone.borrow().as_ref() {
                    sub.dispose();
                }
            }
        });
        *slot.borrow_mut() = Some(signal.subscribe(listener));

        signal.set(1);
        assert_eq!(*seen.borrow(), vec![0]);
    }

    #[test]
    fn nested_set_still_delivers_outer_value() {
        let signal = Signal::new(0);
        let writer = signal.clone();
        let _clamp = signal.subscribe(move |v| {
            if *v > 10 {
                writer.set(10);
            }
        });
        let (seen, listener) = recorder();
        let _sub = signal.subscribe(listener);

        signal.set(50);

        assert_eq!(signal.get(), 10);
        // The nested pass finishes before the outer pass reaches this
        // listener, so it sees 10 first and still gets 50 exactly once.
        assert_eq!(*seen.borrow(), vec![0, 10, 50]);
        assert_eq!(signal.version(), 2);
    }

    #[test]
    fn panicking_listener_aborts_remaining_notifications() {
        let signal = Signal::new(0);
        let _boom = signal.subscribe(|v| {
            if *v == 1 {
                panic!("listener failed");
            }
        });
        let (seen, listener) = recorder();
        let _sub = signal.subscribe(listener);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| signal.set(1)));
        assert!(result.is_err());

        // Value stored, later listener skipped.
        assert_eq!(signal.get(), 1);
        assert_eq!(*seen.borrow(), vec![0]);

        signal.set(2);
        assert_eq!(*seen.borrow(), vec![0, 2]);
    }

    #[test]
    fn panicking_replay_unregisters_listener() {
        let signal = Signal::new(0);
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            signal.subscribe(|_| panic!("replay failed"))
        }));
        assert!(result.is_err());
        assert_eq!(signal.listener_count(), 0);
    }

    #[test]
    fn observe_does_not_replay() {
        let signal = Signal::new(0);
        let hits = Rc::new(Cell::new(0));
        let hits_clone = hits.clone();

        let _sub = signal.observe(Rc::new(move || hits_clone.set(hits_clone.get() + 1)));
        assert_eq!(hits.get(), 0);

        signal.set(3);
        signal.set(3);
        assert_eq!(hits.get(), 1);
    }

    #[test]
    fn signal_clone_shares_state() {
        let signal1 = Signal::new(0);
        let signal2 = signal1.clone();

        signal1.set(42);
        assert_eq!(signal2.get(), 42);

        signal2.set(100);
        assert_eq!(signal1.get(), 100);
        assert_eq!(signal1.id(), signal2.id());
    }

    #[test]
    fn subscription_outliving_signal_is_inert() {
        let signal = Signal::new(String::from("a"));
        let sub = signal.subscribe(|_| {});
        drop(signal);

        sub.dispose();
        assert!(!sub.is_active());
    }

    #[test]
    fn signal_ids_are_unique() {
        let s1 = Signal::new(0);
        let s2 = Signal::new(0);
        let s3 = Signal::new(0);

        assert_ne!(s1.id(), s2.id());
        assert_ne!(s2.id(), s3.id());
        assert_ne!(s1.id(), s3.id());
    }

    #[cfg(feature = "serde")]
    #[test]
    fn signal_serializes_current_value() {
        let signal = Signal::new(vec![1, 2, 3]);
        assert_eq!(serde_json::to_string(&signal).unwrap(), "[1,2,3]");

        let restored: Signal<Vec<i32>> = serde_json::from_str("[4,5]").unwrap();
        assert_eq!(restored.get(), vec![4, 5]);
    }
}
