//! Capability traits shared by every kind of cell.
//!
//! [`Source`] is the minimal thing a derived cell needs from an upstream:
//! an identity and a way to hear about changes. It is object safe, so a
//! derived cell can depend on a homogeneous `&[&dyn Source]` no matter what
//! value types the upstreams hold.
//!
//! [`Observable<T>`] adds typed reads and typed subscriptions. The re-render
//! adapter accepts any `Observable<T>`, which is how it treats signals and
//! computed cells uniformly.

use std::rc::Rc;

use super::subscription::{CellId, Subscription};

/// Anything a derived cell can depend on.
pub trait Source {
    /// Identity of the underlying cell.
    fn cell_id(&self) -> CellId;

    /// Register a change-only listener.
    ///
    /// Unlike `subscribe`, the listener is not replayed on registration; it
    /// runs once per actual value change.
    fn observe(&self, listener: Rc<dyn Fn()>) -> Subscription;
}

/// A readable, subscribable cell holding a `T`.
pub trait Observable<T>: Source {
    /// Current value. Registers a read with an active tracking context.
    fn get(&self) -> T;

    /// Current value without registering a read.
    fn get_untracked(&self) -> T;

    /// Register a listener with replay-on-subscribe semantics.
    fn subscribe_dyn(&self, listener: Rc<dyn Fn(&T)>) -> Subscription;
}
