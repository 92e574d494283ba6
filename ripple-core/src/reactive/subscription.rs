//! Subscription handles and identifiers for the reactive system.
//!
//! A [`Subscription`] represents exactly one listener registered on one cell.
//! Disposing it removes that listener and nothing else.

use std::any::Any;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Unique identifier for a cell (signal or the cell inside a computed).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CellId(u64);

impl CellId {
    /// Generate a new unique cell ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl Default for CellId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CellId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "cell#{}", self.0)
    }
}

/// Unique identifier for a listener registration.
///
/// Used as the key of a cell's listener map, so it also fixes the
/// notification order (ids are handed out in increasing order).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(u64);

impl SubscriptionId {
    /// Generate a new unique subscription ID.
    pub fn new() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::Relaxed))
    }
}

impl Default for SubscriptionId {
    fn default() -> Self {
        Self::new()
    }
}

/// Handle to a single listener registration.
///
/// Calling [`dispose`](Subscription::dispose) removes the listener from its
/// cell. Disposal is idempotent, and dropping the handle disposes it. Use
/// [`detach`](Subscription::detach) to keep the listener registered for the
/// rest of the cell's life.
#[must_use = "dropping a Subscription removes the listener"]
pub struct Subscription {
    id: SubscriptionId,
    source: CellId,
    /// Removal callback. `None` once disposed or detached.
    remove: RefCell<Option<Box<dyn FnOnce()>>>,
}

impl Subscription {
    /// Create a subscription whose disposal runs `remove` once.
    pub(crate) fn new<F>(id: SubscriptionId, source: CellId, remove: F) -> Self
    where
        F: FnOnce() + 'static,
    {
        Self {
            id,
            source,
            remove: RefCell::new(Some(Box::new(remove))),
        }
    }

    /// Keep `owner` alive until this subscription is disposed or detached.
    pub(crate) fn retaining(self, owner: Rc<dyn Any>) -> Self {
        let remove = self.remove.borrow_mut().take();
        if let Some(remove) = remove {
            *self.remove.borrow_mut() = Some(Box::new(move || {
                remove();
                drop(owner);
            }));
        }
        self
    }

    /// The id of this registration.
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    /// The cell this subscription listens to.
    pub fn source(&self) -> CellId {
        self.source
    }

    /// Whether the listener is still registered through this handle.
    pub fn is_active(&self) -> bool {
        self.remove.borrow().is_some()
    }

    /// Remove the listener. Calling this more than once does nothing.
    pub fn dispose(&self) {
        // Release the borrow before running the callback; it may re-enter.
        let remove = self.remove.borrow_mut().take();
        if let Some(remove) = remove {
            remove();
        }
    }

    /// Give up the handle without removing the listener.
    ///
    /// A detached listener on a computed cell no longer keeps that cell
    /// alive.
    pub fn detach(self) {
        self.remove.borrow_mut().take();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("source", &self.source)
            .field("active", &self.is_active())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::rc::Rc;

    fn counting_subscription() -> (Subscription, Rc<Cell<u32>>) {
        let removed = Rc::new(Cell::new(0));
        let removed_clone = removed.clone();
        let sub = Subscription::new(SubscriptionId::new(), CellId::new(), move || {
            removed_clone.set(removed_clone.get() + 1);
        });
        (sub, removed)
    }

    #[test]
    fn ids_are_unique() {
        let id1 = SubscriptionId::new();
        let id2 = SubscriptionId::new();
        assert_ne!(id1, id2);
        assert!(id1 < id2);

        assert_ne!(CellId::new(), CellId::new());
    }

    #[test]
    fn dispose_runs_removal_once() {
        let (sub, removed) = counting_subscription();
        assert!(sub.is_active());

        sub.dispose();
        sub.dispose();
        sub.dispose();

        assert!(!sub.is_active());
        assert_eq!(removed.get(), 1);
    }

    #[test]
    fn drop_disposes() {
        let (sub, removed) = counting_subscription();
        drop(sub);
        assert_eq!(removed.get(), 1);
    }

    #[test]
    fn dispose_then_drop_does_not_remove_twice() {
        let (sub, removed) = counting_subscription();
        sub.dispose();
        drop(sub);
        assert_eq!(removed.get(), 1);
    }

    #[test]
    fn detach_skips_removal() {
        let (sub, removed) = counting_subscription();
        sub.detach();
        assert_eq!(removed.get(), 0);
    }

    #[test]
    fn retained_owner_lives_until_dispose() {
        let (sub, removed) = counting_subscription();
        let owner = Rc::new(5u8);
        let sub = sub.retaining(owner.clone());
        assert_eq!(Rc::strong_count(&owner), 2);

        sub.dispose();
        assert_eq!(removed.get(), 1);
        assert_eq!(Rc::strong_count(&owner), 1);
    }

    #[test]
    fn cell_id_display() {
        let id = CellId::new();
        assert_eq!(id.to_string(), format!("cell#{}", id.raw()));
    }
}
