//! Computed Implementation
//!
//! A Computed is a read-only cell whose value is derived from other cells and
//! recomputed eagerly whenever one of them changes.
//!
//! # How Computeds Work
//!
//! 1. On construction the computation runs once and its result becomes the
//!    initial value.
//!
//! 2. The computed holds a change-only subscription on each upstream cell.
//!    Any upstream change calls [`Computed::recompute`].
//!
//! 3. The new result is written through the inner cell's setter, so an
//!    unchanged result notifies nobody. Chains of computeds therefore only
//!    propagate real value changes.
//!
//! # Dependencies
//!
//! [`Computed::new`] takes an explicit, static list of upstreams. Reads the
//! computation makes are not tracked; an upstream left out of the list will
//! not trigger recomputation.
//!
//! [`Computed::tracked`] instead records every cell read while the
//! computation runs and subscribes to exactly those, re-discovering them on
//! each recomputation.
//!
//! # Failure
//!
//! A panicking computation unwinds to whoever triggered it: the constructor,
//! or the upstream `set` whose notification caused the recomputation. The
//! cell keeps its previous value.
//!
//! No batching: N upstream changes cause up to N recomputations.

use std::any::Any;
use std::cell::{Cell, RefCell};
use std::fmt::{self, Debug};
use std::rc::Rc;

use smallvec::SmallVec;

use super::context::{untrack, ReactiveContext};
use super::signal::Signal;
use super::source::{Observable, Source};
use super::subscription::{CellId, Subscription};

/// How a computed finds its upstreams.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependencies {
    /// Declared by the caller at construction.
    Explicit,

    /// Discovered from the reads of each evaluation.
    Tracked,
}

type Upstreams = SmallVec<[(CellId, Subscription); 4]>;

struct ComputedInner<T> {
    /// Holds the derived value and the downstream listeners.
    cell: Signal<T>,

    /// The computation function.
    compute: Box<dyn Fn() -> T>,

    dependencies: Dependencies,

    /// Change-only subscriptions on every upstream, owned by this computed.
    upstream: RefCell<Upstreams>,

    disposed: Cell<bool>,

    /// Evaluations after the initial one.
    recomputations: Cell<u64>,
}

/// A derived, read-only cell that recomputes when its upstreams change.
///
/// Cloning a `Computed` creates another handle to the same cell. Active
/// downstream subscriptions count as holders too: the upstream
/// subscriptions are released once the last handle and the last downstream
/// subscription are gone, or earlier through [`dispose`](Computed::dispose).
///
/// # Example
///
/// ```rust
/// use ripple_core::reactive::{Computed, Signal};
///
/// let a = Signal::new(2);
/// let b = Signal::new(3);
/// let sum = Computed::new(&[&a, &b], {
///     let (a, b) = (a.clone(), b.clone());
///     move || a.get() + b.get()
/// });
///
/// assert_eq!(sum.get(), 5);
/// a.set(5);
/// assert_eq!(sum.get(), 8);
/// ```
pub struct Computed<T> {
    inner: Rc<ComputedInner<T>>,
}

impl<T> Computed<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Create a computed over an explicit list of upstream cells.
    pub fn new<F>(dependencies: &[&dyn Source], compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let initial = untrack(&compute);
        let inner = Rc::new(ComputedInner {
            cell: Signal::new(initial),
            compute: Box::new(compute),
            dependencies: Dependencies::Explicit,
            upstream: RefCell::new(SmallVec::new()),
            disposed: Cell::new(false),
            recomputations: Cell::new(0),
        });

        let upstream: Upstreams = dependencies
            .iter()
            .map(|dep| (dep.cell_id(), dep.observe(inner.listener())))
            .collect();
        *inner.upstream.borrow_mut() = upstream;

        tracing::debug!(
            cell = %inner.cell.id(),
            upstreams = dependencies.len(),
            "computed created"
        );
        Self { inner }
    }

    /// Create a computed whose upstreams are the cells its computation reads.
    pub fn tracked<F>(compute: F) -> Self
    where
        F: Fn() -> T + 'static,
    {
        let id = CellId::new();
        let (initial, sources) = {
            let ctx = ReactiveContext::enter(id);
            let value = compute();
            (value, ctx.take_sources())
        };

        let inner = Rc::new(ComputedInner {
            cell: Signal::with_id(id, initial),
            compute: Box::new(compute),
            dependencies: Dependencies::Tracked,
            upstream: RefCell::new(SmallVec::new()),
            disposed: Cell::new(false),
            recomputations: Cell::new(0),
        });
        inner.resubscribe(sources);

        tracing::debug!(
            cell = %id,
            upstreams = inner.upstream.borrow().len(),
            "tracked computed created"
        );
        Self { inner }
    }

    /// Get the computed's unique ID.
    pub fn id(&self) -> CellId {
        self.inner.cell.id()
    }

    /// Get the current value.
    ///
    /// Inside a tracking context this records the computed as a dependency.
    pub fn get(&self) -> T {
        self.track();
        self.inner.cell.get_untracked()
    }

    /// Get the current value without tracking dependencies.
    pub fn get_untracked(&self) -> T {
        self.inner.cell.get_untracked()
    }

    /// Read the value by reference.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        self.track();
        self.inner.cell.with_untracked(f)
    }

    /// Register a listener; replayed once with the current value.
    ///
    /// The computed stays alive, and keeps recomputing, for as long as the
    /// returned subscription is active.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&T) + 'static,
    {
        self.retain(self.inner.cell.subscribe(listener))
    }

    /// Re-run the computation and publish the result.
    ///
    /// Returns `false` without evaluating anything once the computed has
    /// been disposed.
    pub fn recompute(&self) -> bool {
        self.inner.recompute()
    }

    /// Release every upstream subscription and freeze the value.
    ///
    /// Downstream subscribers stay registered. Calling this again does
    /// nothing.
    pub fn dispose(&self) {
        if self.inner.disposed.replace(true) {
            return;
        }
        let released = std::mem::take(&mut *self.inner.upstream.borrow_mut());
        tracing::debug!(cell = %self.id(), upstreams = released.len(), "computed disposed");
        drop(released);
    }

    /// Whether [`dispose`](Computed::dispose) has been called.
    pub fn is_disposed(&self) -> bool {
        self.inner.disposed.get()
    }

    /// How the upstreams of this computed are determined.
    pub fn dependencies(&self) -> Dependencies {
        self.inner.dependencies
    }

    /// Number of recomputations since construction.
    pub fn recompute_count(&self) -> u64 {
        self.inner.recomputations.get()
    }

    /// Number of upstream cells currently subscribed to.
    pub fn upstream_count(&self) -> usize {
        self.inner.upstream.borrow().len()
    }

    /// Number of value changes published since construction.
    pub fn version(&self) -> u64 {
        self.inner.cell.version()
    }

    /// Get the number of downstream listeners.
    pub fn listener_count(&self) -> usize {
        self.inner.cell.listener_count()
    }

    /// Tie this computed's lifetime to `subscription`.
    fn retain(&self, subscription: Subscription) -> Subscription {
        let owner: Rc<dyn Any> = Rc::clone(&self.inner) as Rc<dyn Any>;
        subscription.retaining(owner)
    }

    fn track(&self) {
        if ReactiveContext::is_active() {
            ReactiveContext::track(self.id(), || Rc::new(self.clone()) as Rc<dyn Source>);
        }
    }
}

impl<T> ComputedInner<T>
where
    T: Clone + PartialEq + 'static,
{
    /// Upstream listener. Holds only a weak reference, so upstreams never
    /// keep a computed alive.
    fn listener(self: &Rc<Self>) -> Rc<dyn Fn()> {
        let weak = Rc::downgrade(self);
        Rc::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.recompute();
            }
        })
    }

    fn recompute(self: &Rc<Self>) -> bool {
        if self.disposed.get() {
            return false;
        }

        let value = match self.dependencies {
            Dependencies::Explicit => untrack(|| (self.compute)()),
            Dependencies::Tracked => {
                let (value, sources) = {
                    let ctx = ReactiveContext::enter(self.cell.id());
                    let value = (self.compute)();
                    (value, ctx.take_sources())
                };
                self.resubscribe(sources);
                value
            }
        };

        let count = self.recomputations.get() + 1;
        self.recomputations.set(count);
        tracing::trace!(cell = %self.cell.id(), recomputations = count, "recomputed");

        self.cell.set(value);
        true
    }

    /// Subscribe to `sources`, unless they are the current upstreams.
    fn resubscribe(self: &Rc<Self>, sources: Vec<(CellId, Rc<dyn Source>)>) {
        let unchanged = {
            let current = self.upstream.borrow();
            current.len() == sources.len()
                && sources
                    .iter()
                    .all(|(id, _)| current.iter().any(|(existing, _)| existing == id))
        };
        if unchanged {
            return;
        }

        let fresh: Upstreams = sources
            .iter()
            .map(|(id, source)| (*id, source.observe(self.listener())))
            .collect();
        tracing::debug!(cell = %self.cell.id(), upstreams = fresh.len(), "dependencies changed");

        let stale = std::mem::replace(&mut *self.upstream.borrow_mut(), fresh);
        drop(stale);
    }
}

impl<T> Clone for Computed<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Rc::clone(&self.inner),
        }
    }
}

impl<T> Source for Computed<T>
where
    T: Clone + PartialEq + 'static,
{
    fn cell_id(&self) -> CellId {
        self.inner.cell.id()
    }

    fn observe(&self, listener: Rc<dyn Fn()>) -> Subscription {
        self.retain(self.inner.cell.observe(listener))
    }
}

impl<T> Observable<T> for Computed<T>
where
    T: Clone + PartialEq + 'static,
{
    fn get(&self) -> T {
        Computed::get(self)
    }

    fn get_untracked(&self) -> T {
        Computed::get_untracked(self)
    }

    fn subscribe_dyn(&self, listener: Rc<dyn Fn(&T)>) -> Subscription {
        self.retain(self.inner.cell.subscribe_dyn(listener))
    }
}

impl<T> Debug for Computed<T>
where
    T: Clone + PartialEq + Debug + 'static,
{
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Computed")
            .field("id", &self.id())
            .field("value", &self.get_untracked())
            .field("dependencies", &self.inner.dependencies)
            .field("upstream_count", &self.upstream_count())
            .field("recompute_count", &self.recompute_count())
            .field("disposed", &self.is_disposed())
            .finish()
    }
}

#[cfg(feature = "serde")]
impl<T> serde::Serialize for Computed<T>
where
    T: Clone + PartialEq + serde::Serialize + 'static,
{
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.with(|value| serde::Serialize::serialize(value, serializer))
    }
}

// ----------------------------------------------------------------------------
// Tests
// ----------------------------------------------------------------------------
