//! Reactive Context
//!
//! The reactive context records which cells a computation reads while it
//! runs. This is what lets [`Computed::tracked`](super::Computed::tracked)
//! discover its upstreams instead of having them listed by the caller.
//!
//! # Implementation
//!
//! We use a thread-local stack of frames. Running a tracked computation
//! pushes a tracking frame; every [`Signal::get`](super::Signal::get) while
//! that frame is on top records the signal in it. Explicit-dependency
//! computations push an *untracked* frame instead, which swallows reads so
//! they never leak into an enclosing tracked computation.
//!
//! Frames nest, so a tracked computed may read another tracked computed.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::rc::Rc;

use indexmap::IndexMap;

use super::source::Source;
use super::subscription::CellId;

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Frame>> = const { RefCell::new(Vec::new()) };
}

/// One entry of the context stack.
struct Frame {
    /// The computed cell running in this frame, if any.
    owner: Option<CellId>,
    /// Whether reads are recorded.
    tracking: bool,
    /// Cells read so far, deduplicated, in first-read order.
    sources: IndexMap<CellId, Rc<dyn Source>>,
}

/// Guard that pops its frame when dropped.
///
/// Dropping restores the previous frame even if the computation panicked.
/// The guard is tied to the thread that created it.
pub struct ReactiveContext {
    owner: Option<CellId>,
    depth: usize,
    _not_send: PhantomData<*const ()>,
}

impl ReactiveContext {
    /// Enter a tracking frame owned by `owner`.
    pub fn enter(owner: CellId) -> Self {
        Self::push(Some(owner), true)
    }

    /// Enter a frame that records nothing.
    pub fn untracked() -> Self {
        Self::push(None, false)
    }

    fn push(owner: Option<CellId>, tracking: bool) -> Self {
        let depth = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            stack.push(Frame {
                owner,
                tracking,
                sources: IndexMap::new(),
            });
            stack.len()
        });

        Self {
            owner,
            depth,
            _not_send: PhantomData,
        }
    }

    /// Whether reads are currently being recorded.
    pub fn is_active() -> bool {
        CONTEXT_STACK.with(|stack| stack.borrow().last().is_some_and(|frame| frame.tracking))
    }

    /// The computed cell whose frame is on top, if it is tracking.
    pub fn current_owner() -> Option<CellId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .filter(|frame| frame.tracking)
                .and_then(|frame| frame.owner)
        })
    }

    /// Record a read of cell `id`.
    ///
    /// `source` is only called when the read is new to the current frame.
    pub fn track<F>(id: CellId, source: F)
    where
        F: FnOnce() -> Rc<dyn Source>,
    {
        let wanted = CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .is_some_and(|frame| frame.tracking && !frame.sources.contains_key(&id))
        });
        if !wanted {
            return;
        }

        // Build the handle outside the borrow.
        let source = source();
        CONTEXT_STACK.with(|stack| {
            if let Some(frame) = stack.borrow_mut().last_mut() {
                frame.sources.entry(id).or_insert(source);
            }
        });
    }

    /// Ids of the cells read so far in the current frame.
    pub fn tracked_ids() -> Vec<CellId> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow()
                .last()
                .map(|frame| frame.sources.keys().copied().collect())
                .unwrap_or_default()
        })
    }

    /// Take the sources recorded in this guard's frame.
    pub fn take_sources(&self) -> Vec<(CellId, Rc<dyn Source>)> {
        CONTEXT_STACK.with(|stack| {
            stack
                .borrow_mut()
                .get_mut(self.depth - 1)
                .map(|frame| std::mem::take(&mut frame.sources).into_iter().collect())
                .unwrap_or_default()
        })
    }
}

impl Drop for ReactiveContext {
    fn drop(&mut self) {
        // Pop outside the borrow so dropped sources can't re-enter it.
        let popped = CONTEXT_STACK.with(|stack| {
            let mut stack = stack.borrow_mut();
            debug_assert_eq!(
                stack.len(),
                self.depth,
                "ReactiveContext dropped out of order"
            );
            stack.pop()
        });

        if let Some(frame) = popped {
            debug_assert_eq!(
                frame.owner, self.owner,
                "ReactiveContext mismatch: expected {:?}, got {:?}",
                self.owner, frame.owner
            );
        }
    }
}

/// Run `f` without recording any reads.
pub fn untrack<R>(f: impl FnOnce() -> R) -> R {
    let _ctx = ReactiveContext::untracked();
    f()
}
