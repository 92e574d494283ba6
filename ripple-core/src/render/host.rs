//! Re-render hosts.
//!
//! A [`RerenderHost`] is the capability the UI framework hands to a binding:
//! "please schedule a re-render of this component". The framework decides
//! whether that happens synchronously, on a queue drained by its UI thread,
//! or through an async channel. The built-in strategies cover the last two
//! and [`Fallback`] chains several of them.
//!
//! Requests must return promptly. They run inside a cell's notification, so
//! a host that blocks stalls the `set` that triggered it.

use std::any::Any;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use indexmap::IndexSet;
use parking_lot::Mutex;
use smallvec::SmallVec;
use tokio::sync::mpsc;

use super::component::ComponentId;
use super::config::QueueConfig;
use crate::error::{RerenderError, RerenderResult};

/// Something that can schedule a component re-render.
pub trait RerenderHost {
    /// Ask for `component` to be re-rendered.
    fn request_rerender(&self, component: ComponentId) -> RerenderResult;
}

impl<F> RerenderHost for F
where
    F: Fn(ComponentId) -> RerenderResult,
{
    fn request_rerender(&self, component: ComponentId) -> RerenderResult {
        self(component)
    }
}

/// Call `host`, turning a panic into [`RerenderError::Panicked`].
pub(crate) fn attempt(host: &dyn RerenderHost, component: ComponentId) -> RerenderResult {
    match panic::catch_unwind(AssertUnwindSafe(|| host.request_rerender(component))) {
        Ok(result) => result,
        Err(payload) => Err(RerenderError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

// ----------------------------------------------------------------------------
// Queue
// ----------------------------------------------------------------------------

struct QueueShared {
    /// Pending components, oldest first, each at most once.
    pending: Mutex<IndexSet<ComponentId>>,
    closed: AtomicBool,
    config: QueueConfig,
}

/// A coalescing queue of components awaiting a re-render.
///
/// Bindings push into it from the cell's thread; the UI thread calls
/// [`drain`](RenderQueue::drain) once per frame. Cloning shares the queue,
/// and the queue is `Send + Sync` so a clone can live on the UI thread.
#[derive(Clone)]
pub struct RenderQueue {
    shared: Arc<QueueShared>,
}

impl RenderQueue {
    /// Create an unbounded queue.
    pub fn new() -> Self {
        Self::with_config(QueueConfig::default())
    }

    /// Create a queue with the given limits.
    pub fn with_config(config: QueueConfig) -> Self {
        Self {
            shared: Arc::new(QueueShared {
                pending: Mutex::new(IndexSet::new()),
                closed: AtomicBool::new(false),
                config,
            }),
        }
    }

    /// Take every pending component, oldest request first.
    pub fn drain(&self) -> Vec<ComponentId> {
        self.shared.pending.lock().drain(..).collect()
    }

    /// Number of components waiting to be drained.
    pub fn len(&self) -> usize {
        self.shared.pending.lock().len()
    }

    /// Whether nothing is waiting to be drained.
    pub fn is_empty(&self) -> bool {
        self.shared.pending.lock().is_empty()
    }

    /// Refuse further requests. Pending entries can still be drained.
    pub fn close(&self) {
        self.shared.closed.store(true, Ordering::Release);
    }

    /// Whether [`close`](RenderQueue::close) has been called.
    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    /// The limits this queue was created with.
    pub fn config(&self) -> QueueConfig {
        self.shared.config
    }
}

impl Default for RenderQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl RerenderHost for RenderQueue {
    fn request_rerender(&self, component: ComponentId) -> RerenderResult {
        if self.is_closed() {
            return Err(RerenderError::QueueClosed);
        }

        let mut pending = self
            .shared
            .pending
            .try_lock_for(self.shared.config.lock_timeout)
            .ok_or(RerenderError::Busy)?;

        // Already scheduled for the next frame.
        if pending.contains(&component) {
            return Ok(());
        }
        if let Some(capacity) = self.shared.config.capacity {
            if pending.len() >= capacity {
                return Err(RerenderError::QueueFull { capacity });
            }
        }
        pending.insert(component);
        Ok(())
    }
}

impl fmt::Debug for RenderQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RenderQueue")
            .field("pending", &self.len())
            .field("closed", &self.is_closed())
            .field("config", &self.shared.config)
            .finish()
    }
}

// ----------------------------------------------------------------------------
// Channel
// ----------------------------------------------------------------------------

/// Forwards re-render requests to an async UI loop.
///
/// Sending never blocks. Once the receiver is dropped every request fails
/// with [`RerenderError::Disconnected`].
#[derive(Debug, Clone)]
pub struct RenderChannel {
    tx: mpsc::UnboundedSender<ComponentId>,
}

impl RenderChannel {
    /// Wrap the sending half of a channel the UI loop reads from.
    pub fn new(tx: mpsc::UnboundedSender<ComponentId>) -> Self {
        Self { tx }
    }

    /// Whether the receiver has been dropped.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// Create a render channel and the receiver the UI loop reads from.
pub fn render_channel() -> (RenderChannel, mpsc::UnboundedReceiver<ComponentId>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (RenderChannel::new(tx), rx)
}

impl RerenderHost for RenderChannel {
    fn request_rerender(&self, component: ComponentId) -> RerenderResult {
        self.tx
            .send(component)
            .map_err(|_| RerenderError::Disconnected)
    }
}

// ----------------------------------------------------------------------------
// Fallback
// ----------------------------------------------------------------------------

/// Tries each host in order until one accepts the request.
///
/// List the preferred strategy first and successively simpler ones after
/// it. A host that panics counts as a failure.
pub struct Fallback {
    strategies: SmallVec<[Box<dyn RerenderHost>; 3]>,
}

impl Fallback {
    /// Start a chain with its preferred strategy.
    pub fn new(primary: impl RerenderHost + 'static) -> Self {
        let mut strategies: SmallVec<[Box<dyn RerenderHost>; 3]> = SmallVec::new();
        strategies.push(Box::new(primary));
        Self { strategies }
    }

    /// Append a strategy to try when the earlier ones fail.
    pub fn or_else(mut self, next: impl RerenderHost + 'static) -> Self {
        self.strategies.push(Box::new(next));
        self
    }

    /// Number of strategies in the chain.
    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    /// Always `false`: a chain starts with its primary strategy. Present
    /// as the companion of [`len`](Fallback::len).
    pub fn is_empty(&self) -> bool {
        false
    }
}

impl RerenderHost for Fallback {
    fn request_rerender(&self, component: ComponentId) -> RerenderResult {
        let mut last = None;
        for (index, strategy) in self.strategies.iter().enumerate() {
            match attempt(strategy.as_ref(), component) {
                Ok(()) => return Ok(()),
                Err(error) => {
                    tracing::debug!(%component, strategy = index, %error, "re-render strategy failed");
                    last = Some(error);
                }
            }
        }

        Err(RerenderError::Exhausted {
            attempts: self.strategies.len(),
            last: Box::new(last.unwrap_or(RerenderError::Unmounted(component))),
        })
    }
}

impl fmt::Debug for Fallback {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fallback")
            .field("strategies", &self.strategies.len())
            .finish()
    }
}
