//! Ripple Core
//!
//! This crate provides reactive value propagation for UI state:
//!
//! - Observable cells ([`Signal`]) that notify listeners when their value
//!   changes
//! - Derived cells ([`Computed`]) that recompute from other cells
//! - Disposable [`Subscription`] handles
//! - A re-render adapter that binds cells to UI components
//!
//! Everything runs synchronously on the caller's thread. There is no
//! scheduler, batching, or cycle detection.
//!
//! # Architecture
//!
//! - `reactive`: cells, subscriptions, and dependency tracking
//! - `render`: component bindings and re-render hosts
//! - `error`: errors reported by re-render hosts
//!
//! # Example
//!
//! ```rust
//! use ripple_core::reactive::{Computed, Signal};
//! use ripple_core::render::{bind, ComponentId, RenderQueue};
//!
//! let count = Signal::new(1);
//! let doubled = Computed::new(&[&count], {
//!     let count = count.clone();
//!     move || count.get() * 2
//! });
//!
//! let queue = RenderQueue::new();
//! let view = ComponentId::new();
//! let binding = bind(&doubled, view, queue.clone());
//!
//! count.set(5);
//! assert_eq!(binding.value(), 10);
//! assert_eq!(queue.drain(), vec![view]);
//! ```

pub mod error;
pub mod reactive;
pub mod render;

pub use error::{RerenderError, RerenderResult};
pub use reactive::{Computed, Signal, Subscription};
pub use render::{bind, bind_fn, Binding, ComponentId, RerenderHost};
