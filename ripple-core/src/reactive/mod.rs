//! Reactive Primitives
//!
//! This module implements the value-propagation core: signals, computeds,
//! and the subscriptions that connect them.
//!
//! # Concepts
//!
//! ## Signals
//!
//! A [`Signal`] is a mutable cell. Setting it to a value different from the
//! current one synchronously notifies every listener, in subscription order.
//! Setting an equal value does nothing.
//!
//! ## Computeds
//!
//! A [`Computed`] is a read-only cell derived from other cells. It recomputes
//! whenever an upstream changes and republishes only if the result differs,
//! so chains of computeds collapse redundant updates.
//!
//! ## Subscriptions
//!
//! Every `subscribe` returns a [`Subscription`]. Disposing it removes exactly
//! that listener. Disposal is idempotent.
//!
//! # Implementation Notes
//!
//! Everything here is single-threaded and synchronous. Cells are `Rc` based,
//! so the compiler keeps them on one thread; there are no locks and no
//! scheduler. A `set` returns only after every listener (and every computed
//! downstream of it) has run.
//!
//! Dependencies are explicit by default. [`Computed::tracked`] adds
//! automatic discovery through a thread-local [`ReactiveContext`].

mod computed;
mod context;
mod signal;
mod source;
mod subscription;

pub use computed::{Computed, Dependencies};
pub use context::{untrack, ReactiveContext};
pub use signal::Signal;
pub use source::{Observable, Source};
pub use subscription::{CellId, Subscription, SubscriptionId};
